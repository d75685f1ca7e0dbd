use std::fmt;
use std::sync::{Arc, Weak};

use inetnum::addr::Prefix;
use log::{debug, error, warn};
use parking_lot::Mutex;

use crate::rib::client::{
    ClientManager, ClientOptions, RouteTable, RouteTableClient,
};
use crate::route::{Path, Route};
use crate::trie::RoutingTable;
use crate::types::errors::RibError;

//------------ LocRib --------------------------------------------------------

/// The local RIB: all paths learned from all sources, with path selection.
///
/// Every client receives the best paths of each route, as many as its
/// [`ClientOptions`] ask for. When a route changes, each client is sent the
/// difference between the paths it had and the paths it should have now,
/// withdrawals first.
#[derive(Debug)]
pub struct LocRib {
    clients: ClientManager,
    rt: RoutingTable,
    /// Serializes changes, so that reading the old route, changing it and
    /// propagating the difference happens as one step.
    updates: Mutex<()>,
}

impl LocRib {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<LocRib>| {
            let owner: Weak<dyn RouteTableClient> = me.clone();
            LocRib {
                clients: ClientManager::new(owner),
                rt: RoutingTable::new(),
                updates: Mutex::new(()),
            }
        })
    }

    /// Whether exactly `path` is stored for `prefix`.
    pub fn contains_pfx_path(&self, prefix: &Prefix, path: &Path) -> bool {
        self.rt.contains_path(prefix, path)
    }

    pub fn get(&self, prefix: &Prefix) -> Option<Route> {
        self.rt.get(prefix)
    }

    pub fn lpm(&self, prefix: &Prefix) -> Vec<Route> {
        self.rt.lpm(prefix)
    }

    pub fn get_longer(&self, prefix: &Prefix) -> Vec<Route> {
        self.rt.get_longer(prefix)
    }

    pub fn dump(&self) -> Vec<Route> {
        self.rt.dump()
    }

    pub fn client_count(&self) -> usize {
        self.clients.client_count()
    }

    pub fn dispose(&self) {
        self.clients.dispose();
    }

    fn propagate_changes(&self, old: &Route, new: &Route) {
        let clients = self.clients.clients_with_options();

        for (client, options) in &clients {
            let (old_paths, new_paths) = limited(old, new, options);
            for path in old_paths.iter().filter(|p| !new_paths.contains(p)) {
                client.remove_path(&old.prefix(), path);
            }
        }

        for (client, options) in &clients {
            let (old_paths, new_paths) = limited(old, new, options);
            for path in new_paths.iter().filter(|p| !old_paths.contains(p)) {
                if let Err(err) = client.add_path(&new.prefix(), path) {
                    error!(
                        "could not send path for {} to client: {}",
                        new.prefix(),
                        err
                    );
                }
            }
        }
    }
}

/// The paths of the old and the new route a client with `options` gets.
fn limited<'a>(
    old: &'a Route,
    new: &'a Route,
    options: &ClientOptions,
) -> (&'a [Path], &'a [Path]) {
    (
        old.best_paths(options.get_max_paths(old.ecmp_path_count())),
        new.best_paths(options.get_max_paths(new.ecmp_path_count())),
    )
}

impl RouteTableClient for LocRib {
    fn add_path(&self, prefix: &Prefix, path: &Path) -> Result<(), RibError> {
        let _updates = self.updates.lock();
        debug!("add path to Loc-RIB for {}: {}", prefix, path);

        let old = self.rt.get(prefix).unwrap_or_else(|| Route::new(*prefix));
        if !self.rt.add_path(prefix, path.clone())? {
            return Ok(());
        }
        let new = self.rt.get(prefix).ok_or(RibError::RouteNotFound)?;

        self.propagate_changes(&old, &new);
        Ok(())
    }

    fn remove_path(&self, prefix: &Prefix, path: &Path) -> bool {
        let _updates = self.updates.lock();
        debug!("remove path from Loc-RIB for {}: {}", prefix, path);

        let Some(old) = self.rt.get(prefix) else {
            return false;
        };
        if !self.rt.remove_path(prefix, path) {
            return false;
        }
        let new = self.rt.get(prefix).unwrap_or_else(|| Route::new(*prefix));

        self.propagate_changes(&old, &new);
        true
    }

    fn update_new_client(
        &self,
        client: Arc<dyn RouteTableClient>,
    ) -> Result<(), RibError> {
        let _updates = self.updates.lock();
        let options = self
            .clients
            .get_options(&client)
            .unwrap_or_else(ClientOptions::best_only);

        for route in self.rt.dump() {
            let max = options.get_max_paths(route.ecmp_path_count());
            for path in route.best_paths(max) {
                client.add_path(&route.prefix(), path)?;
            }
        }
        Ok(())
    }

    fn register_with_options(
        &self,
        client: Arc<dyn RouteTableClient>,
        options: ClientOptions,
    ) {
        if let Err(err) = self.clients.register_with_options(client, options)
        {
            warn!("could not register client with Loc-RIB: {}", err);
        }
    }

    fn unregister(&self, client: &Arc<dyn RouteTableClient>) {
        self.clients.unregister(client);
    }

    fn route_count(&self) -> i64 {
        self.rt.get_route_count()
    }
}

impl RouteTable for LocRib {
    fn refresh_client(
        &self,
        client: &Arc<dyn RouteTableClient>,
        done: &dyn Fn(),
    ) {
        let _updates = self.updates.lock();
        let options = self
            .clients
            .get_options(client)
            .unwrap_or_else(ClientOptions::best_only);

        for route in self.rt.dump() {
            let max = options.get_max_paths(route.ecmp_path_count());
            client.refresh_route(&route.prefix(), route.best_paths(max));
        }
        done();
    }
}

impl fmt::Display for LocRib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Loc-RIB DUMP:")?;
        for route in self.rt.dump() {
            writeln!(f, "{}", route.prefix())?;
        }
        Ok(())
    }
}
