//! The observer contract that connects RIB layers.
//!
//! Every table (a Loc-RIB, an Adj-RIB-Out, a filter, a wire encoder, ...)
//! implements [`RouteTableClient`], so it can be registered with a table
//! upstream of it, and keeps a [`ClientManager`] holding the tables
//! downstream of it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use inetnum::addr::Prefix;
use log::{debug, error, trace};
use parking_lot::RwLock;

use crate::route::Path;
use crate::types::errors::RibError;

//------------ RouteTableClient ----------------------------------------------

/// A table that receives path updates from another table.
pub trait RouteTableClient: Send + Sync {
    /// Receive a new path for `prefix`. The caller keeps the path, a client
    /// that wants to change it works on a copy.
    fn add_path(&self, prefix: &Prefix, path: &Path) -> Result<(), RibError>;

    /// Withdraw `path` for `prefix`. Returns true if the client actually had
    /// the path (or what it derived from it) and withdrew it.
    fn remove_path(&self, prefix: &Prefix, path: &Path) -> bool;

    /// Replay the current state of this table to a newly registered client.
    fn update_new_client(
        &self,
        client: Arc<dyn RouteTableClient>,
    ) -> Result<(), RibError>;

    /// Register `client` to receive the best path of every route.
    fn register(&self, client: Arc<dyn RouteTableClient>) {
        self.register_with_options(client, ClientOptions::best_only());
    }

    fn register_with_options(
        &self,
        client: Arc<dyn RouteTableClient>,
        options: ClientOptions,
    );

    fn unregister(&self, client: &Arc<dyn RouteTableClient>);

    /// The number of prefixes with at least one path in this table.
    fn route_count(&self) -> i64;

    /// Re-evaluate `paths`, the complete current set of paths for `prefix`
    /// upstream, after the client changed how it processes paths (e.g. its
    /// export filter). Clients that keep no such state ignore this.
    fn refresh_route(&self, _prefix: &Prefix, _paths: &[Path]) {}
}

/// A table that can resend its state to one of its clients.
pub trait RouteTable: Send + Sync {
    /// Calls [`RouteTableClient::refresh_route`] on `client` for every route
    /// in this table, with the paths the client is registered to receive.
    ///
    /// `done` runs after the last route was handed over and before the
    /// table processes any further changes, so the client can switch over
    /// to its new way of processing paths without missing an update.
    fn refresh_client(
        &self,
        client: &Arc<dyn RouteTableClient>,
        done: &dyn Fn(),
    );
}

/// Whether `a` and `b` are the same client object.
pub fn same_client(
    a: &Arc<dyn RouteTableClient>,
    b: &Arc<dyn RouteTableClient>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

//------------ ClientOptions -------------------------------------------------

/// How many paths per prefix a client wants to receive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Only the best path.
    pub best_only: bool,
    /// The best path and all paths equal cost to it.
    pub ecmp_only: bool,
    /// Up to this many paths, best first. Only used when neither of the
    /// flags above is set.
    pub max_paths: usize,
}

impl ClientOptions {
    pub fn best_only() -> Self {
        Self {
            best_only: true,
            ..Default::default()
        }
    }

    pub fn ecmp_only() -> Self {
        Self {
            ecmp_only: true,
            ..Default::default()
        }
    }

    pub fn max_paths(max_paths: usize) -> Self {
        Self {
            max_paths,
            ..Default::default()
        }
    }

    /// The number of paths to deliver for a route with `ecmp_count` equal
    /// cost best paths.
    pub fn get_max_paths(&self, ecmp_count: usize) -> usize {
        if self.best_only {
            1
        } else if self.ecmp_only {
            ecmp_count
        } else {
            self.max_paths
        }
    }
}

//------------ ClientManager -------------------------------------------------

type ClientList = Vec<(Arc<dyn RouteTableClient>, ClientOptions)>;

/// The registry of the clients of one table.
///
/// The registry has its own lock. Callers iterate over a snapshot taken with
/// [`clients`](Self::clients), so client callbacks never run while the lock
/// is held, and a client is free to (un)register from inside a callback.
pub struct ClientManager {
    clients: RwLock<ClientList>,
    disposed: AtomicBool,
    owner: Option<Weak<dyn RouteTableClient>>,
}

impl ClientManager {
    /// A registry for the table `owner`. Newly registered clients are
    /// caught up through `owner`'s
    /// [`update_new_client`](RouteTableClient::update_new_client).
    pub fn new(owner: Weak<dyn RouteTableClient>) -> Self {
        Self {
            clients: RwLock::new(vec![]),
            disposed: AtomicBool::new(false),
            owner: Some(owner),
        }
    }

    /// A registry that does not catch up new clients.
    pub fn without_owner() -> Self {
        Self {
            clients: RwLock::new(vec![]),
            disposed: AtomicBool::new(false),
            owner: None,
        }
    }

    pub fn register(
        &self,
        client: Arc<dyn RouteTableClient>,
    ) -> Result<(), RibError> {
        self.register_with_options(client, ClientOptions::best_only())
    }

    /// Stores `client` with `options`, replacing the options if the client
    /// was already registered, and lets the owning table replay its state
    /// to it. A failed replay is logged, the client stays registered.
    pub fn register_with_options(
        &self,
        client: Arc<dyn RouteTableClient>,
        options: ClientOptions,
    ) -> Result<(), RibError> {
        {
            let mut clients = self.clients.write();
            if self.disposed.load(Ordering::Acquire) {
                return Err(RibError::RegistryDisposed);
            }
            match clients.iter_mut().find(|(c, _)| same_client(c, &client)) {
                Some(entry) => entry.1 = options,
                None => clients.push((Arc::clone(&client), options)),
            }
        }
        trace!("registered client with {:?}", options);

        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            if let Err(err) = owner.update_new_client(client) {
                error!("could not catch up new client: {}", err);
            }
        }
        Ok(())
    }

    /// Removes `client`. Unknown clients are ignored.
    pub fn unregister(&self, client: &Arc<dyn RouteTableClient>) {
        self.clients.write().retain(|(c, _)| !same_client(c, client));
    }

    /// A point in time copy of all registered clients.
    pub fn clients(&self) -> Vec<Arc<dyn RouteTableClient>> {
        self.clients
            .read()
            .iter()
            .map(|(c, _)| Arc::clone(c))
            .collect()
    }

    /// A point in time copy of all registered clients with their options.
    pub fn clients_with_options(&self) -> ClientList {
        self.clients.read().clone()
    }

    pub fn get_options(
        &self,
        client: &Arc<dyn RouteTableClient>,
    ) -> Option<ClientOptions> {
        self.clients
            .read()
            .iter()
            .find(|(c, _)| same_client(c, client))
            .map(|(_, o)| *o)
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Unregisters every client and refuses new ones from now on.
    pub fn dispose(&self) {
        let mut clients = self.clients.write();
        self.disposed.store(true, Ordering::Release);
        debug!("disposing of client registry with {} clients", clients.len());
        clients.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientManager")
            .field("clients", &self.client_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
