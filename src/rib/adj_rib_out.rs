use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use inetnum::addr::Prefix;
use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::rib::client::{
    ClientManager, ClientOptions, RouteTable, RouteTableClient,
};
use crate::rib::filter::FilterChain;
use crate::rib::path_id::PathIdManager;
use crate::rib::session::SessionAttrs;
use crate::route::attributes::Community;
use crate::route::{BgpPath, BgpPathCache, Path, Route};
use crate::trie::RoutingTable;
use crate::types::errors::RibError;

#[derive(Debug)]
struct State {
    path_ids: PathIdManager,
    export_filter: FilterChain,
    /// The chain that is about to replace `export_filter`, while the
    /// upstream table is resending its routes.
    pending_filter: Option<FilterChain>,
}

//------------ AdjRibOut -----------------------------------------------------

/// The view of the routes to be sent to one BGP peer.
///
/// An `AdjRibOut` is registered as a client with an upstream table (usually
/// a Loc-RIB). For every path it receives it decides whether the peer
/// should see it, rewrites it the way this session requires, runs it
/// through the export filter chain, stores the result and hands it to its
/// own clients (usually the update sender of the session).
///
/// With add-path sending enabled every stored path gets its own path
/// identifier and a prefix can have multiple paths. Without add-path, a new
/// path for a prefix replaces the one sent before.
///
/// All changes to the table happen while holding the state lock, including
/// the delivery to the clients, so the clients see the changes in the
/// order in which they were made.
#[derive(Debug)]
pub struct AdjRibOut {
    me: Weak<AdjRibOut>,
    clients: ClientManager,
    attrs: SessionAttrs,
    cache: Arc<BgpPathCache>,
    upstream: Option<Weak<dyn RouteTable>>,
    rt: RoutingTable,
    state: Mutex<State>,
}

impl AdjRibOut {
    pub fn new(
        attrs: SessionAttrs,
        export_filter: FilterChain,
        cache: Arc<BgpPathCache>,
    ) -> Arc<Self> {
        Self::build(attrs, export_filter, cache, None)
    }

    /// An `AdjRibOut` that asks `upstream` to resend its routes whenever
    /// the export filter chain is replaced.
    pub fn with_upstream<T: RouteTable + 'static>(
        attrs: SessionAttrs,
        export_filter: FilterChain,
        cache: Arc<BgpPathCache>,
        upstream: &Arc<T>,
    ) -> Arc<Self> {
        let upstream: Weak<dyn RouteTable> = Arc::downgrade(upstream) as Weak<T>;
        Self::build(attrs, export_filter, cache, Some(upstream))
    }

    fn build(
        attrs: SessionAttrs,
        export_filter: FilterChain,
        cache: Arc<BgpPathCache>,
        upstream: Option<Weak<dyn RouteTable>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<AdjRibOut>| {
            let owner: Weak<dyn RouteTableClient> = me.clone();
            AdjRibOut {
                me: me.clone(),
                clients: ClientManager::new(owner),
                attrs,
                cache,
                upstream,
                rt: RoutingTable::new(),
                state: Mutex::new(State {
                    path_ids: PathIdManager::new(),
                    export_filter,
                    pending_filter: None,
                }),
            }
        })
    }

    pub fn session_attrs(&self) -> &SessionAttrs {
        &self.attrs
    }

    //-------- Propagation rules ---------------------------------------------

    /// Whether `path` may be sent to this peer at all: it was not learned
    /// from the peer itself and its communities don't forbid it.
    pub fn should_propagate(&self, path: &BgpPath) -> bool {
        !self.is_own_path(path) && !self.is_disallowed_by_community(path)
    }

    fn is_own_path(&self, path: &BgpPath) -> bool {
        path.source == self.attrs.peer_ip
    }

    fn is_disallowed_by_community(&self, path: &BgpPath) -> bool {
        path.communities.iter().flatten().any(|c| {
            (*c == Community::NO_EXPORT && !self.attrs.ibgp)
                || *c == Community::NO_ADVERTISE
        })
    }

    /// Applies the changes this session makes to every path it sends.
    /// Returns `None` if the path must not be sent to this peer.
    fn rewrite(&self, path: &BgpPath) -> Option<BgpPath> {
        let attrs = &self.attrs;

        // iBGP learned paths are not sent to iBGP peers, unless we reflect
        if attrs.ibgp && !attrs.route_reflector_client && !path.ebgp {
            trace!("not sending iBGP path to iBGP peer {}", attrs.peer_ip);
            return None;
        }

        let mut path = path.clone();

        if attrs.ibgp && attrs.route_reflector_client {
            if path.originator_id == 0 {
                path.originator_id = path.bgp_identifier;
            }
            path.prepend_cluster_id(attrs.cluster_id);
        }

        if !attrs.ibgp && !attrs.route_server_client {
            path.prepend(attrs.local_asn(), 1);
            path.next_hop = attrs.local_ip;
        }

        if attrs.otc_enforced() {
            if path.only_to_customer != 0 {
                if attrs.peer_role_remote.refuses_otc() {
                    trace!(
                        "not sending OTC path to {} {}",
                        attrs.peer_role_remote,
                        attrs.peer_ip
                    );
                    return None;
                }
            } else if attrs.peer_role_remote.sets_otc() {
                path.only_to_customer = attrs.local_asn;
            }
        }

        Some(path)
    }

    /// The path as it would be sent to the peer with `filter` as export
    /// filter chain, or `None` if it would not be sent.
    fn export(
        &self,
        prefix: &Prefix,
        path: &BgpPath,
        filter: &FilterChain,
    ) -> Option<BgpPath> {
        let rewritten = self.rewrite(path)?;
        let verdict = filter.process(prefix, Path::new_bgp(rewritten));
        if verdict.reject {
            trace!("export filter rejected path for {}", prefix);
            return None;
        }
        match verdict.path {
            Path::Bgp(path) => Some(Arc::unwrap_or_clone(path)),
            _ => None,
        }
    }

    //-------- Table changes, all with the state lock held ----------------

    fn add_locked(
        &self,
        state: &mut State,
        prefix: &Prefix,
        path: BgpPath,
    ) -> Result<(), RibError> {
        let path = if self.attrs.add_path_tx {
            let id = state.path_ids.add_path(&path)?;
            let path =
                Path::Bgp(self.cache.intern(path.with_path_identifier(id)));
            match self.rt.add_path(prefix, path.clone()) {
                Ok(true) => {}
                Ok(false) => {
                    // Another upstream path exports to this one, each of
                    // them holds a reference.
                    trace!("{} already sent for {}", path, prefix);
                    return Ok(());
                }
                Err(err) => {
                    self.release(state, &path);
                    return Err(err);
                }
            }
            path
        } else {
            let path = Path::Bgp(self.cache.intern(path));
            let old_paths = match self.rt.replace_path(prefix, path.clone())
            {
                Ok(old_paths) => old_paths,
                Err(err) => {
                    self.release_cached(&path);
                    return Err(err);
                }
            };
            for old in old_paths {
                self.release_cached(&old);
                if old != path {
                    self.withdraw(prefix, &old);
                }
            }
            path
        };

        self.announce(prefix, &path);
        Ok(())
    }

    fn remove_locked(
        &self,
        state: &mut State,
        prefix: &Prefix,
        path: &BgpPath,
    ) -> bool {
        let Some(route) = self.rt.get(prefix) else {
            return false;
        };

        let Some(stored) = self.find_stored(&route, path).cloned() else {
            trace!("path for {} was never sent", prefix);
            return false;
        };

        if self.release(state, &stored) > 0 {
            trace!("{} still sent for {}", stored, prefix);
            return true;
        }
        if !self.rt.remove_path(prefix, &stored) {
            return false;
        }
        self.withdraw(prefix, &stored);
        true
    }

    /// The stored path in `route` that was sent for `path`. With add-path
    /// the stored path carries an identifier that `path` doesn't have yet,
    /// so an attribute-wise match is tried first, then any path that is
    /// equal in path selection.
    fn find_stored<'a>(
        &self,
        route: &'a Route,
        path: &BgpPath,
    ) -> Option<&'a Path> {
        let paths = route.paths();
        if !self.attrs.add_path_tx {
            return paths
                .iter()
                .find(|p| p.bgp().is_some_and(|b| **b == *path));
        }
        paths
            .iter()
            .find(|p| {
                p.bgp().is_some_and(|b| {
                    **b == path.with_path_identifier(b.path_identifier)
                })
            })
            .or_else(|| {
                paths.iter().find(|p| {
                    p.bgp()
                        .is_some_and(|b| b.select(path) == Ordering::Equal)
                })
            })
    }

    /// Withdraws every path sent for `prefix`.
    fn remove_prefix_locked(&self, state: &mut State, prefix: &Prefix) {
        for path in self.rt.remove_prefix(prefix) {
            while self.release(state, &path) > 0 {}
            self.withdraw(prefix, &path);
        }
    }

    /// Gives back one reference to the path identifier (with add-path) and
    /// the cache entry of a stored path. Returns how many upstream paths
    /// still map to the stored path, which is always zero without
    /// add-path.
    fn release(&self, state: &mut State, path: &Path) -> u64 {
        let mut left = 0;
        if self.attrs.add_path_tx {
            if let Some(bgp) = path.bgp() {
                match state.path_ids.release_path(bgp) {
                    Ok(refs) => left = refs,
                    Err(err) => warn!(
                        "could not release path id of {}: {}",
                        path, err
                    ),
                }
            }
        }
        self.release_cached(path);
        left
    }

    fn release_cached(&self, path: &Path) {
        if let Some(bgp) = path.bgp() {
            if let Err(err) = self.cache.release(bgp) {
                warn!("could not release cached path {}: {}", path, err);
            }
        }
    }

    //-------- Delivery ------------------------------------------------------

    fn announce(&self, prefix: &Prefix, path: &Path) {
        for client in self.clients.clients() {
            if let Err(err) = client.add_path(prefix, path) {
                error!(
                    "could not send update for {} to client: {}",
                    prefix, err
                );
            }
        }
    }

    fn withdraw(&self, prefix: &Prefix, path: &Path) {
        for client in self.clients.clients() {
            client.remove_path(prefix, path);
        }
    }

    //-------- Export filter -----------------------------------------------

    /// Replaces the export filter chain. The upstream table resends all its
    /// routes while both chains are known, so that paths the new chain
    /// treats differently are sent or withdrawn. The new chain takes over
    /// before the upstream table lets any further changes through.
    pub fn replace_filter_chain(&self, chain: FilterChain) {
        self.state.lock().pending_filter = Some(chain);

        match (
            self.upstream.as_ref().and_then(Weak::upgrade),
            self.me.upgrade(),
        ) {
            (Some(upstream), Some(me)) => {
                let me: Arc<dyn RouteTableClient> = me;
                upstream.refresh_client(&me, &|| self.commit_filter_chain());
            }
            _ => {
                debug!(
                    "no upstream table to refresh {} from",
                    self.attrs.peer_ip
                );
                self.commit_filter_chain();
            }
        }
    }

    fn commit_filter_chain(&self) {
        let mut state = self.state.lock();
        if let Some(chain) = state.pending_filter.take() {
            state.export_filter = chain;
        }
    }

    //-------- Queries -------------------------------------------------------

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

    /// Drops all clients. Called when the session goes away.
    pub fn dispose(&self) {
        self.clients.dispose();
    }
}

impl RouteTableClient for AdjRibOut {
    fn add_path(&self, prefix: &Prefix, path: &Path) -> Result<(), RibError> {
        let Some(bgp) = path.bgp() else {
            trace!("not sending {} path for {}", path.protocol(), prefix);
            return Ok(());
        };

        let mut state = self.state.lock();

        if !self.should_propagate(bgp) {
            trace!("not propagating {} to {}", prefix, self.attrs.peer_ip);
            if self.attrs.add_path_tx {
                self.remove_prefix_locked(&mut state, prefix);
            }
            return Ok(());
        }

        let Some(path) = self.export(prefix, bgp, &state.export_filter)
        else {
            return Ok(());
        };
        self.add_locked(&mut state, prefix, path)
    }

    fn remove_path(&self, prefix: &Prefix, path: &Path) -> bool {
        let Some(bgp) = path.bgp() else {
            return false;
        };
        if !self.should_propagate(bgp) {
            return false;
        }

        let mut state = self.state.lock();
        let Some(path) = self.export(prefix, bgp, &state.export_filter)
        else {
            return false;
        };
        self.remove_locked(&mut state, prefix, &path)
    }

    fn update_new_client(
        &self,
        client: Arc<dyn RouteTableClient>,
    ) -> Result<(), RibError> {
        let _state = self.state.lock();
        for route in self.rt.dump() {
            for path in route.paths() {
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
            warn!("could not register client: {}", err);
        }
    }

    fn unregister(&self, client: &Arc<dyn RouteTableClient>) {
        self.clients.unregister(client);
    }

    fn route_count(&self) -> i64 {
        self.rt.get_route_count()
    }

    fn refresh_route(&self, prefix: &Prefix, paths: &[Path]) {
        let mut state = self.state.lock();
        let Some(pending) = state.pending_filter.clone() else {
            trace!("no pending filter chain, nothing to refresh");
            return;
        };
        let current = state.export_filter.clone();

        for path in paths {
            let Some(bgp) = path.bgp() else {
                continue;
            };
            if !self.should_propagate(bgp) {
                continue;
            }

            let old = self.export(prefix, bgp, &current);
            let new = self.export(prefix, bgp, &pending);
            match (old, new) {
                (None, None) => {}
                (Some(old), None) => {
                    self.remove_locked(&mut state, prefix, &old);
                }
                (old, Some(new)) => {
                    if old.as_ref() == Some(&new) {
                        continue;
                    }
                    if let Some(old) = old {
                        self.remove_locked(&mut state, prefix, &old);
                    }
                    if let Err(err) = self.add_locked(&mut state, prefix, new)
                    {
                        error!("could not refresh {}: {}", prefix, err);
                    }
                }
            }
        }
    }
}

impl fmt::Display for AdjRibOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DUMPING ADJ-RIB-OUT:")?;
        for route in self.rt.dump() {
            writeln!(f, "{}", route.prefix())?;
        }
        Ok(())
    }
}
