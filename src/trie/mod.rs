//! The routing table: a path-compressed binary trie mapping prefixes to
//! [`Route`]s, one trie per address family.

mod node;

use std::net::IpAddr;
use std::sync::atomic::{AtomicI64, Ordering};

use inetnum::addr::Prefix;
use log::trace;
use parking_lot::RwLock;

use crate::route::{Path, Route};
use crate::types::errors::RibError;
use crate::types::PrefixId;
use crate::{AddressFamily, IPv4, IPv6};

use node::AfTrie;

#[derive(Debug, Default)]
struct Tries {
    v4: AfTrie<IPv4>,
    v6: AfTrie<IPv6>,
}

//------------ RoutingTable --------------------------------------------------

/// A routing table for IPv4 and IPv6 prefixes.
///
/// All operations take `&self`, the table is meant to be shared between
/// threads. Readers take a read lock on the tries, writers take the write
/// lock for the whole structural change. The route count is kept in an
/// atomic and can be read without locking.
#[derive(Debug, Default)]
pub struct RoutingTable {
    tries: RwLock<Tries>,
    route_count: AtomicI64,
}

/// Runs `$body` with `$trie` bound to the trie of the address family of
/// `$pfx`, and `$id` to the `PrefixId` of `$pfx` in that family.
macro_rules! with_af_trie {
    (mut $tries:expr, $pfx:expr, |$trie:ident, $id:ident| $body:expr) => {
        match $pfx.addr() {
            IpAddr::V4(addr) => {
                let $id = PrefixId::<IPv4>::new(
                    <IPv4 as AddressFamily>::from_ipaddr(addr),
                    $pfx.len(),
                );
                let $trie = &mut $tries.v4;
                $body
            }
            IpAddr::V6(addr) => {
                let $id = PrefixId::<IPv6>::new(
                    <IPv6 as AddressFamily>::from_ipaddr(addr),
                    $pfx.len(),
                );
                let $trie = &mut $tries.v6;
                $body
            }
        }
    };
    ($tries:expr, $pfx:expr, |$trie:ident, $id:ident| $body:expr) => {
        match $pfx.addr() {
            IpAddr::V4(addr) => {
                let $id = PrefixId::<IPv4>::new(
                    <IPv4 as AddressFamily>::from_ipaddr(addr),
                    $pfx.len(),
                );
                let $trie = &$tries.v4;
                $body
            }
            IpAddr::V6(addr) => {
                let $id = PrefixId::<IPv6>::new(
                    <IPv6 as AddressFamily>::from_ipaddr(addr),
                    $pfx.len(),
                );
                let $trie = &$tries.v6;
                $body
            }
        }
    };
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of prefixes that have at least one path.
    pub fn get_route_count(&self) -> i64 {
        self.route_count.load(Ordering::Acquire)
    }

    /// Adds `path` to the route for `prefix`, creating the route if needed.
    /// Returns false if an equal path was already present.
    pub fn add_path(
        &self,
        prefix: &Prefix,
        path: Path,
    ) -> Result<bool, RibError> {
        let mut tries = self.tries.write();
        let inserted = with_af_trie!(mut tries, prefix, |trie, id| {
            trie.add_path(id, *prefix, path)?
        });
        if inserted.new_route {
            self.route_count.fetch_add(1, Ordering::AcqRel);
        }
        Ok(inserted.added)
    }

    /// Removes `path` from the route for `prefix`. Returns whether the path
    /// was there.
    pub fn remove_path(&self, prefix: &Prefix, path: &Path) -> bool {
        let mut tries = self.tries.write();
        let Some((_, route_gone)) =
            with_af_trie!(mut tries, prefix, |trie, id| trie
                .remove_path(&id, path))
        else {
            return false;
        };
        if route_gone {
            self.route_count.fetch_sub(1, Ordering::AcqRel);
        }
        true
    }

    /// Replaces all paths of `prefix` with `path`. Returns the paths that
    /// were displaced, best first; empty if the prefix was not stored.
    ///
    /// The route count only ever goes up here: a stored prefix keeps
    /// counting as one route while its paths are swapped.
    pub fn replace_path(
        &self,
        prefix: &Prefix,
        path: Path,
    ) -> Result<Vec<Path>, RibError> {
        let mut tries = self.tries.write();
        let (old, inserted) = with_af_trie!(mut tries, prefix, |trie, id| {
            trie.replace_path(id, *prefix, path)?
        });
        if inserted.new_route {
            self.route_count.fetch_add(1, Ordering::AcqRel);
        }
        Ok(old)
    }

    /// Removes all paths of `prefix`, returning them best first.
    pub fn remove_prefix(&self, prefix: &Prefix) -> Vec<Path> {
        let mut tries = self.tries.write();
        let (paths, removed) =
            with_af_trie!(mut tries, prefix, |trie, id| trie
                .remove_prefix(&id));
        if removed {
            trace!("removed all {} paths of {}", paths.len(), prefix);
            self.route_count.fetch_sub(1, Ordering::AcqRel);
        }
        paths
    }

    /// The route stored for exactly `prefix`, if any.
    pub fn get(&self, prefix: &Prefix) -> Option<Route> {
        let tries = self.tries.read();
        with_af_trie!(tries, prefix, |trie, id| trie.get(&id).cloned())
    }

    /// Whether `path` is stored for `prefix`.
    pub fn contains_path(&self, prefix: &Prefix, path: &Path) -> bool {
        let tries = self.tries.read();
        with_af_trie!(tries, prefix, |trie, id| trie
            .get(&id)
            .is_some_and(|r| r.paths().contains(path)))
    }

    /// All routes for prefixes covering `prefix` (including `prefix`
    /// itself), least specific first. The last one is the longest match.
    pub fn lpm(&self, prefix: &Prefix) -> Vec<Route> {
        let tries = self.tries.read();
        with_af_trie!(tries, prefix, |trie, id| trie.lpm(&id))
    }

    /// The route for `prefix` (if stored) and all more specific routes.
    pub fn get_longer(&self, prefix: &Prefix) -> Vec<Route> {
        let tries = self.tries.read();
        with_af_trie!(tries, prefix, |trie, id| trie.get_longer(&id))
    }

    /// All routes, IPv4 first, each family in pre-order.
    pub fn dump(&self) -> Vec<Route> {
        let tries = self.tries.read();
        let mut res = tries.v4.dump();
        res.extend(tries.v6.dump());
        res
    }
}
