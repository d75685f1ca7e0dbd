use inetnum::addr::Prefix;
use log::trace;

use crate::route::{Path, Route};
use crate::types::errors::RibError;
use crate::types::PrefixId;
use crate::AddressFamily;

//------------ TrieNode ------------------------------------------------------

/// A node in the path-compressed binary trie.
///
/// `skip` is the number of address bits consumed since the parent node
/// (the length of the prefix for the root). A `dummy` node only exists to
/// branch into its two children, its route is always empty and it is never
/// returned from a lookup.
#[derive(Debug)]
pub(crate) struct TrieNode<AF: AddressFamily> {
    pub(crate) prefix: PrefixId<AF>,
    pub(crate) skip: u8,
    pub(crate) dummy: bool,
    pub(crate) route: Route,
    pub(crate) low: Option<usize>,
    pub(crate) high: Option<usize>,
}

impl<AF: AddressFamily> TrieNode<AF> {
    fn child(&self, high: bool) -> Option<usize> {
        if high {
            self.high
        } else {
            self.low
        }
    }

    fn set_child(&mut self, high: bool, idx: usize) {
        if high {
            self.high = Some(idx);
        } else {
            self.low = Some(idx);
        }
    }
}

/// What an insertion did to the trie.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Inserted {
    /// A prefix without any paths (absent or dummy) now has one.
    pub(crate) new_route: bool,
    /// The path was added, i.e. it was not a duplicate.
    pub(crate) added: bool,
}

//------------ AfTrie --------------------------------------------------------

/// The trie for one address family.
///
/// Nodes live in an arena and refer to their children by index. Every node
/// has at most one parent, and nodes are never freed: a prefix that loses
/// its last path turns into a dummy node.
#[derive(Debug)]
pub(crate) struct AfTrie<AF: AddressFamily> {
    nodes: Vec<TrieNode<AF>>,
    root: Option<usize>,
}

impl<AF: AddressFamily> Default for AfTrie<AF> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<AF: AddressFamily> AfTrie<AF> {
    pub(crate) fn node(&self, idx: usize) -> Option<&TrieNode<AF>> {
        self.nodes.get(idx)
    }

    pub(crate) fn root(&self) -> Option<&TrieNode<AF>> {
        self.root.and_then(|idx| self.node(idx))
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn new_node(
        &mut self,
        prefix: PrefixId<AF>,
        skip: u8,
        route: Route,
        dummy: bool,
    ) -> usize {
        self.nodes.push(TrieNode {
            prefix,
            skip,
            dummy,
            route,
            low: None,
            high: None,
        });
        self.nodes.len() - 1
    }

    fn new_leaf(
        &mut self,
        prefix: PrefixId<AF>,
        skip: u8,
        pfx: Prefix,
        path: Path,
    ) -> usize {
        self.new_node(prefix, skip, Route::new_with_path(pfx, path), false)
    }

    //-------- Insertion -----------------------------------------------------

    pub(crate) fn add_path(
        &mut self,
        prefix: PrefixId<AF>,
        pfx: Prefix,
        path: Path,
    ) -> Result<Inserted, RibError> {
        let Some(root) = self.root else {
            let idx = self.new_leaf(prefix, prefix.get_len(), pfx, path);
            self.root = Some(idx);
            return Ok(Inserted {
                new_route: true,
                added: true,
            });
        };

        let (root, inserted) = self.insert_at(root, prefix, pfx, path)?;
        self.root = Some(root);
        Ok(inserted)
    }

    /// Inserts `path` for `prefix` into the subtree rooted at `idx`. Returns
    /// the index of the node that now roots this subtree, which differs
    /// from `idx` if a node had to be placed above it.
    fn insert_at(
        &mut self,
        idx: usize,
        prefix: PrefixId<AF>,
        pfx: Prefix,
        path: Path,
    ) -> Result<(usize, Inserted), RibError> {
        let (node_prefix, node_skip) = {
            let node = self.nodes.get(idx).ok_or(RibError::RouteNotFound)?;
            (node.prefix, node.skip)
        };

        // The prefix is stored in this node
        if node_prefix == prefix {
            let node =
                self.nodes.get_mut(idx).ok_or(RibError::RouteNotFound)?;
            let was_dummy = node.dummy;
            let added = node.route.add_path(path);
            node.dummy = node.dummy && !added;
            return Ok((
                idx,
                Inserted {
                    new_route: was_dummy && added,
                    added,
                },
            ));
        }

        // The prefix lives below this node
        if node_prefix.contains(&prefix) {
            let high = node_prefix.child_bit(&prefix);
            let child = self
                .nodes
                .get(idx)
                .ok_or(RibError::RouteNotFound)?
                .child(high);
            let (child, inserted) = match child {
                Some(child) => self.insert_at(child, prefix, pfx, path)?,
                None => {
                    let skip = prefix.get_len() - node_prefix.get_len() - 1;
                    (
                        self.new_leaf(prefix, skip, pfx, path),
                        Inserted {
                            new_route: true,
                            added: true,
                        },
                    )
                }
            };
            self.nodes
                .get_mut(idx)
                .ok_or(RibError::RouteNotFound)?
                .set_child(high, child);
            return Ok((idx, inserted));
        }

        // The prefix covers this node: it goes in above it
        if prefix.contains(&node_prefix) {
            trace!("insert {} above {}", prefix, node_prefix);
            let skip = node_skip
                .saturating_sub(node_prefix.get_len() - prefix.get_len());
            let new = self.new_leaf(prefix, skip, pfx, path);
            self.attach(new, idx)?;
            return Ok((
                new,
                Inserted {
                    new_route: true,
                    added: true,
                },
            ));
        }

        // Disjoint: branch at the longest common supernet
        let supernet = prefix.common_supernet(&node_prefix);
        trace!(
            "new branch point {} for {} and {}",
            supernet,
            prefix,
            node_prefix
        );
        let skip = node_skip
            .saturating_sub(node_prefix.get_len() - supernet.get_len());
        let branch = self.new_node(
            supernet,
            skip,
            Route::new(supernet.into_prefix()?),
            true,
        );
        self.attach(branch, idx)?;
        let leaf_skip = prefix.get_len() - supernet.get_len() - 1;
        let leaf = self.new_leaf(prefix, leaf_skip, pfx, path);
        self.attach(branch, leaf)?;

        Ok((
            branch,
            Inserted {
                new_route: true,
                added: true,
            },
        ))
    }

    /// Links `child` below `parent`, fixing up the child's skip count.
    fn attach(
        &mut self,
        parent: usize,
        child: usize,
    ) -> Result<(), RibError> {
        let parent_prefix = self
            .nodes
            .get(parent)
            .ok_or(RibError::RouteNotFound)?
            .prefix;
        let child_node =
            self.nodes.get_mut(child).ok_or(RibError::RouteNotFound)?;
        child_node.skip =
            child_node.prefix.get_len() - parent_prefix.get_len() - 1;
        let high = parent_prefix.child_bit(&child_node.prefix);
        self.nodes
            .get_mut(parent)
            .ok_or(RibError::RouteNotFound)?
            .set_child(high, child);
        Ok(())
    }

    //-------- Lookup --------------------------------------------------------

    /// The index of the node holding exactly `prefix`, dummy or not.
    fn find(&self, prefix: &PrefixId<AF>) -> Option<usize> {
        let mut cursor = self.root;
        while let Some(idx) = cursor {
            let node = self.nodes.get(idx)?;
            if node.prefix == *prefix {
                return Some(idx);
            }
            if !node.prefix.contains(prefix) {
                return None;
            }
            cursor = node.child(node.prefix.child_bit(prefix));
        }
        None
    }

    pub(crate) fn get(&self, prefix: &PrefixId<AF>) -> Option<&Route> {
        self.find(prefix)
            .and_then(|idx| self.nodes.get(idx))
            .filter(|node| !node.dummy)
            .map(|node| &node.route)
    }

    /// All routes covering `prefix`, least specific first.
    pub(crate) fn lpm(&self, prefix: &PrefixId<AF>) -> Vec<Route> {
        let mut res = vec![];
        let mut cursor = self.root;
        while let Some(node) = cursor.and_then(|idx| self.nodes.get(idx)) {
            if !node.prefix.covers(prefix) {
                break;
            }
            if !node.dummy {
                res.push(node.route.clone());
            }
            if node.prefix == *prefix {
                break;
            }
            cursor = node.child(node.prefix.child_bit(prefix));
        }
        res
    }

    /// `prefix` itself (if stored) and all more specific routes.
    pub(crate) fn get_longer(&self, prefix: &PrefixId<AF>) -> Vec<Route> {
        let mut cursor = self.root;
        while let Some(idx) = cursor {
            let Some(node) = self.nodes.get(idx) else {
                break;
            };
            if prefix.covers(&node.prefix) {
                let mut res = vec![];
                self.dump_from(idx, &mut res);
                return res;
            }
            if !node.prefix.contains(prefix) {
                break;
            }
            cursor = node.child(node.prefix.child_bit(prefix));
        }
        vec![]
    }

    /// All routes, in pre-order.
    pub(crate) fn dump(&self) -> Vec<Route> {
        let mut res = vec![];
        if let Some(root) = self.root {
            self.dump_from(root, &mut res);
        }
        res
    }

    fn dump_from(&self, idx: usize, res: &mut Vec<Route>) {
        let mut stack = vec![idx];
        while let Some(idx) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else {
                continue;
            };
            if !node.dummy {
                res.push(node.route.clone());
            }
            // high first on the stack, so that low is visited first
            stack.extend(node.high);
            stack.extend(node.low);
        }
    }

    //-------- Removal -------------------------------------------------------

    /// Removes `path` from `prefix`. Returns the removed path, and whether
    /// the prefix lost its last path with it.
    pub(crate) fn remove_path(
        &mut self,
        prefix: &PrefixId<AF>,
        path: &Path,
    ) -> Option<(Path, bool)> {
        let idx = self.find(prefix)?;
        let node = self.nodes.get_mut(idx)?;
        if node.dummy {
            return None;
        }
        let removed = node.route.remove_path(path)?;
        if node.route.is_empty() {
            trace!("{} is now a dummy node", node.prefix);
            node.dummy = true;
        }
        Some((removed, node.dummy))
    }

    /// Removes every path of `prefix`, returning them best first. The
    /// second element tells whether there was a route to remove at all.
    /// Replaces all paths of `prefix` with `path` in one step. Returns the
    /// displaced paths, best first. A live route stays live throughout, so
    /// `new_route` is only set if the prefix had no paths before.
    pub(crate) fn replace_path(
        &mut self,
        prefix: PrefixId<AF>,
        pfx: Prefix,
        path: Path,
    ) -> Result<(Vec<Path>, Inserted), RibError> {
        let node = self.find(&prefix).and_then(|idx| self.nodes.get_mut(idx));
        let old = match node {
            Some(node) if !node.dummy => node.route.take_paths(),
            _ => vec![],
        };
        let inserted = self.add_path(prefix, pfx, path)?;
        Ok((old, inserted))
    }

    pub(crate) fn remove_prefix(
        &mut self,
        prefix: &PrefixId<AF>,
    ) -> (Vec<Path>, bool) {
        let Some(node) =
            self.find(prefix).and_then(|idx| self.nodes.get_mut(idx))
        else {
            return (vec![], false);
        };
        if node.dummy {
            return (vec![], false);
        }
        node.dummy = true;
        (node.route.take_paths(), true)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::route::{BgpPath, StaticPath};
    use crate::IPv4;

    fn id(
        s: &str,
    ) -> Result<(PrefixId<IPv4>, Prefix), Box<dyn std::error::Error>> {
        let pfx = Prefix::from_str(s)?;
        let id =
            PrefixId::try_from_prefix(&pfx).ok_or("not an IPv4 prefix")?;
        Ok((id, pfx))
    }

    fn path(lp: u32) -> Path {
        Path::new_bgp(BgpPath {
            local_pref: lp,
            ..Default::default()
        })
    }

    #[test]
    fn disjoint_prefixes_get_a_dummy_root(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut trie = AfTrie::<IPv4>::default();
        let (a, pa) = id("10.0.0.0/8")?;
        let (b, pb) = id("11.0.0.0/8")?;
        trie.add_path(a, pa, path(100))?;
        trie.add_path(b, pb, path(100))?;

        let root = trie.root().ok_or("no root")?;
        assert!(root.dummy);
        assert!(root.route.is_empty());
        assert_eq!(root.prefix.to_string(), "10.0.0.0/7");
        assert_eq!(root.skip, 7);

        let low =
            root.low.and_then(|i| trie.node(i)).ok_or("no low child")?;
        let high =
            root.high.and_then(|i| trie.node(i)).ok_or("no high child")?;
        assert_eq!(low.prefix, a);
        assert_eq!(high.prefix, b);
        assert_eq!(low.skip, 0);
        assert_eq!(high.skip, 0);
        assert_eq!(trie.node_count(), 3);
        Ok(())
    }

    #[test]
    fn covering_prefix_goes_above() -> Result<(), Box<dyn std::error::Error>> {
        let mut trie = AfTrie::<IPv4>::default();
        let (a, pa) = id("10.0.0.0/16")?;
        let (b, pb) = id("10.0.0.0/8")?;
        trie.add_path(a, pa, path(100))?;
        assert_eq!(trie.root().ok_or("no root")?.skip, 16);

        trie.add_path(b, pb, path(100))?;
        let root = trie.root().ok_or("no root")?;
        assert_eq!(root.prefix, b);
        assert_eq!(root.skip, 8);
        let low =
            root.low.and_then(|i| trie.node(i)).ok_or("no low child")?;
        assert_eq!(low.prefix, a);
        assert_eq!(low.skip, 7);
        assert!(root.high.is_none());
        Ok(())
    }

    #[test]
    fn dummy_turns_live_on_insert() -> Result<(), Box<dyn std::error::Error>> {
        let mut trie = AfTrie::<IPv4>::default();
        let (a, pa) = id("10.0.0.0/8")?;
        let (b, pb) = id("11.0.0.0/8")?;
        let (s, ps) = id("10.0.0.0/7")?;
        trie.add_path(a, pa, path(100))?;
        trie.add_path(b, pb, path(100))?;
        assert!(trie.get(&s).is_none());

        let inserted = trie.add_path(s, ps, path(100))?;
        assert!(inserted.new_route);
        assert!(trie.get(&s).is_some());
        assert_eq!(trie.node_count(), 3);

        let again = trie.add_path(s, ps, path(100))?;
        assert_eq!(again, Inserted::default());
        Ok(())
    }

    #[test]
    fn removal_leaves_a_dummy() -> Result<(), Box<dyn std::error::Error>> {
        let mut trie = AfTrie::<IPv4>::default();
        let (a, pa) = id("10.0.0.0/8")?;
        let p = Path::Static(StaticPath::new("192.0.2.1".parse()?));
        trie.add_path(a, pa, p.clone())?;

        assert_eq!(trie.remove_path(&a, &path(1)), None);
        assert_eq!(trie.remove_path(&a, &p), Some((p.clone(), true)));
        assert!(trie.get(&a).is_none());
        assert!(trie.root().ok_or("no root")?.dummy);
        assert_eq!(trie.remove_path(&a, &p), None);
        assert_eq!(trie.remove_prefix(&a), (vec![], false));
        Ok(())
    }

    #[test]
    fn replace_keeps_a_live_route() -> Result<(), Box<dyn std::error::Error>> {
        let mut trie = AfTrie::<IPv4>::default();
        let (a, pa) = id("10.0.0.0/8")?;
        let (b, pb) = id("11.0.0.0/8")?;

        let (old, inserted) = trie.replace_path(a, pa, path(100))?;
        assert!(old.is_empty());
        assert!(inserted.new_route);

        trie.add_path(a, pa, path(200))?;
        let (old, inserted) = trie.replace_path(a, pa, path(300))?;
        assert_eq!(old, vec![path(200), path(100)]);
        assert!(!inserted.new_route);
        assert!(inserted.added);
        let route = trie.get(&a).ok_or("route missing")?;
        assert_eq!(route.paths(), &[path(300)]);

        // a dummy counts as absent
        trie.add_path(b, pb, path(100))?;
        trie.remove_prefix(&a);
        let (old, inserted) = trie.replace_path(a, pa, path(100))?;
        assert!(old.is_empty());
        assert!(inserted.new_route);
        assert_eq!(trie.node_count(), 3);
        Ok(())
    }
}
