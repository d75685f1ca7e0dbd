use std::fmt;

use inetnum::addr::Prefix;

use super::Path;
use crate::types::errors::RibError;

//------------ Route ---------------------------------------------------------

/// A prefix together with all the competing paths to it.
///
/// The paths are kept ordered best first: every change to the path list
/// re-runs path selection and recalculates the number of equal cost paths.
/// No two paths in a route are equal.
#[derive(Clone, Debug)]
pub struct Route {
    prefix: Prefix,
    paths: Vec<Path>,
    ecmp_paths: usize,
}

impl Route {
    /// A route without any paths.
    pub fn new(prefix: Prefix) -> Self {
        Self {
            prefix,
            paths: Vec::with_capacity(2),
            ecmp_paths: 0,
        }
    }

    pub fn new_with_path(prefix: Prefix, path: Path) -> Self {
        Self::new_with_paths(prefix, vec![path])
    }

    pub fn new_with_paths(prefix: Prefix, paths: Vec<Path>) -> Self {
        let mut route = Self::new(prefix);
        for path in paths {
            route.insert_unselected(path);
        }
        route.path_selection();
        route
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// All paths, best first.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The current best path, if any.
    pub fn best_path(&self) -> Option<&Path> {
        self.paths.first()
    }

    /// The number of paths that are equally good as the best path.
    pub fn ecmp_path_count(&self) -> usize {
        self.ecmp_paths
    }

    /// The best path together with all paths that are equal cost to it.
    pub fn ecmp_paths(&self) -> &[Path] {
        self.paths.get(..self.ecmp_paths).unwrap_or(&[])
    }

    /// The best `max` paths (or all paths if there are fewer).
    pub fn best_paths(&self, max: usize) -> &[Path] {
        self.paths.get(..max.min(self.paths.len())).unwrap_or(&[])
    }

    /// Adds `path`. Returns false, and leaves the route untouched, if an
    /// equal path is already present.
    pub fn add_path(&mut self, path: Path) -> bool {
        if !self.insert_unselected(path) {
            return false;
        }
        self.path_selection();
        true
    }

    /// Removes the path equal to `path`, returning it, if present.
    pub fn remove_path(&mut self, path: &Path) -> Option<Path> {
        let idx = self.paths.iter().position(|p| p == path)?;
        let removed = self.paths.remove(idx);
        self.path_selection();
        Some(removed)
    }

    /// Replaces the path equal to `old` with `new`.
    pub fn replace_path(
        &mut self,
        old: &Path,
        new: Path,
    ) -> Result<(), RibError> {
        let slot = self
            .paths
            .iter_mut()
            .find(|p| *p == old)
            .ok_or(RibError::PathNotFound)?;
        *slot = new;
        self.path_selection();
        Ok(())
    }

    /// Removes all paths, returning them best first.
    pub(crate) fn take_paths(&mut self) -> Vec<Path> {
        self.ecmp_paths = 0;
        std::mem::take(&mut self.paths)
    }

    fn insert_unselected(&mut self, path: Path) -> bool {
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Sorts the paths best first and recalculates the ECMP path count.
    fn path_selection(&mut self) {
        self.paths.sort_by(|a, b| b.select(a));
        self.update_ecmp_path_count();
    }

    fn update_ecmp_path_count(&mut self) {
        let Some(first) = self.paths.first() else {
            self.ecmp_paths = 0;
            return;
        };
        self.ecmp_paths = 1 + self
            .paths
            .windows(2)
            .take_while(|w| match w {
                [a, b] => a.ecmp(b) && first.ecmp(b),
                _ => false,
            })
            .count();
    }

    /// Human readable, multi-line representation of the route and all its
    /// paths.
    pub fn print(&self) -> String {
        let mut ret = format!("{}:\nAll Paths:\n", self.prefix);
        for p in &self.paths {
            ret.push_str(&p.print());
        }
        ret
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.prefix == other.prefix
            && self.ecmp_paths == other.ecmp_paths
            && self.paths.len() == other.paths.len()
            && self.paths.iter().all(|p| other.paths.contains(p))
    }
}

impl Eq for Route {}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} paths)", self.prefix, self.paths.len())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::str::FromStr;

    use super::*;
    use crate::route::{BgpPath, StaticPath};

    fn bgp(local_pref: u32, source: u8) -> Path {
        Path::new_bgp(BgpPath {
            local_pref,
            source: IpAddr::V4(Ipv4Addr::new(10, 0, 0, source)),
            ..Default::default()
        })
    }

    #[test]
    fn paths_are_kept_best_first() -> Result<(), Box<dyn std::error::Error>> {
        let mut r = Route::new(Prefix::from_str("10.0.0.0/8")?);
        assert!(r.best_path().is_none());
        assert_eq!(r.ecmp_path_count(), 0);

        assert!(r.add_path(bgp(100, 1)));
        assert!(r.add_path(bgp(200, 2)));
        assert!(r.add_path(bgp(200, 3)));
        assert!(!r.add_path(bgp(200, 3)));

        assert_eq!(r.path_count(), 3);
        assert_eq!(r.best_path(), Some(&bgp(200, 2)));
        assert_eq!(r.ecmp_path_count(), 2);
        assert_eq!(r.ecmp_paths(), &[bgp(200, 2), bgp(200, 3)]);
        assert_eq!(r.best_paths(10).len(), 3);

        assert_eq!(r.remove_path(&bgp(200, 2)), Some(bgp(200, 2)));
        assert_eq!(r.ecmp_path_count(), 1);
        assert_eq!(r.remove_path(&bgp(200, 2)), None);
        Ok(())
    }

    #[test]
    fn replace_path() -> Result<(), Box<dyn std::error::Error>> {
        let pfx = Prefix::from_str("10.0.0.0/8")?;
        let mut r = Route::new_with_path(pfx, bgp(100, 1));
        r.replace_path(&bgp(100, 1), bgp(300, 1))?;
        assert_eq!(r.best_path(), Some(&bgp(300, 1)));
        assert_eq!(
            r.replace_path(&bgp(100, 1), bgp(300, 1)),
            Err(RibError::PathNotFound)
        );
        Ok(())
    }

    #[test]
    fn static_paths_are_all_ecmp() -> Result<(), Box<dyn std::error::Error>> {
        let nh = |o| {
            Path::Static(StaticPath::new(IpAddr::V4(Ipv4Addr::new(
                192, 0, 2, o,
            ))))
        };
        let r = Route::new_with_paths(
            Prefix::from_str("0.0.0.0/0")?,
            vec![nh(3), nh(1), nh(2)],
        );
        assert_eq!(r.ecmp_path_count(), 3);
        assert_eq!(r.best_path(), Some(&nh(1)));
        Ok(())
    }

    #[test]
    fn route_equality_ignores_order(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let pfx = Prefix::from_str("10.0.0.0/8")?;
        let a = Route::new_with_paths(pfx, vec![bgp(100, 1), bgp(100, 2)]);
        let b = Route::new_with_paths(pfx, vec![bgp(100, 2), bgp(100, 1)]);
        assert_eq!(a, b);
        Ok(())
    }
}
