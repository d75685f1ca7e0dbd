use std::collections::HashMap;

use log::trace;
use roaring::RoaringBitmap;

use crate::route::BgpPath;
use crate::types::errors::RibError;

//------------ PathIdManager -------------------------------------------------

/// Hands out add-path identifiers (RFC7911) for the paths sent to one peer.
///
/// Identifiers are keyed on the attribute set of a path, not counting the
/// identifier itself, so allocating twice for equal attributes yields the
/// same identifier with a reference count of two. Zero is never handed out.
///
/// The allocation cursor wraps past `u32::MAX` back to 1 and then skips the
/// identifiers still in use, so freed identifiers are reused once the
/// cursor comes around. Allocation only fails when every non-zero
/// identifier is taken.
///
/// Not thread safe on its own; it lives behind the lock of its
/// Adj-RIB-Out.
#[derive(Debug, Default)]
pub struct PathIdManager {
    ids_by_path: HashMap<BgpPath, (u32, u64)>,
    used: RoaringBitmap,
    last: u32,
}

impl PathIdManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &BgpPath) -> BgpPath {
        path.with_path_identifier(0)
    }

    /// Returns the identifier for `path`, allocating one if its attribute
    /// set has none yet.
    pub fn add_path(&mut self, path: &BgpPath) -> Result<u32, RibError> {
        let key = Self::key(path);
        if let Some((id, refs)) = self.ids_by_path.get_mut(&key) {
            *refs += 1;
            return Ok(*id);
        }

        if self.used.len() >= u64::from(u32::MAX) {
            return Err(RibError::PathIdsExhausted);
        }

        let mut id = self.last.wrapping_add(1);
        while id == 0 || self.used.contains(id) {
            id = id.wrapping_add(1);
        }
        self.last = id;
        self.used.insert(id);
        self.ids_by_path.insert(key, (id, 1));
        trace!("allocated path id {}", id);

        Ok(id)
    }

    /// Gives back one reference to the identifier of `path`, returning the
    /// number of references left. The identifier is freed with its last
    /// reference.
    pub fn release_path(&mut self, path: &BgpPath) -> Result<u64, RibError> {
        let key = Self::key(path);
        let (id, refs) = self
            .ids_by_path
            .get_mut(&key)
            .ok_or(RibError::PathIdNotFound)?;
        let id = *id;
        *refs -= 1;
        if *refs == 0 {
            self.ids_by_path.remove(&key);
            self.used.remove(id);
            trace!("freed path id {}", id);
            return Ok(0);
        }
        Ok(*refs)
    }

    /// The identifier and reference count of the attribute set of `path`.
    pub fn get(&self, path: &BgpPath) -> Option<(u32, u64)> {
        self.ids_by_path.get(&Self::key(path)).copied()
    }

    /// The number of identifiers in use.
    pub fn len(&self) -> usize {
        self.ids_by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids_by_path.is_empty()
    }
}
