use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use super::BgpPath;
use crate::types::errors::RibError;

//------------ BgpPathCache --------------------------------------------------

/// Interning cache for BGP attribute sets.
///
/// Every table that stores BGP paths can route them through a cache, so that
/// equal attribute sets stored in many places (e.g. one Adj-RIB-Out per
/// peer) share one allocation. The cache is an ordinary value: create one
/// per scope that wants to share, and hand it out as an `Arc`.
#[derive(Debug, Default)]
pub struct BgpPathCache {
    paths: Mutex<HashMap<Arc<BgpPath>, u64>>,
}

impl BgpPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared instance of `path`, adding it to the cache if it
    /// isn't there yet. Every call takes one reference, to be given back
    /// with [`release`](Self::release).
    pub fn intern(&self, path: BgpPath) -> Arc<BgpPath> {
        let mut paths = self.paths.lock();
        if let Some((shared, refs)) = paths.get_key_value(&path) {
            let shared = Arc::clone(shared);
            let refs = refs + 1;
            paths.insert(Arc::clone(&shared), refs);
            trace!("path cache hit, {} references", refs);
            return shared;
        }
        let shared = Arc::new(path);
        paths.insert(Arc::clone(&shared), 1);
        shared
    }

    /// Gives back one reference to `path`. The cache forgets the attribute
    /// set once the last reference is released.
    pub fn release(&self, path: &BgpPath) -> Result<(), RibError> {
        let mut paths = self.paths.lock();
        let refs = paths
            .get_mut(path)
            .ok_or(RibError::CachedPathNotFound)?;
        *refs -= 1;
        if *refs == 0 {
            paths.remove(path);
        }
        Ok(())
    }

    /// The number of references held on the cached copy of `path`.
    pub fn ref_count(&self, path: &BgpPath) -> u64 {
        self.paths.lock().get(path).copied().unwrap_or(0)
    }

    /// The number of distinct attribute sets in the cache.
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}
