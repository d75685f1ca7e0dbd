//! Helpers for testing RIB layers.

use std::sync::Arc;

use inetnum::addr::Prefix;
use parking_lot::Mutex;

use crate::rib::client::{ClientOptions, RouteTableClient};
use crate::route::Path;
use crate::types::errors::RibError;

//------------ Update --------------------------------------------------------

/// One call received by a [`RecordingClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    Add(Prefix, Path),
    Remove(Prefix, Path),
    Refresh(Prefix, Vec<Path>),
}

//------------ RecordingClient -----------------------------------------------

/// A client that records every update it receives, in order.
///
/// With `fail` set every `add_path` returns an error (after recording the
/// update), to simulate a broken downstream client.
#[derive(Debug, Default)]
pub struct RecordingClient {
    updates: Mutex<Vec<Update>>,
    fail: bool,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            updates: Mutex::new(vec![]),
            fail: true,
        })
    }

    pub fn updates(&self) -> Vec<Update> {
        self.updates.lock().clone()
    }

    /// Returns the updates received so far and forgets them.
    pub fn take(&self) -> Vec<Update> {
        std::mem::take(&mut *self.updates.lock())
    }

    /// The paths announced and not withdrawn since, per prefix, in the
    /// order they were announced.
    pub fn current(&self) -> Vec<(Prefix, Path)> {
        let mut current: Vec<(Prefix, Path)> = vec![];
        for update in self.updates.lock().iter() {
            match update {
                Update::Add(pfx, path) => {
                    current.push((*pfx, path.clone()));
                }
                Update::Remove(pfx, path) => {
                    if let Some(idx) = current.iter().position(
                        |(c_pfx, c_path)| c_pfx == pfx && c_path == path,
                    ) {
                        current.remove(idx);
                    }
                }
                Update::Refresh(..) => {}
            }
        }
        current
    }
}

impl RouteTableClient for RecordingClient {
    fn add_path(&self, prefix: &Prefix, path: &Path) -> Result<(), RibError> {
        self.updates.lock().push(Update::Add(*prefix, path.clone()));
        if self.fail {
            return Err(RibError::ClientFailed("recording client".into()));
        }
        Ok(())
    }

    fn remove_path(&self, prefix: &Prefix, path: &Path) -> bool {
        self.updates.lock().push(Update::Remove(*prefix, path.clone()));
        true
    }

    fn update_new_client(
        &self,
        _client: Arc<dyn RouteTableClient>,
    ) -> Result<(), RibError> {
        Ok(())
    }

    fn register_with_options(
        &self,
        _client: Arc<dyn RouteTableClient>,
        _options: ClientOptions,
    ) {
    }

    fn unregister(&self, _client: &Arc<dyn RouteTableClient>) {}

    fn route_count(&self) -> i64 {
        0
    }

    fn refresh_route(&self, prefix: &Prefix, paths: &[Path]) {
        self.updates
            .lock()
            .push(Update::Refresh(*prefix, paths.to_vec()));
    }
}
