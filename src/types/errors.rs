use std::fmt;

/// Possible errors returned by the tables, registries and managers in this
/// crate. None of these are fatal: they are either returned to the caller of
/// the operation that failed, or logged at the point where they occur.
///
/// Rejections by filters, loop prevention or community based suppression
/// are not errors; they are normal outcomes of propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RibError {
    /// Every add-path identifier (1..=u32::MAX) is in use. The operation
    /// that tried to allocate one was aborted without changing any state.
    PathIdsExhausted,
    /// An add-path identifier was released for a path that was never
    /// allocated one. The id manager state was not changed.
    PathIdNotFound,
    /// A path was released from the path cache, but it was never interned
    /// there.
    CachedPathNotFound,
    /// The requested prefix is not present in the table.
    RouteNotFound,
    /// The requested path is not present in the route.
    PathNotFound,
    /// A client tried to register with a registry that was already
    /// disposed of.
    RegistryDisposed,
    /// A downstream client failed to process an update. The string
    /// describes the failure.
    ClientFailed(String),
    /// A prefix could not be represented, e.g. its length exceeds the
    /// address family width.
    InvalidPrefix,
}

impl std::error::Error for RibError {}

impl fmt::Display for RibError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RibError::PathIdsExhausted => {
                write!(f, "Error: Out of add-path identifiers.")
            }
            RibError::PathIdNotFound => {
                write!(f, "Error: No add-path identifier found for path.")
            }
            RibError::CachedPathNotFound => {
                write!(
                    f,
                    "Error: Tried to release a path that is not in the \
                    path cache."
                )
            }
            RibError::RouteNotFound => {
                write!(f, "Error: The Prefix cannot be found.")
            }
            RibError::PathNotFound => {
                write!(f, "Error: The Path cannot be found for this prefix.")
            }
            RibError::RegistryDisposed => {
                write!(
                    f,
                    "Error: The client registry has been disposed of and \
                    does not accept new clients."
                )
            }
            RibError::ClientFailed(reason) => {
                write!(
                    f,
                    "Error: Client failed to process update: {}",
                    reason
                )
            }
            RibError::InvalidPrefix => {
                write!(f, "Error: The specified Prefix is invalid.")
            }
        }
    }
}

pub type RibResult<T> = Result<T, RibError>;
