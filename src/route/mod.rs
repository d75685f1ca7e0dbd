//! The Path/Route model: the paths competing for a prefix, the attributes
//! they carry, and how the best of them is selected.

pub mod attributes;
mod bgp_path;
mod cache;
mod entry;
mod netlink_path;
mod path;
mod static_path;

pub use bgp_path::BgpPath;
pub use cache::BgpPathCache;
pub use entry::Route;
pub use netlink_path::{NetlinkPath, PROTO_RIB_ENGINE};
pub use path::{Path, Protocol};
pub use static_path::StaticPath;
