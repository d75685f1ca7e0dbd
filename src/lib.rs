#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

//! A Routing Information Base (RIB) engine for a routing daemon.
//!
//! The engine stores prefixes together with all the competing paths learned
//! for them from routing protocols (BGP, static configuration, the kernel),
//! selects the best path(s) per prefix, and propagates paths through a chain
//! of RIB layers down to the individual peer sessions.
//!
//! The main parts are:
//!
//! * [`trie::RoutingTable`], a path-compressed binary trie per address
//!   family, supporting exact, longest prefix and more specific lookups;
//! * the [`route`] model: [`route::Path`], with its protocol variants and
//!   the BGP decision process, and [`route::Route`], the paths of one
//!   prefix, ordered best first;
//! * the [`rib`] layers: a [`rib::LocRib`] doing path selection, and an
//!   [`rib::AdjRibOut`] per BGP session, that applies the propagation rules
//!   of the session (loop prevention, well-known communities, route
//!   reflection, BGP roles), runs the export filter chain and manages
//!   add-path identifiers.
//!
//! Layers are connected through the [`rib::RouteTableClient`] trait: every
//! layer keeps a registry of the clients downstream of it and hands every
//! change to them.
//!
//! ```
//! use std::str::FromStr;
//! use std::sync::Arc;
//!
//! use rib_engine::addr::Prefix;
//! use rib_engine::rib::{
//!     AdjRibOut, FilterChain, LocRib, RouteTableClient, SessionAttrs,
//! };
//! use rib_engine::route::{BgpPath, BgpPathCache, Path};
//!
//! let loc_rib = LocRib::new();
//! let attrs = SessionAttrs {
//!     local_asn: 65000,
//!     peer_asn: 65001,
//!     local_ip: "192.0.2.1".parse().unwrap(),
//!     peer_ip: "192.0.2.2".parse().unwrap(),
//!     ..Default::default()
//! };
//! let adj_rib_out = AdjRibOut::with_upstream(
//!     attrs,
//!     FilterChain::accept_all(),
//!     Arc::new(BgpPathCache::new()),
//!     &loc_rib,
//! );
//! loc_rib.register(adj_rib_out.clone());
//!
//! let pfx = Prefix::from_str("198.51.100.0/24").unwrap();
//! loc_rib.add_path(&pfx, &Path::new_bgp(BgpPath::default())).unwrap();
//!
//! assert_eq!(adj_rib_out.route_count(), 1);
//! ```

mod types;

/// Routing table storage.
pub mod trie;

/// Paths, routes and path selection.
pub mod route;

/// RIB layers and their observer contract.
pub mod rib;

// re-exports
pub use inetnum::addr;
pub use inetnum::asn;

/// Error types returned by the tables and managers.
pub use types::errors;

/// Trait that defines the AFIs 1 (IPv4) and 2 (IPv6)
pub use types::af::AddressFamily;

/// The underlying value (u32) and trait impl for AFI 1.
pub use types::af::IPv4;
/// The underlying value (u128) and trait impl for AFI 2.
pub use types::af::IPv6;

/// Helpers for testing RIB layers.
pub use types::test_types;
