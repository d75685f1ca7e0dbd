//! The RIB layers and the machinery connecting them.

pub mod client;
pub mod filter;
pub mod session;

mod adj_rib_out;
mod loc_rib;
mod path_id;

pub use adj_rib_out::AdjRibOut;
pub use client::{
    ClientManager, ClientOptions, RouteTable, RouteTableClient,
};
pub use filter::{Filter, FilterChain, Verdict};
pub use loc_rib::LocRib;
pub use path_id::PathIdManager;
pub use session::{PeerRole, SessionAttrs};
