//! The attributes of one BGP session that decide how paths are propagated to
//! the peer.
//!
//! ```
//! use rib_engine::rib::session::{PeerRole, SessionAttrs};
//!
//! let attrs = SessionAttrs::from_json(r#"{
//!     "peer_ip": "192.0.2.1",
//!     "local_ip": "192.0.2.2",
//!     "local_asn": 65000,
//!     "peer_asn": 65001,
//!     "peer_role_enabled": true,
//!     "peer_role_adv_by_peer": true,
//!     "peer_role_remote": "customer"
//! }"#).unwrap();
//!
//! assert!(!attrs.ibgp);
//! assert_eq!(attrs.peer_role_remote, PeerRole::Customer);
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use inetnum::asn::Asn;
use serde_derive::{Deserialize, Serialize};

//------------ PeerRole ------------------------------------------------------

/// BGP roles (RFC9234), with their wire values.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PeerRole {
    #[default]
    Provider = 0,
    RouteServer = 1,
    RouteServerClient = 2,
    Customer = 3,
    Peer = 4,
}

impl PeerRole {
    /// Roles a path carrying OTC must not be sent to.
    pub fn refuses_otc(&self) -> bool {
        matches!(
            self,
            PeerRole::Provider | PeerRole::Peer | PeerRole::RouteServer
        )
    }

    /// Roles whose paths get OTC stamped with the local ASN when sent.
    pub fn sets_otc(&self) -> bool {
        matches!(
            self,
            PeerRole::Customer | PeerRole::Peer | PeerRole::RouteServerClient
        )
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerRole::Provider => write!(f, "provider"),
            PeerRole::RouteServer => write!(f, "route server"),
            PeerRole::RouteServerClient => write!(f, "route server client"),
            PeerRole::Customer => write!(f, "customer"),
            PeerRole::Peer => write!(f, "peer"),
        }
    }
}

/// The attributes of a session. Fixed for the lifetime of the Adj-RIB-Out
/// it is given to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionAttrs {
    /// The BGP identifier of the local router.
    pub router_id: u32,
    pub peer_ip: IpAddr,
    /// The local address of the session, used as next hop towards eBGP
    /// peers.
    pub local_ip: IpAddr,
    /// Whether local and peer ASN are the same.
    pub ibgp: bool,
    pub local_asn: u32,
    pub peer_asn: u32,
    pub route_server_client: bool,
    pub route_reflector_client: bool,
    /// The cluster id of the local route reflector.
    pub cluster_id: u32,
    /// Whether add-path is negotiated for receiving from the peer.
    pub add_path_rx: bool,
    /// Whether add-path is negotiated for sending to the peer.
    pub add_path_tx: bool,

    /// Whether BGP roles (RFC9234) are enabled locally.
    pub peer_role_enabled: bool,
    /// Whether the peer must advertise a role.
    pub peer_role_strict_mode: bool,
    pub peer_role_local: PeerRole,
    /// Whether the peer advertised the BGP role capability.
    pub peer_role_adv_by_peer: bool,
    pub peer_role_remote: PeerRole,
}

impl Default for SessionAttrs {
    fn default() -> Self {
        Self {
            router_id: 0,
            peer_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ibgp: false,
            local_asn: 0,
            peer_asn: 0,
            route_server_client: false,
            route_reflector_client: false,
            cluster_id: 0,
            add_path_rx: false,
            add_path_tx: false,
            peer_role_enabled: false,
            peer_role_strict_mode: false,
            peer_role_local: PeerRole::default(),
            peer_role_adv_by_peer: false,
            peer_role_remote: PeerRole::default(),
        }
    }
}

impl SessionAttrs {
    /// Reads the attributes from JSON. Missing fields take their default.
    /// If `ibgp` is absent it is derived from the two ASNs.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let has_ibgp = value.get("ibgp").is_some();
        let mut attrs: SessionAttrs = serde_json::from_value(value)?;
        if !has_ibgp {
            attrs.ibgp = attrs.local_asn == attrs.peer_asn;
        }
        Ok(attrs)
    }

    pub fn local_asn(&self) -> Asn {
        Asn::from_u32(self.local_asn)
    }

    pub fn peer_asn(&self) -> Asn {
        Asn::from_u32(self.peer_asn)
    }

    /// Whether the RFC9234 OTC rules apply to paths sent to this peer.
    pub fn otc_enforced(&self) -> bool {
        !self.ibgp && self.peer_role_enabled && self.peer_role_adv_by_peer
    }
}
