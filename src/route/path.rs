use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use super::{BgpPath, NetlinkPath, StaticPath};

//------------ Protocol ------------------------------------------------------

/// The protocol a path was learned from. When paths of different protocols
/// compete for a prefix, the one with the greater protocol id is preferred.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Protocol {
    Static = 1,
    Bgp = 2,
    Netlink = 5,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Static => write!(f, "static"),
            Protocol::Bgp => write!(f, "BGP"),
            Protocol::Netlink => write!(f, "Netlink"),
        }
    }
}

//------------ Path ----------------------------------------------------------

/// One path to a prefix, tagged with the protocol it was learned from.
///
/// Paths are immutable values. Cloning a `Path` is cheap for BGP paths,
/// their attribute set is shared. To change a path, clone the attributes,
/// modify them and wrap them in a new `Path`.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Path {
    Static(StaticPath),
    Bgp(Arc<BgpPath>),
    Netlink(NetlinkPath),
}

impl Path {
    pub fn new_bgp(path: BgpPath) -> Self {
        Path::Bgp(Arc::new(path))
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Path::Static(_) => Protocol::Static,
            Path::Bgp(_) => Protocol::Bgp,
            Path::Netlink(_) => Protocol::Netlink,
        }
    }

    /// Compares self with `other` for best path selection. `Greater` means
    /// self is preferred over `other`, `Equal` means neither is.
    pub fn select(&self, other: &Path) -> Ordering {
        match (self, other) {
            (Path::Bgp(a), Path::Bgp(b)) => a.select(b),
            (Path::Static(a), Path::Static(b)) => a.select(b),
            (Path::Netlink(a), Path::Netlink(b)) => a.select(b),
            _ => self.protocol().cmp(&other.protocol()),
        }
    }

    /// Whether self and `other` may be used together as equal cost paths.
    pub fn ecmp(&self, other: &Path) -> bool {
        match (self, other) {
            (Path::Bgp(a), Path::Bgp(b)) => a.ecmp(b),
            (Path::Static(a), Path::Static(b)) => a.ecmp(b),
            (Path::Netlink(a), Path::Netlink(b)) => a.ecmp(b),
            _ => false,
        }
    }

    pub fn bgp(&self) -> Option<&Arc<BgpPath>> {
        match self {
            Path::Bgp(p) => Some(p),
            _ => None,
        }
    }

    pub fn next_hop(&self) -> IpAddr {
        match self {
            Path::Static(p) => p.next_hop,
            Path::Bgp(p) => p.next_hop,
            Path::Netlink(p) => p.next_hop,
        }
    }

    /// Human readable, multi-line representation.
    pub fn print(&self) -> String {
        let details = match self {
            Path::Static(p) => p.print(),
            Path::Bgp(p) => p.print(),
            Path::Netlink(p) => p.print(),
        };
        format!("\tProtocol: {}\n{}", self.protocol(), details)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Static(p) => {
                write!(f, "Protocol: {}, {}", self.protocol(), p)
            }
            Path::Bgp(p) => {
                write!(f, "Protocol: {}, {}", self.protocol(), p)
            }
            Path::Netlink(p) => {
                write!(f, "Protocol: {}, {}", self.protocol(), p)
            }
        }
    }
}

impl From<BgpPath> for Path {
    fn from(value: BgpPath) -> Self {
        Path::new_bgp(value)
    }
}

impl From<StaticPath> for Path {
    fn from(value: StaticPath) -> Self {
        Path::Static(value)
    }
}

impl From<NetlinkPath> for Path {
    fn from(value: NetlinkPath) -> Self {
        Path::Netlink(value)
    }
}
