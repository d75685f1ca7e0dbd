use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

//------------ StaticPath ----------------------------------------------------

/// A statically configured path.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct StaticPath {
    pub next_hop: IpAddr,
}

impl StaticPath {
    pub fn new(next_hop: IpAddr) -> Self {
        Self { next_hop }
    }

    /// `Greater` means self is preferred. The lower next hop wins, so the
    /// order of static paths never depends on insertion order.
    pub fn select(&self, other: &StaticPath) -> Ordering {
        other.next_hop.cmp(&self.next_hop)
    }

    /// Static paths to the same prefix are always equal cost.
    pub fn ecmp(&self, _other: &StaticPath) -> bool {
        true
    }

    pub fn print(&self) -> String {
        format!("\t\tNext hop: {}\n", self.next_hop)
    }
}

impl fmt::Display for StaticPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Next hop: {}", self.next_hop)
    }
}
