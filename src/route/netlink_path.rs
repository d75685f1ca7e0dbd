use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

/// Routing protocol id used for routes installed into the kernel by this
/// daemon.
pub const PROTO_RIB_ENGINE: i32 = 45;

//------------ NetlinkPath ---------------------------------------------------

/// A path learned from, or to be installed into, the kernel routing table.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct NetlinkPath {
    pub src: IpAddr,
    pub next_hop: IpAddr,
    pub priority: i32,
    pub protocol: i32,
    pub kind: i32,
    pub table: i32,
    /// Whether the route is already installed in the kernel.
    pub kernel: bool,
}

impl NetlinkPath {
    /// `Greater` means self is preferred: lower next hop, then lower source,
    /// priority, protocol and table.
    pub fn select(&self, other: &NetlinkPath) -> Ordering {
        other
            .next_hop
            .cmp(&self.next_hop)
            .then_with(|| other.src.cmp(&self.src))
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.protocol.cmp(&self.protocol))
            .then_with(|| other.table.cmp(&self.table))
    }

    /// Kernel paths are never merged into a multipath set.
    pub fn ecmp(&self, _other: &NetlinkPath) -> bool {
        false
    }

    pub fn print(&self) -> String {
        let mut ret = String::new();
        ret.push_str(&format!("\t\tSource: {}\n", self.src));
        ret.push_str(&format!("\t\tNextHop: {}\n", self.next_hop));
        ret.push_str(&format!("\t\tPriority: {}\n", self.priority));
        ret.push_str(&format!("\t\tType: {}\n", self.kind));
        ret.push_str(&format!("\t\tTable: {}\n", self.table));
        ret
    }
}

impl fmt::Display for NetlinkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Source: {}, NextHop: {}, Priority: {}, Type: {}, Table: {}",
            self.src, self.next_hop, self.priority, self.kind, self.table
        )
    }
}
