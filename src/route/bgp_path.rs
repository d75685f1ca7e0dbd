use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use inetnum::asn::Asn;

use super::attributes::{
    AsPath, Community, LargeCommunity, Origin, UnknownAttribute,
};

//------------ BgpPath -------------------------------------------------------

/// The set of BGP path attributes (plus the session information needed for
/// path selection) of one path.
///
/// A `BgpPath` is a value: once it is published in a table it is shared
/// behind an `Arc` and never modified in place. Changes are made on a clone.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct BgpPath {
    /// The add-path identifier (RFC7911), zero if none was assigned.
    pub path_identifier: u32,
    pub next_hop: IpAddr,
    pub local_pref: u32,
    pub as_path: AsPath,
    pub origin: Origin,
    pub med: u32,
    /// Whether the path was learned over an eBGP session.
    pub ebgp: bool,
    /// The BGP identifier of the peer the path was learned from.
    pub bgp_identifier: u32,
    /// The address of the peer the path was learned from.
    pub source: IpAddr,
    /// ORIGINATOR_ID (RFC4456), zero if not set.
    pub originator_id: u32,
    /// CLUSTER_LIST (RFC4456).
    pub cluster_list: Option<Vec<u32>>,
    pub communities: Option<Vec<Community>>,
    pub large_communities: Option<Vec<LargeCommunity>>,
    pub unknown_attributes: Vec<UnknownAttribute>,
    /// Only-to-Customer (RFC9234), zero if not set.
    pub only_to_customer: u32,
}

impl Default for BgpPath {
    fn default() -> Self {
        Self {
            path_identifier: 0,
            next_hop: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_pref: 0,
            as_path: AsPath::new(),
            origin: Origin::Igp,
            med: 0,
            ebgp: false,
            bgp_identifier: 0,
            source: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            originator_id: 0,
            cluster_list: None,
            communities: None,
            large_communities: None,
            unknown_attributes: vec![],
            only_to_customer: 0,
        }
    }
}

impl BgpPath {
    /// Compares self with `other` for best path selection. `Greater` means
    /// self is preferred over `other`.
    ///
    /// Criteria, in order, each deciding on the first difference:
    ///
    /// 1. higher LOCAL_PREF
    /// 2. shorter AS_PATH
    /// 3. lower ORIGIN
    /// 4. lower MED
    /// 5. eBGP over iBGP
    /// 6. lower ORIGINATOR_ID (or BGP identifier of the peer if there is
    ///    none), then the shorter CLUSTER_LIST
    /// 7. lower peer address
    /// 8. lower next hop
    pub fn select(&self, other: &BgpPath) -> Ordering {
        self.select_ecmp(other)
            .then_with(|| self.ebgp.cmp(&other.ebgp))
            .then_with(|| {
                other
                    .effective_bgp_identifier()
                    .cmp(&self.effective_bgp_identifier())
            })
            .then_with(|| {
                other.cluster_list_len().cmp(&self.cluster_list_len())
            })
            .then_with(|| other.source.cmp(&self.source))
            .then_with(|| other.next_hop.cmp(&self.next_hop))
    }

    fn select_ecmp(&self, other: &BgpPath) -> Ordering {
        self.local_pref
            .cmp(&other.local_pref)
            .then_with(|| other.as_path_len().cmp(&self.as_path_len()))
            .then_with(|| other.origin.cmp(&self.origin))
            .then_with(|| other.med.cmp(&self.med))
    }

    /// Whether self and `other` are equally good for multipath, i.e. they
    /// only differ in tie breakers.
    pub fn ecmp(&self, other: &BgpPath) -> bool {
        self.select_ecmp(other) == Ordering::Equal
    }

    pub fn as_path_len(&self) -> u16 {
        self.as_path.length()
    }

    /// The ORIGINATOR_ID if set, the BGP identifier of the peer otherwise.
    pub fn effective_bgp_identifier(&self) -> u32 {
        if self.originator_id != 0 {
            self.originator_id
        } else {
            self.bgp_identifier
        }
    }

    pub fn cluster_list_len(&self) -> usize {
        self.cluster_list.as_ref().map_or(0, |c| c.len())
    }

    pub fn has_community(&self, community: Community) -> bool {
        self.communities
            .as_ref()
            .is_some_and(|c| c.contains(&community))
    }

    /// Prepend `asn` to the AS path `times` times.
    pub fn prepend(&mut self, asn: Asn, times: u16) {
        self.as_path.prepend(asn, times);
    }

    /// Prepend `cluster_id` to the CLUSTER_LIST, creating it if absent.
    pub fn prepend_cluster_id(&mut self, cluster_id: u32) {
        self.cluster_list
            .get_or_insert_with(Vec::new)
            .insert(0, cluster_id);
    }

    /// A copy of self with `path_identifier` set to `id`.
    pub fn with_path_identifier(&self, id: u32) -> Self {
        Self {
            path_identifier: id,
            ..self.clone()
        }
    }

    pub fn communities_string(&self) -> String {
        join(self.communities.iter().flatten())
    }

    pub fn large_communities_string(&self) -> String {
        join(self.large_communities.iter().flatten())
    }

    /// Human readable, multi-line representation of all attributes.
    pub fn print(&self) -> String {
        let mut ret = String::new();
        let bgp_type = if self.ebgp { "external" } else { "internal" };
        ret.push_str(&format!("\t\tLocal Pref: {}\n", self.local_pref));
        ret.push_str(&format!("\t\tOrigin: {}\n", self.origin));
        ret.push_str(&format!("\t\tAS Path: {}\n", self.as_path));
        ret.push_str(&format!("\t\tBGP type: {}\n", bgp_type));
        ret.push_str(&format!("\t\tNEXT HOP: {}\n", self.next_hop));
        ret.push_str(&format!("\t\tMED: {}\n", self.med));
        ret.push_str(&format!("\t\tPath ID: {}\n", self.path_identifier));
        ret.push_str(&format!("\t\tSource: {}\n", self.source));
        ret.push_str(&format!(
            "\t\tCommunities: {}\n",
            self.communities_string()
        ));
        ret.push_str(&format!(
            "\t\tLargeCommunities: {}\n",
            self.large_communities_string()
        ));
        if self.originator_id != 0 {
            ret.push_str(&format!(
                "\t\tOriginatorID: {}\n",
                Ipv4Addr::from(self.originator_id)
            ));
        }
        if let Some(cluster_list) = &self.cluster_list {
            ret.push_str(&format!(
                "\t\tClusterList: {}\n",
                join(cluster_list.iter().map(|c| Ipv4Addr::from(*c)))
            ));
        }
        if self.only_to_customer != 0 {
            ret.push_str(&format!("\t\tOTC: {}\n", self.only_to_customer));
        }
        ret
    }
}

impl fmt::Display for BgpPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Local Pref: {}, Origin: {}, AS Path: {}, BGP type: {}, \
            NEXT HOP: {}, MED: {}, Path ID: {}, Source: {}, \
            Communities: [{}], LargeCommunities: [{}]",
            self.local_pref,
            self.origin,
            self.as_path,
            if self.ebgp { "external" } else { "internal" },
            self.next_hop,
            self.med,
            self.path_identifier,
            self.source,
            self.communities_string(),
            self.large_communities_string(),
        )
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
}
