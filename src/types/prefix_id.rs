use inetnum::addr::Prefix;

use crate::types::errors::RibError;
use crate::AddressFamily;

//------------ PrefixId ------------------------------------------------------

/// The bit-level representation of a prefix for one address family, as used
/// inside the trie. The host bits (everything after `len`) are always zero.
#[derive(Hash, Eq, PartialEq, Debug, Copy, Clone)]
pub struct PrefixId<AF: AddressFamily> {
    len: u8,
    net: AF,
}

impl<AF: AddressFamily> PrefixId<AF> {
    pub(crate) fn new(net: AF, len: u8) -> Self {
        let len = len.min(AF::BITS);
        PrefixId {
            len,
            net: net.truncate_to_len(len),
        }
    }

    pub(crate) fn get_len(&self) -> u8 {
        self.len
    }

    pub(crate) fn truncate_to_len(self, len: u8) -> Self {
        Self::new(self.net, len)
    }

    /// Whether `other` is a strict subnet of self.
    pub(crate) fn contains(&self, other: &Self) -> bool {
        other.len > self.len
            && other.net.truncate_to_len(self.len) == self.net
    }

    /// Whether `other` equals self or is a subnet of it.
    pub(crate) fn covers(&self, other: &Self) -> bool {
        self == other || self.contains(other)
    }

    /// The address bit right after this prefix, if it belonged to `other`.
    /// This selects the child of a node with this prefix that `other` lives
    /// under.
    pub(crate) fn child_bit(&self, other: &Self) -> bool {
        other.net.bit_at(self.len)
    }

    /// The longest prefix that covers both self and other.
    pub(crate) fn common_supernet(&self, other: &Self) -> Self {
        let len = self
            .net
            .common_len(other.net)
            .min(self.len)
            .min(other.len);
        self.truncate_to_len(len)
    }

    pub(crate) fn into_prefix(self) -> Result<Prefix, RibError> {
        Prefix::new(self.net.into_ipaddr(), self.len)
            .map_err(|_| RibError::InvalidPrefix)
    }

    #[cfg(test)]
    pub(crate) fn try_from_prefix(prefix: &Prefix) -> Option<Self> {
        AF::try_from_ipaddr(prefix.addr())
            .map(|net| Self::new(net, prefix.len()))
    }
}

impl<AF: AddressFamily> std::fmt::Display for PrefixId<AF> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.net.into_ipaddr(), self.len)
    }
}
