use std::net::IpAddr;

use log::trace;
use num_traits::PrimInt;

//------------ AddressFamily (trait) ----------------------------------------
//
/// The address family of an IP address as a Trait.
///
/// Each family has its own primitive integer type holding the network
/// address, so that a trie for one family only ever deals with addresses of
/// exactly the right width. Bit positions are counted from the most
/// significant bit, starting at zero, i.e. bit `n` of an address is the bit
/// that decides between the two children of a trie node with a prefix length
/// of `n`.
pub trait AddressFamily:
    PrimInt
    + std::fmt::Binary
    + std::fmt::Debug
    + std::hash::Hash
    + std::fmt::Display
    + Send
    + Sync
    + 'static
{
    /// The number of bits in the byte representation of the family.
    const BITS: u8;

    /// The std::net type that the value of self belongs to. So,
    /// [std::net::Ipv4Addr], and [std::net::Ipv6Addr] for IPv4, and IPv6
    /// respectively.
    type InnerIpAddr;

    fn from_ipaddr(ip_addr: Self::InnerIpAddr) -> Self;

    /// Returns the value for `addr` if it belongs to this family.
    fn try_from_ipaddr(addr: IpAddr) -> Option<Self>;

    /// Turn self in to a [std::net::IpAddr].
    fn into_ipaddr(self) -> IpAddr;

    /// Fill the bits after the specified len with zeros. Interpreted as an
    /// IP Prefix, this means that self will be truncated to the specified
    /// len.
    fn truncate_to_len(self, len: u8) -> Self {
        if len == 0 {
            return Self::zero();
        }
        if len >= Self::BITS {
            return self;
        }
        self & ((!Self::zero()) << (Self::BITS - len) as usize)
    }

    /// Returns whether the bit at `pos` is set. Positions at or beyond
    /// `BITS` are never set.
    fn bit_at(self, pos: u8) -> bool {
        if pos >= Self::BITS {
            return false;
        }
        (self >> (Self::BITS - 1 - pos) as usize) & Self::one() == Self::one()
    }

    /// The number of leading bits self and other have in common.
    fn common_len(self, other: Self) -> u8 {
        let len = (self ^ other).leading_zeros() as u8;
        trace!("common len {:b} {:b} -> {}", self, other, len);
        len.min(Self::BITS)
    }
}

//-------------- Ipv4 Type --------------------------------------------------

/// IPv4 addresses are held in a u32.
pub type IPv4 = u32;

impl AddressFamily for IPv4 {
    const BITS: u8 = 32;
    type InnerIpAddr = std::net::Ipv4Addr;

    fn from_ipaddr(ip_addr: Self::InnerIpAddr) -> Self {
        u32::from(ip_addr)
    }

    fn try_from_ipaddr(addr: IpAddr) -> Option<Self> {
        match addr {
            IpAddr::V4(addr) => Some(Self::from_ipaddr(addr)),
            IpAddr::V6(_) => None,
        }
    }

    fn into_ipaddr(self) -> IpAddr {
        IpAddr::V4(std::net::Ipv4Addr::from(self))
    }
}

//-------------- Ipv6 Type --------------------------------------------------

/// IPv6 addresses are held in a u128.
pub type IPv6 = u128;

impl AddressFamily for IPv6 {
    const BITS: u8 = 128;
    type InnerIpAddr = std::net::Ipv6Addr;

    fn from_ipaddr(ip_addr: Self::InnerIpAddr) -> Self {
        u128::from(ip_addr)
    }

    fn try_from_ipaddr(addr: IpAddr) -> Option<Self> {
        match addr {
            IpAddr::V6(addr) => Some(Self::from_ipaddr(addr)),
            IpAddr::V4(_) => None,
        }
    }

    fn into_ipaddr(self) -> IpAddr {
        IpAddr::V6(std::net::Ipv6Addr::from(self))
    }
}
