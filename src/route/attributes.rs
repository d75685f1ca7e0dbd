//! BGP path attribute value types carried by a [`BgpPath`].
//!
//! [`BgpPath`]: super::BgpPath
use std::fmt;
use std::str::FromStr;

use inetnum::asn::Asn;

/// The maximum number of ASNs in a single AS path segment (RFC4271).
pub const MAX_ASNS_SEGMENT: usize = 255;

//------------ Origin --------------------------------------------------------

/// The BGP ORIGIN attribute. Lower values are preferred in path selection.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Origin {
    #[default]
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Igp => write!(f, "IGP"),
            Origin::Egp => write!(f, "EGP"),
            Origin::Incomplete => write!(f, "Incomplete"),
        }
    }
}

//------------ AsPath --------------------------------------------------------

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum SegmentType {
    Set,
    Sequence,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct AsPathSegment {
    pub segment_type: SegmentType,
    pub asns: Vec<Asn>,
}

impl AsPathSegment {
    pub fn sequence(asns: impl IntoIterator<Item = u32>) -> Self {
        Self {
            segment_type: SegmentType::Sequence,
            asns: asns.into_iter().map(Asn::from_u32).collect(),
        }
    }

    pub fn set(asns: impl IntoIterator<Item = u32>) -> Self {
        Self {
            segment_type: SegmentType::Set,
            asns: asns.into_iter().map(Asn::from_u32).collect(),
        }
    }
}

/// A BGP AS_PATH, as a list of segments.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct AsPath(Vec<AsPathSegment>);

impl AsPath {
    pub fn new() -> Self {
        Self(vec![])
    }

    /// An AS path consisting of a single AS_SEQUENCE.
    pub fn from_sequence(asns: impl IntoIterator<Item = u32>) -> Self {
        Self(vec![AsPathSegment::sequence(asns)])
    }

    pub fn from_segments(segments: Vec<AsPathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[AsPathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|s| s.asns.is_empty())
    }

    /// The length of the path as used in path selection: every ASN in an
    /// AS_SEQUENCE counts, an AS_SET counts as one.
    pub fn length(&self) -> u16 {
        self.0.iter().fold(0_u16, |acc, s| match s.segment_type {
            SegmentType::Sequence => acc.saturating_add(s.asns.len() as u16),
            SegmentType::Set => acc.saturating_add(1),
        })
    }

    /// All ASNs in order of appearance, including the members of sets.
    pub fn asns(&self) -> impl Iterator<Item = Asn> + '_ {
        self.0.iter().flat_map(|s| s.asns.iter().copied())
    }

    /// The originating ASN: the last ASN of the last AS_SEQUENCE.
    pub fn origin_asn(&self) -> Option<Asn> {
        self.0
            .iter()
            .rev()
            .find(|s| s.segment_type == SegmentType::Sequence)
            .and_then(|s| s.asns.last().copied())
    }

    /// Prepend `asn` `times` times. A new AS_SEQUENCE is started if the path
    /// is empty, starts with an AS_SET, or its first segment is full.
    pub fn prepend(&mut self, asn: Asn, times: u16) {
        if times == 0 {
            return;
        }

        if !matches!(
            self.0.first(),
            Some(AsPathSegment { segment_type: SegmentType::Sequence, .. })
        ) {
            self.insert_new_sequence();
        }

        for _ in 0..times {
            if self
                .0
                .first()
                .is_some_and(|s| s.asns.len() >= MAX_ASNS_SEGMENT)
            {
                self.insert_new_sequence();
            }
            if let Some(first) = self.0.first_mut() {
                first.asns.insert(0, asn);
            }
        }
    }

    fn insert_new_sequence(&mut self) {
        self.0.insert(
            0,
            AsPathSegment {
                segment_type: SegmentType::Sequence,
                asns: vec![],
            },
        );
    }
}

impl fmt::Display for AsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            let asns = segment
                .asns
                .iter()
                .map(|a| a.into_u32().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            match segment.segment_type {
                SegmentType::Sequence => write!(f, "{}", asns)?,
                SegmentType::Set => write!(f, "({})", asns)?,
            }
        }
        Ok(())
    }
}

//------------ Community -----------------------------------------------------

/// A standard BGP community (RFC1997).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Community(pub u32);

impl Community {
    /// NO_EXPORT (65535:65281): do not advertise outside the confederation
    /// or AS.
    pub const NO_EXPORT: Community = Community(0xFFFF_FF01);
    /// NO_ADVERTISE (65535:65282): do not advertise to any peer.
    pub const NO_ADVERTISE: Community = Community(0xFFFF_FF02);

    pub fn new(high: u16, low: u16) -> Self {
        Self(((high as u32) << 16) | low as u32)
    }

    pub fn high(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn low(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.high(), self.low())
    }
}

impl FromStr for Community {
    type Err = std::num::ParseIntError;

    /// Parses `high:low` or `(high,low)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (high, low) = s.split_once([':', ',']).unwrap_or((s, ""));
        Ok(Community::new(high.trim().parse()?, low.trim().parse()?))
    }
}

//------------ LargeCommunity ------------------------------------------------

/// A BGP large community (RFC8092).
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct LargeCommunity {
    pub global_administrator: u32,
    pub data_part1: u32,
    pub data_part2: u32,
}

impl fmt::Display for LargeCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.global_administrator, self.data_part1, self.data_part2
        )
    }
}

//------------ UnknownAttribute ----------------------------------------------

/// A path attribute this implementation does not interpret. Transitive ones
/// are passed on unchanged.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct UnknownAttribute {
    pub optional: bool,
    pub transitive: bool,
    pub partial: bool,
    pub type_code: u8,
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_path_length_counts_sets_once() {
        let path = AsPath::from_segments(vec![
            AsPathSegment::sequence([65001, 65002]),
            AsPathSegment::set([65003, 65004, 65005]),
        ]);
        assert_eq!(path.length(), 3);
        assert_eq!(path.to_string(), "65001 65002 (65003 65004 65005)");
        assert_eq!(path.origin_asn(), Some(Asn::from_u32(65002)));
    }

    #[test]
    fn prepend_to_empty_and_set() {
        let mut path = AsPath::new();
        path.prepend(Asn::from_u32(41981), 1);
        assert_eq!(path, AsPath::from_sequence([41981]));

        let mut path =
            AsPath::from_segments(vec![AsPathSegment::set([1, 2])]);
        path.prepend(Asn::from_u32(3), 2);
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.length(), 3);
        assert_eq!(path.to_string(), "3 3 (1 2)");
    }

    #[test]
    fn prepend_overflows_into_new_segment() {
        let mut path = AsPath::from_sequence(vec![1; 255]);
        path.prepend(Asn::from_u32(2), 1);
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.length(), 256);
    }

    #[test]
    fn community_parse_and_print() -> Result<(), Box<dyn std::error::Error>> {
        let c: Community = "65535:65281".parse()?;
        assert_eq!(c, Community::NO_EXPORT);
        assert_eq!(c.to_string(), "(65535,65281)");
        assert_eq!(
            "(65535,65282)".parse::<Community>()?,
            Community::NO_ADVERTISE
        );
        assert!("foo".parse::<Community>().is_err());
        Ok(())
    }
}
