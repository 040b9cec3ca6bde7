use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Offset of a Consumer Group, or of a Topic Partition watermark.
///
/// Kafka reports "no committed offset yet" with a sentinel (`-1`):
/// here that case is an explicit [`Offset::Unknown`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Offset {
    /// A real offset, as reported by the cluster.
    Known(i64),

    /// No offset available (i.e. nothing committed for this partition yet).
    #[default]
    Unknown,
}

impl Offset {
    /// Maps a raw offset to [`Offset`]: negative values are never real offsets.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Offset::Unknown
        } else {
            Offset::Known(raw)
        }
    }

    pub fn known(&self) -> Option<i64> {
        match self {
            Offset::Known(o) => Some(*o),
            Offset::Unknown => None,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Known(o) => write!(f, "{o}"),
            Offset::Unknown => write!(f, "unknown"),
        }
    }
}

/// Topic name -> set of Partition IDs.
///
/// Built fresh every polling cycle. `BTree*` collections keep iteration deterministic.
pub type TopicPartitionSet = BTreeMap<String, BTreeSet<u32>>;

/// Topic name -> (Partition ID -> [`Offset`]).
pub type OffsetMap = BTreeMap<String, BTreeMap<u32, Offset>>;

/// Earliest and latest (high watermark) offsets of a set of Topic Partitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetBounds {
    pub earliest: OffsetMap,
    pub latest: OffsetMap,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn negative_raw_offsets_are_unknown() {
        assert_eq!(Offset::from_raw(-1), Offset::Unknown);
        assert_eq!(Offset::from_raw(-1001), Offset::Unknown);
        assert_eq!(Offset::from_raw(0), Offset::Known(0));
        assert_eq!(Offset::from_raw(42), Offset::Known(42));
    }

    #[test]
    fn zero_is_not_unknown() {
        assert_ne!(Offset::Known(0), Offset::Unknown);
        assert_eq!(Offset::Known(0).known(), Some(0));
        assert_eq!(Offset::Unknown.known(), None);
    }
}
