use std::collections::BTreeSet;

use super::errors::{ScalingMetadataError, ScalingMetadataResult};

/// Parse a partition allow-list, formatted as comma separated IDs and inclusive ranges.
///
/// For example, `"0,2,5-7"` becomes `{0, 2, 5, 6, 7}`. Whitespace around items is ignored,
/// and an empty (or blank) input results in an empty set (i.e. "no limitation").
pub fn parse_partition_limitation(input: &str) -> ScalingMetadataResult<BTreeSet<u32>> {
    let invalid = || ScalingMetadataError::InvalidPartitionLimitation(input.to_string());

    let mut res = BTreeSet::new();
    if input.trim().is_empty() {
        return Ok(res);
    }

    for item in input.split(',').map(str::trim) {
        match item.split_once('-') {
            Some((from, to)) => {
                let from = from.trim().parse::<u32>().map_err(|_| invalid())?;
                let to = to.trim().parse::<u32>().map_err(|_| invalid())?;
                if from > to {
                    return Err(invalid());
                }
                res.extend(from..=to);
            },
            None => {
                res.insert(item.parse::<u32>().map_err(|_| invalid())?);
            },
        }
    }

    Ok(res)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_ids_and_ranges() {
        assert_eq!(parse_partition_limitation("0,2,5-7"), Ok(BTreeSet::from([0, 2, 5, 6, 7])));
        assert_eq!(parse_partition_limitation(" 1 , 3 - 4 "), Ok(BTreeSet::from([1, 3, 4])));
        assert_eq!(parse_partition_limitation("4,4,4"), Ok(BTreeSet::from([4])));
    }

    #[test]
    fn blank_means_no_limitation() {
        assert_eq!(parse_partition_limitation(""), Ok(BTreeSet::new()));
        assert_eq!(parse_partition_limitation("   "), Ok(BTreeSet::new()));
    }

    #[test]
    fn reject_malformed() {
        for bad in ["a", "1,,2", "-1", "3-1", "1-", "1-2-3"] {
            assert_eq!(
                parse_partition_limitation(bad),
                Err(ScalingMetadataError::InvalidPartitionLimitation(bad.to_string())),
                "'{bad}' should be rejected"
            );
        }
    }
}
