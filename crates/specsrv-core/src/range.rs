//! Range serialization into the DNF wire structure.

use crate::encoder::encode;
use crate::error::{ClassifyError, Result};
use crate::resolver::{Bound, ParsedRange, RawComparator};
use crate::types::{Comparator, VersionConstraint};

/// Serializes a parsed range.
///
/// OR-branches and AND-clauses keep the parser's order and multiplicity.
///
/// # Errors
///
/// Returns [`ClassifyError::UnrecognizedComparatorOperator`] for any operator
/// outside `""`, `>`, `>=`, `<=`, `<`, and for a non-empty operator bound to
/// the "any" sentinel. Both mean the range grammar and this adapter disagree.
///
/// # Examples
///
/// ```
/// use specsrv_core::{Comparator, RawComparator, serialize_range};
///
/// let constraint = serialize_range(&vec![vec![RawComparator::any()]]).unwrap();
/// assert_eq!(constraint.0, vec![vec![Comparator::Any]]);
/// ```
pub fn serialize_range(range: &ParsedRange) -> Result<VersionConstraint> {
    range
        .iter()
        .map(|set| set.iter().map(serialize_comparator).collect::<Result<Vec<_>>>())
        .collect::<Result<Vec<_>>>()
        .map(VersionConstraint)
}

/// Serializes one comparator.
pub fn serialize_comparator(comparator: &RawComparator) -> Result<Comparator> {
    let version = match (&comparator.bound, comparator.operator.as_str()) {
        (Bound::Any, "") => return Ok(Comparator::Any),
        (Bound::Any, op) => return Err(unrecognized(op)),
        (Bound::Version(version), _) => encode(version),
    };

    match comparator.operator.as_str() {
        ">" => Ok(Comparator::Gt(version)),
        ">=" => Ok(Comparator::Gte(version)),
        "" => Ok(Comparator::Eq(version)),
        "<=" => Ok(Comparator::Lte(version)),
        "<" => Ok(Comparator::Lt(version)),
        op => Err(unrecognized(op)),
    }
}

fn unrecognized(operator: &str) -> ClassifyError {
    tracing::error!(operator, "comparator operator not understood by serializer");
    ClassifyError::UnrecognizedComparatorOperator {
        operator: operator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemverVersion;
    use node_semver::Version;

    fn v(major: u64, minor: u64, patch: u64) -> Bound {
        Bound::Version(Version {
            major,
            minor,
            patch,
            build: vec![],
            pre_release: vec![],
        })
    }

    #[test]
    fn test_operator_table() {
        let cases = [
            (">", Comparator::Gt(SemverVersion::new(1, 0, 0))),
            (">=", Comparator::Gte(SemverVersion::new(1, 0, 0))),
            ("", Comparator::Eq(SemverVersion::new(1, 0, 0))),
            ("<=", Comparator::Lte(SemverVersion::new(1, 0, 0))),
            ("<", Comparator::Lt(SemverVersion::new(1, 0, 0))),
        ];
        for (op, expected) in cases {
            let got = serialize_comparator(&RawComparator::new(op, v(1, 0, 0))).unwrap();
            assert_eq!(got, expected, "operator {:?}", op);
        }
    }

    #[test]
    fn test_empty_operator_with_sentinel_is_any() {
        assert_eq!(
            serialize_comparator(&RawComparator::any()).unwrap(),
            Comparator::Any
        );
    }

    #[test]
    fn test_empty_operator_with_zero_version_is_eq() {
        assert_eq!(
            serialize_comparator(&RawComparator::new("", v(0, 0, 0))).unwrap(),
            Comparator::Eq(SemverVersion::new(0, 0, 0))
        );
    }

    #[test]
    fn test_unknown_operator_is_fatal() {
        let err = serialize_comparator(&RawComparator::new("~>", v(1, 0, 0))).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err,
            ClassifyError::UnrecognizedComparatorOperator {
                operator: "~>".into()
            }
        );
    }

    #[test]
    fn test_operator_on_sentinel_is_fatal() {
        let err = serialize_comparator(&RawComparator::new(">", Bound::Any)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_structure_and_order_preserved() {
        let parsed = vec![
            vec![
                RawComparator::new("<", v(1, 4, 5)),
                RawComparator::new("<", v(1, 2, 3)),
                RawComparator::new("<", v(1, 2, 3)),
            ],
            vec![RawComparator::any()],
            vec![RawComparator::new(">=", v(3, 0, 0))],
        ];
        let constraint = serialize_range(&parsed).unwrap();
        assert_eq!(constraint.branches(), 3);
        let counts: Vec<usize> = constraint.iter().map(Vec::len).collect();
        assert_eq!(counts, vec![3, 1, 1]);
        assert_eq!(constraint.0[0][0], Comparator::Lt(SemverVersion::new(1, 4, 5)));
        assert_eq!(constraint.0[0][1], constraint.0[0][2]);
    }

    #[test]
    fn test_one_bad_comparator_fails_whole_range() {
        let parsed = vec![
            vec![RawComparator::new(">=", v(1, 0, 0))],
            vec![RawComparator::new("!=", v(2, 0, 0))],
        ];
        assert!(serialize_range(&parsed).is_err());
    }
}
