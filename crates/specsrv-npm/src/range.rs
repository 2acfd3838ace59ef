//! npm range desugaring.
//!
//! Turns a range string into OR-groups of primitive comparators the way
//! npm's loose range grammar does: `||` splits groups, hyphen ranges and
//! `~`/`^`/x-ranges expand into `>=`/`<` pairs, and comparators the grammar
//! cannot read are dropped. Upper bounds carry no `-0` prerelease.
//!
//! `node_semver::Range` keeps its desugared comparator sets private, so the
//! expansion is done here and only [`Version`] is taken from node-semver.

use crate::error::{NpmSpecError, Result};
use crate::version::{BUILD, identifiers, prerelease_loose};
use node_semver::{Identifier, Version};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use specsrv_core::{Bound, ParsedRange, RangeParser, RawComparator, ResolveError};

/// Partial version, one capture per part plus prerelease and build.
fn xrange_plain() -> String {
    format!(
        r"[v=\s]*(\d+|x|X|\*)(?:\.(\d+|x|X|\*)(?:\.(\d+|x|X|\*)(?:{})?{}?)?)?",
        prerelease_loose(),
        BUILD
    )
}

static OR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\|\|\s*").unwrap());
static HYPHEN: Lazy<Regex> = Lazy::new(|| {
    let plain = xrange_plain();
    Regex::new(&format!(r"^\s*(?P<from>{plain})\s+-\s+(?P<to>{plain})\s*$")).unwrap()
});
static PARTIAL: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("^{}$", xrange_plain())).unwrap());
static XRANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^((?:<|>)?=?)\s*{}$", xrange_plain())).unwrap());
static TILDE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^~>?{}$", xrange_plain())).unwrap());
static CARET: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r"^\^{}$", xrange_plain())).unwrap());

static COMPARATOR_TRIM: Lazy<Regex> = Lazy::new(|| Regex::new(r"([<>]=?|=)\s+").unwrap());
static TILDE_TRIM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(~>?)\s+").unwrap());
static CARET_TRIM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\^\s+").unwrap());

/// Desugars npm range strings.
///
/// # Examples
///
/// ```
/// use specsrv_npm::NpmRangeParser;
///
/// let sets = NpmRangeParser::new().parse("^1.2.3 || 2.x").unwrap();
/// assert_eq!(sets.len(), 2);
/// assert_eq!(sets[0][0].operator, ">=");
/// assert_eq!(sets[0][1].operator, "<");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmRangeParser;

impl NpmRangeParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a range into comparator sets.
    ///
    /// # Errors
    ///
    /// [`NpmSpecError::InvalidRange`] when no group keeps a single comparator,
    /// or when a bound does not fit in `u64`.
    pub fn parse(&self, range: &str) -> Result<ParsedRange> {
        let mut sets = Vec::new();
        for set in OR.split(range.trim()) {
            let comparators = parse_set(set.trim(), range)?;
            if !comparators.is_empty() {
                sets.push(comparators);
            }
        }

        if sets.is_empty() {
            return Err(NpmSpecError::invalid_range(range));
        }

        // A branch matching any version absorbs the whole disjunction.
        if sets.len() > 1
            && let Some(any) = sets.iter().position(|set| is_any_set(set))
        {
            sets = vec![sets.swap_remove(any)];
        }

        tracing::trace!(range, sets = sets.len(), "desugared range");
        Ok(sets)
    }

    /// True when [`parse`](Self::parse) would succeed.
    pub fn is_valid(&self, range: &str) -> bool {
        self.parse(range).is_ok()
    }
}

impl RangeParser for NpmRangeParser {
    fn parse_range(&self, range: &str) -> std::result::Result<ParsedRange, ResolveError> {
        self.parse(range).map_err(Into::into)
    }
}

fn is_any_set(set: &[RawComparator]) -> bool {
    matches!(set, [only] if only.operator.is_empty() && only.bound == Bound::Any)
}

fn parse_set(set: &str, range: &str) -> Result<Vec<RawComparator>> {
    if let Some(caps) = HYPHEN.captures(set) {
        let from = partial_of(&caps["from"], range)?;
        let to = partial_of(&caps["to"], range)?;
        return hyphen(&from, &to).ok_or_else(|| NpmSpecError::invalid_range(range));
    }

    let set = COMPARATOR_TRIM.replace_all(set, "$1");
    let set = TILDE_TRIM.replace_all(&set, "$1");
    let set = CARET_TRIM.replace_all(&set, "^");

    let tokens: Vec<&str> = set.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(vec![RawComparator::any()]);
    }

    let mut comparators = Vec::new();
    for token in tokens {
        comparators.extend(desugar(token, range)?);
    }
    Ok(comparators)
}

/// Expands one comparator token. Unreadable tokens expand to nothing.
fn desugar(token: &str, range: &str) -> Result<Vec<RawComparator>> {
    let overflow = || NpmSpecError::invalid_range(range);

    let expanded = if let Some(caps) = CARET.captures(token) {
        caret(&Partial::from_captures(&caps, 1).ok_or_else(overflow)?)
    } else if let Some(caps) = TILDE.captures(token) {
        tilde(&Partial::from_captures(&caps, 1).ok_or_else(overflow)?)
    } else if let Some(caps) = XRANGE.captures(token) {
        xrange(&caps[1], &Partial::from_captures(&caps, 2).ok_or_else(overflow)?)
    } else {
        tracing::trace!(token, range, "dropping unparsable comparator");
        return Ok(Vec::new());
    };

    expanded.ok_or_else(overflow)
}

fn partial_of(text: &str, range: &str) -> Result<Partial> {
    PARTIAL
        .captures(text)
        .and_then(|caps| Partial::from_captures(&caps, 1))
        .ok_or_else(|| NpmSpecError::invalid_range(range))
}

/// A version that may stop early or use `x`/`*` wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre_release: Vec<Identifier>,
    build: Vec<Identifier>,
}

impl Partial {
    /// Reads captures starting at `first`. `None` when a number overflows.
    fn from_captures(caps: &Captures<'_>, first: usize) -> Option<Self> {
        let part = |i: usize| -> Option<Option<u64>> {
            match caps.get(first + i).map(|m| m.as_str()) {
                None | Some("x" | "X" | "*") => Some(None),
                Some(digits) => digits.parse().ok().map(Some),
            }
        };

        let mut partial = Self {
            major: part(0)?,
            minor: part(1)?,
            patch: part(2)?,
            pre_release: caps
                .get(first + 3)
                .map(|m| identifiers(m.as_str()))
                .unwrap_or_default(),
            build: caps
                .get(first + 4)
                .map(|m| identifiers(m.as_str()))
                .unwrap_or_default(),
        };

        // A wildcard swallows everything after it.
        if partial.major.is_none() {
            partial.minor = None;
        }
        if partial.minor.is_none() {
            partial.patch = None;
        }
        Some(partial)
    }

    fn lower_bound(&self, major: u64, minor: u64, patch: u64) -> Version {
        Version {
            pre_release: self.pre_release.clone(),
            ..version(major, minor, patch)
        }
    }

    fn exact(&self, major: u64, minor: u64, patch: u64) -> Version {
        Version {
            pre_release: self.pre_release.clone(),
            build: self.build.clone(),
            ..version(major, minor, patch)
        }
    }
}

fn version(major: u64, minor: u64, patch: u64) -> Version {
    Version {
        major,
        minor,
        patch,
        build: vec![],
        pre_release: vec![],
    }
}

fn cmp(operator: &str, v: Version) -> RawComparator {
    RawComparator::new(operator, Bound::Version(v))
}

fn between(lower: Version, upper: Version) -> Vec<RawComparator> {
    vec![cmp(">=", lower), cmp("<", upper)]
}

/// `^M.m.p`: changes that do not modify the left-most non-zero part.
fn caret(p: &Partial) -> Option<Vec<RawComparator>> {
    let Some(major) = p.major else {
        return Some(vec![RawComparator::any()]);
    };
    let Some(minor) = p.minor else {
        return Some(between(version(major, 0, 0), version(major.checked_add(1)?, 0, 0)));
    };
    let Some(patch) = p.patch else {
        let upper = if major == 0 {
            version(0, minor.checked_add(1)?, 0)
        } else {
            version(major.checked_add(1)?, 0, 0)
        };
        return Some(between(version(major, minor, 0), upper));
    };

    let upper = match (major, minor) {
        (0, 0) => version(0, 0, patch.checked_add(1)?),
        (0, _) => version(0, minor.checked_add(1)?, 0),
        _ => version(major.checked_add(1)?, 0, 0),
    };
    Some(between(p.lower_bound(major, minor, patch), upper))
}

/// `~M.m.p`: patch-level changes when a minor is given, else minor-level.
fn tilde(p: &Partial) -> Option<Vec<RawComparator>> {
    let Some(major) = p.major else {
        return Some(vec![RawComparator::any()]);
    };
    let Some(minor) = p.minor else {
        return Some(between(version(major, 0, 0), version(major.checked_add(1)?, 0, 0)));
    };
    let upper = version(major, minor.checked_add(1)?, 0);
    let lower = match p.patch {
        Some(patch) => p.lower_bound(major, minor, patch),
        None => version(major, minor, 0),
    };
    Some(between(lower, upper))
}

/// Plain comparators and x-ranges, with or without an operator.
fn xrange(operator: &str, p: &Partial) -> Option<Vec<RawComparator>> {
    let any_x = p.patch.is_none();
    let operator = if operator == "=" { "" } else { operator };

    let Some(major) = p.major else {
        return Some(match operator {
            ">" | "<" => vec![cmp("<", version(0, 0, 0))],
            _ => vec![RawComparator::any()],
        });
    };

    if !any_x {
        let patch = p.patch?;
        let minor = p.minor?;
        return Some(vec![cmp(operator, p.exact(major, minor, patch))]);
    }

    if !operator.is_empty() {
        let minor_x = p.minor.is_none();
        let (mut major, mut minor) = (major, p.minor.unwrap_or(0));
        let operator = match operator {
            ">" => {
                if minor_x {
                    major = major.checked_add(1)?;
                    minor = 0;
                } else {
                    minor = minor.checked_add(1)?;
                }
                ">="
            }
            "<=" => {
                if minor_x {
                    major = major.checked_add(1)?;
                } else {
                    minor = minor.checked_add(1)?;
                }
                "<"
            }
            other => other,
        };
        return Some(vec![cmp(operator, version(major, minor, 0))]);
    }

    match p.minor {
        None => Some(between(version(major, 0, 0), version(major.checked_add(1)?, 0, 0))),
        Some(minor) => Some(between(
            version(major, minor, 0),
            version(major, minor.checked_add(1)?, 0),
        )),
    }
}

/// `A - B`: inclusive on both ends, partial ends widened.
fn hyphen(from: &Partial, to: &Partial) -> Option<Vec<RawComparator>> {
    let mut comparators = Vec::with_capacity(2);

    if let Some(major) = from.major {
        let lower = match (from.minor, from.patch) {
            (None, _) => version(major, 0, 0),
            (Some(minor), None) => version(major, minor, 0),
            (Some(minor), Some(patch)) => from.exact(major, minor, patch),
        };
        comparators.push(cmp(">=", lower));
    }

    if let Some(major) = to.major {
        comparators.push(match (to.minor, to.patch) {
            (None, _) => cmp("<", version(major.checked_add(1)?, 0, 0)),
            (Some(minor), None) => cmp("<", version(major, minor.checked_add(1)?, 0)),
            (Some(minor), Some(patch)) if !to.pre_release.is_empty() => {
                cmp("<=", to.lower_bound(major, minor, patch))
            }
            (Some(minor), Some(patch)) => cmp("<=", to.exact(major, minor, patch)),
        });
    }

    if comparators.is_empty() {
        comparators.push(RawComparator::any());
    }
    Some(comparators)
}
