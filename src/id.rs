//! Identifier parsing and validation (spec §4.1).
//!
//! Allocation of fresh IDs needs directory state (to check collisions and
//! scan existing child ordinals) and lives in [`crate::store::lifecycle`];
//! this module is the pure, I/O-free half: parsing, validation, and slug
//! generation.

use once_cell::sync::Lazy;
use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;

use crate::error::{BeadsError, Result};

/// Default slug length for root IDs.
pub const DEFAULT_SLUG_LENGTH: usize = 4;
/// Default hierarchy depth limit (ordinals after the root).
pub const DEFAULT_MAX_DEPTH: usize = 3;
/// Default root ID prefix.
pub const DEFAULT_PREFIX: &str = "bd";

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]+)-([A-Za-z0-9]+)((?:\.[0-9]+)*)$").unwrap());

/// A parsed identifier: `<prefix>-<base>(.<n>)*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub prefix: String,
    pub base: String,
    pub ordinals: Vec<u32>,
}

impl ParsedId {
    /// Depth is the count of dot-separated ordinals after the root
    /// (spec §3.2): a root ID has depth 0, `bd-abcd.1` has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ordinals.len()
    }

    /// The root identifier this ID descends from, e.g. `bd-abcd` for
    /// `bd-abcd.1.2`.
    #[must_use]
    pub fn root(&self) -> String {
        format!("{}-{}", self.prefix, self.base)
    }

    /// Whether `other` is a direct parent of this ID (one fewer ordinal,
    /// matching prefix, and a shared ordinal prefix).
    #[must_use]
    pub fn is_direct_child_of(&self, other: &ParsedId) -> bool {
        self.prefix == other.prefix
            && self.base == other.base
            && self.ordinals.len() == other.ordinals.len() + 1
            && self.ordinals[..other.ordinals.len()] == other.ordinals[..]
    }
}

/// Parse an identifier into its components.
///
/// Rejects any identifier lacking a hyphen, or containing `/`. When
/// `allowed_prefixes` is `Some` and non-empty, the prefix must be a member
/// unless `force` is set (spec §4.1).
pub fn parse(id: &str, allowed_prefixes: Option<&[String]>, force: bool) -> Result<ParsedId> {
    if id.contains('/') {
        return Err(BeadsError::invalid_field(
            "id",
            format!("{id:?} must not contain '/'"),
        ));
    }
    let captures = ID_RE
        .captures(id)
        .ok_or_else(|| BeadsError::invalid_field("id", format!("{id:?} is missing a prefix hyphen or has an invalid shape")))?;

    let prefix = captures[1].to_string();
    let base = captures[2].to_string();
    let ordinal_str = &captures[3];
    let mut ordinals = Vec::new();
    if !ordinal_str.is_empty() {
        for part in ordinal_str.split('.').filter(|s| !s.is_empty()) {
            let n: u32 = part
                .parse()
                .map_err(|_| BeadsError::invalid_field("id", format!("{id:?} has a non-numeric ordinal")))?;
            ordinals.push(n);
        }
    }

    if !force {
        if let Some(allowed) = allowed_prefixes {
            if !allowed.is_empty() && !allowed.iter().any(|p| p == &prefix) {
                return Err(BeadsError::invalid_field(
                    "id",
                    format!("prefix {prefix:?} is not in the allowed set {allowed:?}"),
                ));
            }
        }
    }

    Ok(ParsedId {
        prefix,
        base,
        ordinals,
    })
}

/// Validate an identifier's shape without restricting its prefix.
pub fn is_valid_id_format(id: &str) -> bool {
    !id.contains('/') && ID_RE.is_match(id)
}

/// Generate a random lowercase-alphanumeric slug of the given length.
#[must_use]
pub fn generate_slug(len: usize) -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric())
        .take(len)
        .collect()
}

/// Build `<parent>.<n>`.
#[must_use]
pub fn child_id(parent: &str, ordinal: u32) -> String {
    format!("{parent}.{ordinal}")
}
