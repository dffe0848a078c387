//! Suffix filters
//!
//! A filter specification is a `|`-separated list of name suffixes, for
//! example `.efi|.EFI`. Matching is exact and case sensitive, unit by unit
//! against the tail of the name. An empty suffix matches every name, so the
//! empty specification lists everything. A leading `*` on a suffix is
//! accepted and ignored, so `*.efi` and `.efi` are the same filter.

use std::fmt;

use crate::directory::RawEntry;

/// Ordered list of suffix patterns; never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    patterns: Vec<String>,
    suffixes: Vec<Vec<u16>>,
}

impl FilterSet {
    /// Splits `spec` on `|`
    ///
    /// Always yields at least one pattern. Adjacent separators produce empty
    /// patterns, which match everything.
    pub fn parse(spec: &str) -> Self {
        let patterns: Vec<String> = spec.split('|').map(str::to_string).collect();
        let suffixes = patterns
            .iter()
            .map(|pattern| {
                pattern
                    .strip_prefix('*')
                    .unwrap_or(pattern.as_str())
                    .encode_utf16()
                    .collect()
            })
            .collect();
        Self { patterns, suffixes }
    }

    /// Filter that lists every file
    pub fn match_all() -> Self {
        Self::parse("")
    }

    /// The patterns as written, in order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Always false: parsing yields at least one pattern
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if any suffix matches the tail of the entry name
    pub fn matches(&self, entry: &RawEntry<'_>) -> bool {
        self.suffixes
            .iter()
            .any(|suffix| entry.name_ends_with(suffix))
    }

    /// Returns true if any suffix matches the tail of `name`
    pub fn matches_name(&self, name: &str) -> bool {
        let units: Vec<u16> = name.encode_utf16().collect();
        self.suffixes.iter().any(|suffix| units.ends_with(suffix))
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::match_all()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.patterns.join("|"))
    }
}
