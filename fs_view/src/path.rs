//! Navigation path
//!
//! [`PathState`] is the absolute, `\`-separated path a navigation session is
//! looking at. Growing the path allocates a new pool string and releases the
//! old one; ascending truncates in place.

use core_types::{BootPool, MemoryError, Pooled};

/// Volume root
pub const ROOT: &str = "\\";

/// Separator between path segments
pub const SEPARATOR: char = '\\';

/// The current path of a navigation session
#[derive(Debug)]
pub struct PathState {
    text: Pooled<String>,
}

impl PathState {
    /// Starts at `start`; an empty start is the volume root
    pub fn new(pool: &BootPool, start: &str) -> Result<Self, MemoryError> {
        let start = if start.is_empty() { ROOT } else { start };
        Ok(Self {
            text: pool.allocate_str(start)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_root(&self) -> bool {
        self.text.as_str() == ROOT
    }

    /// Position at which ascending cuts the path
    ///
    /// The last separator after the first character, or the position right
    /// after the first character when there is none.
    fn cut_index(&self) -> usize {
        self.text
            .char_indices()
            .skip(1)
            .filter(|(_, c)| *c == SEPARATOR)
            .map(|(index, _)| index)
            .last()
            .unwrap_or_else(|| self.text.chars().next().map_or(0, char::len_utf8))
    }

    /// Drops the last segment
    ///
    /// Returns false, leaving the path untouched, when the path is the root
    /// or the text from the cut position on is exactly `..`. Callers then
    /// append a literal `..` segment instead, so ascending from the root
    /// yields `\..`.
    pub fn ascend(&mut self) -> bool {
        let index = self.cut_index();
        if self.is_root() || &self.text[index..] == ".." {
            return false;
        }
        self.text.truncate(index);
        true
    }

    /// Appends a directory segment, dropping one trailing `/`
    pub fn descend(&mut self, pool: &BootPool, segment: &str) -> Result<(), MemoryError> {
        let segment = segment.strip_suffix('/').unwrap_or(segment);
        let joined = self.joined(segment);
        self.text = pool.allocate_str(&joined)?;
        Ok(())
    }

    /// Full path of `name` inside the current directory
    pub fn join_file(&self, pool: &BootPool, name: &str) -> Result<Pooled<String>, MemoryError> {
        pool.allocate_str(&self.joined(name))
    }

    fn joined(&self, segment: &str) -> String {
        let mut joined = String::with_capacity(self.text.len() + segment.len() + 1);
        joined.push_str(&self.text);
        if !joined.ends_with(SEPARATOR) {
            joined.push(SEPARATOR);
        }
        joined.push_str(segment);
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(pool: &BootPool, start: &str) -> PathState {
        PathState::new(pool, start).unwrap()
    }

    #[test]
    fn test_empty_start_is_root() {
        let pool = BootPool::new();
        let state = path(&pool, "");
        assert_eq!(state.as_str(), "\\");
        assert!(state.is_root());
    }

    #[test]
    fn test_descend_inserts_one_separator() {
        let pool = BootPool::new();
        let mut state = path(&pool, "\\");
        state.descend(&pool, "EFI/").unwrap();
        assert_eq!(state.as_str(), "\\EFI");
        state.descend(&pool, "BOOT/").unwrap();
        assert_eq!(state.as_str(), "\\EFI\\BOOT");
    }

    #[test]
    fn test_descend_reallocates() {
        let pool = BootPool::new();
        let mut state = path(&pool, "\\");
        state.descend(&pool, "EFI/").unwrap();
        let stats = pool.stats();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.releases, 1);
        drop(state);
        assert!(pool.stats().is_balanced());
    }

    #[test]
    fn test_descend_failure_keeps_path() {
        let pool = BootPool::failing_after(1);
        let mut state = path(&pool, "\\EFI");
        assert!(state.descend(&pool, "BOOT/").is_err());
        assert_eq!(state.as_str(), "\\EFI");
    }

    #[test]
    fn test_ascend_truncates_last_segment() {
        let pool = BootPool::new();
        let mut state = path(&pool, "\\EFI\\BOOT");
        assert!(state.ascend());
        assert_eq!(state.as_str(), "\\EFI");
        assert!(state.ascend());
        assert_eq!(state.as_str(), "\\");
    }

    #[test]
    fn test_ascend_at_root_falls_through() {
        let pool = BootPool::new();
        let mut state = path(&pool, "\\");
        assert!(!state.ascend());
        state.descend(&pool, "../").unwrap();
        assert_eq!(state.as_str(), "\\..");
    }

    #[test]
    fn test_ascend_after_literal_parent_falls_through() {
        let pool = BootPool::new();
        let mut state = path(&pool, "\\..");
        assert!(!state.ascend());
        state.descend(&pool, "../").unwrap();
        assert_eq!(state.as_str(), "\\..\\..");
    }

    #[test]
    fn test_ascend_from_nested_parent_segment() {
        let pool = BootPool::new();
        let mut state = path(&pool, "\\EFI\\..");
        assert!(state.ascend());
        assert_eq!(state.as_str(), "\\EFI");
    }

    #[test]
    fn test_join_file_exactly_one_separator() {
        let pool = BootPool::new();
        let root = path(&pool, "\\");
        assert_eq!(root.join_file(&pool, "a.efi").unwrap().as_str(), "\\a.efi");
        let nested = path(&pool, "\\EFI\\BOOT");
        assert_eq!(
            nested.join_file(&pool, "BOOTX64.EFI").unwrap().as_str(),
            "\\EFI\\BOOT\\BOOTX64.EFI"
        );
        let trailing = path(&pool, "\\EFI\\");
        assert_eq!(trailing.join_file(&pool, "x").unwrap().as_str(), "\\EFI\\x");
    }
}
