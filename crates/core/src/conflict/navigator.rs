//! Stateless traversal over every conflict in the workspace.

use crate::models::{ConflictFile, ConflictHunk, Direction, NavigationResult};

/// One entry in the flattened conflict list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictLocation {
    pub file_path: String,
    pub hunk_index: usize,
    pub hunk: ConflictHunk,
}

/// Flat, ordered list of conflicts: files in status-listing order, hunks in
/// parse order within each file.
#[derive(Debug, Clone, Default)]
pub struct ConflictNavigator {
    entries: Vec<ConflictLocation>,
}

impl ConflictNavigator {
    pub fn new(files: &[ConflictFile]) -> Self {
        let entries = files
            .iter()
            .flat_map(|file| {
                file.hunks.iter().enumerate().map(|(hunk_index, hunk)| ConflictLocation {
                    file_path: file.path.clone(),
                    hunk_index,
                    hunk: hunk.clone(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ConflictLocation] {
        &self.entries
    }

    /// Index of `(file_path, hunk_index)` in the flat list.
    pub fn position_of(&self, file_path: &str, hunk_index: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.file_path == file_path && e.hunk_index == hunk_index)
    }

    /// Move one step from `current` in `direction`.
    ///
    /// An unknown or absent `current` counts as position -1, so `next` lands
    /// on the first conflict. There is no wraparound.
    pub fn step(&self, current: Option<(&str, usize)>, direction: Direction) -> NavigationResult {
        let total = self.entries.len();
        let here: isize = current
            .and_then(|(path, idx)| self.position_of(path, idx))
            .map_or(-1, |p| p as isize);

        let target = match direction {
            Direction::Next => here + 1,
            Direction::Previous => here - 1,
        };

        if target < 0 || target as usize >= total {
            return NavigationResult {
                has_more: false,
                position: None,
                total,
                file_path: None,
                hunk_index: None,
                hunk: None,
            };
        }

        let entry = &self.entries[target as usize];
        NavigationResult {
            has_more: true,
            position: Some(target as usize + 1),
            total,
            file_path: Some(entry.file_path.clone()),
            hunk_index: Some(entry.hunk_index),
            hunk: Some(entry.hunk.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::parser::ConflictParser;

    fn files() -> Vec<ConflictFile> {
        let parser = ConflictParser::default();
        let two = "<<<<<<< a\n1\n=======\n2\n>>>>>>> b\nx\n<<<<<<< a\n3\n=======\n4\n>>>>>>> b\n";
        let one = "<<<<<<< a\n5\n=======\n6\n>>>>>>> b\n";
        vec![
            ConflictFile::text("a.txt", parser.parse(two, "a.txt")),
            ConflictFile::binary("img.png"),
            ConflictFile::text("b.txt", parser.parse(one, "b.txt")),
        ]
    }

    #[test]
    fn test_flatten_order() {
        let nav = ConflictNavigator::new(&files());
        assert_eq!(nav.len(), 3);
        let order: Vec<(&str, usize)> = nav
            .entries()
            .iter()
            .map(|e| (e.file_path.as_str(), e.hunk_index))
            .collect();
        assert_eq!(order, vec![("a.txt", 0), ("a.txt", 1), ("b.txt", 0)]);
    }

    #[test]
    fn test_next_without_position_returns_first() {
        let nav = ConflictNavigator::new(&files());
        let r = nav.step(None, Direction::Next);
        assert!(r.has_more);
        assert_eq!(r.position, Some(1));
        assert_eq!(r.total, 3);
        assert_eq!(r.file_path.as_deref(), Some("a.txt"));
        assert_eq!(r.hunk_index, Some(0));
        assert_eq!(r.hunk.unwrap().ours_content, "1");
    }

    #[test]
    fn test_previous_from_first_has_no_more() {
        let nav = ConflictNavigator::new(&files());
        let r = nav.step(Some(("a.txt", 0)), Direction::Previous);
        assert!(!r.has_more);
        assert_eq!(r.total, 3);
    }

    #[test]
    fn test_next_from_last_has_no_more() {
        let nav = ConflictNavigator::new(&files());
        let r = nav.step(Some(("b.txt", 0)), Direction::Next);
        assert!(!r.has_more);
        assert!(r.hunk.is_none());
    }

    #[test]
    fn test_step_crosses_files() {
        let nav = ConflictNavigator::new(&files());
        let r = nav.step(Some(("a.txt", 1)), Direction::Next);
        assert_eq!(r.file_path.as_deref(), Some("b.txt"));
        assert_eq!(r.position, Some(3));

        let back = nav.step(Some(("b.txt", 0)), Direction::Previous);
        assert_eq!(back.file_path.as_deref(), Some("a.txt"));
        assert_eq!(back.hunk_index, Some(1));
    }

    #[test]
    fn test_unknown_position_counts_as_before_start() {
        let nav = ConflictNavigator::new(&files());
        assert_eq!(nav.step(Some(("gone.txt", 4)), Direction::Next).position, Some(1));
        assert!(!nav.step(Some(("gone.txt", 4)), Direction::Previous).has_more);
    }

    #[test]
    fn test_empty_list() {
        let nav = ConflictNavigator::new(&[]);
        assert!(nav.is_empty());
        let r = nav.step(None, Direction::Next);
        assert!(!r.has_more);
        assert_eq!(r.total, 0);
    }
}
