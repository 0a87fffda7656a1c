//! Conflict marker parser.
//!
//! A single forward pass over the file's lines, driven by a small state
//! machine:
//!
//! ```text
//! Searching --<<<<<<<--> AwaitingSeparatorOrBase
//! AwaitingSeparatorOrBase --|||||||--> AwaitingSeparatorAfterBase
//! AwaitingSeparatorOrBase --=======--> AwaitingEnd
//! AwaitingSeparatorAfterBase --=======--> AwaitingEnd
//! AwaitingEnd --->>>>>>>--> emit hunk, Searching
//! ```
//!
//! A block that hits end-of-file, or a closing marker before its separator,
//! is discarded. Scanning resumes after that closing marker: any opening
//! marker inside the discarded block would run into the same closing marker
//! (or the same end-of-file) without a separator, so none of them can form a
//! hunk. Each line is visited once.

use tracing::debug;

use crate::models::ConflictHunk;

pub const OPENING_MARKER: &str = "<<<<<<<";
pub const BASE_MARKER: &str = "|||||||";
pub const SEPARATOR_MARKER: &str = "=======";
pub const CLOSING_MARKER: &str = ">>>>>>>";

pub const DEFAULT_OURS_LABEL: &str = "HEAD";
pub const DEFAULT_THEIRS_LABEL: &str = "incoming";

/// Whether `content` contains at least one opening marker line.
pub fn has_conflict_markers(content: &str) -> bool {
    split_lines(content)
        .iter()
        .any(|line| line.starts_with(OPENING_MARKER))
}

/// Split file content into lines. A trailing newline does not produce an
/// extra empty line; `\r` is left on the line it belongs to.
pub fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n').collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Searching,
    AwaitingSeparatorOrBase { start: usize },
    AwaitingSeparatorAfterBase { start: usize, base: usize },
    AwaitingEnd { start: usize, base: Option<usize>, separator: usize },
}

/// Stateless marker parser; only the context window is configurable.
#[derive(Debug, Clone, Copy)]
pub struct ConflictParser {
    context_lines: usize,
}

impl Default for ConflictParser {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

impl ConflictParser {
    pub fn new(context_lines: usize) -> Self {
        Self { context_lines }
    }

    /// Parse every well-formed conflict block in `content`.
    ///
    /// `path` is used only to build hunk ids. Hunks come back ordered by
    /// `start_line` and never overlap.
    pub fn parse(&self, content: &str, path: &str) -> Vec<ConflictHunk> {
        let lines = split_lines(content);
        let mut hunks = Vec::new();
        let mut state = State::Searching;
        for (i, line) in lines.iter().copied().enumerate() {
            state = match state {
                State::Searching => {
                    if line.starts_with(OPENING_MARKER) {
                        State::AwaitingSeparatorOrBase { start: i }
                    } else {
                        State::Searching
                    }
                }
                State::AwaitingSeparatorOrBase { start } => {
                    if line.starts_with(BASE_MARKER) {
                        State::AwaitingSeparatorAfterBase { start, base: i }
                    } else if line.starts_with(SEPARATOR_MARKER) {
                        State::AwaitingEnd { start, base: None, separator: i }
                    } else if line.starts_with(CLOSING_MARKER) {
                        debug!(path, line = start + 1, "closing marker before separator, skipping block");
                        State::Searching
                    } else {
                        state
                    }
                }
                State::AwaitingSeparatorAfterBase { start, base } => {
                    if line.starts_with(SEPARATOR_MARKER) {
                        State::AwaitingEnd { start, base: Some(base), separator: i }
                    } else if line.starts_with(CLOSING_MARKER) {
                        debug!(path, line = start + 1, "closing marker before separator, skipping block");
                        State::Searching
                    } else {
                        state
                    }
                }
                State::AwaitingEnd { start, base, separator } => {
                    if line.starts_with(CLOSING_MARKER) {
                        let hunk = self.build_hunk(&lines, path, hunks.len(), start, base, separator, i);
                        hunks.push(hunk);
                        State::Searching
                    } else {
                        state
                    }
                }
            };
        }

        if let Some(start) = state.open_block_start() {
            debug!(path, line = start + 1, "unterminated conflict block, skipping");
        }

        debug!(path, count = hunks.len(), "parsed conflict hunks");
        hunks
    }

    #[allow(clippy::too_many_arguments)]
    fn build_hunk(
        &self,
        lines: &[&str],
        path: &str,
        index: usize,
        start: usize,
        base: Option<usize>,
        separator: usize,
        end: usize,
    ) -> ConflictHunk {
        let ours_end = base.unwrap_or(separator);
        let ours_content = lines[start + 1..ours_end].join("\n");
        let base_content = base
            .map(|b| lines[b + 1..separator].join("\n"))
            .unwrap_or_default();
        let theirs_content = lines[separator + 1..end].join("\n");

        let before_start = start.saturating_sub(self.context_lines);
        let after_end = (end + 1 + self.context_lines).min(lines.len());

        ConflictHunk {
            id: format!("{}#{}", path, index),
            start_line: start + 1,
            end_line: end + 1,
            ours_content,
            theirs_content,
            base_content,
            context_before: lines[before_start..start].iter().map(|s| s.to_string()).collect(),
            context_after: lines[end + 1..after_end].iter().map(|s| s.to_string()).collect(),
            ours_branch: marker_label(lines[start], OPENING_MARKER, DEFAULT_OURS_LABEL),
            theirs_branch: marker_label(lines[end], CLOSING_MARKER, DEFAULT_THEIRS_LABEL),
        }
    }
}

impl State {
    fn open_block_start(&self) -> Option<usize> {
        match *self {
            State::Searching => None,
            State::AwaitingSeparatorOrBase { start }
            | State::AwaitingSeparatorAfterBase { start, .. }
            | State::AwaitingEnd { start, .. } => Some(start),
        }
    }
}

fn marker_label(line: &str, marker: &str, default: &str) -> String {
    let label = line[marker.len()..].trim();
    if label.is_empty() {
        default.to_string()
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<ConflictHunk> {
        ConflictParser::default().parse(content, "file.txt")
    }

    #[test]
    fn test_two_way_hunk() {
        let content = "line1\n<<<<<<< HEAD\nfoo\n=======\nbar\n>>>>>>> feature\nline2\n";
        let hunks = parse(content);
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.id, "file.txt#0");
        assert_eq!(h.start_line, 2);
        assert_eq!(h.end_line, 6);
        assert_eq!(h.ours_content, "foo");
        assert_eq!(h.theirs_content, "bar");
        assert_eq!(h.base_content, "");
        assert_eq!(h.ours_branch, "HEAD");
        assert_eq!(h.theirs_branch, "feature");
        assert_eq!(h.context_before, vec!["line1"]);
        assert_eq!(h.context_after, vec!["line2"]);
    }

    #[test]
    fn test_three_way_hunk() {
        let content = "<<<<<<< ours\na\nb\n||||||| base\norig\n=======\nc\n>>>>>>> theirs\n";
        let hunks = parse(content);
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.ours_content, "a\nb");
        assert_eq!(h.base_content, "orig");
        assert_eq!(h.theirs_content, "c");
        assert!(h.is_three_way());
        assert!(h.context_before.is_empty());
        assert!(h.context_after.is_empty());
    }

    #[test]
    fn test_no_markers() {
        assert!(parse("just\nsome\ntext\n").is_empty());
        assert!(parse("").is_empty());
        assert!(!has_conflict_markers("plain"));
    }

    #[test]
    fn test_default_labels() {
        let hunks = parse("<<<<<<<\nx\n=======\ny\n>>>>>>>\n");
        assert_eq!(hunks[0].ours_branch, DEFAULT_OURS_LABEL);
        assert_eq!(hunks[0].theirs_branch, DEFAULT_THEIRS_LABEL);
    }

    #[test]
    fn test_multiple_hunks_ordered_and_disjoint() {
        let content = "\
a
<<<<<<< HEAD
one
=======
uno
>>>>>>> b1
b
c
<<<<<<< HEAD
two
=======
dos
>>>>>>> b2
d
<<<<<<< HEAD
=======
tres
>>>>>>> b3
";
        let hunks = parse(content);
        assert_eq!(hunks.len(), 3);
        for pair in hunks.windows(2) {
            assert!(pair[0].end_line < pair[1].start_line);
        }
        assert_eq!(hunks[1].start_line, 9);
        assert_eq!(hunks[1].context_before, vec![">>>>>>> b1", "b", "c"]);
        assert_eq!(hunks[2].ours_content, "");
        assert_eq!(hunks[2].theirs_content, "tres");
        assert_eq!(hunks[2].id, "file.txt#2");
    }

    #[test]
    fn test_context_clamped_to_three_lines() {
        let content = "1\n2\n3\n4\n<<<<<<< a\nx\n=======\ny\n>>>>>>> b\n5\n6\n7\n8\n";
        let h = &parse(content)[0];
        assert_eq!(h.context_before, vec!["2", "3", "4"]);
        assert_eq!(h.context_after, vec!["5", "6", "7"]);
    }

    #[test]
    fn test_configurable_context() {
        let content = "1\n2\n<<<<<<< a\nx\n=======\ny\n>>>>>>> b\n3\n4\n";
        let h = &ConflictParser::new(1).parse(content, "f")[0];
        assert_eq!(h.context_before, vec!["2"]);
        assert_eq!(h.context_after, vec!["3"]);
    }

    #[test]
    fn test_nested_opening_marker_is_content() {
        let content = "\
<<<<<<< broken
never closed
<<<<<<< HEAD
ok
=======
fine
>>>>>>> other
tail
";
        // The inner opening marker is just ours-side text of the outer block.
        let hunks = parse(content);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].start_line, 1);
        assert_eq!(hunks[0].ours_content, "never closed\n<<<<<<< HEAD\nok");
    }

    #[test]
    fn test_missing_separator_skips_block() {
        let content = "\
<<<<<<< HEAD
orphan
>>>>>>> gone
middle
<<<<<<< HEAD
a
=======
b
>>>>>>> feature
";
        let hunks = parse(content);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].start_line, 5);
        assert_eq!(hunks[0].end_line, 9);
        assert_eq!(hunks[0].id, "file.txt#0");
    }

    #[test]
    fn test_block_truncated_at_eof_is_dropped() {
        let content = "\
<<<<<<< HEAD
a
=======
b
>>>>>>> one
x
<<<<<<< HEAD
c
=======
d
";
        let hunks = parse(content);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].theirs_branch, "one");
    }

    #[test]
    fn test_openers_before_early_closing_marker_are_skipped() {
        let content = "\
<<<<<<< a
<<<<<<< b
x
||||||| base
>>>>>>> c
<<<<<<< HEAD
y
=======
z
>>>>>>> feature
";
        let hunks = parse(content);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].start_line, 6);
        assert_eq!(hunks[0].end_line, 10);
        assert_eq!(hunks[0].ours_content, "y");
        assert_eq!(hunks[0].context_before, vec!["x", "||||||| base", ">>>>>>> c"]);
    }

    #[test]
    fn test_many_unterminated_openers_parse_in_linear_time() {
        // Just under the default 1 MiB size cap.
        let content = "<<<<<<< x\n".repeat(100_000);
        let started = std::time::Instant::now();
        let hunks = parse(&content);
        assert!(hunks.is_empty());
        assert!(
            started.elapsed() < std::time::Duration::from_secs(2),
            "parse took {:?}",
            started.elapsed()
        );

        let mut content = "<<<<<<< x\n".repeat(50_000);
        content.push_str(">>>>>>> early\n");
        content.push_str(&"<<<<<<< y\n".repeat(50_000));
        content.push_str("<<<<<<< HEAD\na\n=======\nb\n>>>>>>> t\n");
        let started = std::time::Instant::now();
        let hunks = parse(&content);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].start_line, 50_002);
        assert_eq!(hunks[0].ours_content, "<<<<<<< y\n".repeat(49_999) + "<<<<<<< HEAD\na");
    }

    #[test]
    fn test_crlf_labels_trimmed() {
        let content = "<<<<<<< HEAD\r\nfoo\r\n=======\r\nbar\r\n>>>>>>> feature\r\n";
        let h = &parse(content)[0];
        assert_eq!(h.ours_branch, "HEAD");
        assert_eq!(h.theirs_branch, "feature");
        assert_eq!(h.ours_content, "foo\r");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert!(split_lines("").is_empty());
    }
}
