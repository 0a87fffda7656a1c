//! Rewrites file content to replace conflict blocks with resolved text.
//!
//! Blocks are located by position (`start_line`), never by searching for
//! marker text, so several blocks with identical markers are told apart.

use tracing::debug;

use super::parser::{split_lines, OPENING_MARKER};
use crate::errors::ConflictError;
use crate::models::{ConflictHunk, ResolutionStrategy};

/// Stateless hunk rewriting operations.
pub struct HunkResolver;

impl HunkResolver {
    /// Text that replaces `hunk` under `strategy`.
    ///
    /// Fails with [`ConflictError::MissingManualContent`] when `strategy` is
    /// manual and no content was supplied.
    pub fn resolved_content(
        hunk: &ConflictHunk,
        strategy: ResolutionStrategy,
        manual_content: Option<&str>,
    ) -> Result<String, ConflictError> {
        match strategy {
            ResolutionStrategy::Ours => Ok(hunk.ours_content.clone()),
            ResolutionStrategy::Theirs => Ok(hunk.theirs_content.clone()),
            ResolutionStrategy::Both => Ok(join_sides(&hunk.ours_content, &hunk.theirs_content)),
            ResolutionStrategy::Manual => manual_content
                .map(str::to_string)
                .ok_or(ConflictError::MissingManualContent),
        }
    }

    /// Replace exactly `hunk`'s marker block in `content`.
    pub fn resolve(
        content: &str,
        hunk: &ConflictHunk,
        strategy: ResolutionStrategy,
        manual_content: Option<&str>,
        path: &str,
    ) -> Result<String, ConflictError> {
        let resolved = Self::resolved_content(hunk, strategy, manual_content)?;
        Self::apply(content, &[(hunk, resolved)], path)
    }

    /// Replace several blocks from one parse in a single pass.
    ///
    /// Every replacement is addressed by the line numbers of the parse that
    /// produced it, and the original lines are walked exactly once, so no
    /// replacement can shift the position of another.
    pub fn apply(
        content: &str,
        replacements: &[(&ConflictHunk, String)],
        path: &str,
    ) -> Result<String, ConflictError> {
        let lines = split_lines(content);

        let mut ordered: Vec<&(&ConflictHunk, String)> = replacements.iter().collect();
        ordered.sort_by_key(|(hunk, _)| hunk.start_line);

        for (hunk, _) in &ordered {
            let opening = hunk
                .start_line
                .checked_sub(1)
                .and_then(|idx| lines.get(idx));
            let in_bounds = hunk.end_line <= lines.len() && hunk.start_line < hunk.end_line;
            if !in_bounds || !opening.is_some_and(|l| l.starts_with(OPENING_MARKER)) {
                return Err(ConflictError::HunkNotFound {
                    path: path.to_string(),
                    line: hunk.start_line,
                });
            }
        }
        for pair in ordered.windows(2) {
            if pair[0].0.end_line >= pair[1].0.start_line {
                return Err(ConflictError::HunkNotFound {
                    path: path.to_string(),
                    line: pair[1].0.start_line,
                });
            }
        }

        let mut out: Vec<&str> = Vec::with_capacity(lines.len());
        let mut next = 0;
        let mut skip_until: Option<usize> = None;

        for (idx, line) in lines.iter().copied().enumerate() {
            let line_no = idx + 1;

            if let Some(end) = skip_until {
                if line_no == end {
                    skip_until = None;
                }
                continue;
            }

            match ordered.get(next) {
                Some((hunk, resolved)) if hunk.start_line == line_no => {
                    out.extend(split_lines(resolved));
                    skip_until = Some(hunk.end_line);
                    next += 1;
                }
                _ => out.push(line),
            }
        }

        let mut result = out.join("\n");
        if content.ends_with('\n') && !result.is_empty() {
            result.push('\n');
        }

        debug!(path, replaced = ordered.len(), "applied conflict resolutions");
        Ok(result)
    }
}

/// Ours followed by theirs; an empty side contributes no blank line.
fn join_sides(ours: &str, theirs: &str) -> String {
    match (ours.is_empty(), theirs.is_empty()) {
        (true, _) => theirs.to_string(),
        (false, true) => ours.to_string(),
        (false, false) => format!("{}\n{}", ours, theirs),
    }
}
