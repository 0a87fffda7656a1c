//! Human-readable rendering of tool results.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use gitmend_core::models::{
    ConflictFile, ConflictHunk, MergeState, NavigationResult, OperationType, ResolutionResult,
};
use gitmend_core::tools::{CommitOutcome, OperationOutcome, StageOutcome, Suggestion};

use crate::style;

pub fn merge_state(state: &MergeState) {
    let active = state.operation != OperationType::None;

    println!();
    println!("{}", style::header("Workspace"));
    println!("{}", "═".repeat(9));
    println!();
    println!("  Branch     {}", state.current_branch);
    println!(
        "  Operation  {}",
        style::operation(&state.operation.to_string(), active)
    );
    if let Some(incoming) = &state.incoming_ref {
        println!("  Incoming   {}", incoming);
    }
    if let (Some(step), Some(total)) = (state.current_step, state.total_steps) {
        println!("  Progress   {}/{}", step, total);
    }
    println!();

    if state.has_conflicts {
        println!(
            "{}",
            style::warn(&format!("{} conflicted file(s)", state.conflict_files.len()))
        );
        for path in &state.conflict_files {
            println!("    {}", path);
        }
    } else if active {
        println!(
            "{}",
            style::success("All conflicts resolved; run 'gitmend continue' to finish")
        );
    } else {
        println!("{}", style::success("No operation in progress"));
    }
    println!();
}

pub fn conflict_list(files: &[ConflictFile]) {
    if files.is_empty() {
        println!();
        println!("{}", style::success("No conflicted files"));
        println!();
        return;
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Conflicted Files ({})", files.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Kind", "Conflicts", "Lines"]);

    for file in files {
        let kind = if file.is_binary {
            Cell::new("binary").fg(Color::Yellow)
        } else {
            Cell::new("text")
        };
        let lines = if file.hunks.is_empty() {
            "—".to_string()
        } else {
            file.hunks
                .iter()
                .map(|h| format!("{}-{}", h.start_line, h.end_line))
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            Cell::new(&file.path),
            kind,
            Cell::new(file.conflict_count),
            Cell::new(lines),
        ]);
    }

    println!("{}", table);
    println!();
}

pub fn conflict_file(file: &ConflictFile) {
    println!();
    if file.hunks.is_empty() {
        println!("{}", style::success(&format!("No conflict markers in {}", file.path)));
        println!();
        return;
    }
    println!(
        "{}",
        style::header(&format!("{} ({} conflict(s))", file.path, file.hunks.len()))
    );
    for (index, hunk) in file.hunks.iter().enumerate() {
        println!();
        hunk_detail(index, hunk);
    }
    println!();
}

fn hunk_detail(index: usize, hunk: &ConflictHunk) {
    println!(
        "  {} {}",
        style::header(&format!("#{}", index)),
        style::dim(&format!("lines {}-{}", hunk.start_line, hunk.end_line))
    );
    for line in &hunk.context_before {
        println!("    {}", style::dim(line));
    }
    println!("  {}", style::ours(&hunk.ours_branch));
    print_block(&hunk.ours_content);
    if hunk.is_three_way() {
        println!("  {}", style::base());
        print_block(&hunk.base_content);
    }
    println!("  {}", style::theirs(&hunk.theirs_branch));
    print_block(&hunk.theirs_content);
    for line in &hunk.context_after {
        println!("    {}", style::dim(line));
    }
}

fn print_block(text: &str) {
    for line in text.lines() {
        println!("    {}", line);
    }
}

pub fn resolution(result: &ResolutionResult) {
    let target = match &result.hunk_id {
        Some(id) => id.clone(),
        None => result.file_path.clone(),
    };
    println!(
        "{}",
        style::success(&format!("Resolved {} using {}", target, result.strategy))
    );
    if result.remaining_conflicts > 0 {
        println!(
            "  {}",
            style::dim(&format!("{} conflict(s) remain", result.remaining_conflicts))
        );
    } else if result.staged {
        println!("  {}", style::dim("file staged"));
    } else {
        println!(
            "{}",
            style::warn("file is clean but could not be staged; run 'gitmend stage'")
        );
    }
}

pub fn navigation(result: &NavigationResult) {
    let (Some(path), Some(index), Some(position), Some(hunk)) = (
        &result.file_path,
        result.hunk_index,
        result.position,
        &result.hunk,
    ) else {
        println!(
            "{}",
            style::dim(&format!("No more conflicts ({} total)", result.total))
        );
        return;
    };

    println!();
    println!(
        "{} {}",
        style::header(&format!("[{}/{}] {}", position, result.total, path)),
        style::dim(&format!("(--file {} --hunk {})", path, index))
    );
    hunk_detail(index, hunk);
    println!();
}

pub fn suggestion(suggestion: &Suggestion) {
    println!("{}", suggestion.prompt);
}

pub fn staged(outcome: &StageOutcome) {
    println!("{}", style::success(&format!("Staged {}", outcome.file_path)));
}

pub fn committed(outcome: &CommitOutcome) {
    println!("{}", style::success(&format!("Committed {}", outcome.commit)));
}

pub fn operation(verb: &str, outcome: &OperationOutcome) {
    println!(
        "{}",
        style::success(&format!("{} {}", outcome.operation, verb))
    );
    if !outcome.output.is_empty() {
        println!("{}", style::dim(&outcome.output));
    }
}
