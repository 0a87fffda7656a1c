//! Renders a parsed hunk into a prompt for an external reasoning consumer.

use crate::models::ConflictHunk;

/// Map a file extension to a fenced-code language tag.
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "sh" | "bash" => "bash",
        "json" => "json",
        "toml" => "toml",
        "yml" | "yaml" => "yaml",
        "md" => "markdown",
        "html" | "htm" => "html",
        "css" => "css",
        "sql" => "sql",
        _ => "",
    }
}

/// Fill the fixed suggestion template for one hunk.
pub fn format_suggestion_prompt(hunk: &ConflictHunk, file_path: &str, extension: &str) -> String {
    let lang = language_for_extension(extension);
    let mut out = String::new();

    out.push_str(&format!("Resolve the merge conflict in `{}`.\n\n", file_path));
    out.push_str(&format!(
        "Conflict lines {}-{}. Ours is `{}`, theirs is `{}`.\n\n",
        hunk.start_line, hunk.end_line, hunk.ours_branch, hunk.theirs_branch
    ));

    push_section(&mut out, "Context before", lang, &hunk.context_before.join("\n"));
    push_section(&mut out, &format!("Ours ({})", hunk.ours_branch), lang, &hunk.ours_content);
    if hunk.is_three_way() {
        push_section(&mut out, "Base (common ancestor)", lang, &hunk.base_content);
    }
    push_section(&mut out, &format!("Theirs ({})", hunk.theirs_branch), lang, &hunk.theirs_content);
    push_section(&mut out, "Context after", lang, &hunk.context_after.join("\n"));

    out.push_str(
        "Reply with a JSON object with keys \"strategy\" (one of \"ours\", \"theirs\", \
         \"both\", \"manual\"), \"content\" (the resolved text, required for \"manual\") \
         and \"explanation\".\n",
    );
    out
}

fn push_section(out: &mut String, title: &str, lang: &str, body: &str) {
    out.push_str(&format!("### {}\n```{}\n{}\n```\n\n", title, lang, body));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::parser::ConflictParser;

    #[test]
    fn test_prompt_contains_both_sides() {
        let content = "fn a() {}\n<<<<<<< HEAD\nlet x = 1;\n=======\nlet x = 2;\n>>>>>>> topic\n";
        let hunk = &ConflictParser::default().parse(content, "src/lib.rs")[0];
        let prompt = format_suggestion_prompt(hunk, "src/lib.rs", "rs");

        assert!(prompt.contains("`src/lib.rs`"));
        assert!(prompt.contains("```rust\nlet x = 1;\n```"));
        assert!(prompt.contains("### Theirs (topic)"));
        assert!(prompt.contains("fn a() {}"));
        assert!(!prompt.contains("Base (common ancestor)"));
    }

    #[test]
    fn test_prompt_includes_base_for_three_way() {
        let content = "<<<<<<< HEAD\na\n||||||| merged common ancestors\no\n=======\nb\n>>>>>>> t\n";
        let hunk = &ConflictParser::default().parse(content, "x.txt")[0];
        let prompt = format_suggestion_prompt(hunk, "x.txt", "txt");
        assert!(prompt.contains("### Base (common ancestor)\n```\no\n```"));
    }

    #[test]
    fn test_language_lookup() {
        assert_eq!(language_for_extension(".PY"), "python");
        assert_eq!(language_for_extension("unknown"), "");
    }
}
