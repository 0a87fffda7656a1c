//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Label for our side of a conflict (green).
pub fn ours(label: &str) -> String {
    let style = Style::new().green().bold();
    style.apply_to(format!("ours ({})", label)).to_string()
}

/// Label for the incoming side of a conflict (blue).
pub fn theirs(label: &str) -> String {
    let style = Style::new().blue().bold();
    style.apply_to(format!("theirs ({})", label)).to_string()
}

/// Label for the common-ancestor section (magenta).
pub fn base() -> String {
    let style = Style::new().magenta().bold();
    style.apply_to("base").to_string()
}

/// Operation indicator: in progress (yellow dot) or idle (dim dot).
pub fn operation(name: &str, active: bool) -> String {
    if active {
        format!("{} {}", Style::new().yellow().apply_to("●"), name)
    } else {
        format!("{} {}", Style::new().dim().apply_to("○"), name)
    }
}
