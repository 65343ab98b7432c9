//! Text sanitizing for terminal input.
//!
//! Bracketed paste hands over whatever the clipboard holds, including bytes
//! that would corrupt a raw-mode TUI.

/// Rewrites pasted text so it is safe to insert into the input widget:
/// tabs become four spaces, carriage returns become newlines, and all other
/// control characters are dropped.
pub fn sanitize_text_input(text: &str) -> String {
    let mut sanitized = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\t' => sanitized.push_str("    "),
            '\r' => sanitized.push('\n'),
            '\n' => sanitized.push(c),
            _ if !c.is_control() => sanitized.push(c),
            _ => {}
        }
    }

    sanitized
}
