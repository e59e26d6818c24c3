//! Keeps user-supplied strings single-line when they are interpolated
//! into log records.

/// Longest preview of user text a log line will carry.
const MAX_PREVIEW: usize = 200;

/// Escapes line breaks and other control characters and truncates long
/// input with an ellipsis. Used wherever chat text or usernames from the
/// wire end up in a log record.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
