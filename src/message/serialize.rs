//! Outbound line assembly.

use crate::error::ProtocolError;

use super::MAX_IRC_LINE_LEN;

/// Join `command` and `params` with single spaces, appending ` :trailing`
/// only when a trailing parameter is given.
///
/// `Some("")` and `None` are distinct: the former emits an explicit empty
/// trailing parameter (`TOPIC #chan :` clears a topic).
pub fn build_command<S: AsRef<str>>(command: &str, params: &[S], trailing: Option<&str>) -> String {
    let mut line = String::from(command);
    for param in params {
        let param = param.as_ref();
        if param.is_empty() {
            continue;
        }
        line.push(' ');
        line.push_str(param);
    }
    if let Some(trailing) = trailing {
        line.push_str(" :");
        line.push_str(trailing);
    }
    line
}

/// Prefix `line` with an `@tags` block, or return it untouched when
/// `tag_string` is empty.
pub fn with_tags(tag_string: &str, line: &str) -> String {
    if tag_string.is_empty() {
        line.to_string()
    } else {
        format!("@{} {}", tag_string, line)
    }
}

/// Check that `line` can go on the wire as a single line.
///
/// CR, LF and NUL are refused anywhere in the line rather than truncated or
/// stripped, as is a line longer than [`MAX_IRC_LINE_LEN`] bytes.
pub fn check_outbound(line: &str) -> Result<(), ProtocolError> {
    if let Some(c) = line.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
        return Err(ProtocolError::IllegalControlChar(c));
    }
    if line.len() > MAX_IRC_LINE_LEN {
        return Err(ProtocolError::MessageTooLong(line.len()));
    }
    Ok(())
}
