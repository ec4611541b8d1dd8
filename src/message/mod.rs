//! Stateless parsing and serialization of single protocol lines.
//!
//! A [`ParsedLine`] is produced for every inbound line and never mutated
//! afterwards. Outbound lines are assembled with [`build_command`] and,
//! when IRCv3 tags are attached, [`build_tag_string`] / [`with_tags`].

mod parse;
mod serialize;
pub mod tags;

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

pub use self::serialize::{build_command, check_outbound, with_tags};
pub use self::tags::{build_tag_string, escape_tag_value, unescape_tag_value};

/// Maximum accepted line length in bytes, tags included.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// One inbound protocol line, split into its parts.
///
/// `command` is always the first token after the optional tag and prefix
/// blocks; `params` holds the middle parameters and `trailing` the text after
/// the first ` :` verbatim (empty when absent).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedLine {
    /// The line exactly as received.
    pub raw: String,
    /// Unescaped IRCv3 tags. A key without `=` maps to the empty string.
    pub tags: HashMap<String, String>,
    /// Source prefix without the leading `:`.
    pub prefix: Option<String>,
    /// Command name or three-digit numeric.
    pub command: String,
    /// Middle parameters, in order.
    pub params: Vec<String>,
    /// Trailing parameter, without the leading `:`.
    pub trailing: String,
}

impl ParsedLine {
    /// Parse a raw line. Never fails: garbage input yields a line with an
    /// empty command and no parameters.
    pub fn parse(raw: &str) -> ParsedLine {
        parse::parse_line(raw)
    }

    /// Middle parameter `index`, or `""` when absent.
    #[inline]
    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map(String::as_str).unwrap_or("")
    }

    /// Tag value for `key`, if the tag is present.
    #[inline]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// First non-empty tag value among `keys`.
    pub fn tag_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.tag(key))
            .find(|value| !value.is_empty())
    }

    /// Nickname of the sender (see [`crate::prefix::parse_nickname`]).
    pub fn nickname(&self) -> &str {
        crate::prefix::parse_nickname(self.prefix.as_deref())
    }

    /// Trailing text, falling back to the middle parameters from `from`
    /// onwards when the server sent no trailing parameter.
    pub fn text_from(&self, from: usize) -> String {
        if !self.trailing.is_empty() {
            return self.trailing.clone();
        }
        self.params
            .get(from..)
            .map(|rest| rest.join(" "))
            .unwrap_or_default()
    }

    /// Whether the command is `name` (commands are compared case-insensitively).
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.command.eq_ignore_ascii_case(name)
    }
}

impl FromStr for ParsedLine {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ParsedLine::parse(s))
    }
}

impl std::fmt::Display for ParsedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
