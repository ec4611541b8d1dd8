//! Channel names and membership entries.

use std::fmt;

/// Normalize a user-supplied channel name.
///
/// Surrounding whitespace is trimmed and a missing `#` is added. Returns
/// `None` for an empty name.
pub fn normalize_channel(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        None
    } else if name.starts_with('#') {
        Some(name.to_string())
    } else {
        Some(format!("#{}", name))
    }
}

/// Channel rank decoded from a NAMES prefix sigil.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MemberRank {
    /// `~`
    Owner,
    /// `&`
    Admin,
    /// `@`
    Op,
    /// `%`
    HalfOp,
    /// `+`
    Voice,
    /// No sigil.
    Regular,
}

impl MemberRank {
    /// Rank for a NAMES sigil, if `c` is one.
    pub fn from_sigil(c: char) -> Option<MemberRank> {
        match c {
            '~' => Some(MemberRank::Owner),
            '&' => Some(MemberRank::Admin),
            '@' => Some(MemberRank::Op),
            '%' => Some(MemberRank::HalfOp),
            '+' => Some(MemberRank::Voice),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemberRank::Owner => "owner",
            MemberRank::Admin => "admin",
            MemberRank::Op => "op",
            MemberRank::HalfOp => "halfop",
            MemberRank::Voice => "voice",
            MemberRank::Regular => "regular",
        };
        f.write_str(name)
    }
}

/// One member from a `353 RPL_NAMREPLY` line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamesEntry {
    pub nick: String,
    pub rank: MemberRank,
}

impl NamesEntry {
    /// Decode `@nick`, `+nick`, `nick`, ...
    ///
    /// Only the first sigil is significant; with `multi-prefix` any further
    /// sigils remain part of the nick as sent.
    pub fn parse(raw: &str) -> NamesEntry {
        let mut chars = raw.chars();
        match chars.next().and_then(MemberRank::from_sigil) {
            Some(rank) => NamesEntry {
                nick: chars.as_str().to_string(),
                rank,
            },
            None => NamesEntry {
                nick: raw.to_string(),
                rank: MemberRank::Regular,
            },
        }
    }
}

/// Decode the space-separated member list of a NAMES reply.
pub fn parse_names_reply(list: &str) -> impl Iterator<Item = NamesEntry> + '_ {
    list.split(' ')
        .filter(|entry| !entry.is_empty())
        .map(NamesEntry::parse)
}

/// Ban mask for `nick_or_mask`: a bare nick becomes `nick!*@*`, anything
/// already containing `!` or `@` is used verbatim.
pub fn ban_mask_for(nick_or_mask: &str) -> Option<String> {
    let value = nick_or_mask.trim();
    if value.is_empty() {
        None
    } else if value.contains('!') || value.contains('@') {
        Some(value.to_string())
    } else {
        Some(format!("{}!*@*", value))
    }
}
