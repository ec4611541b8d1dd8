//! IRC numeric replies the client correlates against.
//!
//! Only the numerics that confirm or refuse an operation the client issues
//! are named here; every other numeric is left as a plain command string on
//! the [`ParsedLine`](crate::ParsedLine).
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

mod helpers;

pub use self::helpers::ParseResponseError;

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    // === Connection Registration ===
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 221 - User mode string
    RPL_UMODEIS = 221,

    // === WHOIS ===
    /// 311 - WHOIS user info
    RPL_WHOISUSER = 311,
    /// 312 - WHOIS server info
    RPL_WHOISSERVER = 312,
    /// 313 - WHOIS operator status
    RPL_WHOISOPERATOR = 313,
    /// 317 - WHOIS idle time
    RPL_WHOISIDLE = 317,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS = 318,
    /// 319 - WHOIS channels
    RPL_WHOISCHANNELS = 319,
    /// 330 - WHOIS account name
    RPL_WHOISACCOUNT = 330,
    /// 671 - WHOIS secure connection
    RPL_WHOISSECURE = 671,

    // === Channel ===
    /// 324 - Channel mode is
    RPL_CHANNELMODEIS = 324,
    /// 331 - No topic set
    RPL_NOTOPIC = 331,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 353 - Names reply
    RPL_NAMREPLY = 353,
    /// 366 - End of names
    RPL_ENDOFNAMES = 366,
    /// 367 - Ban list entry
    RPL_BANLIST = 367,
    /// 368 - End of ban list
    RPL_ENDOFBANLIST = 368,

    // === MOTD ===
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 422 - No MOTD
    ERR_NOMOTD = 422,

    // === Errors ===
    /// 401 - No such nick
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 441 - User not in channel
    ERR_USERNOTINCHANNEL = 441,
    /// 442 - Not on channel
    ERR_NOTONCHANNEL = 442,
    /// 472 - Unknown mode character
    ERR_UNKNOWNMODE = 472,
    /// 482 - Channel operator privileges needed
    ERR_CHANOPRIVSNEEDED = 482,
    /// 696 - Invalid mode parameter (also sent for a refused RENAME)
    ERR_INVALIDMODEPARAM = 696,
}

/// Numerics that refuse a channel operation, scoped by `param(1)`.
pub const CHANNEL_REFUSALS: &[Response] = &[
    Response::ERR_CHANOPRIVSNEEDED,
    Response::ERR_NOTONCHANNEL,
    Response::ERR_NOSUCHCHANNEL,
];
