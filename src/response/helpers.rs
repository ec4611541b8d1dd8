//! Helper methods and trait implementations for IRC response codes.

use super::Response;
use crate::message::ParsedLine;
use std::str::FromStr;

impl Response {
    /// Returns the numeric code as u16
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Creates a Response from a numeric code
    pub fn from_code(code: u16) -> Option<Response> {
        let resp = match code {
            1 => Response::RPL_WELCOME,
            221 => Response::RPL_UMODEIS,
            311 => Response::RPL_WHOISUSER,
            312 => Response::RPL_WHOISSERVER,
            313 => Response::RPL_WHOISOPERATOR,
            317 => Response::RPL_WHOISIDLE,
            318 => Response::RPL_ENDOFWHOIS,
            319 => Response::RPL_WHOISCHANNELS,
            324 => Response::RPL_CHANNELMODEIS,
            330 => Response::RPL_WHOISACCOUNT,
            331 => Response::RPL_NOTOPIC,
            332 => Response::RPL_TOPIC,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            367 => Response::RPL_BANLIST,
            368 => Response::RPL_ENDOFBANLIST,
            376 => Response::RPL_ENDOFMOTD,
            401 => Response::ERR_NOSUCHNICK,
            403 => Response::ERR_NOSUCHCHANNEL,
            422 => Response::ERR_NOMOTD,
            441 => Response::ERR_USERNOTINCHANNEL,
            442 => Response::ERR_NOTONCHANNEL,
            472 => Response::ERR_UNKNOWNMODE,
            482 => Response::ERR_CHANOPRIVSNEEDED,
            671 => Response::RPL_WHOISSECURE,
            696 => Response::ERR_INVALIDMODEPARAM,
            _ => return None,
        };
        Some(resp)
    }

    /// The known numeric carried by `line`, if any.
    ///
    /// Numerics are exactly three ASCII digits.
    pub fn from_line(line: &ParsedLine) -> Option<Response> {
        let command = line.command.as_str();
        if command.len() != 3 || !command.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        command.parse().ok()
    }

    /// Check if this is an error response
    #[inline]
    pub fn is_error(&self) -> bool {
        let code = self.code();
        (400..600).contains(&code) || code == 696
    }

    /// Whether this numeric marks the end of registration
    /// (welcome, end of MOTD, or missing MOTD).
    #[inline]
    pub fn is_registration_signal(&self) -> bool {
        matches!(
            self,
            Response::RPL_WELCOME | Response::RPL_ENDOFMOTD | Response::ERR_NOMOTD
        )
    }

    /// Check if this is a WHOIS-related response
    #[inline]
    pub fn is_whois_related(&self) -> bool {
        matches!(
            self,
            Response::RPL_WHOISUSER
                | Response::RPL_WHOISSERVER
                | Response::RPL_WHOISOPERATOR
                | Response::RPL_WHOISIDLE
                | Response::RPL_ENDOFWHOIS
                | Response::RPL_WHOISCHANNELS
                | Response::RPL_WHOISACCOUNT
                | Response::RPL_WHOISSECURE
        )
    }
}

impl FromStr for Response {
    type Err = ParseResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: u16 = s.parse().map_err(|_| ParseResponseError::InvalidFormat)?;
        Response::from_code(code).ok_or(ParseResponseError::UnknownCode(code))
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Error when parsing a response code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseResponseError {
    /// The string was not a valid number
    #[error("invalid response code format")]
    InvalidFormat,
    /// The numeric code is not a known response
    #[error("unknown response code: {0}")]
    UnknownCode(u16),
}
