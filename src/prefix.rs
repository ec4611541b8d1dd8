//! Message source prefixes (`nick!user@host` or a server name).

/// Nickname part of a prefix.
///
/// Everything before the first `!`, the whole prefix when there is no
/// `!`, or `""` when the line carried no prefix.
pub fn parse_nickname(prefix: Option<&str>) -> &str {
    match prefix {
        Some(prefix) => prefix.split_once('!').map_or(prefix, |(nick, _)| nick),
        None => "",
    }
}
