//! RFC 1459/2812 and IRCv3 compliance tests for the line codec.
//!
//! This module tests specific edge cases and requirements from:
//! - RFC 1459: Internet Relay Chat Protocol
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - IRCv3 Message Tags: https://ircv3.net/specs/extensions/message-tags
//!
//! Run with: `cargo test --test rfc_ircv3_compliance`

use slirc_client::message::{escape_tag_value, unescape_tag_value};
use slirc_client::{build_command, build_tag_string, with_tags, ParsedLine};

// =============================================================================
// IRCv3 MESSAGE TAGS ESCAPING (https://ircv3.net/specs/extensions/message-tags)
// =============================================================================

mod tag_escaping {
    use super::*;

    /// IRCv3 specifies these escape sequences:
    /// - `\:` → `;` (semicolon)
    /// - `\s` → ` ` (space)
    /// - `\\` → `\` (backslash)
    /// - `\r` → CR (carriage return)
    /// - `\n` → LF (line feed)
    #[test]
    fn test_unescape_semicolon() {
        assert_eq!(unescape_tag_value("a\\:b"), "a;b");
    }

    #[test]
    fn test_unescape_combined() {
        let input = "a\\:b\\sc\\\\d\\re\\nf";
        let expected = "a;b c\\d\re\nf";
        assert_eq!(unescape_tag_value(input), expected);
    }

    #[test]
    fn test_unescape_trailing_backslash_is_kept() {
        assert_eq!(unescape_tag_value("test\\"), "test\\");
    }

    #[test]
    fn test_unescape_unknown_escape() {
        // Unknown escape sequences: \x becomes x (backslash dropped)
        assert_eq!(unescape_tag_value("a\\xb"), "axb");
    }

    #[test]
    fn test_escape_roundtrip() {
        let test_values = [
            "simple",
            "with space",
            "with;semicolon",
            "with\\backslash",
            "with\nnewline",
            "with\rcarriage",
            "complex; \\ \n \r all",
            "ends with backslash\\",
        ];

        for original in test_values {
            let escaped = escape_tag_value(original);
            let unescaped = unescape_tag_value(&escaped);
            assert_eq!(
                unescaped, original,
                "Roundtrip failed: '{}' -> '{}' -> '{}'",
                original, escaped, unescaped
            );
        }
    }
}

// =============================================================================
// IRCv3 TAG PARSING IN MESSAGES
// =============================================================================

mod tag_parsing {
    use super::*;

    #[test]
    fn test_tag_with_escaped_semicolon() {
        let line = ParsedLine::parse("@key=value\\:with\\:semicolons :nick PRIVMSG #ch :hi");
        assert_eq!(line.tag("key"), Some("value;with;semicolons"));
    }

    #[test]
    fn test_tag_with_escaped_spaces() {
        let line = ParsedLine::parse("@key=hello\\sworld :nick PRIVMSG #ch :hi");
        assert_eq!(line.tag("key"), Some("hello world"));
    }

    #[test]
    fn test_tag_without_value() {
        // Flag-style tags carry the empty string
        let line = ParsedLine::parse("@+typing :nick PRIVMSG #ch :hi");
        assert_eq!(line.tag("+typing"), Some(""));
        assert_eq!(line.tag_any(&["+typing"]), None);
    }

    #[test]
    fn test_multiple_tags_mixed() {
        let line =
            ParsedLine::parse("@+typing;time=2023-01-01T00:00:00Z;msgid=abc :nick PRIVMSG #ch :hi");
        assert_eq!(line.tags.len(), 3);
        assert_eq!(line.tag("time"), Some("2023-01-01T00:00:00Z"));
        assert_eq!(line.tag("msgid"), Some("abc"));
    }

    #[test]
    fn test_client_only_tag_prefix() {
        let line = ParsedLine::parse("@+example.com/custom=value :nick PRIVMSG #ch :hi");
        assert_eq!(line.tag("+example.com/custom"), Some("value"));
    }

    #[test]
    fn test_vendor_prefixed_tag() {
        let line = ParsedLine::parse("@example.com/foo=bar :nick PRIVMSG #ch :hi");
        assert_eq!(line.tag("example.com/foo"), Some("bar"));
    }

    #[test]
    fn test_empty_tag_set_omits_block() {
        let tags = build_tag_string([("msgid", None::<&str>), ("label", None)]);
        assert_eq!(tags, "");
        assert_eq!(with_tags(&tags, "PING :x"), "PING :x");
    }

    #[test]
    fn test_built_tags_parse_back() {
        let tags = build_tag_string([("+draft/reply", Some("abc;1")), ("skip", None)]);
        let line = with_tags(&tags, "TAGMSG #ch");
        assert_eq!(line, "@+draft/reply=abc\\:1 TAGMSG #ch");
        assert_eq!(ParsedLine::parse(&line).tag("+draft/reply"), Some("abc;1"));
    }
}

// =============================================================================
// RFC 1459/2812 MESSAGE FORMAT
// =============================================================================

mod message_format {
    use super::*;

    #[test]
    fn test_long_line_still_parses() {
        let long_text = "a".repeat(600);
        let line = ParsedLine::parse(&format!("PRIVMSG #ch :{}\r\n", long_text));
        assert_eq!(line.trailing.len(), 600);
    }

    #[test]
    fn test_line_endings() {
        for raw in ["PING :server\r\n", "PING :server\n", "PING :server"] {
            let line = ParsedLine::parse(raw);
            assert_eq!(line.command, "PING");
            assert_eq!(line.trailing, "server");
        }
    }

    #[test]
    fn test_empty_trailing_parameter() {
        let line = ParsedLine::parse("PRIVMSG #channel :");
        assert_eq!(line.params, vec!["#channel"]);
        assert_eq!(line.trailing, "");
    }

    #[test]
    fn test_trailing_preserves_leading_colon() {
        // Double colon at start of trailing: the second colon is literal
        let line = ParsedLine::parse("PRIVMSG #ch ::starts with colon");
        assert_eq!(line.trailing, ":starts with colon");
    }

    #[test]
    fn test_numeric_command() {
        let line = ParsedLine::parse(":server 001 nick :Welcome to the network");
        assert_eq!(line.command, "001");
        assert_eq!(line.param(0), "nick");
    }

    #[test]
    fn test_many_params() {
        let line = ParsedLine::parse("CMD 1 2 3 4 5 6 7 8 9 10 11 12 13 14 :15th trailing");
        assert_eq!(line.params.len(), 14);
        assert_eq!(line.param(13), "14");
        assert_eq!(line.trailing, "15th trailing");
        assert_eq!(line.param(20), "");
    }

    #[test]
    fn test_command_case_is_preserved_but_matched_loosely() {
        let line = ParsedLine::parse(":n!u@h privmsg #ch :hi");
        assert_eq!(line.command, "privmsg");
        assert!(line.is("PRIVMSG"));
    }

    #[test]
    fn test_build_command_shapes() {
        assert_eq!(build_command("PRIVMSG", &["#ch"], Some("hi there")), "PRIVMSG #ch :hi there");
        assert_eq!(build_command("TOPIC", &["#ch"], Some("")), "TOPIC #ch :");
        assert_eq!(build_command("MODE", &["#ch", "", "+b"], None), "MODE #ch +b");
    }
}

// =============================================================================
// PREFIX PARSING (RFC 2812 Section 2.3.1)
// =============================================================================

mod prefix_parsing {
    use super::*;

    #[test]
    fn test_full_user_prefix() {
        let line = ParsedLine::parse(":nick!user@host.example.com PRIVMSG #ch :hi");
        assert_eq!(line.prefix.as_deref(), Some("nick!user@host.example.com"));
        assert_eq!(line.nickname(), "nick");
    }

    #[test]
    fn test_nick_only_prefix() {
        let line = ParsedLine::parse(":nick PRIVMSG #ch :hi");
        assert_eq!(line.nickname(), "nick");
    }

    #[test]
    fn test_server_prefix() {
        let line = ParsedLine::parse(":irc.example.com 001 nick :Welcome");
        assert_eq!(line.nickname(), "irc.example.com");
    }

    #[test]
    fn test_no_prefix() {
        let line = ParsedLine::parse("PING :server");
        assert_eq!(line.prefix, None);
        assert_eq!(line.nickname(), "");
    }

    #[test]
    fn test_ipv6_host() {
        let line = ParsedLine::parse(":nick!user@2001:db8::1 PRIVMSG #ch :hi");
        assert_eq!(line.nickname(), "nick");
        assert_eq!(line.param(0), "#ch");
    }
}

// =============================================================================
// UTF-8 HANDLING (IRCv3 implies UTF-8)
// =============================================================================

mod utf8_handling {
    use super::*;

    #[test]
    fn test_utf8_in_message() {
        let line = ParsedLine::parse(":nick PRIVMSG #ch :Hello 世界 🌍");
        assert_eq!(line.trailing, "Hello 世界 🌍");
    }

    #[test]
    fn test_utf8_in_nick() {
        let line = ParsedLine::parse(":Ñoño!user@host PRIVMSG #ch :hi");
        assert_eq!(line.nickname(), "Ñoño");
    }

    #[test]
    fn test_utf8_in_tag_value() {
        let line = ParsedLine::parse("@label=föö :nick PRIVMSG #ch :hi");
        assert_eq!(line.tag("label"), Some("föö"));
    }
}

// =============================================================================
// EDGE CASES
// =============================================================================

mod edge_cases {
    use super::*;

    #[test]
    fn test_empty_line_is_low_information() {
        for raw in ["", "   ", "\r\n"] {
            let line = ParsedLine::parse(raw);
            assert_eq!(line.command, "");
            assert!(line.params.is_empty());
            assert_eq!(line.trailing, "");
        }
    }

    #[test]
    fn test_multiple_consecutive_spaces() {
        let line = ParsedLine::parse(":nick  PRIVMSG  #ch  :hello");
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#ch"]);
        assert_eq!(line.trailing, "hello");
    }

    #[test]
    fn test_very_long_nick() {
        let long_nick = "a".repeat(100);
        let line = ParsedLine::parse(&format!(":{}!user@host PRIVMSG #ch :hi", long_nick));
        assert_eq!(line.nickname(), long_nick);
    }

    #[test]
    fn test_trailing_only_colon() {
        let line = ParsedLine::parse("PRIVMSG #ch ::");
        assert_eq!(line.trailing, ":");
    }

    #[test]
    fn test_control_characters_are_accepted() {
        let line = ParsedLine::parse(":n!u@h PRIVMSG #ch :\u{1}ACTION waves\u{1}");
        assert_eq!(line.trailing, "\u{1}ACTION waves\u{1}");
    }

    #[test]
    fn test_parse_via_from_str() {
        let line: ParsedLine = "PING :x".parse().unwrap();
        assert_eq!(line.command, "PING");
    }
}
