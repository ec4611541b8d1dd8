//! Nom-based line parser.
//!
//! The grammar is deliberately forgiving: every block is optional and the
//! parser consumes whatever it is given, so arbitrary text produces a
//! (possibly low-information) [`ParsedLine`] instead of an error.

use std::collections::HashMap;

use nom::{
    bytes::complete::{take_till, take_till1},
    character::complete::{char, space0},
    combinator::{opt, rest},
    sequence::{preceded, terminated},
    IResult,
};

use super::tags::unescape_tag_value;
use super::ParsedLine;

/// `@tags ` block, without the `@`.
fn tag_block(input: &str) -> IResult<&str, Option<&str>> {
    opt(terminated(
        preceded(char('@'), take_till(|c: char| c == ' ')),
        space0,
    ))(input)
}

/// `:prefix ` block, without the `:`.
fn prefix_block(input: &str) -> IResult<&str, Option<&str>> {
    opt(terminated(
        preceded(char(':'), take_till(|c: char| c == ' ')),
        space0,
    ))(input)
}

/// `:trailing`, verbatim to the end of the line.
fn trailing(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), rest)(input)
}

/// One space-delimited token followed by any run of spaces.
fn middle(input: &str) -> IResult<&str, &str> {
    terminated(take_till1(|c: char| c == ' '), space0)(input)
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn tokens(input: &str) -> IResult<&str, (Vec<&str>, &str)> {
    let mut params = Vec::new();
    let mut cursor = input;
    loop {
        if let Ok((remaining, text)) = trailing(cursor) {
            return Ok((remaining, (params, text)));
        }
        match middle(cursor) {
            Ok((remaining, token)) => {
                params.push(token);
                cursor = remaining;
            }
            Err(_) => return Ok((cursor, (params, ""))),
        }
    }
}

fn components(input: &str) -> IResult<&str, (Option<&str>, Option<&str>, Vec<&str>, &str)> {
    let (input, tags) = tag_block(input)?;
    let (input, prefix) = prefix_block(input)?;
    let (input, (params, text)) = tokens(input)?;
    Ok((input, (tags, prefix, params, text)))
}

pub(super) fn parse_line(raw: &str) -> ParsedLine {
    let cursor = raw.trim_end_matches(['\r', '\n']).trim_start();
    let Ok((_, (tags, prefix, mut params, text))) = components(cursor) else {
        return ParsedLine {
            raw: raw.to_string(),
            ..ParsedLine::default()
        };
    };

    let command = if params.is_empty() {
        String::new()
    } else {
        params.remove(0).to_string()
    };

    ParsedLine {
        raw: raw.to_string(),
        tags: tags.map(parse_tags).unwrap_or_default(),
        prefix: prefix.map(str::to_string),
        command,
        params: params.into_iter().map(str::to_string).collect(),
        trailing: text.to_string(),
    }
}
