//! Variable Reference Parser
//!
//! Splits template text into literal runs and variable references.
//!
//! # Supported Syntax
//!
//! ```text
//! $name
//! ${name}
//! ${name:format}
//! [[name]]
//! [[name:format]]
//! ```
//!
//! Anything that does not form a complete reference is kept as literal text,
//! so `$`, `${` or `[[` on their own never fail a parse.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::opt,
    sequence::{delimited, pair, preceded},
    IResult,
};

/// A variable reference found in template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableRef<'a> {
    /// Variable name without sigils
    pub name: &'a str,
    /// Explicit format suffix, if any
    pub format: Option<&'a str>,
    /// The reference exactly as written
    pub raw: &'a str,
}

/// A piece of parsed template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Variable(VariableRef<'a>),
}

/// Split `input` into literal and variable segments
pub fn parse_template(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];

        if rest.starts_with('$') || rest.starts_with("[[") {
            if let Ok((remaining, (name, format))) = parse_reference(rest) {
                let end = input.len() - remaining.len();

                if literal_start < pos {
                    segments.push(Segment::Literal(&input[literal_start..pos]));
                }
                segments.push(Segment::Variable(VariableRef {
                    name,
                    format,
                    raw: &input[pos..end],
                }));

                pos = end;
                literal_start = end;
                continue;
            }
        }

        pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
    }

    if literal_start < input.len() {
        segments.push(Segment::Literal(&input[literal_start..]));
    }

    segments
}

type Reference<'a> = (&'a str, Option<&'a str>);

fn parse_reference(input: &str) -> IResult<&str, Reference<'_>> {
    alt((parse_braced, parse_bracketed, parse_bare))(input)
}

/// `${name}` or `${name:format}`
fn parse_braced(input: &str) -> IResult<&str, Reference<'_>> {
    delimited(
        tag("${"),
        pair(
            parse_name,
            opt(preceded(char(':'), take_while1(|c: char| c != '}'))),
        ),
        char('}'),
    )(input)
}

/// `[[name]]` or `[[name:format]]`
fn parse_bracketed(input: &str) -> IResult<&str, Reference<'_>> {
    delimited(
        tag("[["),
        pair(
            parse_name,
            opt(preceded(char(':'), take_while1(|c: char| c != ']'))),
        ),
        tag("]]"),
    )(input)
}

/// `$name`
fn parse_bare(input: &str) -> IResult<&str, Reference<'_>> {
    let (input, name) = preceded(char('$'), parse_name)(input)?;
    Ok((input, (name, None)))
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}
