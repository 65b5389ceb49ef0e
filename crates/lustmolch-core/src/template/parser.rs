//! Template parsing built on `nom`.
//!
//! A template is plain text with `{{ key }}` placeholders. Whitespace
//! inside the braces is optional; keys are ASCII letters, digits and `_`.

use lustmolch_common::error::{LustmolchError, Result};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::multispace0,
    combinator::rest,
    sequence::{delimited, pair},
};

/// Opening delimiter of a placeholder.
const OPEN: &str = "{{";

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied verbatim.
    Literal(&'a str),
    /// A `{{ key }}` placeholder.
    Placeholder(&'a str),
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parses `{{ key }}`.
fn placeholder(input: &str) -> IResult<&str, Segment<'_>> {
    let (input, key) = delimited(
        pair(tag(OPEN), multispace0),
        take_while1(is_key_char),
        pair(multispace0, tag("}}")),
    )
    .parse(input)?;
    Ok((input, Segment::Placeholder(key)))
}

/// Parses text up to the next `{{` or the end of input.
fn literal(input: &str) -> IResult<&str, Segment<'_>> {
    let (input, text) = alt((take_until(OPEN), rest)).parse(input)?;
    Ok((input, Segment::Literal(text)))
}

/// Splits template `source` into literal and placeholder segments.
///
/// `name` is only used for error messages.
///
/// # Errors
///
/// Returns [`LustmolchError::Template`] on an unterminated or malformed
/// placeholder.
pub fn parse<'a>(name: &str, source: &'a str) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();
    let mut remaining = source;

    while !remaining.is_empty() {
        let parsed = if remaining.starts_with(OPEN) {
            placeholder(remaining)
        } else {
            literal(remaining)
        };
        let (tail, segment) = parsed.map_err(|_| {
            let line = source[..source.len() - remaining.len()].matches('\n').count() + 1;
            LustmolchError::Template {
                template: name.to_owned(),
                message: format!(
                    "malformed placeholder on line {line} near {:?}",
                    remaining.chars().take(20).collect::<String>()
                ),
            }
        })?;
        segments.push(segment);
        remaining = tail;
    }

    Ok(segments)
}
