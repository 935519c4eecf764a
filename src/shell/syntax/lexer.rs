//! Word splitting over raw bytes. Words are handed on as `OsString`, so
//! file names and arguments reach exec byte for byte, UTF-8 or not.
use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

use nom::branch::alt;
use nom::bytes::complete::{take, take_while, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::map;
use nom::multi::{fold_many0, fold_many1, separated_list0};
use nom::sequence::{delimited, preceded};
use nom::IResult;

use super::super::error::{Error, Result};

// the same set nom's multispace parsers skip
fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\r' || b == b'\n'
}

fn is_special(b: u8) -> bool {
    is_blank(b) || b == b'"' || b == b'\'' || b == b'\\'
}

fn append(mut acc: Vec<u8>, piece: Vec<u8>) -> Vec<u8> {
    acc.extend_from_slice(&piece);
    acc
}

fn bare(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(take_while1(|b: u8| !is_special(b)), |s: &[u8]| s.to_vec())(input)
}

fn escaped(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(preceded(char('\\'), take(1usize)), |s: &[u8]| s.to_vec())(input)
}

fn single_quoted(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(
        delimited(char('\''), take_while(|b: u8| b != b'\''), char('\'')),
        |s: &[u8]| s.to_vec(),
    )(input)
}

fn double_quoted(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let run = map(take_while1(|b: u8| b != b'"' && b != b'\\'), |s: &[u8]| s.to_vec());
    delimited(
        char('"'),
        fold_many0(alt((run, escaped)), Vec::new, append),
        char('"'),
    )(input)
}

/// One shell word: adjacent bare, escaped and quoted pieces glued together.
fn word(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    fold_many1(
        alt((bare, escaped, single_quoted, double_quoted)),
        Vec::new,
        append,
    )(input)
}

fn words(input: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
    delimited(multispace0, separated_list0(multispace1, word), multispace0)(input)
}

/// Split a line into words.
pub fn lex(line: &[u8]) -> Result<Vec<OsString>> {
    match words(line) {
        Ok((remaining, tokens)) => {
            if remaining.is_empty() {
                Ok(tokens.into_iter().map(OsString::from_vec).collect())
            } else if remaining[0] == b'\\' {
                Err(Error::Lex(String::from("dangling escape at end of line")))
            } else {
                let text = String::from_utf8_lossy(remaining);
                Err(Error::Lex(format!("unterminated quote `{}`", text.trim_end())))
            }
        }
        Err(e) => Err(Error::Lex(format!("{:?}", e))),
    }
}
