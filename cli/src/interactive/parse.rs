use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{digit1, hex_digit1, oct_digit1, one_of};
use nom::combinator::{all_consuming, map_res, recognize};
use nom::error::{convert_error, VerboseError};
use nom::multi::many1;
use nom::sequence::preceded;
use nom::{Finish, IResult};
use thiserror::Error;

/// An unsigned 32-bit literal in decimal, hex (`0x`), octal (`0o`) or binary
/// (`0b`) notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal(pub u32);

#[derive(Debug, Error)]
#[error("could not parse literal: {0}")]
pub struct ParseLiteralError(String);

impl FromStr for Literal {
    type Err = ParseLiteralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, value) = all_consuming(parse_literal)(s)
            .finish()
            .map_err(|e| ParseLiteralError(convert_error(s, e)))?;
        Ok(Literal(value))
    }
}

fn parse_hex(input: &str) -> IResult<&str, u32, VerboseError<&str>> {
    preceded(
        tag_no_case("0x"),
        map_res(hex_digit1, |s| u32::from_str_radix(s, 16)),
    )(input)
}

fn parse_oct(input: &str) -> IResult<&str, u32, VerboseError<&str>> {
    preceded(
        tag_no_case("0o"),
        map_res(oct_digit1, |s| u32::from_str_radix(s, 8)),
    )(input)
}

fn parse_bin(input: &str) -> IResult<&str, u32, VerboseError<&str>> {
    preceded(
        tag_no_case("0b"),
        map_res(recognize(many1(one_of("01"))), |s: &str| {
            u32::from_str_radix(s, 2)
        }),
    )(input)
}

fn parse_dec(input: &str) -> IResult<&str, u32, VerboseError<&str>> {
    map_res(digit1, str::parse)(input)
}

fn parse_literal(input: &str) -> IResult<&str, u32, VerboseError<&str>> {
    alt((parse_hex, parse_oct, parse_bin, parse_dec))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_radix() {
        assert_eq!("42".parse::<Literal>().unwrap(), Literal(42));
        assert_eq!(
            "0x1f880000".parse::<Literal>().unwrap(),
            Literal(0x1f88_0000)
        );
        assert_eq!("0o777".parse::<Literal>().unwrap(), Literal(0o777));
        assert_eq!("0b1010".parse::<Literal>().unwrap(), Literal(0b1010));
    }

    #[test]
    fn rejects_invalid_input() {
        assert!("".parse::<Literal>().is_err());
        assert!("0x".parse::<Literal>().is_err());
        assert!("12junk".parse::<Literal>().is_err());
        // One past u32::MAX
        assert!("4294967296".parse::<Literal>().is_err());
    }
}
