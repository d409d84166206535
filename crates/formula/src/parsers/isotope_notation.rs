//! Rewrites isotopes written as `[2]H3` into the canonical `[2H3]` form, leaving everything else untouched

use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use nom::{
    branch::alt,
    character::complete::{anychar, char, digit1},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, tuple},
};

use super::{
    errors::ParseResult,
    primitives::{lowercase, uppercase},
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Token<'s> {
    Isotope {
        mass_number: &'s str,
        symbol: &'s str,
        count: Option<&'s str>,
    },
    Verbatim(&'s str),
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isotope {
                mass_number,
                symbol,
                count,
            } => write!(f, "[{mass_number}{symbol}{}]", count.unwrap_or_default()),
            Self::Verbatim(text) => write!(f, "{text}"),
        }
    }
}

// Public API ==========================================================================================================

/// Rewrites every `[<digits>]<Element>[<digits>]` occurrence as `[<digits><Element>[<digits>]]`
///
/// The text is never validated: anything that isn't an isotope in the `[2]H3` notation is copied through unchanged, so
/// already-canonical formulae (and even garbage) come back as they went in. That also makes normalization idempotent.
pub fn normalize_isotope_notation(formula: impl AsRef<str>) -> String {
    let formula = formula.as_ref();
    // NOTE: `verbatim` accepts any character, so the only way `tokens` can fail is on a bug, in which case the input
    // is passed through as-is
    tokens(formula).map_or_else(|_| formula.to_owned(), |(_, tokens)| tokens.iter().join(""))
}

// Tokenizer ===========================================================================================================

/// Tokens = { External Isotope | any character } ;
fn tokens(i: &str) -> ParseResult<Vec<Token>> {
    many0(alt((external_isotope, verbatim)))(i)
}

/// External Isotope = "[" , digit , { digit } , "]" , Symbol , [ digit , { digit } ] ;
fn external_isotope(i: &str) -> ParseResult<Token> {
    let mass_number = delimited(char('['), digit1, char(']'));
    map(
        tuple((mass_number, symbol, opt(digit1))),
        |(mass_number, symbol, count)| Token::Isotope {
            mass_number,
            symbol,
            count,
        },
    )(i)
}

/// Symbol = uppercase , { lowercase } ;
// NOTE: Looser than an element symbol, so `[2]Hxx` becomes `[2Hxx]` and is rejected whole by the formula parser
fn symbol(i: &str) -> ParseResult<&str> {
    recognize(pair(uppercase, many0(lowercase)))(i)
}

fn verbatim(i: &str) -> ParseResult<Token> {
    map(recognize(anychar), Token::Verbatim)(i)
}
