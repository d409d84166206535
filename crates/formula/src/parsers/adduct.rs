use nom::{character::complete::char, sequence::{pair, preceded}};

use crate::OffsetKind;

use super::{
    errors::ParseResult,
    primitives::{element_symbol, offset_kind},
};

/// Adduct = "M" , Offset Kind , Element Symbol ;
pub(crate) fn adduct(i: &str) -> ParseResult<(OffsetKind, &str)> {
    preceded(char('M'), pair(offset_kind, element_symbol))(i)
}
