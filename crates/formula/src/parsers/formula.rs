use nom::{
    branch::alt,
    character::complete::char,
    combinator::{cut, map},
    multi::many1,
    sequence::{delimited, pair, tuple},
    Err,
};

use crate::{AtomicDatabase, Atom, Count};

use super::{
    errors::{expect, FormulaErrorKind, ParseError, ParseResult},
    primitives::{element_symbol, mass_number, optional_count},
};

/// Formula = { Atomic Offset }- ;
pub(crate) fn formula<'a, 's>(
    db: &'a AtomicDatabase,
) -> impl FnMut(&'s str) -> ParseResult<'s, Vec<(Atom, Count)>> {
    many1(atomic_offset(db))
}

/// Atomic Offset = ( Element | Isotope ) , [ Count ] ;
fn atomic_offset<'a, 's>(db: &'a AtomicDatabase) -> impl FnMut(&'s str) -> ParseResult<'s, (Atom, Count)> {
    let element_offset = pair(element(db), optional_count);
    let mut isotope_offset = pair(isotope(db), optional_count);
    let isotope_offset = move |i| {
        let (rest, ((atom, inner), outer)) = isotope_offset(i)?;
        let count = inner.checked_mul(outer).ok_or_else(|| {
            let kind = FormulaErrorKind::CountOverflow(atom.to_string());
            Err::Failure(ParseError::new(i, kind).with_length(i.len() - rest.len()))
        })?;
        Ok((rest, (atom, count)))
    };
    expect(alt((element_offset, isotope_offset)), FormulaErrorKind::ExpectedAtom)
}

/// Element = Element Symbol ;
fn element<'a, 's>(db: &'a AtomicDatabase) -> impl FnMut(&'s str) -> ParseResult<'s, Atom> {
    map(known_symbol(db, FormulaErrorKind::ExpectedElementSymbol), Atom::element)
}

/// Isotope = "[" , Mass Number , Element Symbol , [ Count ] , "]" ;
fn isotope<'a, 's>(db: &'a AtomicDatabase) -> impl FnMut(&'s str) -> ParseResult<'s, (Atom, Count)> {
    let symbol = known_symbol(db, FormulaErrorKind::ExpectedIsotopeSymbol);
    let contents = tuple((cut(mass_number), cut(symbol), optional_count));
    let close = cut(expect(char(']'), FormulaErrorKind::ExpectedIsotopeEnd));
    map(
        delimited(char('['), contents, close),
        |(mass_number, symbol, count)| (Atom::isotope(symbol, mass_number), count),
    )
}

// NOTE: A well-formed symbol missing from the database can't be anything else, so that's a failure, not an error
fn known_symbol<'a, 's>(
    db: &'a AtomicDatabase,
    expected: FormulaErrorKind,
) -> impl FnMut(&'s str) -> ParseResult<'s, &'s str> {
    move |i| {
        let (rest, symbol) = expect(element_symbol, expected.clone())(i)?;
        if db.contains_element(symbol) {
            Ok((rest, symbol))
        } else {
            let kind = FormulaErrorKind::UnknownElement(symbol.to_owned());
            Err(Err::Failure(ParseError::new(i, kind).with_length(symbol.len())))
        }
    }
}
