use nom::{
    character::complete::{char, one_of, satisfy, u32},
    combinator::{cut, map, map_opt, not, opt, recognize},
    sequence::{pair, preceded},
};

use crate::{Count, MassNumber, OffsetKind};

use super::errors::{expect, FormulaErrorKind, ParseResult};

/// uppercase = "A" | "B" | ... | "Z" ;
pub(crate) fn uppercase(i: &str) -> ParseResult<char> {
    satisfy(|c| c.is_ascii_uppercase())(i)
}

/// lowercase = "a" | "b" | ... | "z" ;
pub(crate) fn lowercase(i: &str) -> ParseResult<char> {
    satisfy(|c| c.is_ascii_lowercase())(i)
}

/// Element Symbol = uppercase , [ lowercase ] ;
pub(crate) fn element_symbol(i: &str) -> ParseResult<&str> {
    let parser = recognize(pair(uppercase, opt(lowercase)));
    expect(parser, FormulaErrorKind::ExpectedElementSymbol)(i)
}

/// Count = digit - "0" , { digit } ;
pub(crate) fn count(i: &str) -> ParseResult<Count> {
    let not_zero = cut(expect(not(char('0')), FormulaErrorKind::LeadingZero));
    map_opt(preceded(not_zero, u32), Count::new)(i)
}

/// Optional Count = [ Count ] ;
pub(crate) fn optional_count(i: &str) -> ParseResult<Count> {
    map(opt(count), Option::unwrap_or_default)(i)
}

/// Mass Number = digit - "0" , { digit } ;
pub(crate) fn mass_number(i: &str) -> ParseResult<MassNumber> {
    let parser = map_opt(preceded(not(char('0')), u32), MassNumber::new);
    expect(parser, FormulaErrorKind::ExpectedMassNumber)(i)
}

/// Offset Kind = "+" | "-" ;
pub(crate) fn offset_kind(i: &str) -> ParseResult<OffsetKind> {
    map(one_of("+-"), |c| {
        if c == '+' {
            OffsetKind::Add
        } else {
            OffsetKind::Remove
        }
    })(i)
}

#[cfg(test)]
mod tests {
    use nom::Err;

    use super::*;

    #[test]
    fn test_element_symbol() {
        // Valid Symbols
        assert_eq!(element_symbol("H"), Ok(("", "H")));
        assert_eq!(element_symbol("Na"), Ok(("", "Na")));
        assert_eq!(element_symbol("NaCl"), Ok(("Cl", "Na")));
        assert_eq!(element_symbol("HG"), Ok(("G", "H")));
        assert_eq!(element_symbol("H2O"), Ok(("2O", "H")));
        // Invalid Symbols
        for input in ["h", "2H", "[2H]", "", "+H"] {
            let Err(Err::Error(error)) = element_symbol(input) else {
                panic!("{input:?} should not be an element symbol");
            };
            assert_eq!(error.kind(), &FormulaErrorKind::ExpectedElementSymbol);
        }
    }

    #[test]
    fn test_count() {
        // Valid Counts
        assert_eq!(count("1"), Ok(("", Count::new(1).unwrap())));
        assert_eq!(count("10"), Ok(("", Count::new(10).unwrap())));
        assert_eq!(count("422"), Ok(("", Count::new(422).unwrap())));
        assert_eq!(count("42HeH"), Ok(("HeH", Count::new(42).unwrap())));
        // Leading Zeroes Are Fatal
        for input in ["0", "01", "00145"] {
            let Err(Err::Failure(error)) = count(input) else {
                panic!("{input:?} should fail to parse");
            };
            assert_eq!(error.kind(), &FormulaErrorKind::LeadingZero);
        }
        // Everything Else Is Recoverable
        for input in ["H", "p", "+H", "[H]", ""] {
            assert!(matches!(count(input), Err(Err::Error(_))));
        }
    }

    #[test]
    fn test_optional_count() {
        assert_eq!(optional_count("3O"), Ok(("O", Count::new(3).unwrap())));
        assert_eq!(optional_count("O"), Ok(("O", Count::default())));
        assert_eq!(optional_count(""), Ok(("", Count::default())));
        assert!(matches!(optional_count("0"), Err(Err::Failure(_))));
    }

    #[test]
    fn test_mass_number() {
        assert_eq!(mass_number("13C"), Ok(("C", MassNumber::new(13).unwrap())));
        assert_eq!(mass_number("2"), Ok(("", MassNumber::new(2).unwrap())));
        for input in ["0", "02H", "H", "]"] {
            let Err(Err::Error(error)) = mass_number(input) else {
                panic!("{input:?} should not be a mass number");
            };
            assert_eq!(error.kind(), &FormulaErrorKind::ExpectedMassNumber);
        }
    }

    #[test]
    fn test_offset_kind() {
        assert_eq!(offset_kind("+"), Ok(("", OffsetKind::Add)));
        assert_eq!(offset_kind("-H"), Ok(("H", OffsetKind::Remove)));
        assert!(offset_kind("p").is_err());
        assert!(offset_kind("H").is_err());
        assert!(offset_kind("").is_err());
    }
}
