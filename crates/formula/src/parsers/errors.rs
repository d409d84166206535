use miette::{Diagnostic, SourceSpan};
use nom::{
    error::{ErrorKind, ParseError as NomParseError},
    Err, Finish, IResult, Parser,
};
use thiserror::Error;

pub(crate) type ParseResult<'s, O> = IResult<&'s str, O, ParseError<'s>>;

/// A formula that couldn't be parsed, labelled with the offending stretch of the input
#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
#[error("{kind}")]
pub struct FormulaError {
    #[source_code]
    formula: String,
    #[label("{label}")]
    span: SourceSpan,
    label: &'static str,
    #[help]
    help: Option<&'static str>,
    kind: FormulaErrorKind,
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum FormulaErrorKind {
    #[error("expected an element (like Na) or an isotope (like [13C]), optionally followed by a count")]
    ExpectedAtom,

    #[error("expected an element symbol")]
    ExpectedElementSymbol,

    #[error("expected an element symbol after the isotopic mass number")]
    ExpectedIsotopeSymbol,

    #[error("the element {0:?} could not be found in the supplied atomic database")]
    UnknownElement(String),

    #[error("counts cannot start with 0")]
    LeadingZero,

    #[error("expected an isotopic mass number")]
    ExpectedMassNumber,

    #[error("expected ']' to close isotope brackets")]
    ExpectedIsotopeEnd,

    #[error("found a ']' without a matching '['")]
    UnmatchedIsotopeEnd,

    #[error("the number of {0} atoms is too large to count")]
    CountOverflow(String),

    #[error("could not interpret the full input as a molecular formula")]
    Incomplete,

    #[error("internal `nom` error: {0:?}")]
    Nom(ErrorKind),
}

impl FormulaError {
    pub(crate) fn new(full_input: &str, span: impl Into<SourceSpan>, kind: FormulaErrorKind) -> Self {
        Self {
            // NOTE: The additional space lets labels point just past the end of the input
            formula: format!("{full_input} "),
            span: span.into(),
            label: kind.label(),
            help: kind.help(),
            kind,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &FormulaErrorKind {
        &self.kind
    }

    #[must_use]
    pub const fn span(&self) -> SourceSpan {
        self.span
    }
}

impl FormulaErrorKind {
    const fn label(&self) -> &'static str {
        match self {
            Self::ExpectedAtom => "expected an atom",
            Self::ExpectedElementSymbol | Self::ExpectedIsotopeSymbol => "expected an element",
            Self::UnknownElement(_) => "unknown element",
            Self::LeadingZero => "leading zero",
            Self::ExpectedMassNumber => "expected a mass number",
            Self::ExpectedIsotopeEnd => "expected ']'",
            Self::UnmatchedIsotopeEnd => "unmatched ']'",
            Self::CountOverflow(_) => "count overflow",
            Self::Incomplete => "input was valid up until this point",
            Self::Nom(_) => "bug",
        }
    }

    const fn help(&self) -> Option<&'static str> {
        match self {
            Self::ExpectedIsotopeSymbol => Some(
                "isotopes written like [2]H3 need normalizing into the canonical [2H3] form before they can be parsed",
            ),
            Self::UnknownElement(_) => {
                Some("double-check for typos, or add a new entry to the atomic database")
            }
            Self::LeadingZero => Some(
                "a 0 value doesn't make sense here, if you've mistakenly included a leading zero, like NH02, try \
                just NH2 instead",
            ),
            Self::ExpectedIsotopeEnd => Some("you've probably forgotten to close an earlier '[' bracket"),
            Self::Nom(_) => Some(
                "this is an internal error that you shouldn't ever see! If you have gotten this error, then please \
                report it as a bug!",
            ),
            _ => None,
        }
    }
}

impl From<ErrorKind> for FormulaErrorKind {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Eof => Self::Incomplete,
            kind => Self::Nom(kind),
        }
    }
}

// Parser Error Plumbing ===============================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct ParseError<'s> {
    input: &'s str,
    length: usize,
    kind: FormulaErrorKind,
}

impl<'s> ParseError<'s> {
    pub(crate) const fn new(input: &'s str, kind: FormulaErrorKind) -> Self {
        Self {
            input,
            length: 0,
            kind,
        }
    }

    pub(crate) const fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    #[cfg(test)]
    pub(crate) const fn kind(&self) -> &FormulaErrorKind {
        &self.kind
    }

    // NOTE: Every `input` handed to a parser is a suffix of `full_input`, so the difference in lengths is the offset
    fn into_final_error(self, full_input: &str) -> FormulaError {
        let offset = full_input.len() - self.input.len();
        FormulaError::new(full_input, (offset, self.length), self.kind)
    }
}

impl<'s> NomParseError<&'s str> for ParseError<'s> {
    fn from_error_kind(input: &'s str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &'s str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // NOTE: When every alternative fails, report the one that made it furthest through the input
    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}

/// Replaces recoverable errors from `parser` with a zero-width error of `kind`, leaving failures untouched
pub(crate) fn expect<'s, O>(
    mut parser: impl Parser<&'s str, O, ParseError<'s>>,
    kind: FormulaErrorKind,
) -> impl FnMut(&'s str) -> ParseResult<'s, O> {
    move |i| match parser.parse(i) {
        Err(Err::Error(_)) => Err(Err::Error(ParseError::new(i, kind.clone()))),
        result => result,
    }
}

/// Runs `parser` to completion, converting any error into a [`FormulaError`] that points into `input`
pub(crate) fn final_parser<'s, O>(
    mut parser: impl Parser<&'s str, O, ParseError<'s>>,
) -> impl FnMut(&'s str) -> Result<O, FormulaError> {
    move |input| {
        let (rest, output) = parser
            .parse(input)
            .finish()
            .map_err(|e| e.into_final_error(input))?;

        if rest.is_empty() {
            Ok(output)
        } else {
            let error = if rest.starts_with(']') {
                ParseError::new(rest, FormulaErrorKind::UnmatchedIsotopeEnd).with_length(1)
            } else {
                ParseError::new(rest, FormulaErrorKind::Incomplete).with_length(rest.len())
            };
            Err(error.into_final_error(input))
        }
    }
}
