use miette::Diagnostic;
use thiserror::Error;

use crate::{atoms::errors::DatabaseError, FormulaError, MassLookupError};

pub type Result<T, E = Box<Error>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MassLookup(#[from] MassLookupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidAdduct(#[from] InvalidAdductError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum InvalidAdductError {
    #[diagnostic(help("adducts are named like M+H or M-Na: an M, then a + or -, then a single element symbol"))]
    #[error("{0:?} is not a valid adduct name")]
    Name(String),

    #[diagnostic(help("the adduct elements currently allowed are {allowed}"))]
    #[error("the adduct {name} adjusts {symbol}, which is not an allowed adduct element")]
    Element {
        name: String,
        symbol: String,
        allowed: String,
    },

    #[error("cannot apply {adduct} to {formula}, since it contains no {symbol} to remove")]
    Underflow {
        adduct: String,
        formula: String,
        symbol: String,
    },

    #[error("cannot apply {adduct} to {formula}, since it already contains as much {symbol} as can be counted")]
    Overflow {
        adduct: String,
        formula: String,
        symbol: String,
    },
}
