use ahash::HashMap;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

use crate::MassNumber;

use super::atomic_database::{ElementDescription, Isotope};

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum MassLookupError {
    #[diagnostic(help("double-check for typos, or add a new entry to the atomic database"))]
    #[error("the element {symbol:?} could not be found in the supplied atomic database")]
    Element { symbol: String },

    #[diagnostic(help("double-check the mass number, or add the isotope to the atomic database"))]
    #[error(
        "the isotope {mass_number}{symbol} could not be found in the supplied atomic database, though the following \
        {name} isotopes were found: {known}"
    )]
    Isotope {
        symbol: String,
        mass_number: MassNumber,
        name: String,
        known: String,
    },

    #[diagnostic(help("name the isotope used for the mass explicitly, like [{lightest}{symbol}]"))]
    #[error(
        "{name} ({symbol}) has no natural abundance data to pick a monoisotopic mass from, though the following \
        isotopes were found: {known}"
    )]
    Abundance {
        symbol: String,
        name: String,
        lightest: MassNumber,
        known: String,
    },
}

impl MassLookupError {
    pub(crate) fn element(symbol: &str) -> Self {
        Self::Element {
            symbol: symbol.to_owned(),
        }
    }

    pub(crate) fn isotope(symbol: &str, mass_number: MassNumber, element: &ElementDescription) -> Self {
        Self::Isotope {
            symbol: symbol.to_owned(),
            mass_number,
            name: element.name.clone(),
            known: known_isotopes(&element.isotopes),
        }
    }

    pub(crate) fn abundance(symbol: &str, element: &ElementDescription) -> Option<Self> {
        let lightest = element.isotopes.keys().min().copied()?;
        Some(Self::Abundance {
            symbol: symbol.to_owned(),
            name: element.name.clone(),
            lightest,
            known: known_isotopes(&element.isotopes),
        })
    }
}

fn known_isotopes(isotopes: &HashMap<MassNumber, Isotope>) -> String {
    format!("[{}]", isotopes.keys().sorted().join(", "))
}

#[derive(Debug, Diagnostic, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Kdl(#[from] knuffel::Error),

    #[diagnostic(help("remove or merge one of the entries"))]
    #[error("the element {0:?} is defined more than once")]
    DuplicateElement(String),

    #[diagnostic(help("every element needs at least one `isotope` entry"))]
    #[error("the element {0:?} has no isotopes")]
    NoIsotopes(String),

    #[error("the element {symbol:?} lists the isotope {mass_number} more than once")]
    DuplicateIsotope { symbol: String, mass_number: u32 },

    #[error("the element {0:?} lists an isotope with a mass number of 0")]
    ZeroMassNumber(String),

    #[error("the relative mass of {mass_number}{symbol} must be positive, but was {mass}")]
    RelativeMass {
        symbol: String,
        mass_number: u32,
        mass: f64,
    },

    #[error("the natural abundance of {mass_number}{symbol} must lie between 0 and 1, but was {abundance}")]
    Abundance {
        symbol: String,
        mass_number: u32,
        abundance: f64,
    },
}
