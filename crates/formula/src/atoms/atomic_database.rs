use std::str::FromStr;

use ahash::HashMap;
use knuffel::Decode;
use miette::Diagnostic;
use thiserror::Error;

use crate::MassNumber;

use super::errors::DatabaseError;

pub const BUNDLED_KDL: &str = include_str!("../../atomic_database.kdl");

// Public API ==========================================================================================================

/// Element names and isotope masses, keyed by element symbol
#[derive(Clone, PartialEq, Debug)]
pub struct AtomicDatabase {
    elements: HashMap<String, ElementDescription>,
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ElementDescription {
    pub(crate) name: String,
    pub(crate) isotopes: HashMap<MassNumber, Isotope>,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub(crate) struct Isotope {
    pub(crate) relative_mass: f64,
    pub(crate) abundance: Option<f64>,
}

impl AtomicDatabase {
    /// Decodes and validates a KDL atomic database
    ///
    /// # Errors
    ///
    /// Fails on malformed KDL, on element symbols that aren't an uppercase ASCII letter optionally followed by a
    /// lowercase one, and on duplicate, empty, or out-of-range element and isotope entries.
    pub fn from_kdl(file_name: impl AsRef<str>, text: impl AsRef<str>) -> Result<Self, DatabaseError> {
        let parsed: AtomicDatabaseKdl = knuffel::parse(file_name.as_ref(), text.as_ref())?;

        let mut elements = HashMap::default();
        for element in parsed.elements {
            let (symbol, description) = ElementEntry::try_from(element)?;
            if elements.contains_key(&symbol) {
                return Err(DatabaseError::DuplicateElement(symbol));
            }
            elements.insert(symbol, description);
        }

        Ok(Self { elements })
    }

    #[must_use]
    pub fn contains_element(&self, symbol: &str) -> bool {
        self.elements.contains_key(symbol)
    }

    #[must_use]
    pub fn element_name(&self, symbol: &str) -> Option<&str> {
        self.elements.get(symbol).map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn element(&self, symbol: &str) -> Option<&ElementDescription> {
        self.elements.get(symbol)
    }
}

impl Default for AtomicDatabase {
    /// The bundled database of NIST isotope masses and natural abundances
    fn default() -> Self {
        // NOTE: The bundled file is checked by `bundled_database_is_valid`, so this can only fail if that test does
        Self::from_kdl("atomic_database.kdl", BUNDLED_KDL)
            .expect("the bundled atomic database should always be valid")
    }
}

impl ElementDescription {
    pub(crate) fn most_abundant_isotope(&self) -> Option<&Isotope> {
        self.isotopes
            .values()
            .filter_map(|i| i.abundance.map(|a| (a, i)))
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, i)| i)
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct AtomicDatabaseKdl {
    #[knuffel(child, unwrap(children))]
    elements: Vec<ElementKdl>,
}

#[derive(Debug, Decode)]
struct ElementKdl {
    #[knuffel(node_name)]
    symbol: ElementSymbol,
    #[knuffel(argument)]
    name: String,
    #[knuffel(children(name = "isotope"))]
    isotopes: Vec<IsotopeKdl>,
}

#[derive(Debug, Decode)]
struct IsotopeKdl {
    #[knuffel(argument)]
    mass_number: u32,
    #[knuffel(argument)]
    relative_mass: f64,
    #[knuffel(argument)]
    abundance: Option<f64>,
}

// Element Symbol Validation ===========================================================================================

#[derive(Debug)]
struct ElementSymbol(String);

impl FromStr for ElementSymbol {
    type Err = InvalidElementSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [f] if f.is_ascii_uppercase() => Ok(Self(s.to_owned())),
            [f, l] if f.is_ascii_uppercase() && l.is_ascii_lowercase() => Ok(Self(s.to_owned())),
            _ => Err(InvalidElementSymbolError(s.to_owned())),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Diagnostic, Error)]
#[error("expected a single uppercase ASCII letter optionally followed by a lowercase ASCII letter, got {0:?}")]
struct InvalidElementSymbolError(String);

// Validated Conversion From KDL =======================================================================================

type ElementEntry = (String, ElementDescription);

impl TryFrom<ElementKdl> for ElementEntry {
    type Error = DatabaseError;

    fn try_from(
        ElementKdl {
            symbol: ElementSymbol(symbol),
            name,
            isotopes: isotope_list,
        }: ElementKdl,
    ) -> Result<Self, Self::Error> {
        if isotope_list.is_empty() {
            return Err(DatabaseError::NoIsotopes(symbol));
        }

        let mut isotopes = HashMap::default();
        for isotope in isotope_list {
            let (mass_number, isotope) = validate_isotope(&symbol, isotope)?;
            if isotopes.insert(mass_number, isotope).is_some() {
                return Err(DatabaseError::DuplicateIsotope {
                    symbol,
                    mass_number: mass_number.get(),
                });
            }
        }

        Ok((symbol, ElementDescription { name, isotopes }))
    }
}

fn validate_isotope(
    symbol: &str,
    IsotopeKdl {
        mass_number,
        relative_mass,
        abundance,
    }: IsotopeKdl,
) -> Result<(MassNumber, Isotope), DatabaseError> {
    let Some(checked_mass_number) = MassNumber::new(mass_number) else {
        return Err(DatabaseError::ZeroMassNumber(symbol.to_owned()));
    };

    if relative_mass.is_nan() || relative_mass <= 0.0 {
        return Err(DatabaseError::RelativeMass {
            symbol: symbol.to_owned(),
            mass_number,
            mass: relative_mass,
        });
    }

    if let Some(abundance) = abundance.filter(|a| !(0.0..=1.0).contains(a)) {
        return Err(DatabaseError::Abundance {
            symbol: symbol.to_owned(),
            mass_number,
            abundance,
        });
    }

    Ok((
        checked_mass_number,
        Isotope {
            relative_mass,
            abundance,
        },
    ))
}

// Module Tests ========================================================================================================
