//! Molecular formulae with isotope support, monoisotopic masses, and single-atom adduct algebra

mod adduct;
pub mod atoms;
pub mod errors;
mod formula;
pub mod parsers;
#[cfg(test)]
mod testing_tools;

use std::{collections::BTreeMap, num::NonZeroU32};

// External Crate Imports
use derive_more::{Add, Display, From, Into, Sub, Sum};
use static_assertions::assert_impl_all;

pub use atoms::{
    atomic_database::AtomicDatabase,
    errors::{DatabaseError, MassLookupError},
};
pub use errors::{Error, InvalidAdductError, Result};
pub use parsers::{errors::FormulaError, isotope_notation::normalize_isotope_notation};

// NOTE: The adduct elements observed in practice; anything else has to be opted into explicitly
pub const DEFAULT_ADDUCT_ELEMENTS: [&str; 2] = ["H", "Na"];

// ---------------------------------------------------------------------------------------------------------------------

/// A molecular formula: an ordered mapping from elements (or specific isotopes) to their atom counts
///
/// Formulae are immutable: operations like [`Formula::apply`] return a new formula and leave the original as it was.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Formula {
    atoms: BTreeMap<Atom, Count>,
}

/// The key of a formula entry: either a plain element (like `H`) or one of its isotopes (like `[2H]`)
// NOTE: The derived `Ord` sorts plain elements before their isotopes, since `None < Some(_)`
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Atom {
    symbol: String,
    mass_number: Option<MassNumber>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Count(NonZeroU32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MassNumber(NonZeroU32);

#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Display, From, Into, Add, Sub, Sum)]
pub struct MonoisotopicMass(f64);

/// An ion species, written `M+<Element>` or `M-<Element>`, that adds or removes a single atom
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Adduct {
    offset_kind: OffsetKind,
    symbol: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OffsetKind {
    Add,
    Remove,
}

/// Displays a [`Formula`] using the `[2]H3` isotope notation instead of the canonical `[2H3]`
#[derive(Copy, Clone, Debug)]
pub struct IsotopeNotation<'f>(&'f Formula);

// Convenience API =====================================================================================================

/// Normalizes, parses, and weighs `formula` in one go
pub fn monoisotopic_mass(db: &AtomicDatabase, formula: impl AsRef<str>) -> Result<MonoisotopicMass> {
    let formula = Formula::normalized(db, formula).map_err(|e| Box::new(e.into()))?;
    formula.monoisotopic_mass(db).map_err(|e| Box::new(e.into()))
}

/// Normalizes and parses `formula`, then applies the adduct called `adduct_name` (from [`DEFAULT_ADDUCT_ELEMENTS`])
pub fn measured_formula(
    db: &AtomicDatabase,
    formula: impl AsRef<str>,
    adduct_name: impl AsRef<str>,
) -> Result<Formula> {
    let adduct = Adduct::new(adduct_name).map_err(|e| Box::new(e.into()))?;
    let formula = Formula::normalized(db, formula).map_err(|e| Box::new(e.into()))?;
    formula.apply(&adduct).map_err(|e| Box::new(e.into()))
}

// =====================================================================================================================

assert_impl_all!(AtomicDatabase: Send, Sync);
assert_impl_all!(Formula: Send, Sync);
assert_impl_all!(Adduct: Send, Sync);
