use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt::{self, Display, Formatter},
};

use itertools::Itertools;

use crate::{
    parsers::{
        errors::{final_parser, FormulaErrorKind},
        formula::formula,
    },
    Atom, AtomicDatabase, Count, Formula, FormulaError, IsotopeNotation, MassLookupError, MonoisotopicMass,
    normalize_isotope_notation,
};

impl Formula {
    /// Parses a formula written in the canonical notation, like `C21H25[2H3]O4` or `[13C6]H12O6`
    ///
    /// Every element (including those inside isotope brackets) must be present in `db`. Repeated atoms are merged, so
    /// `CH3CH3` is the same formula as `C2H6`.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`], labelled with the offending stretch of `formula`, if the formula is malformed,
    /// mentions an unknown element, or has counts too large to represent
    pub fn new(db: &AtomicDatabase, formula_text: impl AsRef<str>) -> Result<Self, FormulaError> {
        let formula_text = formula_text.as_ref();
        let atom_counts = final_parser(formula(db))(formula_text)?;

        let mut atoms = BTreeMap::new();
        for (atom, count) in atom_counts {
            match atoms.entry(atom) {
                Entry::Vacant(e) => {
                    e.insert(count);
                }
                Entry::Occupied(mut e) => {
                    let total = e.get().checked_add(count).ok_or_else(|| {
                        let kind = FormulaErrorKind::CountOverflow(e.key().to_string());
                        FormulaError::new(formula_text, (0, formula_text.len()), kind)
                    })?;
                    e.insert(total);
                }
            }
        }

        Ok(Self { atoms })
    }

    /// Like [`Formula::new`], but first normalizes any isotopes written like `[2]H3` into the canonical `[2H3]`
    ///
    /// # Errors
    ///
    /// As for [`Formula::new`], with error labels pointing into the normalized formula
    pub fn normalized(db: &AtomicDatabase, formula_text: impl AsRef<str>) -> Result<Self, FormulaError> {
        Self::new(db, normalize_isotope_notation(formula_text))
    }

    /// Builds a formula from atoms and their counts, merging repeated atoms
    ///
    /// Returns `None` if a merged count would exceed `u32::MAX`.
    #[must_use]
    pub fn from_atoms(atom_counts: impl IntoIterator<Item = (Atom, Count)>) -> Option<Self> {
        let mut atoms = BTreeMap::new();
        for (atom, count) in atom_counts {
            match atoms.entry(atom) {
                Entry::Vacant(e) => {
                    e.insert(count);
                }
                Entry::Occupied(mut e) => {
                    let total = e.get().checked_add(count)?;
                    e.insert(total);
                }
            }
        }
        Some(Self { atoms })
    }

    #[must_use]
    pub fn count(&self, atom: &Atom) -> Option<Count> {
        self.atoms.get(atom).copied()
    }

    /// Atoms and their counts, with plain elements sorted before their isotopes
    pub fn atoms(&self) -> impl Iterator<Item = (&Atom, Count)> {
        self.atoms.iter().map(|(atom, &count)| (atom, count))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    #[must_use]
    pub const fn isotope_notation(&self) -> IsotopeNotation<'_> {
        IsotopeNotation(self)
    }

    /// The sum over every entry of its count times the relative mass of that isotope (or of the element's most
    /// abundant isotope, for plain elements)
    ///
    /// # Errors
    ///
    /// Fails if any element or isotope is missing from `db`, or if a plain element has no natural abundance data
    pub fn monoisotopic_mass(&self, db: &AtomicDatabase) -> Result<MonoisotopicMass, MassLookupError> {
        self.atoms
            .iter()
            .map(|(atom, &count)| atom.monoisotopic_mass(db).map(|mass| count * mass))
            .sum()
    }

    // NOTE: Hill order puts C then H first (when there is carbon), then everything else alphabetically; the `Ord` on
    // `Atom` breaks ties by placing plain elements before their isotopes, and isotopes by ascending mass number
    fn hill_order(&self) -> impl Iterator<Item = (&Atom, &Count)> {
        let has_carbon = self.atoms.keys().any(|atom| atom.symbol == "C");
        self.atoms.iter().sorted_by_key(move |&(atom, _)| {
            let rank = match atom.symbol.as_str() {
                "C" => 0,
                "H" if has_carbon => 1,
                _ => 2,
            };
            (rank, atom)
        })
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (atom, count) in self.hill_order() {
            if let Some(mass_number) = atom.mass_number {
                write!(f, "[{mass_number}{}{count}]", atom.symbol)?;
            } else {
                write!(f, "{}{count}", atom.symbol)?;
            }
        }
        Ok(())
    }
}

impl Display for IsotopeNotation<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (atom, count) in self.0.hill_order() {
            if let Some(mass_number) = atom.mass_number {
                write!(f, "[{mass_number}]{}{count}", atom.symbol)?;
            } else {
                write!(f, "{}{count}", atom.symbol)?;
            }
        }
        Ok(())
    }
}
