use std::fmt::{self, Display, Formatter};

use crate::{Atom, MassNumber, MonoisotopicMass};

use super::{atomic_database::AtomicDatabase, errors::MassLookupError};

impl Atom {
    pub fn element(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            mass_number: None,
        }
    }

    pub fn isotope(symbol: impl Into<String>, mass_number: MassNumber) -> Self {
        Self {
            symbol: symbol.into(),
            mass_number: Some(mass_number),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub const fn mass_number(&self) -> Option<MassNumber> {
        self.mass_number
    }

    #[must_use]
    pub const fn is_isotope(&self) -> bool {
        self.mass_number.is_some()
    }

    /// The mass of a single atom: the named isotope's relative mass, or that of the element's most abundant isotope
    ///
    /// # Errors
    ///
    /// Fails if the element or isotope is missing from `db`, or if a plain element has no natural abundance data
    pub fn monoisotopic_mass(&self, db: &AtomicDatabase) -> Result<MonoisotopicMass, MassLookupError> {
        let symbol = self.symbol.as_str();
        let element = db
            .element(symbol)
            .ok_or_else(|| MassLookupError::element(symbol))?;

        let isotope = if let Some(mass_number) = self.mass_number {
            element
                .isotopes
                .get(&mass_number)
                .ok_or_else(|| MassLookupError::isotope(symbol, mass_number, element))?
        } else {
            element.most_abundant_isotope().ok_or_else(|| {
                MassLookupError::abundance(symbol, element)
                    .unwrap_or_else(|| MassLookupError::element(symbol))
            })?
        };

        Ok(MonoisotopicMass(isotope.relative_mass))
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let symbol = &self.symbol;
        if let Some(mass_number) = self.mass_number {
            write!(f, "[{mass_number}{symbol}]")
        } else {
            write!(f, "{symbol}")
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use once_cell::sync::Lazy;

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn mass_number(n: u32) -> MassNumber {
        MassNumber::new(n).unwrap()
    }

    #[test]
    fn atom_display() {
        assert_eq!(Atom::element("Na").to_string(), "Na");
        assert_eq!(Atom::isotope("C", mass_number(13)).to_string(), "[13C]");
    }

    #[test]
    fn elements_sort_before_their_isotopes() {
        let mut atoms = vec![
            Atom::isotope("H", mass_number(2)),
            Atom::element("O"),
            Atom::isotope("H", mass_number(1)),
            Atom::element("H"),
        ];
        atoms.sort();
        assert_eq!(
            atoms,
            vec![
                Atom::element("H"),
                Atom::isotope("H", mass_number(1)),
                Atom::isotope("H", mass_number(2)),
                Atom::element("O"),
            ]
        );
    }

    #[test]
    fn element_masses() {
        let mass = |symbol: &str| f64::from(Atom::element(symbol).monoisotopic_mass(&DB).unwrap());
        assert_float_absolute_eq!(mass("C"), 12.0, 1e-9);
        assert_float_absolute_eq!(mass("H"), 1.007_825_032_23, 1e-9);
        assert_float_absolute_eq!(mass("O"), 15.994_914_619_57, 1e-9);
        assert_float_absolute_eq!(mass("Na"), 22.989_769_282, 1e-9);
        assert_float_absolute_eq!(mass("Cl"), 34.968_852_682, 1e-9);
    }

    #[test]
    fn isotope_masses() {
        let mass = |symbol: &str, n: u32| {
            let isotope = Atom::isotope(symbol, mass_number(n));
            f64::from(isotope.monoisotopic_mass(&DB).unwrap())
        };
        assert_float_absolute_eq!(mass("H", 2), 2.014_101_778_12, 1e-9);
        assert_float_absolute_eq!(mass("C", 13), 13.003_354_835_07, 1e-9);
        assert_float_absolute_eq!(mass("Tc", 99), 98.906_250_8, 1e-9);
    }

    #[test]
    fn lookup_errors() {
        let unknown = Atom::element("Xy").monoisotopic_mass(&DB);
        assert_eq!(
            unknown,
            Err(MassLookupError::Element {
                symbol: "Xy".to_owned()
            })
        );
        assert_eq!(
            unknown.unwrap_err().to_string(),
            r#"the element "Xy" could not be found in the supplied atomic database"#
        );

        let missing_isotope = Atom::isotope("C", mass_number(42)).monoisotopic_mass(&DB);
        assert_eq!(
            missing_isotope.unwrap_err().to_string(),
            "the isotope 42C could not be found in the supplied atomic database, though the following Carbon \
            isotopes were found: [12, 13, 14]"
        );

        let no_abundance = Atom::element("Tc").monoisotopic_mass(&DB);
        assert!(matches!(
            no_abundance,
            Err(MassLookupError::Abundance { lightest, .. }) if lightest == mass_number(97)
        ));
    }
}
