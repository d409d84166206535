use std::fmt::{self, Display, Formatter};

use nom::{combinator::all_consuming, Finish};

use crate::{
    Adduct, Atom, Count, DEFAULT_ADDUCT_ELEMENTS, Formula, InvalidAdductError, OffsetKind,
    parsers::adduct::adduct,
};

impl Adduct {
    /// Parses an adduct name like `M+H` or `M-Na`, accepting only the [`DEFAULT_ADDUCT_ELEMENTS`]
    ///
    /// # Errors
    ///
    /// Fails if `name` isn't exactly `M`, then `+` or `-`, then one element symbol, or if that element isn't allowed
    pub fn new(name: impl AsRef<str>) -> Result<Self, InvalidAdductError> {
        Self::with_elements(name, &DEFAULT_ADDUCT_ELEMENTS)
    }

    /// Like [`Adduct::new`], but with a custom set of element symbols that may be added or removed
    ///
    /// # Errors
    ///
    /// As for [`Adduct::new`], checking against `allowed` instead of the [`DEFAULT_ADDUCT_ELEMENTS`]
    pub fn with_elements(name: impl AsRef<str>, allowed: &[impl AsRef<str>]) -> Result<Self, InvalidAdductError> {
        let name = name.as_ref();
        let (_, (offset_kind, symbol)) = all_consuming(adduct)(name)
            .finish()
            .map_err(|_| InvalidAdductError::Name(name.to_owned()))?;

        if !allowed.iter().any(|s| s.as_ref() == symbol) {
            let allowed: Vec<_> = allowed.iter().map(AsRef::as_ref).collect();
            return Err(InvalidAdductError::Element {
                name: name.to_owned(),
                symbol: symbol.to_owned(),
                allowed: allowed.join(", "),
            });
        }

        Ok(Self {
            offset_kind,
            symbol: symbol.to_owned(),
        })
    }

    #[must_use]
    pub const fn offset_kind(&self) -> OffsetKind {
        self.offset_kind
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl Display for Adduct {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "M{}{}", self.offset_kind, self.symbol)
    }
}

impl Display for OffsetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Remove => "-",
        })
    }
}

impl Formula {
    /// Adds or removes one atom of the adduct's element, returning the resulting (measured) formula
    ///
    /// Only the plain element is touched: removing `H` from `C21H25[2H3]O4` leaves the deuterium alone. An entry that
    /// drops to zero is removed entirely.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidAdductError::Underflow`] when removing an element that the formula doesn't contain, and
    /// [`InvalidAdductError::Overflow`] when adding to an element whose count is already `u32::MAX`
    pub fn apply(&self, adduct: &Adduct) -> Result<Self, InvalidAdductError> {
        let atom = Atom::element(adduct.symbol.clone());
        let mut atoms = self.atoms.clone();

        match (adduct.offset_kind, atoms.get(&atom).copied()) {
            (OffsetKind::Add, None) => {
                atoms.insert(atom, Count::default());
            }
            (OffsetKind::Add, Some(count)) => {
                let Some(count) = count.increment() else {
                    return Err(InvalidAdductError::Overflow {
                        adduct: adduct.to_string(),
                        formula: self.to_string(),
                        symbol: adduct.symbol.clone(),
                    });
                };
                atoms.insert(atom, count);
            }
            (OffsetKind::Remove, Some(count)) => {
                if let Some(count) = count.decrement() {
                    atoms.insert(atom, count);
                } else {
                    atoms.remove(&atom);
                }
            }
            (OffsetKind::Remove, None) => {
                return Err(InvalidAdductError::Underflow {
                    adduct: adduct.to_string(),
                    formula: self.to_string(),
                    symbol: adduct.symbol.clone(),
                });
            }
        }

        Ok(Self { atoms })
    }
}
