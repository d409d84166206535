use crate::{
    Adduct, AdductId, Compound, CompoundId, MeasuredCompound, MeasuredCompoundId, NewAdduct, NewMeasuredCompound,
    RetentionTime, RetentionTimeId, errors::StoreError,
};

// Public API ==========================================================================================================

/// Persistence for everything the [`crate::Ingestor`] creates
///
/// Implementations are shared between threads, so every method takes `&self`. Uniqueness (of compound ids, adduct
/// names, retention-time values, and measured-compound triples) must be enforced by the store itself, atomically with
/// the insertion: the ingestor's lookups are only a fast path, and two racing writers must never both succeed.
pub trait Store: Send + Sync {
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if a compound with the same id already exists
    fn insert_compound(&self, compound: Compound) -> Result<Compound, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if an adduct with the same name already exists
    fn insert_adduct(&self, adduct: NewAdduct) -> Result<Adduct, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::InvalidRetentionTime`] unless `value` is finite and positive, and [`StoreError::Duplicate`] if
    /// exactly that value is already stored
    fn insert_retention_time(&self, value: f64, comment: Option<String>) -> Result<RetentionTime, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the (compound, adduct, retention time) triple is already stored, and
    /// [`StoreError::InvalidQuery`] if any of the three doesn't exist
    fn insert_measured_compound(&self, measured: NewMeasuredCompound) -> Result<MeasuredCompound, StoreError>;

    fn find_adduct(&self, name: &str) -> Result<Option<Adduct>, StoreError>;
    fn find_compound(&self, id: CompoundId) -> Result<Option<Compound>, StoreError>;
    fn find_retention_time(&self, value: f64) -> Result<Option<RetentionTime>, StoreError>;

    fn adduct(&self, id: AdductId) -> Result<Option<Adduct>, StoreError>;
    fn retention_time(&self, id: RetentionTimeId) -> Result<Option<RetentionTime>, StoreError>;
    fn measured_compound(&self, id: MeasuredCompoundId) -> Result<Option<MeasuredCompound>, StoreError>;

    fn compounds(&self, page: Page) -> Result<Vec<Compound>, StoreError>;
    fn adducts(&self, page: Page) -> Result<Vec<Adduct>, StoreError>;
    fn retention_times(&self, page: Page) -> Result<Vec<RetentionTime>, StoreError>;

    /// Lists measured compounds (in insertion order) that match every criterion set in `filter`
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidQuery`] if the filter is rejected by [`MeasuredCompoundFilter::validate`]
    fn measured_compounds(
        &self,
        filter: &MeasuredCompoundFilter,
        page: Page,
    ) -> Result<Vec<MeasuredCompound>, StoreError>;
}

/// Which slice of a listing to return
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    #[must_use]
    pub const fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    pub fn apply<I: IntoIterator>(self, items: I) -> impl Iterator<Item = I::Item> {
        items.into_iter().skip(self.skip).take(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, 100)
    }
}

/// Optional criteria for listing measured compounds; unset fields match everything
#[derive(Clone, PartialEq, Debug, Default)]
pub struct MeasuredCompoundFilter {
    pub retention_time: Option<f64>,
    pub compound_type: Option<String>,
    pub ion_mode: Option<String>,
}

impl MeasuredCompoundFilter {
    /// # Errors
    ///
    /// [`StoreError::InvalidQuery`] when filtering on a retention time that isn't a positive number
    pub fn validate(&self) -> Result<(), StoreError> {
        match self.retention_time {
            Some(value) if check_retention_time(value).is_err() => Err(StoreError::InvalidQuery(format!(
                "cannot filter on a retention time of {value}, since retention times are always positive"
            ))),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn matches(&self, measured: &MeasuredCompound) -> bool {
        // NOTE: Retention times are unique by exact value, so exact comparison is what selects a single one
        #[allow(clippy::float_cmp)]
        let retention_time = self
            .retention_time
            .is_none_or(|value| measured.retention_time.value == value);
        let compound_type = self
            .compound_type
            .as_ref()
            .is_none_or(|kind| measured.compound.kind.as_ref() == Some(kind));
        let ion_mode = self
            .ion_mode
            .as_ref()
            .is_none_or(|mode| &measured.adduct.ion_mode == mode);

        retention_time && compound_type && ion_mode
    }
}

// NOTE: Shared by every `Store` implementation as their stand-in for a database check constraint
pub(crate) fn check_retention_time(value: f64) -> Result<(), StoreError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StoreError::InvalidRetentionTime(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measured(retention_time: f64, kind: Option<&str>, ion_mode: &str) -> MeasuredCompound {
        MeasuredCompound {
            id: MeasuredCompoundId::from(1),
            compound: Compound {
                id: CompoundId::from(1),
                name: "Caffeine".to_owned(),
                molecular_formula: "C8H10N4O2".to_owned(),
                kind: kind.map(str::to_owned),
                monoisotopic_mass: 194.080_375_579_16,
            },
            adduct: Adduct {
                id: AdductId::from(1),
                name: "M+H".to_owned(),
                mass_adjustment: 1.007_276,
                ion_mode: ion_mode.to_owned(),
            },
            retention_time: RetentionTime {
                id: RetentionTimeId::from(1),
                value: retention_time,
                comment: None,
            },
            molecular_formula: "C8H11N4O2".to_owned(),
            monoisotopic_mass: 195.088_200_611_39,
        }
    }

    #[test]
    fn default_page() {
        assert_eq!(Page::default(), Page::new(0, 100));
        let items: Vec<_> = Page::new(2, 3).apply(0..10).collect();
        assert_eq!(items, [2, 3, 4]);
        let items: Vec<_> = Page::new(8, 3).apply(0..10).collect();
        assert_eq!(items, [8, 9]);
        assert_eq!(Page::new(0, 0).apply(0..10).count(), 0);
    }

    #[test]
    fn retention_time_constraint() {
        assert_eq!(check_retention_time(5.32), Ok(()));
        assert_eq!(check_retention_time(f64::MIN_POSITIVE), Ok(()));
        for value in [0.0, -0.0, -1.0, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(check_retention_time(value), Err(StoreError::InvalidRetentionTime(value)));
        }
        assert!(check_retention_time(f64::NAN).is_err());
    }

    #[test]
    fn validate_filters() {
        assert_eq!(MeasuredCompoundFilter::default().validate(), Ok(()));
        let positive = MeasuredCompoundFilter {
            retention_time: Some(2.1),
            ..MeasuredCompoundFilter::default()
        };
        assert_eq!(positive.validate(), Ok(()));
        for value in [0.0, -2.1] {
            let filter = MeasuredCompoundFilter {
                retention_time: Some(value),
                ..MeasuredCompoundFilter::default()
            };
            assert!(matches!(filter.validate(), Err(StoreError::InvalidQuery(_))));
        }
    }

    #[test]
    fn match_filters() {
        let caffeine = measured(2.1, Some("alkaloid"), "positive");
        let untyped = measured(2.1, None, "positive");

        assert!(MeasuredCompoundFilter::default().matches(&caffeine));
        assert!(MeasuredCompoundFilter::default().matches(&untyped));

        let filter = MeasuredCompoundFilter {
            retention_time: Some(2.1),
            compound_type: Some("alkaloid".to_owned()),
            ion_mode: Some("positive".to_owned()),
        };
        assert!(filter.matches(&caffeine));
        assert!(!filter.matches(&untyped));
        assert!(!filter.matches(&measured(2.2, Some("alkaloid"), "positive")));
        assert!(!filter.matches(&measured(2.1, Some("alkaloid"), "negative")));
    }
}
