use formula::{AtomicDatabase, DEFAULT_ADDUCT_ELEMENTS, Formula, normalize_isotope_notation};
use log::{debug, info};

use crate::{
    Adduct, Compound, MeasuredCompound, NewAdduct, NewCompound, NewMeasuredCompound, NewMeasurement, RetentionTime,
    errors::{IngestError, Missing, Result, StoreError},
    store::{Store, check_retention_time},
};

// Public API ==========================================================================================================

/// Validates, computes, and stores compounds, adducts, and measured compounds
///
/// The ingestor owns no state of its own: it borrows an [`AtomicDatabase`] for formula work and writes through any
/// [`Store`], so several ingestors (on several threads) can safely share one store.
#[derive(Clone)]
pub struct Ingestor<'a> {
    db: &'a AtomicDatabase,
    store: &'a dyn Store,
    adduct_elements: Vec<String>,
}

impl<'a> Ingestor<'a> {
    #[must_use]
    pub fn new(db: &'a AtomicDatabase, store: &'a dyn Store) -> Self {
        let adduct_elements = DEFAULT_ADDUCT_ELEMENTS.map(str::to_owned).to_vec();
        Self {
            db,
            store,
            adduct_elements,
        }
    }

    /// Replaces the element symbols that adducts are allowed to add or remove (`H` and `Na` by default)
    #[must_use]
    pub fn with_adduct_elements(mut self, elements: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.adduct_elements = elements.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    #[must_use]
    pub fn adduct_elements(&self) -> &[String] {
        &self.adduct_elements
    }

    /// # Errors
    ///
    /// Fails with [`IngestError::InvalidAdduct`] if the name isn't a valid adduct name for the allowed elements, or with
    /// [`IngestError::Duplicate`] if an adduct with that name already exists
    pub fn create_adduct(&self, adduct: NewAdduct) -> Result<Adduct> {
        let parsed = formula::Adduct::with_elements(&adduct.name, &self.adduct_elements)?;
        debug!("validated adduct name {parsed}");

        let adduct = self.store.insert_adduct(adduct)?;
        info!("created adduct {} ({}, {})", adduct.name, adduct.ion_mode, adduct.id);
        Ok(adduct)
    }

    /// Normalizes the compound's formula and computes its monoisotopic mass before storing it
    ///
    /// # Errors
    ///
    /// Fails if the formula can't be parsed ([`IngestError::Formula`]) or weighed ([`IngestError::MassLookup`]), or if a
    /// compound with the same id already exists ([`IngestError::Duplicate`])
    pub fn create_compound(&self, compound: NewCompound) -> Result<Compound> {
        let NewCompound {
            id,
            name,
            molecular_formula,
            kind,
        } = compound;

        let molecular_formula = normalize_isotope_notation(molecular_formula);
        let formula = Formula::new(self.db, &molecular_formula)?;
        let monoisotopic_mass: f64 = formula.monoisotopic_mass(self.db)?.into();
        debug!("compound {id} has the formula {formula} and a monoisotopic mass of {monoisotopic_mass}");

        let compound = self.store.insert_compound(Compound {
            id,
            name,
            molecular_formula,
            kind,
            monoisotopic_mass,
        })?;
        info!("created compound {} ({})", compound.name, compound.id);
        Ok(compound)
    }

    /// Returns the retention time stored for exactly `value`, creating it (with `comment`) if there isn't one yet
    ///
    /// When two callers race to create the same value, the first write wins and the later `comment` is dropped.
    ///
    /// # Errors
    ///
    /// Fails with [`IngestError::InvalidRetentionTime`] unless `value` is finite and positive
    pub fn get_or_create_retention_time(&self, value: f64, comment: Option<String>) -> Result<RetentionTime> {
        check_retention_time(value)?;
        if let Some(retention_time) = self.store.find_retention_time(value)? {
            debug!("reusing retention time {value} ({})", retention_time.id);
            return Ok(retention_time);
        }

        match self.store.insert_retention_time(value, comment) {
            Ok(retention_time) => {
                info!("created retention time {value} ({})", retention_time.id);
                Ok(retention_time)
            }
            Err(StoreError::Duplicate(conflict)) => {
                debug!("lost the race to create retention time {value}, so re-reading it");
                self.store
                    .find_retention_time(value)?
                    .ok_or(IngestError::Duplicate(conflict))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Resolves a measurement's references, computes its measured formula and mass, and stores it
    ///
    /// Every check (and all of the formula work) happens before anything is written, so a failed measurement never
    /// leaves behind a new retention time.
    ///
    /// # Errors
    ///
    /// In the order they are checked:
    /// - [`IngestError::InvalidRetentionTime`] unless the retention time is finite and positive
    /// - [`IngestError::NotFound`] if the adduct name or compound id don't exist
    /// - [`IngestError::Formula`], [`IngestError::InvalidAdduct`], or [`IngestError::MassLookup`] if the measured
    ///   formula can't be computed (like removing an element that the compound doesn't contain)
    /// - [`IngestError::Duplicate`] if this (compound, adduct, retention time) triple already exists
    pub fn create_measured_compound(&self, measurement: NewMeasurement) -> Result<MeasuredCompound> {
        let NewMeasurement {
            compound_id,
            adduct_name,
            retention_time,
            retention_time_comment,
        } = measurement;

        check_retention_time(retention_time)?;

        let adduct = self
            .store
            .find_adduct(&adduct_name)?
            .ok_or(IngestError::NotFound(Missing::Adduct(adduct_name)))?;
        debug!("resolved adduct {} ({})", adduct.name, adduct.id);

        let compound = self
            .store
            .find_compound(compound_id)?
            .ok_or(IngestError::NotFound(Missing::Compound(compound_id)))?;
        debug!("resolved compound {} ({})", compound.name, compound.id);

        let measured = self.measured_formula(&compound, &adduct)?;
        let monoisotopic_mass: f64 = measured.monoisotopic_mass(self.db)?.into();
        let molecular_formula = measured.isotope_notation().to_string();
        debug!("measured formula {molecular_formula} has a monoisotopic mass of {monoisotopic_mass}");

        let retention_time = self.get_or_create_retention_time(retention_time, retention_time_comment)?;

        let measured_compound = self.store.insert_measured_compound(NewMeasuredCompound {
            compound_id,
            adduct_id: adduct.id,
            retention_time_id: retention_time.id,
            molecular_formula,
            monoisotopic_mass,
        })?;
        info!(
            "created measured compound {} ({} {} at {})",
            measured_compound.id, compound.name, adduct.name, retention_time.value
        );
        Ok(measured_compound)
    }

    fn measured_formula(&self, compound: &Compound, adduct: &Adduct) -> Result<Formula> {
        let adduct = formula::Adduct::with_elements(&adduct.name, &self.adduct_elements)?;
        let formula = Formula::normalized(self.db, &compound.molecular_formula)?;
        Ok(formula.apply(&adduct)?)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Barrier, thread};

    use assert_float_eq::assert_float_absolute_eq;
    use once_cell::sync::Lazy;

    use crate::{
        AdductId, CompoundId, MemoryStore, RetentionTimeId,
        errors::Conflict,
        store::{MeasuredCompoundFilter, Page},
    };

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn adduct(name: &str, mass_adjustment: f64, ion_mode: &str) -> NewAdduct {
        NewAdduct {
            name: name.to_owned(),
            mass_adjustment,
            ion_mode: ion_mode.to_owned(),
        }
    }

    fn compound(id: u64, name: &str, molecular_formula: &str) -> NewCompound {
        NewCompound {
            id: CompoundId::from(id),
            name: name.to_owned(),
            molecular_formula: molecular_formula.to_owned(),
            kind: None,
        }
    }

    fn measurement(compound_id: u64, adduct_name: &str, retention_time: f64) -> NewMeasurement {
        NewMeasurement {
            compound_id: CompoundId::from(compound_id),
            adduct_name: adduct_name.to_owned(),
            retention_time,
            retention_time_comment: None,
        }
    }

    // NOTE: A store holding a deuterated steroid, sodium acetate, and the M+H, M-H, and M-Na adducts
    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let ingestor = Ingestor::new(&DB, &store);
        ingestor.create_adduct(adduct("M+H", 1.007_276, "positive")).unwrap();
        ingestor.create_adduct(adduct("M-H", -1.007_276, "negative")).unwrap();
        ingestor.create_adduct(adduct("M-Na", -22.989_218, "negative")).unwrap();
        ingestor.create_compound(compound(1, "Steroid-d3", "C21H25[2]H3O4")).unwrap();
        ingestor.create_compound(compound(5, "Sodium acetate", "C2H3NaO2")).unwrap();
        store
    }

    fn retention_time_count(store: &MemoryStore) -> usize {
        store.retention_times(Page::default()).unwrap().len()
    }

    #[test]
    fn create_adducts() {
        let store = MemoryStore::new();
        let ingestor = Ingestor::new(&DB, &store);

        let protonated = ingestor.create_adduct(adduct("M+H", 1.007_276, "positive")).unwrap();
        assert_eq!(protonated.id, AdductId::from(1));
        assert_eq!(protonated.name, "M+H");

        assert!(matches!(
            ingestor.create_adduct(adduct("M+H", 1.007_276, "positive")),
            Err(IngestError::Duplicate(Conflict::Adduct(name))) if name == "M+H"
        ));
        assert!(matches!(
            ingestor.create_adduct(adduct("[M+H]+", 1.007_276, "positive")),
            Err(IngestError::InvalidAdduct(_))
        ));
        assert!(matches!(
            ingestor.create_adduct(adduct("M+K", 38.963_158, "positive")),
            Err(IngestError::InvalidAdduct(_))
        ));
        assert_eq!(store.adducts(Page::default()).unwrap().len(), 1);
    }

    #[test]
    fn adduct_elements_are_configurable() {
        let store = MemoryStore::new();
        let ingestor = Ingestor::new(&DB, &store).with_adduct_elements(["H", "Na", "K"]);
        assert_eq!(ingestor.adduct_elements(), ["H", "Na", "K"]);
        assert!(ingestor.create_adduct(adduct("M+K", 38.963_158, "positive")).is_ok());

        let sodium_only = Ingestor::new(&DB, &store).with_adduct_elements(["Na"]);
        assert!(matches!(
            sodium_only.create_adduct(adduct("M-H", -1.007_276, "negative")),
            Err(IngestError::InvalidAdduct(_))
        ));
    }

    #[test]
    fn create_compounds() {
        let store = MemoryStore::new();
        let ingestor = Ingestor::new(&DB, &store);

        let steroid = ingestor.create_compound(compound(1, "Steroid-d3", "C21H25[2]H3O4")).unwrap();
        assert_eq!(steroid.molecular_formula, "C21H25[2H3]O4");
        assert_float_absolute_eq!(steroid.monoisotopic_mass, 347.217_589_618_39, 1e-6);

        let glucose = ingestor.create_compound(compound(4, "Glucose-13C6", "[13]C6H12O6")).unwrap();
        assert_eq!(glucose.molecular_formula, "[13C6]H12O6");
        assert_float_absolute_eq!(glucose.monoisotopic_mass, 186.083_517_114_6, 1e-6);

        assert!(matches!(
            ingestor.create_compound(compound(1, "Steroid-d3 again", "C21H25[2]H3O4")),
            Err(IngestError::Duplicate(Conflict::Compound(id))) if id == CompoundId::from(1)
        ));
        assert!(matches!(
            ingestor.create_compound(compound(2, "Broken", "C6H12Xy")),
            Err(IngestError::Formula(_))
        ));
        assert!(matches!(
            ingestor.create_compound(compound(3, "Exotic", "[42C]H4")),
            Err(IngestError::MassLookup(_))
        ));
        assert_eq!(store.compounds(Page::default()).unwrap().len(), 2);
    }

    #[test]
    fn retention_times_are_reused() {
        let store = MemoryStore::new();
        let ingestor = Ingestor::new(&DB, &store);

        let first = ingestor
            .get_or_create_retention_time(5.32, Some("initial run".to_owned()))
            .unwrap();
        let second = ingestor
            .get_or_create_retention_time(5.32, Some("rerun".to_owned()))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.comment.as_deref(), Some("initial run"));

        let other = ingestor.get_or_create_retention_time(5.33, None).unwrap();
        assert_eq!(other.id, RetentionTimeId::from(2));

        for value in [0.0, -5.32, f64::INFINITY] {
            assert!(matches!(
                ingestor.get_or_create_retention_time(value, None),
                Err(IngestError::InvalidRetentionTime(_))
            ));
        }
        assert_eq!(retention_time_count(&store), 2);
    }

    #[test]
    fn racing_retention_times_converge() {
        const WRITERS: usize = 8;
        let store = MemoryStore::new();
        let barrier = Barrier::new(WRITERS);

        let ids: Vec<_> = thread::scope(|s| {
            let writers: Vec<_> = (0..WRITERS)
                .map(|_| {
                    let (store, barrier) = (&store, &barrier);
                    s.spawn(move || {
                        let ingestor = Ingestor::new(&DB, store);
                        barrier.wait();
                        ingestor.get_or_create_retention_time(3.3, None).unwrap().id
                    })
                })
                .collect();
            writers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(ids.iter().all(|&id| id == RetentionTimeId::from(1)));
        assert_eq!(retention_time_count(&store), 1);
    }

    #[test]
    fn racing_measured_compounds_insert_once() {
        const WRITERS: usize = 8;
        let store = seeded_store();
        let barrier = Barrier::new(WRITERS);

        let results: Vec<_> = thread::scope(|s| {
            let writers: Vec<_> = (0..WRITERS)
                .map(|_| {
                    let (store, barrier) = (&store, &barrier);
                    s.spawn(move || {
                        let ingestor = Ingestor::new(&DB, store);
                        barrier.wait();
                        ingestor.create_measured_compound(measurement(1, "M-H", 5.32))
                    })
                })
                .collect();
            writers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let (inserted, rejected): (Vec<_>, Vec<_>) = results.into_iter().partition(std::result::Result::is_ok);
        assert_eq!(inserted.len(), 1);
        assert_eq!(rejected.len(), WRITERS - 1);
        for result in rejected {
            assert!(matches!(
                result,
                Err(IngestError::Duplicate(Conflict::MeasuredCompound {
                    compound,
                    adduct,
                    retention_time,
                })) if compound == CompoundId::from(1)
                    && adduct == AdductId::from(2)
                    && retention_time == RetentionTimeId::from(1)
            ));
        }

        let listed = store
            .measured_compounds(&MeasuredCompoundFilter::default(), Page::default())
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].molecular_formula, "C21H24[2]H3O4");
        assert_eq!(retention_time_count(&store), 1);
    }

    #[test]
    fn create_measured_compounds() {
        let store = seeded_store();
        let ingestor = Ingestor::new(&DB, &store);

        let deprotonated = ingestor.create_measured_compound(measurement(1, "M-H", 5.32)).unwrap();
        assert_eq!(deprotonated.molecular_formula, "C21H24[2]H3O4");
        assert_float_absolute_eq!(deprotonated.monoisotopic_mass, 346.209_764_586_16, 1e-6);
        assert_eq!(deprotonated.compound.id, CompoundId::from(1));
        assert_eq!(deprotonated.adduct.name, "M-H");
        assert_eq!(deprotonated.retention_time.id, RetentionTimeId::from(1));

        let protonated = ingestor.create_measured_compound(measurement(1, "M+H", 5.32)).unwrap();
        assert_eq!(protonated.molecular_formula, "C21H26[2]H3O4");
        assert_float_absolute_eq!(protonated.monoisotopic_mass, 348.225_414_650_62, 1e-6);
        assert_eq!(protonated.retention_time.id, deprotonated.retention_time.id);

        let acetate = ingestor.create_measured_compound(measurement(5, "M-Na", 1.05)).unwrap();
        assert_eq!(acetate.molecular_formula, "C2H3O2");
        assert_float_absolute_eq!(acetate.monoisotopic_mass, 59.013_304_335_83, 1e-6);

        assert_eq!(retention_time_count(&store), 2);
        let listed = store
            .measured_compounds(&MeasuredCompoundFilter::default(), Page::default())
            .unwrap();
        assert_eq!(listed, [deprotonated, protonated, acetate]);
    }

    #[test]
    fn duplicate_measurements_keep_the_first() {
        let store = seeded_store();
        let ingestor = Ingestor::new(&DB, &store);

        let first = ingestor.create_measured_compound(measurement(1, "M+H", 5.32)).unwrap();
        let again = NewMeasurement {
            retention_time_comment: Some("rerun".to_owned()),
            ..measurement(1, "M+H", 5.32)
        };
        assert!(matches!(
            ingestor.create_measured_compound(again),
            Err(IngestError::Duplicate(Conflict::MeasuredCompound { .. }))
        ));

        let listed = store
            .measured_compounds(&MeasuredCompoundFilter::default(), Page::default())
            .unwrap();
        assert_eq!(listed, [first]);
        assert_eq!(retention_time_count(&store), 1);
    }

    #[test]
    fn failed_measurements_leave_no_trace() {
        let store = seeded_store();
        let ingestor = Ingestor::new(&DB, &store);

        assert!(matches!(
            ingestor.create_measured_compound(measurement(1, "M+H", 0.0)),
            Err(IngestError::InvalidRetentionTime(_))
        ));
        assert!(matches!(
            ingestor.create_measured_compound(measurement(1, "M+Na", 5.32)),
            Err(IngestError::NotFound(Missing::Adduct(name))) if name == "M+Na"
        ));
        assert!(matches!(
            ingestor.create_measured_compound(measurement(99, "M+H", 5.32)),
            Err(IngestError::NotFound(Missing::Compound(id))) if id == CompoundId::from(99)
        ));
        assert!(matches!(
            ingestor.create_measured_compound(measurement(1, "M-Na", 5.32)),
            Err(IngestError::InvalidAdduct(formula::InvalidAdductError::Underflow { .. }))
        ));

        assert_eq!(retention_time_count(&store), 0);
        let listed = store
            .measured_compounds(&MeasuredCompoundFilter::default(), Page::default())
            .unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn references_are_resolved_before_formula_work() {
        let store = seeded_store();
        // NOTE: Technetium has no natural abundances, so weighing this formula is guaranteed to fail
        store
            .insert_compound(Compound {
                id: CompoundId::from(7),
                name: "Unweighable".to_owned(),
                molecular_formula: "C6H5Tc".to_owned(),
                kind: None,
                monoisotopic_mass: 0.0,
            })
            .unwrap();
        let ingestor = Ingestor::new(&DB, &store);

        assert!(matches!(
            ingestor.create_measured_compound(measurement(7, "M+Na", 2.0)),
            Err(IngestError::NotFound(Missing::Adduct(_)))
        ));
        assert!(matches!(
            ingestor.create_measured_compound(measurement(7, "M+H", 2.0)),
            Err(IngestError::MassLookup(_))
        ));
        assert_eq!(retention_time_count(&store), 0);
    }

    #[test]
    fn narrowed_whitelists_reject_stored_adducts() {
        let store = seeded_store();
        let ingestor = Ingestor::new(&DB, &store).with_adduct_elements(["Na"]);
        assert!(matches!(
            ingestor.create_measured_compound(measurement(1, "M+H", 5.32)),
            Err(IngestError::InvalidAdduct(formula::InvalidAdductError::Element { .. }))
        ));
        assert_eq!(retention_time_count(&store), 0);
    }
}
