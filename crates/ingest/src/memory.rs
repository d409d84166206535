use std::sync::{Mutex, MutexGuard};

use ahash::{HashMap, HashSet};
use ordered_float::OrderedFloat;

use crate::{
    Adduct, AdductId, Compound, CompoundId, MeasuredCompound, MeasuredCompoundId, NewAdduct, NewMeasuredCompound,
    RetentionTime, RetentionTimeId,
    errors::{Conflict, StoreError},
    store::{MeasuredCompoundFilter, Page, Store, check_retention_time},
};

// Public API ==========================================================================================================

/// A [`Store`] that keeps everything in memory, behind a single lock
///
/// Every uniqueness check happens while that lock is held, so racing writers see [`StoreError::Duplicate`] exactly
/// like they would from a database's unique constraint. Listings come back in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

// Table Layout ========================================================================================================

type RetentionTimeKey = OrderedFloat<f64>;
type Triple = (CompoundId, AdductId, RetentionTimeId);

// NOTE: Minted ids are one more than the row's index in its `Vec`, so they start at 1 and lookups are direct
#[derive(Debug, Default)]
struct Tables {
    compounds: Vec<Compound>,
    compound_rows: HashMap<CompoundId, usize>,
    adducts: Vec<Adduct>,
    adduct_names: HashMap<String, AdductId>,
    retention_times: Vec<RetentionTime>,
    retention_time_values: HashMap<RetentionTimeKey, RetentionTimeId>,
    measured_compounds: Vec<MeasuredRow>,
    measured_triples: HashSet<Triple>,
}

#[derive(Debug)]
struct MeasuredRow {
    id: MeasuredCompoundId,
    triple: Triple,
    molecular_formula: String,
    monoisotopic_mass: f64,
}

const fn next_id(rows: usize) -> u64 {
    rows as u64 + 1
}

fn row_of(id: u64) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

impl Tables {
    fn compound(&self, id: CompoundId) -> Option<&Compound> {
        self.compound_rows.get(&id).map(|&row| &self.compounds[row])
    }

    fn adduct(&self, id: AdductId) -> Option<&Adduct> {
        row_of(id.into()).and_then(|row| self.adducts.get(row))
    }

    fn retention_time(&self, id: RetentionTimeId) -> Option<&RetentionTime> {
        row_of(id.into()).and_then(|row| self.retention_times.get(row))
    }

    fn join(&self, row: &MeasuredRow) -> Option<MeasuredCompound> {
        let (compound, adduct, retention_time) = row.triple;
        Some(MeasuredCompound {
            id: row.id,
            compound: self.compound(compound)?.clone(),
            adduct: self.adduct(adduct)?.clone(),
            retention_time: self.retention_time(retention_time)?.clone(),
            molecular_formula: row.molecular_formula.clone(),
            monoisotopic_mass: row.monoisotopic_mass,
        })
    }
}

// Store Implementation ================================================================================================

impl Store for MemoryStore {
    fn insert_compound(&self, compound: Compound) -> Result<Compound, StoreError> {
        let mut tables = self.tables()?;
        if tables.compound_rows.contains_key(&compound.id) {
            return Err(StoreError::Duplicate(Conflict::Compound(compound.id)));
        }

        let row = tables.compounds.len();
        tables.compound_rows.insert(compound.id, row);
        tables.compounds.push(compound.clone());
        Ok(compound)
    }

    fn insert_adduct(&self, adduct: NewAdduct) -> Result<Adduct, StoreError> {
        let mut tables = self.tables()?;
        if tables.adduct_names.contains_key(&adduct.name) {
            return Err(StoreError::Duplicate(Conflict::Adduct(adduct.name)));
        }

        let id = AdductId::from(next_id(tables.adducts.len()));
        let NewAdduct {
            name,
            mass_adjustment,
            ion_mode,
        } = adduct;
        let adduct = Adduct {
            id,
            name,
            mass_adjustment,
            ion_mode,
        };
        tables.adduct_names.insert(adduct.name.clone(), id);
        tables.adducts.push(adduct.clone());
        Ok(adduct)
    }

    fn insert_retention_time(&self, value: f64, comment: Option<String>) -> Result<RetentionTime, StoreError> {
        check_retention_time(value)?;
        let mut tables = self.tables()?;
        let key = OrderedFloat(value);
        if tables.retention_time_values.contains_key(&key) {
            return Err(StoreError::Duplicate(Conflict::RetentionTime(value)));
        }

        let id = RetentionTimeId::from(next_id(tables.retention_times.len()));
        let retention_time = RetentionTime { id, value, comment };
        tables.retention_time_values.insert(key, id);
        tables.retention_times.push(retention_time.clone());
        Ok(retention_time)
    }

    fn insert_measured_compound(&self, measured: NewMeasuredCompound) -> Result<MeasuredCompound, StoreError> {
        let mut tables = self.tables()?;
        let NewMeasuredCompound {
            compound_id,
            adduct_id,
            retention_time_id,
            molecular_formula,
            monoisotopic_mass,
        } = measured;

        let compound = tables.compound(compound_id).cloned();
        let compound = compound.ok_or_else(|| missing_reference("compound", compound_id))?;
        let adduct = tables.adduct(adduct_id).cloned();
        let adduct = adduct.ok_or_else(|| missing_reference("adduct", adduct_id))?;
        let retention_time = tables.retention_time(retention_time_id).cloned();
        let retention_time = retention_time.ok_or_else(|| missing_reference("retention time", retention_time_id))?;

        let triple = (compound_id, adduct_id, retention_time_id);
        if !tables.measured_triples.insert(triple) {
            return Err(StoreError::Duplicate(Conflict::MeasuredCompound {
                compound: compound_id,
                adduct: adduct_id,
                retention_time: retention_time_id,
            }));
        }

        let id = MeasuredCompoundId::from(next_id(tables.measured_compounds.len()));
        tables.measured_compounds.push(MeasuredRow {
            id,
            triple,
            molecular_formula: molecular_formula.clone(),
            monoisotopic_mass,
        });
        Ok(MeasuredCompound {
            id,
            compound,
            adduct,
            retention_time,
            molecular_formula,
            monoisotopic_mass,
        })
    }

    fn find_adduct(&self, name: &str) -> Result<Option<Adduct>, StoreError> {
        let tables = self.tables()?;
        let id = tables.adduct_names.get(name).copied();
        Ok(id.and_then(|id| tables.adduct(id)).cloned())
    }

    fn find_compound(&self, id: CompoundId) -> Result<Option<Compound>, StoreError> {
        Ok(self.tables()?.compound(id).cloned())
    }

    fn find_retention_time(&self, value: f64) -> Result<Option<RetentionTime>, StoreError> {
        let tables = self.tables()?;
        let id = tables.retention_time_values.get(&OrderedFloat(value)).copied();
        Ok(id.and_then(|id| tables.retention_time(id)).cloned())
    }

    fn adduct(&self, id: AdductId) -> Result<Option<Adduct>, StoreError> {
        Ok(self.tables()?.adduct(id).cloned())
    }

    fn retention_time(&self, id: RetentionTimeId) -> Result<Option<RetentionTime>, StoreError> {
        Ok(self.tables()?.retention_time(id).cloned())
    }

    fn measured_compound(&self, id: MeasuredCompoundId) -> Result<Option<MeasuredCompound>, StoreError> {
        let tables = self.tables()?;
        let row = row_of(id.into()).and_then(|row| tables.measured_compounds.get(row));
        Ok(row.and_then(|row| tables.join(row)))
    }

    fn compounds(&self, page: Page) -> Result<Vec<Compound>, StoreError> {
        Ok(page.apply(&self.tables()?.compounds).cloned().collect())
    }

    fn adducts(&self, page: Page) -> Result<Vec<Adduct>, StoreError> {
        Ok(page.apply(&self.tables()?.adducts).cloned().collect())
    }

    fn retention_times(&self, page: Page) -> Result<Vec<RetentionTime>, StoreError> {
        Ok(page.apply(&self.tables()?.retention_times).cloned().collect())
    }

    fn measured_compounds(
        &self,
        filter: &MeasuredCompoundFilter,
        page: Page,
    ) -> Result<Vec<MeasuredCompound>, StoreError> {
        filter.validate()?;
        let tables = self.tables()?;
        let matching = tables
            .measured_compounds
            .iter()
            .filter_map(|row| tables.join(row))
            .filter(|measured| filter.matches(measured));
        Ok(page.apply(matching).collect())
    }
}

fn missing_reference(table: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::InvalidQuery(format!("the referenced {table} ({id}) does not exist"))
}
