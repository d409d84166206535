//! Turns reference compounds, adducts, and retention times into uniquely identified measured compounds

mod errors;
pub mod loader;
mod memory;
mod pipeline;
mod store;

// External Crate Imports
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

pub use errors::{Conflict, IngestError, LoadError, Missing, Result, StoreError};
pub use loader::{LoadReport, PopulationReport, SkippedRecord, Sources};
pub use memory::MemoryStore;
pub use pipeline::Ingestor;
pub use store::{MeasuredCompoundFilter, Page, Store};

// Identifiers =========================================================================================================

/// Assigned by whoever supplies the compound (usually the `compound_id` column of a compound list)
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundId(u64);

// NOTE: The remaining identifiers are only ever minted by a `Store`
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdductId(u64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetentionTimeId(u64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasuredCompoundId(u64);

// Stored Entities =====================================================================================================

/// A reference compound, with its monoisotopic mass computed from `molecular_formula` when it was created
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Compound {
    pub id: CompoundId,
    pub name: String,
    /// Stored with isotopes in the canonical `[2H3]` notation
    pub molecular_formula: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub monoisotopic_mass: f64,
}

/// A named ion species like `M+H`, along with its reference mass shift and ionization mode
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Adduct {
    pub id: AdductId,
    pub name: String,
    pub mass_adjustment: f64,
    pub ion_mode: String,
}

/// A chromatographic retention time, shared by every measurement made at exactly that value
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct RetentionTime {
    pub id: RetentionTimeId,
    pub value: f64,
    pub comment: Option<String>,
}

/// The ion actually observed for a compound: unique for each (compound, adduct, retention time) triple
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct MeasuredCompound {
    pub id: MeasuredCompoundId,
    pub compound: Compound,
    pub adduct: Adduct,
    pub retention_time: RetentionTime,
    /// Stored with isotopes in the external `[2]H3` notation
    pub molecular_formula: String,
    pub monoisotopic_mass: f64,
}

// Creation Requests ===================================================================================================

#[derive(Clone, PartialEq, Debug)]
pub struct NewCompound {
    pub id: CompoundId,
    pub name: String,
    pub molecular_formula: String,
    pub kind: Option<String>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct NewAdduct {
    pub name: String,
    pub mass_adjustment: f64,
    pub ion_mode: String,
}

/// A measurement to ingest: everything is referenced by the identifiers a user actually knows
#[derive(Clone, PartialEq, Debug)]
pub struct NewMeasurement {
    pub compound_id: CompoundId,
    pub adduct_name: String,
    pub retention_time: f64,
    pub retention_time_comment: Option<String>,
}

/// A fully resolved measured compound, ready for [`Store::insert_measured_compound`]
#[derive(Clone, PartialEq, Debug)]
pub struct NewMeasuredCompound {
    pub compound_id: CompoundId,
    pub adduct_id: AdductId,
    pub retention_time_id: RetentionTimeId,
    pub molecular_formula: String,
    pub monoisotopic_mass: f64,
}

// =====================================================================================================================

assert_impl_all!(MemoryStore: Send, Sync);
assert_impl_all!(Ingestor<'static>: Send, Sync);
