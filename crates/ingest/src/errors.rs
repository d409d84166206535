use formula::{FormulaError, InvalidAdductError, MassLookupError};
use miette::Diagnostic;
use thiserror::Error;

use crate::{AdductId, CompoundId, RetentionTimeId};

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Everything that can stop a single compound, adduct, or measurement from being ingested
#[derive(Debug, Diagnostic, Error)]
pub enum IngestError {
    #[diagnostic(transparent)]
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[diagnostic(transparent)]
    #[error(transparent)]
    MassLookup(#[from] MassLookupError),

    #[diagnostic(transparent)]
    #[error(transparent)]
    InvalidAdduct(#[from] InvalidAdductError),

    #[diagnostic(help("create it before ingesting measurements that refer to it"))]
    #[error("{0}")]
    NotFound(Missing),

    #[diagnostic(help("the earlier entry was kept unchanged"))]
    #[error("{0} already exists")]
    Duplicate(Conflict),

    #[diagnostic(help("retention times must be positive, finite numbers"))]
    #[error("{0} is not a valid retention time")]
    InvalidRetentionTime(f64),

    #[diagnostic(transparent)]
    #[error(transparent)]
    Store(StoreError),
}

// NOTE: Constraint violations are lifted out of `StoreError` so that callers only have one place to match on them
impl From<StoreError> for IngestError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(conflict) => Self::Duplicate(conflict),
            StoreError::InvalidRetentionTime(value) => Self::InvalidRetentionTime(value),
            error => Self::Store(error),
        }
    }
}

/// Failures reported by a [`crate::Store`]
#[derive(Clone, PartialEq, Debug, Diagnostic, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(Conflict),

    #[error("{0} is not a valid retention time")]
    InvalidRetentionTime(f64),

    #[diagnostic(help("retention-time filters must be positive, and referenced rows must already exist"))]
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("the store was poisoned by a writer that panicked")]
    Poisoned,
}

/// The unique value that an insertion collided with
#[derive(Clone, PartialEq, Debug, Error)]
pub enum Conflict {
    #[error("a compound with the id {0}")]
    Compound(CompoundId),

    #[error("an adduct named {0:?}")]
    Adduct(String),

    #[error("a retention time of {0}")]
    RetentionTime(f64),

    #[error(
        "a measured compound for compound {compound}, adduct {adduct}, and retention time {retention_time}"
    )]
    MeasuredCompound {
        compound: CompoundId,
        adduct: AdductId,
        retention_time: RetentionTimeId,
    },
}

/// The reference that a measurement couldn't resolve
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum Missing {
    #[error("no compound with the id {0} exists")]
    Compound(CompoundId),

    #[error("no adduct named {0:?} exists")]
    Adduct(String),
}

/// File-level problems that stop a whole batch from loading (bad records are skipped instead)
#[derive(Debug, Diagnostic, Error)]
pub enum LoadError {
    #[diagnostic(help("adducts should be a JSON array of objects with name, mass, and ion_mode fields"))]
    #[error("failed to read the adduct list")]
    Json(#[from] serde_json::Error),

    #[error("failed to read a CSV file")]
    Csv(#[from] csv::Error),

    #[diagnostic(help("the header row of the file needs a column with exactly this name"))]
    #[error("the {file} file is missing the required column {column:?}")]
    MissingColumn {
        file: &'static str,
        column: &'static str,
    },
}
