//! Bulk loading of adduct lists (JSON), compound lists (CSV), and measurement lists (CSV)
//!
//! Loading is tolerant: a record that can't be read or ingested is logged, noted in the [`LoadReport`], and skipped,
//! while the rest of the batch carries on. Only problems with a file as a whole produce a [`LoadError`].

use std::io::Read;

use csv::{Position, ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{CompoundId, NewAdduct, NewCompound, NewMeasurement, errors::LoadError, pipeline::Ingestor};

// Record Shapes =======================================================================================================

/// One entry of the adduct list, like `{ "name": "M+H", "mass": 1.007276, "ion_mode": "positive" }`
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct AdductRecord {
    pub name: String,
    pub mass: f64,
    pub ion_mode: String,
}

/// One row of the compound list
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct CompoundRecord {
    pub compound_id: CompoundId,
    pub compound_name: String,
    pub molecular_formula: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One row of the measurement list; rows without an adduct name are skipped
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct MeasurementRecord {
    pub compound_id: CompoundId,
    #[serde(default)]
    pub compound_name: Option<String>,
    #[serde(default)]
    pub adduct_name: Option<String>,
    pub retention_time: f64,
    #[serde(default)]
    pub retention_time_comment: Option<String>,
}

impl From<AdductRecord> for NewAdduct {
    fn from(AdductRecord { name, mass, ion_mode }: AdductRecord) -> Self {
        Self {
            name,
            mass_adjustment: mass,
            ion_mode,
        }
    }
}

impl From<CompoundRecord> for NewCompound {
    fn from(
        CompoundRecord {
            compound_id,
            compound_name,
            molecular_formula,
            kind,
        }: CompoundRecord,
    ) -> Self {
        Self {
            id: compound_id,
            name: compound_name,
            molecular_formula,
            kind,
        }
    }
}

// Reports =============================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct SkippedRecord {
    /// Where the record came from, like `line 7` or `entry 3`
    pub record: String,
    pub reason: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct PopulationReport {
    pub adducts: LoadReport,
    pub compounds: LoadReport,
    pub measurements: LoadReport,
}

/// Where [`Ingestor::populate`] reads each of its three lists from
#[derive(Clone, Debug)]
pub struct Sources<A, C, M> {
    pub adducts: A,
    pub compounds: C,
    pub measurements: M,
}

impl LoadReport {
    fn tally(&mut self, record: String, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.loaded += 1,
            Err(reason) => {
                warn!("skipping {record}: {reason}");
                self.skipped.push(SkippedRecord { record, reason });
            }
        }
    }
}

// Public API ==========================================================================================================

const COMPOUND_COLUMNS: [&str; 3] = ["compound_id", "compound_name", "molecular_formula"];
const MEASUREMENT_COLUMNS: [&str; 3] = ["compound_id", "adduct_name", "retention_time"];

impl Ingestor<'_> {
    /// Creates an adduct for every entry of a JSON array of [`AdductRecord`]s
    ///
    /// # Errors
    ///
    /// Fails if the input isn't a JSON array
    pub fn load_adducts(&self, reader: impl Read) -> Result<LoadReport, LoadError> {
        let entries: Vec<serde_json::Value> = serde_json::from_reader(reader)?;

        let mut report = LoadReport::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let outcome = serde_json::from_value::<AdductRecord>(entry)
                .map_err(|e| e.to_string())
                .and_then(|record| self.create_adduct(record.into()).map_err(|e| e.to_string()))
                .map(drop);
            report.tally(format!("entry {}", index + 1), outcome);
        }
        Ok(report)
    }

    /// Creates a compound for every row of a CSV file of [`CompoundRecord`]s
    ///
    /// # Errors
    ///
    /// Fails if the CSV can't be read or if its header row lacks a required column
    pub fn load_compounds(&self, reader: impl Read) -> Result<LoadReport, LoadError> {
        load_csv(reader, "compound", &COMPOUND_COLUMNS, |record: CompoundRecord| {
            self.create_compound(record.into()).map(drop).map_err(|e| e.to_string())
        })
    }

    /// Creates a measured compound for every row of a CSV file of [`MeasurementRecord`]s
    ///
    /// # Errors
    ///
    /// Fails if the CSV can't be read or if its header row lacks a required column
    pub fn load_measurements(&self, reader: impl Read) -> Result<LoadReport, LoadError> {
        load_csv(reader, "measurement", &MEASUREMENT_COLUMNS, |record: MeasurementRecord| {
            let MeasurementRecord {
                compound_id,
                compound_name,
                adduct_name,
                retention_time,
                retention_time_comment,
            } = record;
            let adduct_name = adduct_name.ok_or("no adduct name was given")?;
            debug!(
                "ingesting {adduct_name} of compound {compound_id} ({}) at {retention_time}",
                compound_name.as_deref().unwrap_or("unnamed")
            );

            let measurement = NewMeasurement {
                compound_id,
                adduct_name,
                retention_time,
                retention_time_comment,
            };
            self.create_measured_compound(measurement).map(drop).map_err(|e| e.to_string())
        })
    }

    /// Loads adducts, then compounds, then measurements (which refer to both)
    ///
    /// # Errors
    ///
    /// Stops at the first list that can't be read at all
    pub fn populate<A: Read, C: Read, M: Read>(
        &self,
        Sources {
            adducts,
            compounds,
            measurements,
        }: Sources<A, C, M>,
    ) -> Result<PopulationReport, LoadError> {
        let adducts = self.load_adducts(adducts)?;
        info!("loaded {} adducts ({} skipped)", adducts.loaded, adducts.skipped.len());
        let compounds = self.load_compounds(compounds)?;
        info!("loaded {} compounds ({} skipped)", compounds.loaded, compounds.skipped.len());
        let measurements = self.load_measurements(measurements)?;
        info!(
            "loaded {} measured compounds ({} skipped)",
            measurements.loaded,
            measurements.skipped.len()
        );

        Ok(PopulationReport {
            adducts,
            compounds,
            measurements,
        })
    }
}

// CSV Reading =========================================================================================================

fn load_csv<T: DeserializeOwned>(
    reader: impl Read,
    file: &'static str,
    required: &[&'static str],
    mut ingest: impl FnMut(T) -> Result<(), String>,
) -> Result<LoadReport, LoadError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    if let Some(&column) = required.iter().find(|&&c| !headers.iter().any(|h| h == c)) {
        return Err(LoadError::MissingColumn { file, column });
    }

    let mut report = LoadReport::default();
    let mut row = StringRecord::new();
    loop {
        match reader.read_record(&mut row) {
            Ok(false) => break,
            Ok(true) => {
                let outcome = row
                    .deserialize(Some(&headers))
                    .map_err(|e| e.to_string())
                    .and_then(&mut ingest);
                report.tally(line_of(row.position()), outcome);
            }
            Err(error) if error.is_io_error() => return Err(error.into()),
            Err(error) => report.tally(line_of(error.position()), Err(error.to_string())),
        }
    }
    Ok(report)
}

fn line_of(position: Option<&Position>) -> String {
    position.map_or_else(|| "an unknown line".to_owned(), |p| format!("line {}", p.line()))
}
