use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ActualRecord, BudgetInputs, Holding, ScheduleConfig, net_worth_totals};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid slot name {0:?}: use 1-64 letters, digits, '-' or '_'")]
    InvalidSlot(String),
    #[error("failed to access plan storage: {0}")]
    Io(#[from] io::Error),
    #[error("stored plan is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Everything a named plan slot persists: the snapshot of holdings, the
/// contribution/return schedule, the recorded actuals, and the budget
/// worksheet.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    #[serde(default)]
    pub holdings: Vec<Holding>,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub actuals: Vec<ActualRecord>,
    #[serde(default)]
    pub budget: BudgetInputs,
}

impl PlanSnapshot {
    pub fn starting_balance(&self) -> f64 {
        net_worth_totals(&self.holdings).net_worth
    }
}

/// Persistence seam for named plan slots. The engine never sees this; the
/// presentation layer owns loading and saving.
pub trait PlanRepository {
    fn list(&self) -> Result<Vec<String>, StoreError>;
    fn load(&self, slot: &str) -> Result<Option<PlanSnapshot>, StoreError>;
    fn save(&self, slot: &str, plan: &PlanSnapshot) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per slot under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf, StoreError> {
        if !valid_slot_name(slot) {
            return Err(StoreError::InvalidSlot(slot.to_string()));
        }
        Ok(self.dir.join(format!("{slot}.json")))
    }
}

fn valid_slot_name(slot: &str) -> bool {
    !slot.is_empty()
        && slot.len() <= 64
        && slot
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl PlanRepository for JsonFileStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut slots = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if valid_slot_name(stem) {
                    slots.push(stem.to_string());
                }
            }
        }
        slots.sort();
        Ok(slots)
    }

    fn load(&self, slot: &str) -> Result<Option<PlanSnapshot>, StoreError> {
        let path = self.slot_path(slot)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, slot: &str, plan: &PlanSnapshot) -> Result<(), StoreError> {
        let path = self.slot_path(slot)?;
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(plan)?;
        fs::write(path, raw)?;
        Ok(())
    }
}
