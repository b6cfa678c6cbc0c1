use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, keys};
use crate::model::{HolidayRecord, LeaveInterval};

/// Leave and holiday records as fetched for one view activation.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub leaves: Vec<LeaveInterval>,
    pub holidays: Vec<HolidayRecord>,
}

#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub leaves: PathBuf,
    pub holidays: PathBuf,
}

impl SnapshotPaths {
    pub fn resolve(cfg: &Config, data_dir: &Path) -> Self {
        Self {
            leaves: cfg.data_file(data_dir, keys::LEAVES_FILE),
            holidays: cfg.data_file(data_dir, keys::HOLIDAYS_FILE),
        }
    }
}

impl Snapshot {
    #[tracing::instrument(skip(paths), fields(leaves = %paths.leaves.display(), holidays = %paths.holidays.display()))]
    pub fn load(paths: &SnapshotPaths) -> anyhow::Result<Self> {
        let leaves = load_records(&paths.leaves).context("failed to load leave records")?;
        let holidays = load_records(&paths.holidays).context("failed to load holiday records")?;

        info!(
            leaves = leaves.len(),
            holidays = holidays.len(),
            "loaded calendar snapshot"
        );
        Ok(Self { leaves, holidays })
    }

    pub fn from_json(leaves: &str, holidays: &str) -> anyhow::Result<Self> {
        Ok(Self {
            leaves: parse_records(leaves).context("failed parsing leave records")?,
            holidays: parse_records(holidays).context("failed parsing holiday records")?,
        })
    }
}

#[tracing::instrument(skip(path))]
fn load_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        warn!(file = %path.display(), "snapshot file missing; treating as no data");
        return Ok(Vec::new());
    }

    debug!(file = %path.display(), "loading records");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    parse_records(&raw).with_context(|| format!("failed parsing {}", path.display()))
}

/// Accepts a bare array or an API envelope `{ "data": [...] }`.
fn parse_records<T: DeserializeOwned>(raw: &str) -> anyhow::Result<Vec<T>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let payload: Value = serde_json::from_str(raw)?;
    let records = match payload {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut envelope) => envelope
            .remove("data")
            .ok_or_else(|| anyhow!("expected a record array or an object with a `data` array"))?,
        other => bail!("expected a record array, got {other}"),
    };
    let records: Vec<T> = serde_json::from_value(records)?;
    debug!(count = records.len(), "parsed records");
    Ok(records)
}
