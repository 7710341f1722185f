//! Saved-history import and export.
//!
//! The exported record is a single JSON document; re-importing it lets a
//! later run reuse every already-analyzed day instead of recomputing the
//! whole campaign.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::campaign::models::Campaign;
use crate::error::ForecastError;
use crate::forecast::models::CampaignRecord;

pub const HISTORY_FILE: &str = "history.json";

/// Load a previously exported record, if one exists. A saved history for a
/// different election is useless and almost certainly a misconfiguration.
pub fn import(data_dir: &Path, campaign: &Campaign) -> Result<Option<CampaignRecord>> {
    let path = data_dir.join(HISTORY_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read history: {}", path.display()))?;
    let record: CampaignRecord = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse history: {}", path.display()))?;

    if record.election_day != campaign.end_date {
        return Err(ForecastError::InconsistentHistory {
            saved: record.election_day,
            campaign: campaign.end_date,
        }
        .into());
    }

    info!(
        days = record.history.len(),
        path = %path.display(),
        "imported saved history"
    );
    Ok(Some(record))
}

pub fn export(data_dir: &Path, record: &CampaignRecord) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data dir: {}", data_dir.display()))?;

    let path = data_dir.join(HISTORY_FILE);
    let json = serde_json::to_string(record).context("failed to serialize history")?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write history: {}", path.display()))?;

    info!(
        days = record.history.len(),
        path = %path.display(),
        "exported campaign history"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::test_support::make_campaign;
    use crate::forecast::models::ModelData;
    use chrono::NaiveDate;

    fn record_for(campaign: &Campaign) -> CampaignRecord {
        CampaignRecord {
            election_day: campaign.end_date,
            history: vec![ModelData::for_date(campaign.start_date)],
            ..CampaignRecord::default()
        }
    }

    #[test]
    fn test_round_trip_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let cc = make_campaign();
        let mut record = record_for(&cc);
        record.history[0].metamargin = 1.7;
        record.last_updated = 12345;

        export(dir.path(), &record).unwrap();
        let back = import(dir.path(), &cc).unwrap().unwrap();

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            serde_json::to_string(&back).unwrap()
        );
    }

    #[test]
    fn test_missing_history_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cc = make_campaign();
        assert!(import(dir.path(), &cc).unwrap().is_none());
    }

    #[test]
    fn test_mismatched_election_day_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cc = make_campaign();
        let mut record = record_for(&cc);
        record.election_day = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
        export(dir.path(), &record).unwrap();

        let err = import(dir.path(), &cc).unwrap_err();
        assert!(err.downcast_ref::<ForecastError>().is_some());
    }
}
