//! Campaign definition loading and validation.

pub mod dates;
pub mod feed;
pub mod models;

use std::path::Path;

use anyhow::{Context, Result};

use crate::campaign::models::Campaign;
use crate::error::ForecastError;

/// Load a campaign definition from a JSON document and validate it. All
/// structural problems are reported here, before the pipeline starts.
pub fn load_campaign(path: &Path) -> Result<Campaign> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read campaign file: {}", path.display()))?;
    let campaign: Campaign = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse campaign file: {}", path.display()))?;
    validate(&campaign, &path.display().to_string())?;
    Ok(campaign)
}

/// Load a normalized feed from a JSON document. Sorting and banned-pollster
/// filtering happen later, in [`feed::Feed::normalize`].
pub fn load_feed(path: &Path) -> Result<feed::Feed> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read feed file: {}", path.display()))?;
    let feed: feed::Feed = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse feed file: {}", path.display()))?;
    Ok(feed)
}

pub fn validate(campaign: &Campaign, source: &str) -> Result<(), ForecastError> {
    if campaign.start_date > campaign.end_date {
        return Err(ForecastError::config(
            source,
            format!(
                "start date {} is after election day {}",
                campaign.start_date, campaign.end_date
            ),
        ));
    }

    for state in &campaign.states {
        if state.evs <= 0 {
            return Err(ForecastError::config(
                source,
                format!("state {} has non-positive electoral votes", state.name),
            ));
        }
    }
    if campaign.is_presidential_year && campaign.states.is_empty() {
        return Err(ForecastError::config(
            source,
            "presidential year campaign has no state list",
        ));
    }

    for (name, chamber) in [
        ("senate", &campaign.senate),
        ("governor", &campaign.governor),
        ("house", &campaign.house),
    ] {
        if chamber.races.is_empty() {
            continue;
        }
        if chamber.total_seats <= 0 {
            return Err(ForecastError::config(
                source,
                format!("{name} roster is non-empty but total_seats is unset"),
            ));
        }
        if chamber.seats.dem + chamber.seats.gop > chamber.total_seats {
            return Err(ForecastError::config(
                source,
                format!("{name} held seats exceed total_seats"),
            ));
        }
        for (i, race) in chamber.races.iter().enumerate() {
            if race.race_id != i {
                return Err(ForecastError::config(
                    source,
                    format!("{name} race {} has race_id {} (expected {i})", race.region, race.race_id),
                ));
            }
        }
    }

    if !campaign.senate.races.is_empty() && campaign.senate.dem_seats_for_control <= 0 {
        return Err(ForecastError::config(
            source,
            "senate roster is non-empty but dem_seats_for_control is unset",
        ));
    }

    let mut last = None;
    for snapshot in &campaign.house_rating_history {
        if let Some(prev) = last {
            if snapshot.date < prev {
                return Err(ForecastError::config(
                    source,
                    "house rating history is not in chronological order",
                ));
            }
        }
        last = Some(snapshot.date);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{HashMap, HashSet};

    use chrono::NaiveDate;

    use super::models::*;

    pub fn make_campaign() -> Campaign {
        Campaign {
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2020, 11, 3).unwrap(),
            is_presidential_year: true,
            undecided_pct: 5.0,
            dem_pres: "Delta".to_string(),
            gop_pres: "Gamma".to_string(),
            election_type: "general".to_string(),
            states: vec![],
            assumed_margins: HashMap::new(),
            senate: ChamberMap::default(),
            governor: ChamberMap::default(),
            house: ChamberMap::default(),
            banned_pollsters: HashSet::new(),
            important_dates: vec![],
            house_rating_history: vec![],
            race_results: RaceResults::default(),
        }
    }

    pub fn make_poll(
        pollster: &str,
        start: NaiveDate,
        end: NaiveDate,
        dem: f64,
        gop: f64,
    ) -> Poll {
        Poll {
            description: pollster.to_string(),
            start,
            end,
            published: None,
            dem,
            gop,
            margin: dem - gop,
            sample_size: 800,
            sample_type: SampleType::Lv,
            url: String::new(),
            id: String::new(),
            tracking: false,
            partisan: false,
            grade: 0,
            weight: 0.0,
        }
    }

    pub fn make_race(race_id: usize, region: &str) -> Race {
        Race {
            race_id,
            region: region.to_string(),
            dem_candidate: String::new(),
            gop_candidate: String::new(),
            presumed_winner: None,
            current_holder: None,
            rating: None,
        }
    }
}
