//! The top-level run: iterate the campaign calendar, analyze each day on a
//! worker pool, run the Bayesian predictor over the assembled history, and
//! export the record.
//!
//! Each day's ModelData is a pre-allocated slot owned by exactly one worker
//! during analysis; the main thread only reads the slots after the pool
//! barrier, so the hot path needs no locks and no completion queue.

pub mod history;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::info;

use crate::campaign::dates::{next_day, today, utc_now_secs};
use crate::campaign::feed::Feed;
use crate::campaign::models::{state_codes, Campaign};
use crate::error::ForecastError;
use crate::forecast::daily::analyze_day;
use crate::forecast::models::{CampaignRecord, ModelData};
use crate::forecast::predict;

pub const DEFAULT_NUM_THREADS: usize = 8;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    pub num_threads: usize,
    /// Discard any saved history and recompute every day.
    pub reset_history: bool,
    /// Analyze as if "today" were this date; defaults to the wall clock.
    pub today: Option<NaiveDate>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            num_threads: DEFAULT_NUM_THREADS,
            reset_history: false,
            today: None,
        }
    }
}

struct DaySlot {
    data: ModelData,
    needs_run: bool,
    use_results_feed: bool,
}

/// Run the full pipeline and export the record to the data directory.
pub fn run_forecast(campaign: &Campaign, mut feed: Feed, options: &RunOptions) -> Result<CampaignRecord> {
    feed.normalize(campaign);

    let reference_today = options.today.unwrap_or_else(today).min(campaign.end_date);

    let imported = if options.reset_history {
        None
    } else {
        history::import(&options.data_dir, campaign)?
    };
    let mut saved: BTreeMap<NaiveDate, ModelData> = imported
        .map(|record| {
            record
                .history
                .into_iter()
                .map(|day| (day.date, day))
                .collect()
        })
        .unwrap_or_default();

    let last_updated = utc_now_secs();

    // Pre-allocate one slot per day. Days before today with a saved record
    // are reused untouched; today (and anything newer or missing) is
    // recomputed.
    let mut slots: Vec<DaySlot> = Vec::new();
    let mut day = campaign.start_date;
    while day <= reference_today {
        let slot = match saved.remove(&day) {
            Some(data) if day < reference_today => DaySlot {
                data,
                needs_run: false,
                use_results_feed: false,
            },
            _ => DaySlot {
                data: ModelData::for_date(day),
                needs_run: true,
                use_results_feed: false,
            },
        };
        slots.push(slot);
        day = next_day(day);
    }

    // On election day with official results in hand, append one extra day
    // fed purely by those results.
    let has_final_results =
        reference_today == campaign.end_date && !campaign.race_results.is_empty();
    let results_feed = if has_final_results {
        slots.push(DaySlot {
            data: ModelData::for_date(next_day(campaign.end_date)),
            needs_run: true,
            use_results_feed: true,
        });
        Feed::from_results(campaign, reference_today)
    } else {
        Feed::default()
    };

    let pending = slots.iter().filter(|s| s.needs_run).count();
    info!(
        days = slots.len(),
        pending,
        threads = options.num_threads,
        "analyzing campaign calendar"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.num_threads)
        .build()
        .context("failed to build worker pool")?;
    pool.install(|| -> Result<(), ForecastError> {
        slots
            .par_iter_mut()
            .filter(|slot| slot.needs_run)
            .try_for_each(|slot| {
                let day_feed = if slot.use_results_feed {
                    &results_feed
                } else {
                    &feed
                };
                analyze_day(campaign, day_feed, &mut slot.data, reference_today)
            })
    })?;

    let mut record = CampaignRecord {
        feed_description: feed.info.description.clone(),
        presidential_year: campaign.is_presidential_year,
        dem_pres: campaign.dem_pres.clone(),
        gop_pres: campaign.gop_pres.clone(),
        last_updated,
        election_day: campaign.end_date,
        states: campaign.states.clone(),
        state_codes: state_codes(),
        senate: campaign.senate.clone(),
        governor: campaign.governor.clone(),
        house: campaign.house.clone(),
        important_dates: campaign.important_dates.clone(),
        results_evs: if has_final_results {
            campaign.race_results.electoral_votes
        } else {
            None
        },
        history: slots.into_iter().map(|slot| slot.data).collect(),
    };

    predict::predict(campaign, &mut record)?;

    history::export(&options.data_dir, &record)?;

    if let Some(last) = record.history.last() {
        info!(
            date = %last.date,
            dem_ev_mode = last.dem_ev_mode,
            metamargin = last.metamargin,
            "forecast complete"
        );
    }

    Ok(record)
}
