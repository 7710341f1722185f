use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use racecast::campaign;
use racecast::config::AppConfig;
use racecast::driver::{self, RunOptions};
use racecast::monitoring::logger;

/// Election forecasting engine: aggregates a poll feed over a campaign
/// calendar and produces per-day forecasts with Bayesian election-day
/// predictions.
#[derive(Debug, Parser)]
#[command(name = "racecast", version)]
struct Cli {
    /// Settings file.
    #[arg(default_value = "config/default.toml")]
    settings: PathBuf,

    /// Worker threads for the per-day analysis.
    #[arg(long)]
    num_threads: Option<usize>,

    /// Discard the saved history and recompute every day.
    #[arg(long)]
    reset_history: bool,

    /// Analyze as if today were this date (YYYY-MM-DD); useful for replays.
    #[arg(long)]
    today: Option<NaiveDate>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.settings)?;

    logger::init_logging(&config.monitoring)?;

    let cc = campaign::load_campaign(&config.campaign.campaign_file)?;
    let feed = campaign::load_feed(&config.campaign.feed_file)?;

    tracing::info!(
        start = %cc.start_date,
        election_day = %cc.end_date,
        presidential = cc.is_presidential_year,
        states = cc.states.len(),
        senate_races = cc.senate.races.len(),
        governor_races = cc.governor.races.len(),
        house_races = cc.house.races.len(),
        "campaign loaded"
    );

    let options = RunOptions {
        data_dir: config.engine.data_dir.clone(),
        num_threads: cli.num_threads.unwrap_or(config.engine.num_threads),
        reset_history: cli.reset_history,
        today: cli.today,
    };

    let record = driver::run_forecast(&cc, feed, &options)?;

    if let Some(last) = record.history.last() {
        if record.presidential_year {
            tracing::info!(
                date = %last.date,
                dem_ev_mode = last.dem_ev_mode,
                metamargin = last.metamargin,
                dem_win_p = last.ec_prediction.as_ref().map(|p| p.dem_win_p),
                "electoral college"
            );
        }
        if !last.senate_races.is_empty() {
            tracing::info!(
                dem = last.senate_median.dem,
                gop = last.senate_median.gop,
                metamargin = last.senate_mm,
                can_flip = last.senate_can_flip,
                "senate"
            );
        }
        if !last.house_races.is_empty() {
            tracing::info!(
                dem = last.house_median.dem,
                gop = last.house_median.gop,
                metamargin = last.house_mm,
                "house"
            );
        }
    }

    Ok(())
}
