//! Output records: per-race models, per-day snapshots, and the exported
//! campaign history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::campaign::models::{
    ChamberMap, ImportantDate, Poll, RaceRating, SeatCount, StateRace,
};
use crate::math::convolve::ScoreRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceKind {
    National,
    GenericBallot,
    ElectoralCollege,
    Senate,
    Governor,
    House,
}

impl RaceKind {
    /// Floor on the expected polling error for a race of this kind.
    /// National races use the population stddev of their polls instead.
    pub fn minimum_error(self) -> f64 {
        match self {
            RaceKind::National | RaceKind::GenericBallot | RaceKind::ElectoralCollege => 3.0,
            RaceKind::Senate => 3.5,
            RaceKind::Governor => 6.0,
            RaceKind::House => 8.0,
        }
    }
}

/// One race's aggregated state for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceModel {
    pub race_id: usize,
    pub kind: RaceKind,
    /// The selected polls, weights assigned.
    #[serde(default)]
    pub polls: Vec<Poll>,
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub median: f64,
    #[serde(default)]
    pub stddev: f64,
    #[serde(default)]
    pub undecideds: f64,
    #[serde(default)]
    pub win_prob: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub rating: Option<RaceRating>,
}

impl RaceModel {
    pub fn new(race_id: usize, kind: RaceKind) -> Self {
        Self {
            race_id,
            kind,
            polls: Vec::new(),
            mean: 0.0,
            median: 0.0,
            stddev: 0.0,
            undecideds: 0.0,
            win_prob: 0.0,
            margin: 0.0,
            rating: None,
        }
    }
}

/// An inclusive metamargin band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarginRange {
    pub low: f64,
    pub high: f64,
}

/// The Bayesian election-day prediction for one chamber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prediction {
    /// Posterior-mean metamargin.
    pub metamargin: f64,
    pub dem_win_p: f64,
    pub mm_1sig: MarginRange,
    pub mm_2sig: MarginRange,
    pub score_1sig: ScoreRange,
    pub score_2sig: ScoreRange,
    /// Score at the predicted metamargin, safe-seat offset included.
    pub average: i32,
}

/// Everything the model concluded about one calendar day. Built in isolation
/// from the campaign and feed; prediction fields are filled in afterward by
/// the Bayes pass over the whole history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelData {
    pub date: NaiveDate,
    /// UTC seconds when this record was generated.
    #[serde(default)]
    pub generated: i64,
    /// The day's undecided-voter estimate (national or generic ballot).
    #[serde(default)]
    pub undecideds: f64,
    #[serde(default)]
    pub national: Option<RaceModel>,
    #[serde(default)]
    pub generic_ballot: Option<RaceModel>,
    #[serde(default)]
    pub states: Vec<RaceModel>,
    #[serde(default)]
    pub senate_races: Vec<RaceModel>,
    #[serde(default)]
    pub governor_races: Vec<RaceModel>,
    #[serde(default)]
    pub house_races: Vec<RaceModel>,

    // Electoral college.
    #[serde(default)]
    pub dem_ev_mode: i32,
    #[serde(default)]
    pub predicted_dem_ev_mode: i32,
    #[serde(default)]
    pub mean_ev: SeatCount,
    #[serde(default)]
    pub dem_ev_range: ScoreRange,
    #[serde(default)]
    pub metamargin: f64,

    // Senate.
    #[serde(default)]
    pub senate_median: SeatCount,
    #[serde(default)]
    pub dem_senate_range: ScoreRange,
    #[serde(default)]
    pub senate_safe_seats: SeatCount,
    #[serde(default)]
    pub senate_mm: f64,
    #[serde(default)]
    pub senate_can_flip: bool,
    /// The control threshold's "other side of the coin" (threshold XOR 1).
    #[serde(default)]
    pub senate_control_alt_seats: i32,
    #[serde(default)]
    pub senate_win_prob_alt: f64,

    // House.
    #[serde(default)]
    pub house_median: SeatCount,
    #[serde(default)]
    pub dem_house_range: ScoreRange,
    #[serde(default)]
    pub house_safe_seats: SeatCount,
    #[serde(default)]
    pub house_mm: f64,
    #[serde(default)]
    pub house_can_flip: bool,

    // Governor.
    #[serde(default)]
    pub governor_median: SeatCount,

    // Bayesian predictions (filled by the predictor pass).
    #[serde(default)]
    pub ec_prediction: Option<Prediction>,
    #[serde(default)]
    pub senate_prediction: Option<Prediction>,
    #[serde(default)]
    pub house_prediction: Option<Prediction>,
}

impl ModelData {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    pub fn generic_ballot_margin(&self) -> f64 {
        self.generic_ballot.as_ref().map_or(0.0, |m| m.margin)
    }

    pub fn national_undecideds(&self) -> f64 {
        self.national.as_ref().map_or(0.0, |m| m.undecideds)
    }

    pub fn generic_ballot_undecideds(&self) -> f64 {
        self.generic_ballot.as_ref().map_or(0.0, |m| m.undecideds)
    }
}

/// The complete exported record: embedded campaign metadata plus one
/// ModelData per day in chronological order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignRecord {
    #[serde(default)]
    pub feed_description: String,
    #[serde(default)]
    pub presidential_year: bool,
    #[serde(default)]
    pub dem_pres: String,
    #[serde(default)]
    pub gop_pres: String,
    /// UTC seconds when this export began; days generated at or after this
    /// moment are "fresh" for the predictor.
    #[serde(default)]
    pub last_updated: i64,
    pub election_day: NaiveDate,
    #[serde(default)]
    pub states: Vec<StateRace>,
    #[serde(default)]
    pub state_codes: BTreeMap<String, String>,
    #[serde(default)]
    pub senate: ChamberMap,
    #[serde(default)]
    pub governor: ChamberMap,
    #[serde(default)]
    pub house: ChamberMap,
    #[serde(default)]
    pub important_dates: Vec<ImportantDate>,
    /// Official electoral-vote totals, present only after the election.
    #[serde(default)]
    pub results_evs: Option<SeatCount>,
    #[serde(default)]
    pub history: Vec<ModelData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_error_ladder() {
        assert_eq!(RaceKind::ElectoralCollege.minimum_error(), 3.0);
        assert_eq!(RaceKind::Senate.minimum_error(), 3.5);
        assert_eq!(RaceKind::Governor.minimum_error(), 6.0);
        assert_eq!(RaceKind::House.minimum_error(), 8.0);
    }

    #[test]
    fn test_model_data_round_trip() {
        let mut day = ModelData::for_date(NaiveDate::from_ymd_opt(2020, 10, 1).unwrap());
        day.metamargin = 2.4;
        day.senate_can_flip = true;
        day.states.push(RaceModel::new(0, RaceKind::ElectoralCollege));

        let json = serde_json::to_string(&day).unwrap();
        let back: ModelData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, day.date);
        assert_eq!(back.metamargin, 2.4);
        assert!(back.senate_can_flip);
        assert_eq!(back.states.len(), 1);
    }

    #[test]
    fn test_generic_ballot_margin_default() {
        let day = ModelData::default();
        assert_eq!(day.generic_ballot_margin(), 0.0);
    }
}
