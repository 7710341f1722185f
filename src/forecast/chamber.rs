//! Per-chamber analysis: poll selection and aggregation across a chamber's
//! races, seat-distribution convolution, safe-seat accounting, and the
//! chamber metamargin.
//!
//! The chamber kind is a plain enum; the numeric machinery is shared and
//! parameterized by each kind's minimum error and scoring rules.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::campaign::feed::Feed;
use crate::campaign::models::{Campaign, Party, Poll, RaceRating, RatingClass, SampleType};
use crate::error::ForecastError;
use crate::forecast::metamargin::{find_metamargin, BiasScorer};
use crate::forecast::models::{ModelData, RaceKind, RaceModel};
use crate::math::{tiebreaker_majority, Convolver};
use crate::polls::aggregate::{compute_poll_stats, model_win_prob};
use crate::polls::select::find_recent_polls;

/// The chambers with a control threshold and a Bayesian prediction.
/// Governor races are analyzed but have no aggregate tipping point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chamber {
    ElectoralCollege,
    Senate,
    House,
}

impl Chamber {
    /// The day's metamargin for Bayesian updating. The House uses the
    /// generic-ballot margin: too many seats go unpolled for the House
    /// metamargin to anchor a prior early in the cycle.
    pub fn metamargin(self, day: &ModelData) -> f64 {
        match self {
            Chamber::ElectoralCollege => day.metamargin,
            Chamber::Senate => day.senate_mm,
            Chamber::House => day.generic_ballot_margin(),
        }
    }

    /// Shift restoring chamber semantics to predicted bands. Only the House
    /// needs one, to convert generic-ballot space back to House space.
    pub fn mm_adjustment(self, day: &ModelData) -> f64 {
        match self {
            Chamber::House => day.house_mm - self.metamargin(day),
            _ => 0.0,
        }
    }

    /// `(score, offset)`: the convolved score required to win, and the safe
    /// seats it sits on top of. None when control cannot change hands.
    pub fn score_to_win(self, campaign: &Campaign, day: &ModelData) -> Option<(i32, i32)> {
        match self {
            Chamber::ElectoralCollege => {
                Some((tiebreaker_majority(campaign.total_evs()), 0))
            }
            Chamber::Senate => {
                if !day.senate_can_flip {
                    return None;
                }
                let needed = campaign.senate.dem_seats_for_control;
                let safe = day.senate_safe_seats.dem;
                Some((needed - safe, safe))
            }
            Chamber::House => {
                if !day.house_can_flip {
                    return None;
                }
                let majority = tiebreaker_majority(campaign.house.total_seats);
                let safe = day.house_safe_seats.dem;
                Some((majority - safe, safe))
            }
        }
    }

    pub fn bias_scorer<'a>(self, campaign: &'a Campaign, day: &'a ModelData) -> BiasScorer<'a> {
        match self {
            Chamber::ElectoralCollege => BiasScorer::ElectoralVotes {
                states: &campaign.states,
                models: &day.states,
            },
            Chamber::Senate => BiasScorer::Seats {
                races: &day.senate_races,
            },
            Chamber::House => BiasScorer::for_house(&day.house_races),
        }
    }
}

/// Generic ballot, national race, and the electoral college.
pub fn analyze_states(
    campaign: &Campaign,
    feed: &Feed,
    data: &mut ModelData,
) -> Result<(), ForecastError> {
    if !feed.generic_ballot_polls.is_empty() {
        let mut model = RaceModel::new(0, RaceKind::GenericBallot);
        model.polls = find_recent_polls(campaign, data.date, &feed.generic_ballot_polls);
        if !model.polls.is_empty() {
            compute_poll_stats(campaign, data, &mut model);
            // Undecideds come from the generic ballot, or the campaign.
            data.undecideds = model.undecideds;
            data.generic_ballot = Some(model);
        }
    }

    if !campaign.is_presidential_year {
        return Ok(());
    }

    if !feed.national_polls.is_empty() {
        let mut model = RaceModel::new(0, RaceKind::National);
        model.polls = find_recent_polls(campaign, data.date, &feed.national_polls);
        if !model.polls.is_empty() {
            compute_poll_stats(campaign, data, &mut model);
            // National undecideds trump the generic ballot's.
            data.undecideds = model.undecideds;
            data.national = Some(model);
        }
    }

    let mut state_p: Vec<(i32, f64)> = Vec::with_capacity(campaign.states.len());
    for (index, state) in campaign.states.iter().enumerate() {
        let mut model = RaceModel::new(index, RaceKind::ElectoralCollege);
        if let Some(polls) = feed.state_polls.get(&state.name) {
            model.polls = find_recent_polls(campaign, data.date, polls);
        }
        if model.polls.is_empty() {
            model.polls.push(assumed_margin_poll(campaign, &state.name)?);
        }
        compute_poll_stats(campaign, data, &mut model);
        model.win_prob = model_win_prob(&model, 0.0);

        state_p.push((state.evs, model.win_prob));
        data.states.push(model);
    }
    if state_p.is_empty() {
        return Ok(());
    }

    let mut cv = Convolver::new(&state_p);
    data.dem_ev_mode = cv.mode();

    let mean_ev = cv.mean();
    data.mean_ev.dem = mean_ev;
    data.mean_ev.gop = campaign.total_evs() - mean_ev;

    data.dem_ev_range = cv.confidence(0);

    let ev_needed = tiebreaker_majority(campaign.total_evs());
    let scorer = Chamber::ElectoralCollege.bias_scorer(campaign, data);
    let metamargin = find_metamargin(
        |bias| scorer.score(bias),
        ev_needed - 1,
        cv.mean(),
        campaign.total_evs(),
    )?;
    data.metamargin = metamargin;

    Ok(())
}

/// When a state has no usable polls, fall back to the campaign's assumed
/// margin (typically the previous election result) as a single full-weight
/// poll. A state with neither is unmodelable.
fn assumed_margin_poll(campaign: &Campaign, state: &str) -> Result<Poll, ForecastError> {
    let (dem, gop) = campaign
        .assumed_margin(state)
        .ok_or_else(|| ForecastError::MissingData {
            race: state.to_string(),
        })?;
    Ok(Poll {
        description: format!("{} election result", campaign.end_date.year() - 4),
        start: campaign.start_date,
        end: campaign.end_date,
        published: None,
        dem,
        gop,
        margin: dem - gop,
        sample_size: 0,
        sample_type: SampleType::Other,
        url: String::new(),
        id: String::new(),
        tracking: false,
        partisan: false,
        grade: 0,
        weight: 1.0,
    })
}

pub fn analyze_senate(
    campaign: &Campaign,
    feed: &Feed,
    data: &mut ModelData,
) -> Result<(), ForecastError> {
    if campaign.senate.races.is_empty() || feed.senate_polls.is_empty() {
        return Ok(());
    }

    let total_seats = campaign.senate.seats.dem + campaign.senate.seats.gop;
    let dem_seats_needed = campaign.senate.dem_seats_for_control;

    // Seats not up for election are safe by definition.
    let mut safe_dem = campaign.senate.seats.dem - campaign.senate.seats_up.dem;
    let mut safe_gop = campaign.senate.seats.gop - campaign.senate.seats_up.gop;

    let mut seat_p: Vec<f64> = Vec::new();
    for (index, race) in campaign.senate.races.iter().enumerate() {
        let mut model = RaceModel::new(index, RaceKind::Senate);
        if let Some(polls) = feed.senate_polls.get(&index) {
            model.polls = find_recent_polls(campaign, data.date, polls);
        }

        if model.polls.is_empty() {
            // No polling: lean entirely on the presumed winner.
            match race.presumed_winner {
                Some(party) => {
                    model.rating = Some(RaceRating::safe(party));
                    model.win_prob = match party {
                        Party::Dem => 1.0,
                        Party::Gop => 0.0,
                    };
                }
                None => {
                    model.win_prob = 0.5;
                    model.undecideds = data.national_undecideds();
                    model.stddev = RaceKind::Senate.minimum_error();
                }
            }
        } else {
            compute_poll_stats(campaign, data, &mut model);
            model.win_prob = model_win_prob(&model, 0.0);
        }

        if model.polls.is_empty() && model.rating.is_some() {
            match race.presumed_winner {
                Some(Party::Dem) => safe_dem += 1,
                Some(Party::Gop) => safe_gop += 1,
                None => {}
            }
        } else {
            seat_p.push(model.win_prob);
        }
        data.senate_races.push(model);
    }

    data.senate_safe_seats.dem = safe_dem;
    data.senate_safe_seats.gop = safe_gop;
    data.senate_control_alt_seats = dem_seats_needed ^ 1;

    if seat_p.is_empty() {
        data.senate_median.dem = safe_dem;
        data.senate_median.gop = total_seats - safe_dem;
        return Ok(());
    }

    let mut cv = Convolver::from_probs(&seat_p);
    data.senate_median.dem = safe_dem + cv.mean();
    data.senate_median.gop = total_seats - data.senate_median.dem;
    data.dem_senate_range = cv.confidence(safe_dem);

    // No metamargin when either party's safe seats already decide control.
    if safe_dem >= dem_seats_needed || safe_gop >= dem_seats_needed {
        data.senate_can_flip = false;
        return Ok(());
    }
    data.senate_can_flip = true;

    let scorer = Chamber::Senate.bias_scorer(campaign, data);
    let metamargin = find_metamargin(
        |bias| scorer.score(bias),
        dem_seats_needed - safe_dem - 1,
        cv.mean(),
        seat_p.len() as i32,
    )?;
    data.senate_mm = metamargin;

    Ok(())
}

pub fn analyze_governor(
    campaign: &Campaign,
    feed: &Feed,
    data: &mut ModelData,
) -> Result<(), ForecastError> {
    if campaign.governor.races.is_empty() || feed.governor_polls.is_empty() {
        return Ok(());
    }

    let mut seat_p: Vec<f64> = Vec::new();
    for race in &campaign.governor.races {
        let mut model = RaceModel::new(race.race_id, RaceKind::Governor);
        if let Some(polls) = feed.governor_polls.get(&race.race_id) {
            model.polls = find_recent_polls(campaign, data.date, polls);
        }

        if model.polls.is_empty() {
            match race.presumed_winner {
                Some(party) => {
                    model.rating = Some(RaceRating::safe(party));
                    model.win_prob = match party {
                        Party::Dem => 1.0,
                        Party::Gop => 0.0,
                    };
                }
                None => {
                    model.win_prob = 0.5;
                    model.stddev = RaceKind::Governor.minimum_error();
                }
            }
        } else {
            compute_poll_stats(campaign, data, &mut model);
            model.win_prob = model_win_prob(&model, 0.0);
        }

        seat_p.push(model.win_prob);
        data.governor_races.push(model);
    }

    let total_seats = campaign.governor.seats.dem + campaign.governor.seats.gop;
    let dem_start_seats = campaign.governor.seats.dem - campaign.governor.seats_up.dem;

    let mut cv = Convolver::from_probs(&seat_p);
    data.governor_median.dem = dem_start_seats + cv.mean();
    data.governor_median.gop = total_seats - data.governor_median.dem;

    Ok(())
}

pub fn analyze_house(
    campaign: &Campaign,
    feed: &Feed,
    data: &mut ModelData,
    today: NaiveDate,
) -> Result<(), ForecastError> {
    if campaign.house.races.is_empty() {
        return Ok(());
    }

    let derived;
    let mut ratings: &BTreeMap<usize, RaceRating> = if feed.house_ratings.is_empty() {
        derived = derive_house_ratings(campaign);
        &derived
    } else {
        &feed.house_ratings
    };
    if data.date != today && today != campaign.end_date {
        // Backdated run: poll lists are dated but ratings are not, so
        // replay the rating snapshot as it stood on this day.
        if let Some(old) = backdated_ratings(campaign, data.date) {
            debug!(date = %data.date, "using historical house ratings");
            ratings = old;
        }
    }

    // Safe-seat bookkeeping. In cycles where only competitive races are
    // enumerated, the safe totals are recomputed afterward by counting
    // flips against the held-seat totals.
    let mut safe_dem = 0;
    let mut safe_gop = 0;
    let mut unsafe_dem = 0;
    let mut unsafe_gop = 0;
    let mut flips_to_dem = 0;
    let mut flips_to_gop = 0;

    let mut win_p: Vec<f64> = Vec::new();
    for race in &campaign.house.races {
        let rating = ratings.get(&race.race_id).copied();

        let mut model = RaceModel::new(race.race_id, RaceKind::House);
        if let Some(polls) = feed.house_polls.get(&race.race_id) {
            model.polls = find_recent_polls(campaign, data.date, polls);
        }
        model.rating = rating;

        if !model.polls.is_empty() {
            compute_poll_stats(campaign, data, &mut model);
            model.win_prob = model_win_prob(&model, 0.0);
        } else {
            let (rating_class, presumed_winner) = match rating {
                Some(r) => {
                    model.win_prob = r.dem_win_prob();
                    (Some(r.class), r.winner)
                }
                None => {
                    let presumed = race.presumed_winner.or(race.current_holder);
                    (None, presumed)
                }
            };

            // Without an incumbent, a rating, or a presumed winner, there
            // is no basis at all for estimating this seat.
            if race.current_holder.is_none()
                && rating_class.is_none()
                && presumed_winner.is_none()
            {
                return Err(ForecastError::MissingData {
                    race: race.region.clone(),
                });
            }

            // Unrated seats are assumed safe for their presumed winner and
            // skipped: convolving certain outcomes only slows the model.
            if rating_class.is_none() || rating_class == Some(RatingClass::Safe) {
                match presumed_winner {
                    Some(Party::Gop) => {
                        safe_gop += 1;
                        if race.current_holder == Some(Party::Dem) {
                            flips_to_gop += 1;
                            unsafe_dem += 1;
                        }
                    }
                    Some(Party::Dem) => {
                        safe_dem += 1;
                        if race.current_holder == Some(Party::Gop) {
                            flips_to_dem += 1;
                            unsafe_gop += 1;
                        }
                    }
                    None => {
                        return Err(ForecastError::MissingData {
                            race: race.region.clone(),
                        });
                    }
                }
                continue;
            }
        }

        match race.current_holder {
            Some(Party::Dem) => unsafe_dem += 1,
            Some(Party::Gop) => unsafe_gop += 1,
            None => {}
        }

        win_p.push(model.win_prob);
        data.house_races.push(model);
    }
    if win_p.is_empty() {
        return Ok(());
    }

    if campaign.house.total_seats != campaign.house.races.len() as i32 {
        // Competitive-only roster: impute safe seats by flip counting.
        // Census years enumerate every seat, and seat creation/destruction
        // makes the delta uncomputable until after the election.
        safe_dem = campaign.house.seats.dem - unsafe_dem + flips_to_dem;
        safe_gop = campaign.house.seats.gop - unsafe_gop + flips_to_gop;
    }

    debug_assert_eq!(
        win_p.len() as i32 + safe_dem + safe_gop,
        campaign.house.total_seats,
        "every seat is either convolved or safe"
    );

    let total_seats = campaign.house.total_seats;
    let majority_seats = tiebreaker_majority(total_seats);

    let mut cv = Convolver::from_probs(&win_p);
    data.dem_house_range = cv.confidence(safe_dem);

    data.house_median.dem = cv.mean() + safe_dem;
    data.house_median.gop = total_seats - data.house_median.dem;

    data.house_safe_seats.dem = safe_dem;
    data.house_safe_seats.gop = safe_gop;

    // A majority change must be possible for a metamargin to mean anything.
    if safe_dem >= majority_seats || safe_gop >= majority_seats {
        return Ok(());
    }
    data.house_can_flip = true;

    let scorer = Chamber::House.bias_scorer(campaign, data);
    let metamargin = find_metamargin(
        |bias| scorer.score(bias),
        majority_seats - safe_dem - 1,
        cv.mean(),
        data.house_races.len() as i32,
    )?;
    data.house_mm = metamargin;

    Ok(())
}

/// Ratings pre-recorded on the house roster itself, used when the feed
/// carries none.
fn derive_house_ratings(campaign: &Campaign) -> BTreeMap<usize, RaceRating> {
    campaign
        .house
        .races
        .iter()
        .filter_map(|race| race.rating.map(|r| (race.race_id, r)))
        .collect()
}

/// The most recent rating snapshot dated at or before `date`.
fn backdated_ratings(campaign: &Campaign, date: NaiveDate) -> Option<&BTreeMap<usize, RaceRating>> {
    let mut candidate = None;
    for entry in &campaign.house_rating_history {
        if entry.date > date {
            break;
        }
        candidate = Some(&entry.ratings);
    }
    candidate
}
