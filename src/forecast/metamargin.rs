//! The metamargin: the uniform additive bias, applied to every race's
//! margin, that drags the aggregate outcome to the tipping point.
//!
//! The search needs a "bias → score" function per chamber. Rather than
//! boxed closures, each chamber's captures live in an explicit
//! [`BiasScorer`] variant, so the hot loop stays allocation-light and the
//! inputs are visible.

use crate::campaign::models::StateRace;
use crate::error::ForecastError;
use crate::campaign::dates::round_margin;
use crate::forecast::models::RaceModel;
use crate::math::dist::inverse_cdf;
use crate::math::Convolver;
use crate::polls::aggregate::{dem_win_prob, model_win_prob};

/// Margin substituted for a rated-but-unpolled House seat whose implied
/// margin is unbounded (win probability exactly 0 or 1).
const CERTAIN_SEAT_MARGIN: f64 = 24.0;

/// Search limit; a metamargin past ±101 points means the model is broken.
const MAX_BIAS: f64 = 101.0;

pub enum BiasScorer<'a> {
    /// Electoral college: states weighted by electoral votes.
    ElectoralVotes {
        states: &'a [StateRace],
        models: &'a [RaceModel],
    },
    /// One seat per race; unpolled races carrying a rating are excluded
    /// (they are accounted as safe seats).
    Seats { races: &'a [RaceModel] },
    /// Precomputed (margin, stddev) pairs; used for the House, where
    /// unpolled rated seats get a margin implied by their rating.
    Margins { margins: Vec<(f64, f64)> },
}

impl<'a> BiasScorer<'a> {
    /// House margins: polled races contribute their aggregate margin; rated
    /// races contribute the margin their win probability implies under the
    /// chamber's expected error.
    pub fn for_house(races: &'a [RaceModel]) -> Self {
        let error = crate::forecast::models::RaceKind::House.minimum_error();
        let margins = races
            .iter()
            .map(|race| {
                if !race.polls.is_empty() {
                    (race.margin, race.stddev)
                } else {
                    let implied = inverse_cdf(0.0, 1.0 - race.win_prob, error);
                    let clamped = if implied == f64::INFINITY {
                        CERTAIN_SEAT_MARGIN
                    } else if implied == f64::NEG_INFINITY {
                        -CERTAIN_SEAT_MARGIN
                    } else {
                        implied
                    };
                    (clamped, error)
                }
            })
            .collect();
        BiasScorer::Margins { margins }
    }

    /// The seat histogram under a uniform margin shift of `bias`.
    pub fn convolver(&self, bias: f64) -> Convolver {
        match self {
            BiasScorer::ElectoralVotes { states, models } => {
                let win_p: Vec<(i32, f64)> = states
                    .iter()
                    .zip(models.iter())
                    .map(|(state, model)| (state.evs, model_win_prob(model, bias)))
                    .collect();
                Convolver::new(&win_p)
            }
            BiasScorer::Seats { races } => {
                let win_p: Vec<f64> = races
                    .iter()
                    .filter(|race| !(race.polls.is_empty() && race.rating.is_some()))
                    .map(|race| model_win_prob(race, bias))
                    .collect();
                Convolver::from_probs(&win_p)
            }
            BiasScorer::Margins { margins } => {
                let win_p: Vec<f64> = margins
                    .iter()
                    .map(|(margin, stddev)| dem_win_prob(*margin, *stddev, bias))
                    .collect();
                Convolver::from_probs(&win_p)
            }
        }
    }

    pub fn score(&self, bias: f64) -> i32 {
        self.convolver(bias).mean()
    }
}

/// Find the metamargin: the bias bringing `bias_fn` to `midpoint` (the
/// score just below the win threshold).
///
/// Sign convention: positive favors Democrats (the GOP must gain that much
/// uniformly to tie); negative favors the GOP.
pub fn find_metamargin<F: Fn(f64) -> i32>(
    bias_fn: F,
    midpoint: i32,
    start: i32,
    high: i32,
) -> Result<f64, ForecastError> {
    if midpoint != start {
        let direction = if start > midpoint { -1 } else { 1 };
        calc(&bias_fn, midpoint, direction)
    } else if start == 0 {
        Ok(-calc(&bias_fn, midpoint, 1)?)
    } else if start == high {
        calc(&bias_fn, midpoint, -1)
    } else {
        // Sitting exactly on the midpoint: probe both directions, keep the
        // smaller move.
        let mm1 = calc(&bias_fn, midpoint, 1)?;
        let mm2 = calc(&bias_fn, midpoint, -1)?;
        Ok(if mm1.abs() > mm2.abs() { mm2 } else { mm1 })
    }
}

/// Monotone scan in 0.02 steps until the score crosses the midpoint.
fn calc<F: Fn(f64) -> i32>(
    bias_fn: &F,
    midpoint: i32,
    direction: i32,
) -> Result<f64, ForecastError> {
    let (mut bias, step) = if direction < 0 { (0.0, -0.02) } else { (0.02, 0.02) };

    loop {
        let score = bias_fn(bias);
        if bias.abs() > MAX_BIAS {
            return Err(ForecastError::NumericOutOfRange { limit: MAX_BIAS });
        }
        if (direction < 0 && score <= midpoint) || (direction > 0 && score >= midpoint) {
            return Ok(round_margin(-bias));
        }
        bias += step;
    }
}
