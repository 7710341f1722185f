//! Turning a weighted poll set into a race estimate: margin, spread,
//! undecideds, and win probability.

use crate::campaign::models::{Campaign, Poll};
use crate::forecast::models::{ModelData, RaceKind, RaceModel};
use crate::math::dist::normal_cdf_at;
use crate::math::stats;

/// Upper bound on margin movement from an undecided pool: at worst the
/// undecideds break 65/35, so a u% pool moves the margin by 0.30·u points.
pub fn undecided_factor(undecided_pct: f64) -> f64 {
    (undecided_pct * 0.65) - (undecided_pct * 0.35)
}

/// P(dem wins) for a race at `margin` with spread `stddev`, under a uniform
/// additive shift `bias` (zero outside the metamargin and Bayes machinery).
pub fn dem_win_prob(margin: f64, stddev: f64, bias: f64) -> f64 {
    1.0 - normal_cdf_at(0.0, margin + bias, stddev)
}

pub fn model_win_prob(model: &RaceModel, bias: f64) -> f64 {
    dem_win_prob(model.mean, model.stddev, bias)
}

/// Mean residual (100 - dem - gop) across polls that reported both numbers.
/// None when no poll leaves a non-negative residual.
pub fn poll_undecideds(polls: &[Poll]) -> Option<f64> {
    let residuals: Vec<f64> = polls
        .iter()
        .filter(|p| p.dem != 0.0 && p.gop != 0.0)
        .map(|p| 100.0 - p.dem - p.gop)
        .filter(|u| *u >= 0.0)
        .collect();
    if residuals.is_empty() {
        return None;
    }
    Some(stats::average(&residuals))
}

/// Expected polling error for a race: the chamber floor, or the potential
/// undecided swing when that is larger.
fn estimate_std_dev(kind: RaceKind, undecideds: f64) -> f64 {
    kind.minimum_error().max(undecided_factor(undecideds))
}

/// Fill `model` from its selected polls: weighted mean, unweighted median,
/// undecideds (with fallbacks through the day's national and generic-ballot
/// estimates down to the campaign default), and the spread.
///
/// `day` is the snapshot under construction; only its already-computed
/// national and generic-ballot models are read.
pub fn compute_poll_stats(campaign: &Campaign, day: &ModelData, model: &mut RaceModel) {
    debug_assert!(!model.polls.is_empty());

    let mut weighted_average = 0.0;
    let mut margins = Vec::with_capacity(model.polls.len());
    for poll in &model.polls {
        weighted_average += poll.margin * poll.weight;
        margins.push(poll.margin);
    }

    // Equal thirds of +2, +1, and -3 average to a hair off zero in floating
    // point, which would render as D+0.00 or R+0.00 and dodge tie handling
    // downstream. Three decimal places is plenty of margin resolution.
    weighted_average = stats::round_to_nearest(weighted_average * 1000.0) as f64 / 1000.0;

    model.mean = weighted_average;
    model.median = stats::median(&margins);
    model.margin = model.mean;

    let undecideds = poll_undecideds(&model.polls).unwrap_or_else(|| {
        if campaign.is_presidential_year && day.national_undecideds() != 0.0 {
            day.national_undecideds()
        } else if day.generic_ballot_undecideds() != 0.0 {
            day.generic_ballot_undecideds()
        } else {
            campaign.undecided_pct
        }
    });
    model.undecideds = undecideds;

    if model.kind == RaceKind::National {
        model.stddev = stats::std_dev(&margins);
    } else {
        // Polls carry more error than their margin-of-error suggests: the
        // electorate model can be off, and undecideds can break late. Use
        // the sample spread as a baseline but never trust a spread below
        // the expected error.
        let expected_error = estimate_std_dev(model.kind, model.undecideds);
        let spread = if model.polls.len() > 1 {
            stats::sample_std_dev(&margins)
        } else {
            0.0
        };
        model.stddev = expected_error.max(spread);
    }
}
