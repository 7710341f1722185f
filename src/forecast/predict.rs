//! The Bayesian election-day predictor.
//!
//! Each day's snapshot gives a "now" distribution over the metamargin; the
//! preceding days give a prior. Their product, sampled over a ±4σ domain,
//! yields a calibrated election-day win probability plus metamargin and
//! seat-count confidence bands. The width of the "now" distribution is
//! floored by an empirical maximum-swing table indexed by days until the
//! election: polls simply cannot move more than history has ever moved them
//! in the time remaining.

use crate::campaign::dates::{days_between, round_margin};
use crate::campaign::models::Campaign;
use crate::error::ForecastError;
use crate::forecast::chamber::Chamber;
use crate::forecast::metamargin::BiasScorer;
use crate::forecast::models::{CampaignRecord, MarginRange, ModelData, Prediction};
use crate::math::convolve::ScoreRange;
use crate::math::dist::{normal_cdf, t_pdf};
use crate::math::stats;
use crate::polls::aggregate::undecided_factor;

/// Largest observed presidential-race swing, by days until the election.
static MAX_NATIONAL_SWING: [f64; 151] = [
    0.00, 0.04, 0.26, 0.86, 1.02, 1.08, 1.20, 1.42, 1.54, 1.90, 2.06, 2.06, 2.06, 2.40, 2.40,
    2.40, 2.70, 2.70, 3.18, 3.18, 3.20, 3.48, 3.48, 3.48, 3.48, 3.48, 3.48, 3.48, 3.48, 3.48,
    3.74, 4.32, 4.44, 4.52, 4.62, 4.84, 5.34, 5.68, 6.20, 6.20, 6.20, 6.30, 6.52, 6.70, 6.76,
    7.04, 7.04, 7.04, 7.08, 7.08, 7.08, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18,
    7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18,
    7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18,
    7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18,
    7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18,
    7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18,
    7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.18, 7.38, 7.78, 7.78, 7.78, 7.86, 7.90, 8.02, 8.08,
    8.18,
];

/// Largest observed generic-ballot swing in presidential years.
static MAX_BALLOT_SWING_PRES_YEAR: [f64; 140] = [
    0.00, 0.57, 0.69, 1.02, 1.02, 1.02, 1.40, 2.83, 3.45, 3.45, 3.58, 3.58, 3.58, 3.58, 3.75,
    3.75, 3.75, 3.75, 3.75, 3.75, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12,
    4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12, 4.12,
    4.12, 4.12, 4.12, 4.12, 4.12, 5.49, 5.49, 5.49, 5.49, 6.19, 7.33, 7.58, 7.58, 7.58, 7.58,
    7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58,
    7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 7.58, 8.25, 8.25, 8.25, 8.25, 8.50, 8.50, 8.50,
    8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50,
    8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50,
    8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 8.50, 9.25, 9.25, 9.25, 9.25, 9.25, 9.65, 9.65,
    9.65, 9.65, 9.65, 9.65, 11.00,
];

/// Largest observed generic-ballot swing in midterm years.
static MAX_BALLOT_SWING_MIDTERM: [f64; 137] = [
    0.00, 0.39, 2.04, 2.62, 2.62, 3.54, 3.54, 3.54, 3.54, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51,
    4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51, 4.51,
    4.51, 5.18, 5.18, 5.18, 5.18, 5.35, 5.35, 5.35, 5.35, 5.35, 7.67, 7.67, 7.67, 7.67, 7.86,
    7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86,
    7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86,
    7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86,
    7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86,
    7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86,
    7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.86, 7.98,
    9.27, 11.27,
];

/// Even in the final hours, the metamargin has historically been off by a
/// couple of points.
const MIN_ELECTION_SWING: f64 = 2.0;

/// Posterior sampling step over the metamargin domain.
const MM_STEP: f64 = 0.02;

/// Inputs for one chamber's Bayesian update on one day.
struct BayesInput<'a> {
    table: &'static [f64],
    metamargin: f64,
    swing: f64,
    prior_mm: f64,
    prior_swing: f64,
    score_to_win: i32,
    score_offset: i32,
    mm_adjust: f64,
    scorer: BiasScorer<'a>,
}

struct BayesOutput {
    prediction: Prediction,
    mm_range: Vec<f64>,
    cumulative: Vec<f64>,
}

/// Run the predictor over the whole history, oldest day first. Days
/// generated before `record.last_updated` were predicted on a previous run
/// and are skipped, but still feed the prior.
pub fn predict(campaign: &Campaign, record: &mut CampaignRecord) -> Result<(), ForecastError> {
    let last_updated = record.last_updated;
    let mut should_predict = false;

    for i in 0..record.history.len() {
        let (priors, rest) = record.history.split_at_mut(i);
        let day = &mut rest[0];

        if day.generated >= last_updated {
            should_predict = true;
        }
        if should_predict {
            predict_day(campaign, day, priors);
        }
    }
    Ok(())
}

fn predict_day(campaign: &Campaign, day: &mut ModelData, priors: &[ModelData]) {
    let days_left = days_between(day.date, campaign.end_date);

    if campaign.is_presidential_year && !day.states.is_empty() {
        let (prediction, predicted_mode) = {
            let input = set_bayes_parameters(
                campaign,
                day,
                priors,
                Chamber::ElectoralCollege,
                &MAX_NATIONAL_SWING,
            );
            let mut out = bayes(&input, days_left);

            // The predicted seat histogram sits at the predicted
            // metamargin rather than today's.
            let cv = input
                .scorer
                .convolver(out.prediction.metamargin - day.metamargin);

            // The posterior's tails are not fat enough to justify extreme
            // electoral-college confidence: a symmetric 5%/95% floor and
            // ceiling on top of the generic 1%/99% clamp.
            out.prediction.dem_win_p = out.prediction.dem_win_p.clamp(0.05, 0.95);
            (out.prediction, cv.mode())
        };
        day.predicted_dem_ev_mode = predicted_mode;
        day.ec_prediction = Some(prediction);
    }

    let ballot_table: &'static [f64] = if campaign.is_presidential_year {
        &MAX_BALLOT_SWING_PRES_YEAR
    } else {
        &MAX_BALLOT_SWING_MIDTERM
    };

    // At least one race must survive the seats scorer's rated-unpolled
    // filter, or there is no seat distribution to score against. A cycle
    // where every senate race is a presumed winner gets no prediction.
    let senate_convolvable = day
        .senate_races
        .iter()
        .any(|race| !(race.polls.is_empty() && race.rating.is_some()));
    if senate_convolvable {
        let (prediction, win_prob_alt) = {
            let input = set_bayes_parameters(campaign, day, priors, Chamber::Senate, ballot_table);
            let out = bayes(&input, days_left);

            // The "other side of the coin": the threshold where a tied
            // chamber falls to the opposing vice presidency.
            let alt_delta = campaign.senate.dem_seats_for_control - day.senate_control_alt_seats;
            let alt_seats = input.score_to_win - alt_delta;
            let mut win_prob_inv = 1.0;
            for (i, mm) in out.mm_range.iter().enumerate() {
                if input.scorer.score(mm - input.metamargin) >= alt_seats {
                    win_prob_inv = if i == 0 { 0.0 } else { out.cumulative[i - 1] };
                    break;
                }
            }
            (out.prediction, 1.0 - win_prob_inv)
        };
        day.senate_prediction = Some(prediction);
        day.senate_win_prob_alt = win_prob_alt;
    }

    if day.house_can_flip {
        let input = set_bayes_parameters(campaign, day, priors, Chamber::House, ballot_table);
        let out = bayes(&input, days_left);
        day.house_prediction = Some(out.prediction);
    }
}

fn set_bayes_parameters<'a>(
    campaign: &'a Campaign,
    day: &'a ModelData,
    priors: &[ModelData],
    chamber: Chamber,
    table: &'static [f64],
) -> BayesInput<'a> {
    let metamargin = chamber.metamargin(day);

    let prior_mms: Vec<f64> = priors.iter().map(|d| chamber.metamargin(d)).collect();
    let prior_undecideds: Vec<f64> = priors.iter().map(|d| d.undecideds).collect();

    let prior_mm = if prior_mms.is_empty() {
        metamargin
    } else {
        stats::average(&prior_mms)
    };
    let prior_undecided = if prior_undecideds.is_empty() {
        day.undecideds
    } else {
        stats::average(&prior_undecideds)
    };

    let (score_to_win, score_offset) = chamber.score_to_win(campaign, day).unwrap_or((0, 0));

    BayesInput {
        table,
        metamargin,
        swing: undecided_factor(day.undecideds),
        prior_mm,
        prior_swing: undecided_factor(prior_undecided).max(6.0),
        score_to_win,
        score_offset,
        mm_adjust: chamber.mm_adjustment(day),
        scorer: chamber.bias_scorer(campaign, day),
    }
}

fn bayes(input: &BayesInput<'_>, days_left: i32) -> BayesOutput {
    let table = input.table;
    let mut min_swing = *table.last().expect("swing tables are non-empty");
    if days_left >= 0 && (days_left as usize) < table.len() {
        min_swing = table[days_left as usize];
    }
    min_swing = min_swing.max(MIN_ELECTION_SWING);

    let swing = input.swing.max(min_swing);

    // Sample the posterior across four sigma either side of today.
    let low = input.metamargin - 4.0 * swing;
    let high = input.metamargin + 4.0 * swing;
    let mut mm_range = Vec::with_capacity(((high - low) / MM_STEP) as usize + 1);
    let mut mm = low;
    while mm <= high {
        mm_range.push(mm);
        mm += MM_STEP;
    }

    let now: Vec<f64> = mm_range
        .iter()
        .map(|mm| t_pdf((mm - input.metamargin) / swing, 3))
        .collect();
    let now_sum = stats::sum(&now);

    let prior: Vec<f64> = mm_range
        .iter()
        .map(|mm| t_pdf((mm - input.prior_mm) / input.prior_swing, 1))
        .collect();
    let prior_sum = stats::sum(&prior);

    let mut posterior: Vec<f64> = now
        .iter()
        .zip(prior.iter())
        .map(|(n, p)| (n / now_sum) * (p / prior_sum))
        .collect();
    let posterior_sum = stats::sum(&posterior);
    for v in &mut posterior {
        *v /= posterior_sum;
    }

    let mut prediction = Prediction {
        metamargin: round_margin(stats::weighted_average(&mm_range, &posterior)),
        ..Prediction::default()
    };

    let cumulative = stats::cumsum(&posterior);

    // A 0% or 100% chance makes no sense while both candidates are running.
    if input.score_to_win > 0 {
        prediction.dem_win_p = win_probability(input, &mm_range, &cumulative).clamp(0.01, 0.99);
    }

    // Metamargins at the ±1σ and ±2σ cumulative-probability points. The
    // cursor is shared across targets; they are sorted ascending.
    let targets = [
        normal_cdf(-2.0),
        normal_cdf(-1.0),
        normal_cdf(1.0),
        normal_cdf(2.0),
    ];
    let mut points = [0.0f64; 4];
    let mut cursor = 0usize;
    for (slot, target) in points.iter_mut().zip(targets.iter()) {
        let mut result = *mm_range.last().expect("domain is non-empty");
        while cursor < cumulative.len() {
            if cumulative[cursor] >= *target {
                result = mm_range[cursor];
                break;
            }
            cursor += 1;
        }
        *slot = round_margin(result);
    }

    // Band edges carry the chamber adjustment (generic ballot to House);
    // everything computed from deltas does not need it.
    let adjusted: Vec<f64> = points.iter().map(|p| p + input.mm_adjust).collect();
    prediction.mm_2sig = MarginRange {
        low: adjusted[0],
        high: adjusted[3],
    };
    prediction.mm_1sig = MarginRange {
        low: adjusted[1],
        high: adjusted[2],
    };

    if input.score_to_win > 0 {
        let scores: Vec<i32> = points
            .iter()
            .map(|p| input.scorer.score(p - input.metamargin) + input.score_offset)
            .collect();
        prediction.score_2sig = ScoreRange {
            low: scores[0],
            high: scores[3],
        };
        prediction.score_1sig = ScoreRange {
            low: scores[1],
            high: scores[2],
        };
        prediction.average =
            input.scorer.score(prediction.metamargin - input.metamargin) + input.score_offset;
    }

    BayesOutput {
        prediction,
        mm_range,
        cumulative,
    }
}

/// Walk the posterior for the first metamargin at or above zero whose score
/// clears the win threshold; the mass from there up is the win probability.
/// Scores can cliff between adjacent seat counts, so walking beats assuming
/// the threshold sits at metamargin zero.
fn win_probability(input: &BayesInput<'_>, mm_range: &[f64], cumulative: &[f64]) -> f64 {
    for (i, mm) in mm_range.iter().enumerate() {
        if *mm < 0.0 {
            continue;
        }
        if input.scorer.score(mm - input.metamargin) >= input.score_to_win {
            if i == 0 {
                return 1.0;
            }
            return 1.0 - cumulative[i - 1];
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margins_input(
        margins: Vec<(f64, f64)>,
        metamargin: f64,
        prior_mm: f64,
        score_to_win: i32,
    ) -> BayesInput<'static> {
        BayesInput {
            table: &MAX_NATIONAL_SWING,
            metamargin,
            swing: 0.0,
            prior_mm,
            prior_swing: 6.0,
            score_to_win,
            score_offset: 0,
            mm_adjust: 0.0,
            scorer: BiasScorer::Margins { margins },
        }
    }

    #[test]
    fn test_swing_tables_monotone_from_zero() {
        for table in [
            &MAX_NATIONAL_SWING[..],
            &MAX_BALLOT_SWING_PRES_YEAR[..],
            &MAX_BALLOT_SWING_MIDTERM[..],
        ] {
            assert_eq!(table[0], 0.0);
            for pair in table.windows(2) {
                assert!(pair[1] >= pair[0], "swing tables never shrink with time");
            }
        }
    }

    #[test]
    fn test_bayes_agreeing_prior_converges() {
        // Today and the prior both say +2: the posterior stays at +2.
        let input = margins_input(vec![(2.0, 3.0); 3], 2.0, 2.0, 2);
        let out = bayes(&input, 30);
        assert!(
            (out.prediction.metamargin - 2.0).abs() < 0.1,
            "predicted {}",
            out.prediction.metamargin
        );
        assert!(out.prediction.dem_win_p > 0.5);
        assert!(out.prediction.dem_win_p <= 0.99);
    }

    #[test]
    fn test_bayes_bands_are_monotone() {
        let input = margins_input(vec![(2.0, 3.0); 3], 2.0, 1.0, 2);
        let out = bayes(&input, 45);
        let p = &out.prediction;
        assert!(p.mm_2sig.low <= p.mm_1sig.low);
        assert!(p.mm_1sig.low <= p.metamargin + 0.05);
        assert!(p.metamargin <= p.mm_1sig.high + 0.05);
        assert!(p.mm_1sig.high <= p.mm_2sig.high);
        assert!(p.score_2sig.low <= p.score_1sig.low);
        assert!(p.score_1sig.high <= p.score_2sig.high);
    }

    #[test]
    fn test_bayes_win_prob_clamped() {
        // A blowout still reports at most 0.99.
        let input = margins_input(vec![(20.0, 3.0); 5], 20.0, 20.0, 3);
        let out = bayes(&input, 10);
        assert!(out.prediction.dem_win_p <= 0.99);
        assert!(out.prediction.dem_win_p >= 0.01);

        let input = margins_input(vec![(-20.0, 3.0); 5], -20.0, -20.0, 3);
        let out = bayes(&input, 10);
        assert!(out.prediction.dem_win_p >= 0.01);
        assert!(out.prediction.dem_win_p < 0.5);
    }

    #[test]
    fn test_bayes_tightens_near_election() {
        // Same inputs, fewer days left: the now-distribution narrows, so
        // the 1-sigma band shrinks.
        let far = bayes(&margins_input(vec![(2.0, 3.0); 3], 2.0, 2.0, 2), 120);
        let near = bayes(&margins_input(vec![(2.0, 3.0); 3], 2.0, 2.0, 2), 5);
        let far_width = far.prediction.mm_1sig.high - far.prediction.mm_1sig.low;
        let near_width = near.prediction.mm_1sig.high - near.prediction.mm_1sig.low;
        assert!(
            near_width < far_width,
            "near: {near_width}, far: {far_width}"
        );
    }

    #[test]
    fn test_bayes_house_adjustment_shifts_bands_only() {
        let plain = bayes(&margins_input(vec![(2.0, 3.0); 3], 2.0, 2.0, 2), 30);
        let mut input = margins_input(vec![(2.0, 3.0); 3], 2.0, 2.0, 2);
        input.mm_adjust = 1.5;
        let shifted = bayes(&input, 30);

        assert_eq!(plain.prediction.metamargin, shifted.prediction.metamargin);
        assert!(
            (shifted.prediction.mm_1sig.low - plain.prediction.mm_1sig.low - 1.5).abs() < 1e-9
        );
        assert!(
            (shifted.prediction.mm_2sig.high - plain.prediction.mm_2sig.high - 1.5).abs() < 1e-9
        );
    }

    #[test]
    fn test_negative_days_left_uses_table_tail() {
        // The post-election results day sits past the election; it must not
        // index the table out of range.
        let input = margins_input(vec![(2.0, 3.0); 3], 2.0, 2.0, 2);
        let out = bayes(&input, -1);
        assert!(out.prediction.metamargin.is_finite());
    }

    #[test]
    fn test_posterior_normalized() {
        let input = margins_input(vec![(0.0, 3.0); 3], 0.0, 0.5, 2);
        let out = bayes(&input, 60);
        let total = out.cumulative.last().copied().unwrap();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
