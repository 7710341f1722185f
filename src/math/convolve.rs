//! Seat-count distributions via iterated discrete convolution.
//!
//! Each independent race contributes a two-point distribution: `weight`
//! points with probability `p` (the Democratic win) or zero points with
//! probability `1 - p`. Convolving all races yields the full probability
//! histogram over aggregate scores.

use serde::{Deserialize, Serialize};

use crate::math::stats;

/// An inclusive `[low, high]` band of aggregate scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: i32,
    pub high: i32,
}

pub struct Convolver {
    /// `histogram[s]` = P(dem total == s). Sums to 1 within float error.
    pub histogram: Vec<f64>,
    cumsum: Vec<f64>,
    mean: Option<i32>,
}

impl Convolver {
    /// Build from `(weight, win_prob)` pairs. Seat-per-race chambers use
    /// weight 1; the electoral college uses each state's electoral votes.
    pub fn new(races: &[(i32, f64)]) -> Self {
        debug_assert!(!races.is_empty());

        let mut histogram = Self::make_slice(races[0]);
        for race in &races[1..] {
            histogram = stats::convolve(&histogram, &Self::make_slice(*race));
        }
        // Each slice places the dem win at index 0, so after convolving, low
        // indices are dem sweeps. Reverse so that index s = dem total of s.
        histogram.reverse();

        Self {
            histogram,
            cumsum: Vec::new(),
            mean: None,
        }
    }

    /// Build from bare win probabilities, one seat per race.
    pub fn from_probs(win_p: &[f64]) -> Self {
        let races: Vec<(i32, f64)> = win_p.iter().map(|p| (1, *p)).collect();
        Self::new(&races)
    }

    fn make_slice((weight, p): (i32, f64)) -> Vec<f64> {
        let mut v = vec![0.0; weight as usize + 1];
        v[0] = p;
        *v.last_mut().expect("slice is never empty") = 1.0 - p;
        v
    }

    /// Smallest score with cumulative probability >= 0.5.
    pub fn median(&mut self) -> i32 {
        self.compute_cumsum();
        for (i, c) in self.cumsum.iter().enumerate() {
            if *c >= 0.5 {
                return i as i32;
            }
        }
        self.cumsum.len() as i32
    }

    /// Most probable score.
    pub fn mode(&self) -> i32 {
        let mut mode = 0;
        for i in 1..self.histogram.len() {
            if self.histogram[i] > self.histogram[mode] {
                mode = i;
            }
        }
        mode as i32
    }

    /// Expected score, rounded to the nearest integer.
    pub fn mean(&mut self) -> i32 {
        if self.mean.is_none() {
            self.mean = Some(stats::round_to_nearest(stats::index_weighted_average(
                &self.histogram,
            )));
        }
        self.mean.expect("set above")
    }

    /// P(dem total >= value).
    pub fn dem_win_prob(&mut self, value: i32) -> f64 {
        if value == 0 {
            return 1.0;
        }
        // With the cumulative sum cs, P(>= v) = 1 - cs[v - 1].
        self.compute_cumsum();
        1.0 - self.cumsum[value as usize - 1]
    }

    /// A ±2σ confidence band around the mean, shifted by `base` (the safe
    /// seats excluded from the convolution).
    pub fn confidence(&mut self, base: i32) -> ScoreRange {
        const BAND: f64 = 2.0;

        let mean = self.mean();
        let stddev = stats::index_weighted_std_dev(&self.histogram, mean);
        let dt = (stddev * BAND).round() as i32;

        ScoreRange {
            low: mean - dt + base,
            high: (mean + dt).clamp(0, self.histogram.len() as i32) + base - 1,
        }
    }

    fn compute_cumsum(&mut self) {
        if self.cumsum.len() != self.histogram.len() {
            self.cumsum = stats::cumsum(&self.histogram);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_mass(cv: &Convolver) -> f64 {
        cv.histogram.iter().sum()
    }

    #[test]
    fn test_histogram_sums_to_one() {
        let mut races = Vec::new();
        for i in 0..20 {
            races.push((1 + i % 5, 0.05 * i as f64));
        }
        let cv = Convolver::new(&races);
        assert!((total_mass(&cv) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_length() {
        let races = [(10, 0.5), (20, 0.3), (5, 0.9)];
        let cv = Convolver::new(&races);
        assert_eq!(cv.histogram.len(), 10 + 20 + 5 + 1);
    }

    #[test]
    fn test_certain_outcomes_single_spike() {
        // p in {0, 1} everywhere: the distribution collapses to one spike at
        // the sum of won weights.
        let races = [(10, 1.0), (20, 0.0), (7, 1.0)];
        let cv = Convolver::new(&races);
        for (i, v) in cv.histogram.iter().enumerate() {
            if i == 17 {
                assert!((v - 1.0).abs() < 1e-9);
            } else {
                assert!(v.abs() < 1e-12);
            }
        }
        assert_eq!(cv.mode(), 17);
    }

    #[test]
    fn test_two_even_states() {
        let races = [(10, 0.5), (10, 0.5)];
        let mut cv = Convolver::new(&races);
        assert_eq!(cv.mode(), 10);
        assert_eq!(cv.mean(), 10);
        assert_eq!(cv.median(), 10);
        assert!((cv.histogram[0] - 0.25).abs() < 1e-12);
        assert!((cv.histogram[10] - 0.5).abs() < 1e-12);
        assert!((cv.histogram[20] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_dem_win_prob_walkthrough() {
        // Mirror of the documented example: histogram [.1 .2 .3 .2 .1 .1],
        // P(>=3) = 1 - cumsum[2] = 1 - 0.6 = 0.4.
        let mut cv = Convolver::from_probs(&[0.5]);
        cv.histogram = vec![0.1, 0.2, 0.3, 0.2, 0.1, 0.1];
        cv.cumsum.clear();
        assert!((cv.dem_win_prob(3) - 0.4).abs() < 1e-12);
        assert_eq!(cv.dem_win_prob(0), 1.0);
    }

    #[test]
    fn test_mean_matches_expected_seats() {
        // Independent seats: E[total] = sum of p.
        let mut cv = Convolver::from_probs(&[0.9, 0.8, 0.5, 0.2, 0.1]);
        let expected: f64 = stats::index_weighted_average(&cv.histogram);
        assert!((expected - 2.5).abs() < 1e-9);
        // round(2.5) rounds away from zero.
        assert_eq!(cv.mean(), 3);
    }

    #[test]
    fn test_confidence_band_contains_mean() {
        let mut cv = Convolver::from_probs(&[0.6, 0.5, 0.4, 0.7, 0.3, 0.5]);
        let range = cv.confidence(0);
        let mean = cv.mean();
        assert!(range.low <= mean && mean <= range.high);
    }

    #[test]
    fn test_confidence_band_base_offset() {
        let mut cv = Convolver::from_probs(&[0.6, 0.5, 0.4, 0.7, 0.3, 0.5]);
        let plain = cv.confidence(0);
        let mut cv2 = Convolver::from_probs(&[0.6, 0.5, 0.4, 0.7, 0.3, 0.5]);
        let based = cv2.confidence(48);
        assert_eq!(based.low - plain.low, 48);
        assert_eq!(based.high - plain.high, 48);
    }
}
