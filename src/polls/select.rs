//! Poll selection: recency windows, de-duplication, and pollster-balanced
//! weighting.
//!
//! Given the chronologically sorted poll list for one race and a reference
//! date, selection produces the weighted subset the aggregator works from.
//! The window slides with the most recent poll rather than the reference
//! date, so a race's poll set stays stable until new data arrives.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::campaign::dates::{add_days, days_between};
use crate::campaign::feed::sort_polls;
use crate::campaign::models::{Campaign, Poll};
use crate::math::stats::round_to_nearest;

/// Keep selecting past the window until this many distinct pollsters have
/// been seen. Counting pollsters rather than polls stops one prolific
/// tracking outfit from crowding out everyone else.
const MIN_POLLSTERS: usize = 4;

/// Polls starting this many days before the campaign start are ancient and
/// never selected.
const ANCIENT_CUTOFF_DAYS: i32 = 60;

const MIN_DAYS_IN_WINDOW: i32 = 7;
const MAX_DAYS_IN_WINDOW: i32 = 14;

/// The sliding window length in days, as a function of how far the window's
/// anchor sits from election day. Far out (>28 days) the window is wide;
/// inside the final week it narrows to 7 days; between the two it steps
/// linearly.
pub fn poll_window(election_date: NaiveDate, window_start: NaiveDate) -> i32 {
    const MAX_WINDOW_END: i32 = 28;
    const MIN_WINDOW_START: i32 = 7;

    let diff = days_between(window_start, election_date);
    if diff > MAX_WINDOW_END {
        return MAX_DAYS_IN_WINDOW;
    }
    if diff <= MIN_WINDOW_START {
        return MIN_DAYS_IN_WINDOW;
    }

    let days_until_min_window = diff - MIN_WINDOW_START;
    let stepping_region = MAX_WINDOW_END - MIN_WINDOW_START;
    MIN_DAYS_IN_WINDOW
        + round_to_nearest(7.0 * days_until_min_window as f64 / stepping_region as f64)
}

/// Select and weight the polls visible on `reference_date`.
///
/// `polls` must be sorted by end date descending (the feed invariant).
/// Returns the weighted subset, newest first; empty when nothing survives.
pub fn find_recent_polls(
    campaign: &Campaign,
    reference_date: NaiveDate,
    polls: &[Poll],
) -> Vec<Poll> {
    // Skip polls that had not finished by the reference date.
    let mut iter = polls.iter().peekable();
    while let Some(poll) = iter.peek() {
        if poll.end <= reference_date {
            break;
        }
        iter.next();
    }

    let ancient_cutoff = add_days(campaign.start_date, -ANCIENT_CUTOFF_DAYS);
    let mut staging: BTreeMap<String, Vec<Poll>> = BTreeMap::new();
    let mut earliest: Option<NaiveDate> = None;

    for poll in iter {
        if poll.start < ancient_cutoff {
            continue;
        }

        // Stop at the window edge once enough pollsters are represented.
        if let Some(earliest) = earliest {
            if poll.end <= earliest && staging.len() >= MIN_POLLSTERS {
                break;
            }
        }

        // Keep backdated runs consistent with live runs: a poll does not
        // exist until its publication date.
        if matches!(poll.published, Some(published) if published > reference_date) {
            continue;
        }

        if campaign.is_banned(poll) {
            continue;
        }

        if earliest.is_none() {
            let window = poll_window(campaign.end_date, poll.end);
            earliest = Some(add_days(poll.end, -window));
        }

        stage_poll(&mut staging, poll);
    }

    // Weighting: with P pollsters and k_p polls from pollster p, each of
    // that pollster's polls weighs 1/(P * k_p). Total weight is exactly 1.
    let pollsters = staging.len();
    let mut out = Vec::new();
    for (_, batch) in staging {
        let weight = 1.0 / (batch.len() * pollsters) as f64;
        for mut poll in batch {
            poll.weight = weight;
            out.push(poll);
        }
    }
    sort_polls(&mut out);
    out
}

/// Insert a poll into the per-pollster staging batch, resolving tracking
/// updates and same-date duplicates.
fn stage_poll(staging: &mut BTreeMap<String, Vec<Poll>>, poll: &Poll) {
    let batch = staging.entry(poll.description.clone()).or_default();

    let mut i = 0;
    while i < batch.len() {
        if batch[i].tracking && poll.tracking {
            // Rolling releases of the same tracking poll: keep the newer.
            if batch[i].end > poll.end {
                return;
            }
            if batch[i].end < poll.end {
                batch.remove(i);
                continue;
            }
        }

        if poll.same_dates(&batch[i]) {
            if poll.is_better_than(&batch[i]) {
                batch[i] = poll.clone();
                return;
            }
            if batch[i].is_better_than(poll) {
                return;
            }
            // Same dates, equal quality: keep both; weighting averages them.
        }
        i += 1;
    }
    batch.push(poll.clone());
}
