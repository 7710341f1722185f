//! The normalized poll feed consumed by the daily analyzer.
//!
//! Fetching and scraping live elsewhere; this layer receives already-parsed
//! polls, enforces the ordering invariant (every list sorted by end date
//! descending), recomputes margins, and drops banned pollsters.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::campaign::models::{Campaign, Poll, RaceRating, SampleType};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedInfo {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub feed_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub info: FeedInfo,
    #[serde(default)]
    pub national_polls: Vec<Poll>,
    #[serde(default)]
    pub generic_ballot_polls: Vec<Poll>,
    /// Keyed by state name.
    #[serde(default)]
    pub state_polls: BTreeMap<String, Vec<Poll>>,
    /// Keyed by race id within the chamber roster.
    #[serde(default)]
    pub senate_polls: BTreeMap<usize, Vec<Poll>>,
    #[serde(default)]
    pub governor_polls: BTreeMap<usize, Vec<Poll>>,
    #[serde(default)]
    pub house_polls: BTreeMap<usize, Vec<Poll>>,
    #[serde(default)]
    pub house_ratings: BTreeMap<usize, RaceRating>,
}

impl Feed {
    /// Enforce feed invariants before any analysis runs: banned pollsters
    /// are dropped (with a warning), margins are recomputed from the
    /// reported percentages, and every list is sorted newest-first.
    pub fn normalize(&mut self, campaign: &Campaign) {
        normalize_polls(&mut self.national_polls, campaign);
        normalize_polls(&mut self.generic_ballot_polls, campaign);
        for polls in self.state_polls.values_mut() {
            normalize_polls(polls, campaign);
        }
        for polls in self.senate_polls.values_mut() {
            normalize_polls(polls, campaign);
        }
        for polls in self.governor_polls.values_mut() {
            normalize_polls(polls, campaign);
        }
        for polls in self.house_polls.values_mut() {
            normalize_polls(polls, campaign);
        }
    }

    /// Build the synthetic feed for the post-election day from official
    /// results: one authoritative poll per decided race.
    pub fn from_results(campaign: &Campaign, date: NaiveDate) -> Self {
        let results = &campaign.race_results;
        let mut feed = Feed {
            info: FeedInfo {
                description: "Final Results".to_string(),
                short_name: "final_results".to_string(),
                feed_type: "normal".to_string(),
            },
            ..Feed::default()
        };

        for (state, margins) in &results.states {
            feed.state_polls
                .insert(state.clone(), vec![result_poll(date, *margins)]);
        }
        for (race_id, margins) in &results.senate {
            feed.senate_polls
                .insert(*race_id, vec![result_poll(date, *margins)]);
        }
        for (race_id, margins) in &results.governor {
            feed.governor_polls
                .insert(*race_id, vec![result_poll(date, *margins)]);
        }
        for (race_id, margins) in &results.house {
            feed.house_polls
                .insert(*race_id, vec![result_poll(date, *margins)]);
        }
        if let Some(margins) = results.national {
            feed.national_polls.push(result_poll(date, margins));
        }
        if let Some(margins) = results.generic_ballot {
            feed.generic_ballot_polls.push(result_poll(date, margins));
        }
        feed
    }
}

/// Sort newest-first by end date; stable so same-day polls keep feed order.
pub fn sort_polls(polls: &mut [Poll]) {
    polls.sort_by(|a, b| b.end.cmp(&a.end));
}

fn normalize_polls(polls: &mut Vec<Poll>, campaign: &Campaign) {
    polls.retain(|poll| {
        if campaign.is_banned(poll) {
            warn!(
                pollster = %poll.description,
                id = %poll.id,
                "dropping banned pollster from feed"
            );
            return false;
        }
        true
    });
    for poll in polls.iter_mut() {
        poll.margin = poll.dem - poll.gop;
    }
    sort_polls(polls);
}

fn result_poll(date: NaiveDate, (dem, gop): (f64, f64)) -> Poll {
    Poll {
        description: format!("{} Election Results", date.format("%Y")),
        start: date,
        end: date,
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
        weight: 0.0,
    }
}
