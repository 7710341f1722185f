//! Domain types for the campaign definition and normalized poll feed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Dem,
    Gop,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dem => write!(f, "dem"),
            Self::Gop => write!(f, "gop"),
        }
    }
}

/// Voter screen used by a poll. Likely voters beat registered voters beat
/// all adults when de-duplicating same-day polls from one pollster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Lv,
    Rv,
    #[serde(rename = "a")]
    Adults,
    #[default]
    Other,
}

impl SampleType {
    pub fn score(self) -> i32 {
        match self {
            Self::Lv => 4,
            Self::Rv => 3,
            Self::Adults => 2,
            Self::Other => 0,
        }
    }
}

/// One published poll, normalized by the feed layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    /// Pollster name; the de-duplication key.
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub published: Option<NaiveDate>,
    pub dem: f64,
    pub gop: f64,
    /// dem - gop; positive favors Democrats.
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub sample_size: u32,
    #[serde(default)]
    pub sample_type: SampleType,
    #[serde(default)]
    pub url: String,
    /// Stable identifier from the upstream feed.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tracking: bool,
    #[serde(default)]
    pub partisan: bool,
    #[serde(default)]
    pub grade: i32,
    /// Assigned during poll selection; 0 until then.
    #[serde(default)]
    pub weight: f64,
}

impl Poll {
    pub fn same_dates(&self, other: &Poll) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Sample-quality ordering for duplicate resolution: screen type first,
    /// then sample size.
    pub fn is_better_than(&self, other: &Poll) -> bool {
        if self.sample_type != other.sample_type {
            return self.sample_type.score() > other.sample_type.score();
        }
        self.sample_size > other.sample_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingClass {
    Tossup,
    Leans,
    Likely,
    Safe,
}

/// A handicapper rating for a race: a competitiveness class and, for
/// anything but a tossup, the favored party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceRating {
    pub class: RatingClass,
    #[serde(default)]
    pub winner: Option<Party>,
}

impl RaceRating {
    pub fn new(class: RatingClass, winner: Option<Party>) -> Self {
        Self { class, winner }
    }

    pub fn safe(winner: Party) -> Self {
        Self::new(RatingClass::Safe, Some(winner))
    }

    /// Win probability for the rated party, mapped onto the Democratic side.
    pub fn dem_win_prob(&self) -> f64 {
        let p = match self.class {
            RatingClass::Tossup => 0.5,
            RatingClass::Leans => 0.7,
            RatingClass::Likely => 0.85,
            RatingClass::Safe => 1.0,
        };
        match self.winner {
            Some(Party::Gop) => 1.0 - p,
            _ => p,
        }
    }
}

impl fmt::Display for RaceRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            RatingClass::Tossup => "tossup",
            RatingClass::Leans => "leans",
            RatingClass::Likely => "likely",
            RatingClass::Safe => "safe",
        };
        match self.winner {
            Some(winner) => write!(f, "{class} {winner}"),
            None => write!(f, "{class}"),
        }
    }
}

/// One contest on the ballot (a Senate seat, a governorship, a House
/// district). Presidential state races are `StateRace` instead since they
/// carry electoral weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    pub race_id: usize,
    pub region: String,
    #[serde(default)]
    pub dem_candidate: String,
    #[serde(default)]
    pub gop_candidate: String,
    #[serde(default)]
    pub presumed_winner: Option<Party>,
    /// The incumbent party, used to count seat flips.
    #[serde(default)]
    pub current_holder: Option<Party>,
    #[serde(default)]
    pub rating: Option<RaceRating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRace {
    pub name: String,
    pub evs: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCount {
    pub dem: i32,
    pub gop: i32,
}

/// The definition of one chamber's cycle: which seats are up, who holds
/// what, and what it takes to control the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChamberMap {
    #[serde(default)]
    pub races: Vec<Race>,
    /// Seats held going into the election.
    #[serde(default)]
    pub seats: SeatCount,
    /// Of the held seats, how many are up for election.
    #[serde(default)]
    pub seats_up: SeatCount,
    #[serde(default)]
    pub total_seats: i32,
    /// Senate only: seats needed for Democratic control (accounts for the
    /// vice-presidential tiebreaker).
    #[serde(default)]
    pub dem_seats_for_control: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportantDate {
    pub date: NaiveDate,
    pub label: String,
}

/// A dated snapshot of house ratings, kept so backdated runs can replay the
/// ratings as they stood on that day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub date: NaiveDate,
    pub ratings: BTreeMap<usize, RaceRating>,
}

/// Official election results, fed back in as an authoritative "poll" per
/// race once the campaign is over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceResults {
    #[serde(default)]
    pub states: BTreeMap<String, (f64, f64)>,
    #[serde(default)]
    pub senate: BTreeMap<usize, (f64, f64)>,
    #[serde(default)]
    pub governor: BTreeMap<usize, (f64, f64)>,
    #[serde(default)]
    pub house: BTreeMap<usize, (f64, f64)>,
    #[serde(default)]
    pub national: Option<(f64, f64)>,
    #[serde(default)]
    pub generic_ballot: Option<(f64, f64)>,
    #[serde(default)]
    pub electoral_votes: Option<SeatCount>,
}

impl RaceResults {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.senate.is_empty()
            && self.governor.is_empty()
            && self.house.is_empty()
            && self.national.is_none()
            && self.generic_ballot.is_none()
    }
}

/// The static campaign definition. Built once by the loader, read
/// everywhere, never mutated during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_presidential_year: bool,
    /// Fallback undecided percentage when no poll provides one.
    #[serde(default)]
    pub undecided_pct: f64,
    #[serde(default)]
    pub dem_pres: String,
    #[serde(default)]
    pub gop_pres: String,
    #[serde(default)]
    pub election_type: String,
    /// Presidential states in canonical order, with electoral weights.
    #[serde(default)]
    pub states: Vec<StateRace>,
    /// Baseline (dem%, gop%) per state, typically the previous election's
    /// result, used when a state has no recent polls.
    #[serde(default)]
    pub assumed_margins: HashMap<String, (f64, f64)>,
    #[serde(default)]
    pub senate: ChamberMap,
    #[serde(default)]
    pub governor: ChamberMap,
    #[serde(default)]
    pub house: ChamberMap,
    /// Pollsters excluded from aggregation, keyed by poll id or pollster
    /// description.
    #[serde(default)]
    pub banned_pollsters: HashSet<String>,
    #[serde(default)]
    pub important_dates: Vec<ImportantDate>,
    /// Chronological house-rating snapshots for backdated runs.
    #[serde(default)]
    pub house_rating_history: Vec<RatingSnapshot>,
    #[serde(default)]
    pub race_results: RaceResults,
}

impl Campaign {
    pub fn total_evs(&self) -> i32 {
        self.states.iter().map(|s| s.evs).sum()
    }

    pub fn is_banned(&self, poll: &Poll) -> bool {
        self.banned_pollsters.contains(&poll.id)
            || self.banned_pollsters.contains(&poll.description)
    }

    pub fn assumed_margin(&self, region: &str) -> Option<(f64, f64)> {
        self.assumed_margins.get(region).copied()
    }
}

/// Postal codes for rendering layers downstream of the exported record.
pub fn state_codes() -> BTreeMap<String, String> {
    const CODES: &[(&str, &str)] = &[
        ("Alabama", "AL"),
        ("Alaska", "AK"),
        ("Arizona", "AZ"),
        ("Arkansas", "AR"),
        ("California", "CA"),
        ("Colorado", "CO"),
        ("Connecticut", "CT"),
        ("Delaware", "DE"),
        ("District of Columbia", "DC"),
        ("Florida", "FL"),
        ("Georgia", "GA"),
        ("Hawaii", "HI"),
        ("Idaho", "ID"),
        ("Illinois", "IL"),
        ("Indiana", "IN"),
        ("Iowa", "IA"),
        ("Kansas", "KS"),
        ("Kentucky", "KY"),
        ("Louisiana", "LA"),
        ("Maine", "ME"),
        ("Maryland", "MD"),
        ("Massachusetts", "MA"),
        ("Michigan", "MI"),
        ("Minnesota", "MN"),
        ("Mississippi", "MS"),
        ("Missouri", "MO"),
        ("Montana", "MT"),
        ("Nebraska", "NE"),
        ("Nevada", "NV"),
        ("New Hampshire", "NH"),
        ("New Jersey", "NJ"),
        ("New Mexico", "NM"),
        ("New York", "NY"),
        ("North Carolina", "NC"),
        ("North Dakota", "ND"),
        ("Ohio", "OH"),
        ("Oklahoma", "OK"),
        ("Oregon", "OR"),
        ("Pennsylvania", "PA"),
        ("Rhode Island", "RI"),
        ("South Carolina", "SC"),
        ("South Dakota", "SD"),
        ("Tennessee", "TN"),
        ("Texas", "TX"),
        ("Utah", "UT"),
        ("Vermont", "VT"),
        ("Virginia", "VA"),
        ("Washington", "WA"),
        ("West Virginia", "WV"),
        ("Wisconsin", "WI"),
        ("Wyoming", "WY"),
    ];
    CODES
        .iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_type_precedence() {
        assert!(SampleType::Lv.score() > SampleType::Rv.score());
        assert!(SampleType::Rv.score() > SampleType::Adults.score());
        assert!(SampleType::Adults.score() > SampleType::Other.score());
    }

    #[test]
    fn test_poll_is_better_than() {
        let base = Poll {
            description: "A".into(),
            start: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 5, 3).unwrap(),
            published: None,
            dem: 50.0,
            gop: 45.0,
            margin: 5.0,
            sample_size: 800,
            sample_type: SampleType::Rv,
            url: String::new(),
            id: String::new(),
            tracking: false,
            partisan: false,
            grade: 0,
            weight: 0.0,
        };
        let lv = Poll {
            sample_type: SampleType::Lv,
            sample_size: 500,
            ..base.clone()
        };
        assert!(lv.is_better_than(&base));
        assert!(!base.is_better_than(&lv));

        let bigger = Poll {
            sample_size: 1200,
            ..base.clone()
        };
        assert!(bigger.is_better_than(&base));
    }

    #[test]
    fn test_rating_probability_ladder() {
        let dem = |class| RaceRating::new(class, Some(Party::Dem)).dem_win_prob();
        assert_eq!(dem(RatingClass::Tossup), 0.5);
        assert_eq!(dem(RatingClass::Leans), 0.7);
        assert_eq!(dem(RatingClass::Likely), 0.85);
        assert_eq!(dem(RatingClass::Safe), 1.0);

        let gop = RaceRating::new(RatingClass::Likely, Some(Party::Gop));
        assert!((gop.dem_win_prob() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(
            RaceRating::new(RatingClass::Leans, Some(Party::Gop)).to_string(),
            "leans gop"
        );
        assert_eq!(RaceRating::new(RatingClass::Tossup, None).to_string(), "tossup");
    }

    #[test]
    fn test_banned_by_id_or_description() {
        let mut cc = Campaign {
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2020, 11, 3).unwrap(),
            is_presidential_year: true,
            undecided_pct: 5.0,
            dem_pres: String::new(),
            gop_pres: String::new(),
            election_type: String::new(),
            states: vec![],
            assumed_margins: HashMap::new(),
            senate: ChamberMap::default(),
            governor: ChamberMap::default(),
            house: ChamberMap::default(),
            banned_pollsters: HashSet::new(),
            important_dates: vec![],
            house_rating_history: vec![],
            race_results: RaceResults::default(),
        };
        cc.banned_pollsters.insert("push-poll-inc".into());
        cc.banned_pollsters.insert("12345".into());

        let mut poll = Poll {
            description: "push-poll-inc".into(),
            start: cc.start_date,
            end: cc.start_date,
            published: None,
            dem: 50.0,
            gop: 50.0,
            margin: 0.0,
            sample_size: 0,
            sample_type: SampleType::Other,
            url: String::new(),
            id: String::new(),
            tracking: false,
            partisan: false,
            grade: 0,
            weight: 0.0,
        };
        assert!(cc.is_banned(&poll));
        poll.description = "Honest Polling".into();
        poll.id = "12345".into();
        assert!(cc.is_banned(&poll));
        poll.id = "999".into();
        assert!(!cc.is_banned(&poll));
    }

    #[test]
    fn test_state_codes_complete() {
        let codes = state_codes();
        assert_eq!(codes.len(), 51);
        assert_eq!(codes["Ohio"], "OH");
    }
}
