//! One day's full analysis: every chamber, one ModelData.

use chrono::NaiveDate;

use crate::campaign::dates::utc_now_secs;
use crate::campaign::feed::Feed;
use crate::campaign::models::Campaign;
use crate::error::ForecastError;
use crate::forecast::chamber;
use crate::forecast::models::ModelData;

/// Analyze one calendar day against the feed as it appeared on that day.
///
/// `today` distinguishes live runs from backdated ones (which replay
/// historical house ratings). The chamber passes are ordered so the
/// undecided-voter waterfall sees the generic ballot and national models
/// before any race needs them.
pub fn analyze_day(
    campaign: &Campaign,
    feed: &Feed,
    data: &mut ModelData,
    today: NaiveDate,
) -> Result<(), ForecastError> {
    data.generated = utc_now_secs();

    chamber::analyze_states(campaign, feed, data)?;
    chamber::analyze_senate(campaign, feed, data)?;
    chamber::analyze_governor(campaign, feed, data)?;
    chamber::analyze_house(campaign, feed, data, today)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::models::StateRace;
    use crate::campaign::test_support::{make_campaign, make_poll};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    fn toy_campaign_and_feed() -> (Campaign, Feed) {
        let mut cc = make_campaign();
        cc.states = vec![
            StateRace { name: "Alpha".into(), evs: 10 },
            StateRace { name: "Beta".into(), evs: 10 },
        ];
        let mut feed = Feed::default();
        for state in ["Alpha", "Beta"] {
            feed.state_polls.insert(
                state.into(),
                vec![make_poll("Pollster", date(9, 28), date(10, 1), 52.0, 48.0)],
            );
        }
        feed.national_polls =
            vec![make_poll("Nat", date(9, 28), date(10, 1), 49.0, 45.0)];
        feed.generic_ballot_polls =
            vec![make_poll("Gen", date(9, 28), date(10, 1), 48.0, 44.0)];
        (cc, feed)
    }

    #[test]
    fn test_analyze_day_fills_all_sections() {
        let (cc, feed) = toy_campaign_and_feed();
        let mut data = ModelData::for_date(date(10, 2));
        analyze_day(&cc, &feed, &mut data, date(10, 2)).unwrap();

        assert!(data.national.is_some());
        assert!(data.generic_ballot.is_some());
        assert_eq!(data.states.len(), 2);
        assert!(data.generated > 0);
        // National undecideds (100 - 49 - 45 = 6) win the waterfall.
        assert_eq!(data.undecideds, 6.0);
    }

    #[test]
    fn test_analyze_day_is_deterministic() {
        let (cc, feed) = toy_campaign_and_feed();
        let mut a = ModelData::for_date(date(10, 2));
        let mut b = ModelData::for_date(date(10, 2));
        analyze_day(&cc, &feed, &mut a, date(10, 2)).unwrap();
        analyze_day(&cc, &feed, &mut b, date(10, 2)).unwrap();

        // Identical except for the generation timestamp.
        a.generated = 0;
        b.generated = 0;
        let ja = serde_json::to_string(&a).unwrap();
        let jb = serde_json::to_string(&b).unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn test_generic_ballot_undecideds_without_national() {
        let (mut cc, mut feed) = toy_campaign_and_feed();
        cc.is_presidential_year = false;
        cc.states.clear();
        feed.national_polls.clear();

        let mut data = ModelData::for_date(date(10, 2));
        analyze_day(&cc, &feed, &mut data, date(10, 2)).unwrap();

        assert!(data.national.is_none());
        // Generic ballot residual: 100 - 48 - 44 = 8.
        assert_eq!(data.undecideds, 8.0);
    }
}
