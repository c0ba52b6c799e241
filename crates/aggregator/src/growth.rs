//! Growth window and doubling time.
//!
//! Inputs are the confirmed counts of the day-representative entries, one
//! row per (day, region). Every region, plus the synthetic national region,
//! gets the confirmed counts of the last [`GROWTH_WINDOW_DAYS`] days and a
//! `doubled_in` figure.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use covid19_db::models::ConfirmedRow;

use crate::payloads::{DayCases, GrowthRecord};
use crate::NATIONAL_REGION;

/// Width of the growth window, ending at the latest day with data.
pub const GROWTH_WINDOW_DAYS: u64 = 20;

/// The window of calendar days ending at `max_date`, oldest first.
pub fn window_dates(max_date: NaiveDate) -> Vec<NaiveDate> {
    (0..GROWTH_WINDOW_DAYS)
        .rev()
        .filter_map(|back| max_date.checked_sub_days(Days::new(back)))
        .collect()
}

/// Number of entries back to the first non-zero count below half of the
/// current one.
///
/// `values` is ordered most recent first; `values[0]` is the current count.
/// Zero counts never qualify.
pub fn doubled_in(values: &[i64]) -> Option<usize> {
    let current = *values.first()?;
    values
        .iter()
        .position(|&v| v != 0 && v + v < current)
}

/// Confirmed counts of one region, most recent day first.
struct RegionSeries {
    days: Vec<(NaiveDate, i64)>,
}

impl RegionSeries {
    fn record(&self, state: &str, window: &[NaiveDate], max_date: NaiveDate) -> GrowthRecord {
        let values: Vec<i64> = self.days.iter().map(|(_, confirmed)| *confirmed).collect();
        let by_date: HashMap<NaiveDate, i64> = self.days.iter().copied().collect();

        GrowthRecord {
            state: state.to_string(),
            doubled_in: doubled_in(&values),
            cases: window
                .iter()
                .map(|&date| DayCases {
                    date,
                    cases: by_date.get(&date).copied().unwrap_or(0),
                })
                .collect(),
            current: by_date.get(&max_date).copied().unwrap_or(0),
        }
    }
}

/// Build growth records for every region and the national aggregate.
///
/// Records are sorted by the confirmed count on the oldest day of the
/// window, largest first; ties keep region-code order with the national
/// record last. Returns `None` when there are no rows.
pub fn compute_growth(rows: &[ConfirmedRow]) -> Option<Vec<GrowthRecord>> {
    let max_date = rows.iter().map(|row| row.date).max()?;
    let window = window_dates(max_date);

    let mut regions: BTreeMap<&str, Vec<(NaiveDate, i64)>> = BTreeMap::new();
    let mut national_by_date: HashMap<NaiveDate, i64> = HashMap::new();
    for row in rows {
        let confirmed = row.confirmed.unwrap_or(0);
        regions
            .entry(row.state.as_str())
            .or_default()
            .push((row.date, confirmed));
        *national_by_date.entry(row.date).or_default() += confirmed;
    }
    // The national record replaces a region that happens to share its key.
    regions.remove(NATIONAL_REGION);

    let mut records: Vec<GrowthRecord> = regions
        .into_iter()
        .map(|(state, mut days)| {
            days.sort_by(|a, b| b.0.cmp(&a.0));
            RegionSeries { days }.record(state, &window, max_date)
        })
        .collect();

    // National doubling time only looks at the window, newest first.
    let national = RegionSeries {
        days: window
            .iter()
            .rev()
            .map(|date| (*date, national_by_date.get(date).copied().unwrap_or(0)))
            .collect(),
    };
    records.push(national.record(NATIONAL_REGION, &window, max_date));

    records.sort_by(|a, b| oldest_day_cases(b).cmp(&oldest_day_cases(a)));
    Some(records)
}

fn oldest_day_cases(record: &GrowthRecord) -> i64 {
    record.cases.first().map(|day| day.cases).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 4, day).unwrap()
    }

    fn row(day: u32, state: &str, confirmed: Option<i64>) -> ConfirmedRow {
        ConfirmedRow {
            date: date(day),
            state: state.to_string(),
            confirmed,
        }
    }

    #[test]
    fn test_doubled_in_finds_first_crossing() {
        let mut values = vec![100; 10];
        values.extend(vec![40; 11]);
        assert_eq!(doubled_in(&values), Some(10));

        assert_eq!(doubled_in(&[10, 10, 10, 4]), Some(3));
        assert_eq!(doubled_in(&[10, 8, 4, 2]), Some(2));
    }

    #[test]
    fn test_doubled_in_exact_half_does_not_count() {
        assert_eq!(doubled_in(&[10, 10, 10, 5]), None);
    }

    #[test]
    fn test_doubled_in_skips_zero_counts() {
        assert_eq!(doubled_in(&[10, 0, 0, 3]), Some(3));
        assert_eq!(doubled_in(&[0, 0]), None);
        assert_eq!(doubled_in(&[]), None);
    }

    #[test]
    fn test_window_is_twenty_days_ending_at_max() {
        let window = window_dates(date(30));
        assert_eq!(window.len(), 20);
        assert_eq!(window[0], date(11));
        assert_eq!(window[19], date(30));
        assert!(window.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_days_default_to_zero() {
        let rows = vec![row(30, "KL", Some(8)), row(28, "KL", Some(4))];
        let records = compute_growth(&rows).unwrap();
        let kl = records.iter().find(|r| r.state == "KL").unwrap();

        assert_eq!(kl.current, 8);
        assert_eq!(kl.cases[19], DayCases { date: date(30), cases: 8 });
        assert_eq!(kl.cases[18], DayCases { date: date(29), cases: 0 });
        assert_eq!(kl.cases[17], DayCases { date: date(28), cases: 4 });
        // Region series are not windowed: the gap on the 29th is not an entry.
        assert_eq!(kl.doubled_in, None);
    }

    #[test]
    fn test_national_sums_regions_per_day() {
        let rows = vec![
            row(30, "DL", Some(20)),
            row(29, "DL", Some(10)),
            row(30, "KL", None),
            row(29, "KL", Some(5)),
        ];
        let records = compute_growth(&rows).unwrap();
        let india = records.iter().find(|r| r.state == NATIONAL_REGION).unwrap();

        assert_eq!(india.current, 20);
        assert_eq!(india.cases[18].cases, 15);
        assert_eq!(india.cases[0].cases, 0);
        // Zero-filled window days are skipped, 15 + 15 < 20 is false.
        assert_eq!(india.doubled_in, None);
    }

    #[test]
    fn test_sorted_by_oldest_window_day() {
        // Window for max day 30 starts on the 11th.
        let rows = vec![
            row(30, "AA", Some(60)),
            row(11, "AA", Some(50)),
            row(30, "BB", Some(500)),
            row(11, "BB", Some(10)),
        ];
        let records = compute_growth(&rows).unwrap();
        let order: Vec<&str> = records.iter().map(|r| r.state.as_str()).collect();

        assert_eq!(order, vec![NATIONAL_REGION, "AA", "BB"]);
        assert_eq!(records[1].current, 60);
        assert_eq!(records[2].current, 500);
        assert_eq!(records[2].doubled_in, Some(1));
    }

    #[test]
    fn test_ties_keep_region_order() {
        let rows = vec![row(30, "ZZ", Some(3)), row(30, "AA", Some(3))];
        let records = compute_growth(&rows).unwrap();
        let order: Vec<&str> = records.iter().map(|r| r.state.as_str()).collect();

        assert_eq!(order, vec!["AA", "ZZ", NATIONAL_REGION]);
    }

    #[test]
    fn test_no_rows_no_growth() {
        assert_eq!(compute_growth(&[]), None);
    }
}
