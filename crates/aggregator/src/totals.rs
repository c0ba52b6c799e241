//! National totals from region rows.

use covid19_db::models::CaseCounts;

/// Sum every count across regions, treating missing values as zero.
///
/// Returns `None` for an empty set of regions: there is nothing to total.
pub fn compute_totals<'a, I>(cases: I) -> Option<CaseCounts>
where
    I: IntoIterator<Item = &'a CaseCounts>,
{
    let mut iter = cases.into_iter();
    let first = iter.next()?;
    let start = first.add(&CaseCounts::default());
    Some(iter.fold(start, |acc, counts| acc.add(counts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(confirmed: Option<i64>, deaths: Option<i64>) -> CaseCounts {
        CaseCounts {
            confirmed,
            deaths,
            ..Default::default()
        }
    }

    #[test]
    fn test_nulls_sum_as_zero() {
        let rows = [counts(Some(10), None), counts(None, Some(2)), counts(Some(5), Some(1))];
        let totals = compute_totals(&rows).unwrap();

        assert_eq!(totals.confirmed, Some(15));
        assert_eq!(totals.deaths, Some(3));
        assert_eq!(totals.active, Some(0));
        assert_eq!(totals.foreigners, Some(0));
    }

    #[test]
    fn test_region_order_does_not_matter() {
        let rows = vec![
            counts(Some(7), Some(1)),
            counts(Some(300), None),
            counts(None, Some(4)),
            counts(Some(12), Some(0)),
        ];
        let expected = compute_totals(&rows).unwrap();

        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(compute_totals(&reversed).unwrap(), expected);

        let rotated: Vec<_> = rows.iter().cycle().skip(2).take(rows.len()).copied().collect();
        assert_eq!(compute_totals(&rotated).unwrap(), expected);
    }

    #[test]
    fn test_empty_has_no_totals() {
        assert_eq!(compute_totals(&Vec::<CaseCounts>::new()), None);
    }
}
