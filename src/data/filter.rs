use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::model::SalesDataset;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Active filter selections.
///
/// An empty category set means "no category filter": the panel's default of
/// nothing selected falls back to showing everything, a deliberate usability
/// choice.  A non-empty set is a positive filter, and rows with a missing
/// category never match one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub categories: BTreeSet<String>,
    /// Inclusive day interval.  The end boundary covers the whole end day.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Expand a day interval to timestamps: `[start 00:00:00, end 23:59:59]`,
/// so whole-day semantics hold even though the picker carries no time.
fn interval_bounds(start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("valid end-of-day time");
    (start.and_time(NaiveTime::MIN), end.and_time(end_of_day))
}

/// Return indices of rows that pass all active filters, in source order.
///
/// A row passes when:
/// * the category set is empty, or its category is present and selected
/// * no date interval is set, or its order date is present and inside it
pub fn filtered_indices(dataset: &SalesDataset, filters: &FilterState) -> Vec<usize> {
    let interval = filters.date_range.map(|(s, e)| interval_bounds(s, e));

    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            if !filters.categories.is_empty() {
                match &row.category {
                    Some(cat) if filters.categories.contains(cat) => {}
                    _ => return false,
                }
            }
            if let Some((start, end)) = interval {
                match row.order_date {
                    Some(ts) if ts >= start && ts <= end => {}
                    _ => return false,
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}
