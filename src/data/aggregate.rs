use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate};

use super::model::SalesDataset;
use super::PipelineError;

// ---------------------------------------------------------------------------
// Derived tables
// ---------------------------------------------------------------------------

/// Summary scalars for the KPI cards.  Means are `None` when no value
/// contributes, never a division by zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiSnapshot {
    pub total_sales: f64,
    pub avg_profit_margin: Option<f64>,
    pub total_quantity: i64,
    pub order_count: usize,
    pub avg_order_value: Option<f64>,
}

/// One category's contribution, ranked by sales.  `percent` and
/// `cumulative_percent` are `None` when the grand total is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ParetoRow {
    pub category: String,
    pub total_amount: f64,
    pub percent: Option<f64>,
    pub cumulative_percent: Option<f64>,
}

/// Per-product rollup of the three numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TopProductRow {
    pub product: String,
    pub total_amount: f64,
    pub profit_margin: f64,
    pub quantity: i64,
}

/// Sales summed over one calendar week.  Weeks start on Monday (ISO 8601);
/// weeks with no transactions are absent, not zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyPoint {
    pub week_start: NaiveDate,
    pub total_amount: f64,
}

/// Row-level projection for the profit/quantity point cloud.  Only rows with
/// all three numerics present are plottable.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub quantity: i64,
    pub profit_margin: f64,
    pub total_amount: f64,
    pub category: Option<String>,
    pub product: Option<String>,
}

/// Everything one pipeline pass produces for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    /// Indices of the filtered rows, in source order.
    pub visible: Vec<usize>,
    pub kpis: KpiSnapshot,
    pub pareto: Vec<ParetoRow>,
    pub top_products: Vec<TopProductRow>,
    pub weekly: Vec<WeeklyPoint>,
    pub scatter: Vec<ScatterPoint>,
    pub insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Compute the KPI scalars over the filtered rows.  Each scalar is
/// independent: a column with no usable values yields its missing form
/// without affecting the others.
pub fn kpi_snapshot(dataset: &SalesDataset, indices: &[usize]) -> KpiSnapshot {
    let mut total_sales = 0.0;
    let mut margin_sum = 0.0;
    let mut margin_count = 0usize;
    let mut total_quantity = 0i64;

    for &i in indices {
        let row = &dataset.rows[i];
        if let Some(amount) = row.total_amount {
            total_sales += amount;
        }
        if let Some(margin) = row.profit_margin {
            margin_sum += margin;
            margin_count += 1;
        }
        if let Some(qty) = row.quantity {
            total_quantity += qty;
        }
    }

    let order_count = indices.len();
    KpiSnapshot {
        total_sales,
        avg_profit_margin: (margin_count > 0).then(|| margin_sum / margin_count as f64),
        total_quantity,
        order_count,
        avg_order_value: (order_count > 0).then(|| total_sales / order_count as f64),
    }
}

/// Group sales by category and rank descending, with each row's share of the
/// grand total and the running cumulative share.  Rows with a missing
/// category are left out of this table; they still count toward the KPIs.
pub fn pareto_table(dataset: &SalesDataset, indices: &[usize]) -> Vec<ParetoRow> {
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for &i in indices {
        let row = &dataset.rows[i];
        let Some(category) = &row.category else { continue };
        let entry = sums.entry(category.clone()).or_insert(0.0);
        if let Some(amount) = row.total_amount {
            *entry += amount;
        }
    }

    let grand_total: f64 = sums.values().sum();
    let mut rows: Vec<ParetoRow> = sums
        .into_iter()
        .map(|(category, total_amount)| ParetoRow {
            category,
            total_amount,
            percent: None,
            cumulative_percent: None,
        })
        .collect();
    // descending by sales; BTreeMap iteration already fixed ties by name
    rows.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));

    if grand_total != 0.0 {
        let mut running = 0.0;
        for row in &mut rows {
            let pct = row.total_amount / grand_total * 100.0;
            running += pct;
            row.percent = Some(pct);
            row.cumulative_percent = Some(running);
        }
    }

    rows
}

/// Roll up the three numeric columns per product and keep the `top_n` by
/// sales.  Ties keep first-encountered product order (the sort is stable).
/// Returns an empty table when no product column was resolved.
pub fn top_products(
    dataset: &SalesDataset,
    indices: &[usize],
    top_n: usize,
) -> Result<Vec<TopProductRow>, PipelineError> {
    if top_n < 1 {
        return Err(PipelineError::InvalidParameter(format!(
            "top_n must be at least 1, got {top_n}"
        )));
    }

    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<TopProductRow> = Vec::new();

    for &i in indices {
        let row = &dataset.rows[i];
        let Some(product) = &row.product else { continue };
        let slot = *slots.entry(product.clone()).or_insert_with(|| {
            rows.push(TopProductRow {
                product: product.clone(),
                total_amount: 0.0,
                profit_margin: 0.0,
                quantity: 0,
            });
            rows.len() - 1
        });
        let agg = &mut rows[slot];
        if let Some(amount) = row.total_amount {
            agg.total_amount += amount;
        }
        if let Some(margin) = row.profit_margin {
            agg.profit_margin += margin;
        }
        if let Some(qty) = row.quantity {
            agg.quantity += qty;
        }
    }

    rows.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    rows.truncate(top_n);
    Ok(rows)
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Sum sales per calendar week.  Empty unless a date column was resolved;
/// sparse: only weeks with at least one dated transaction appear.
pub fn weekly_series(dataset: &SalesDataset, indices: &[usize]) -> Vec<WeeklyPoint> {
    if dataset.schema.date_column.is_none() {
        return Vec::new();
    }

    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &i in indices {
        let row = &dataset.rows[i];
        let Some(ts) = row.order_date else { continue };
        let entry = sums.entry(week_start(ts.date())).or_insert(0.0);
        if let Some(amount) = row.total_amount {
            *entry += amount;
        }
    }

    sums.into_iter()
        .map(|(week_start, total_amount)| WeeklyPoint {
            week_start,
            total_amount,
        })
        .collect()
}

/// Project filtered rows into scatter points.  No aggregation; rows missing
/// any of the three numerics are not plottable and are skipped.
pub fn scatter_points(dataset: &SalesDataset, indices: &[usize]) -> Vec<ScatterPoint> {
    indices
        .iter()
        .filter_map(|&i| {
            let row = &dataset.rows[i];
            Some(ScatterPoint {
                quantity: row.quantity?,
                profit_margin: row.profit_margin?,
                total_amount: row.total_amount?,
                category: row.category.clone(),
                product: row.product.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ResolvedSchema, TransactionRow};
    use chrono::NaiveDateTime;

    const EPS: f64 = 1e-9;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn full_schema() -> ResolvedSchema {
        ResolvedSchema {
            date_column: Some("order_date".into()),
            product_column: Some("product_name".into()),
            has_category: true,
            has_amount: true,
            has_margin: true,
            has_quantity: true,
        }
    }

    fn row(
        cat: Option<&str>,
        product: Option<&str>,
        amount: Option<f64>,
        margin: Option<f64>,
        qty: Option<i64>,
        date: Option<&str>,
    ) -> TransactionRow {
        TransactionRow {
            category: cat.map(str::to_string),
            product: product.map(str::to_string),
            total_amount: amount,
            profit_margin: margin,
            quantity: qty,
            order_date: date.map(ts),
            ..TransactionRow::default()
        }
    }

    fn all(ds: &SalesDataset) -> Vec<usize> {
        (0..ds.len()).collect()
    }

    #[test]
    fn kpis_on_empty_table() {
        let ds = SalesDataset::from_rows(Vec::new(), full_schema());
        let kpis = kpi_snapshot(&ds, &[]);
        assert_eq!(kpis.total_sales, 0.0);
        assert_eq!(kpis.avg_profit_margin, None);
        assert_eq!(kpis.total_quantity, 0);
        assert_eq!(kpis.order_count, 0);
        assert_eq!(kpis.avg_order_value, None);
    }

    #[test]
    fn kpis_skip_missing_values() {
        let ds = SalesDataset::from_rows(
            vec![
                row(Some("A"), None, Some(100.0), Some(0.2), Some(2), None),
                row(Some("A"), None, Some(50.0), None, None, None),
            ],
            full_schema(),
        );
        let kpis = kpi_snapshot(&ds, &all(&ds));
        assert_eq!(kpis.total_sales, 150.0);
        // only one margin value contributes to the mean
        assert_eq!(kpis.avg_profit_margin, Some(0.2));
        assert_eq!(kpis.total_quantity, 2);
        assert_eq!(kpis.order_count, 2);
        assert_eq!(kpis.avg_order_value, Some(75.0));
    }

    #[test]
    fn pareto_percentages_sum_to_hundred() {
        let ds = SalesDataset::from_rows(
            vec![
                row(Some("A"), None, Some(137.3), None, None, None),
                row(Some("B"), None, Some(41.1), None, None, None),
                row(Some("C"), None, Some(977.0), None, None, None),
                row(Some("B"), None, Some(12.9), None, None, None),
            ],
            full_schema(),
        );
        let pareto = pareto_table(&ds, &all(&ds));
        assert_eq!(pareto.len(), 3);

        let percent_sum: f64 = pareto.iter().map(|r| r.percent.unwrap()).sum();
        assert!((percent_sum - 100.0).abs() < EPS);

        let cums: Vec<f64> = pareto.iter().map(|r| r.cumulative_percent.unwrap()).collect();
        assert!(cums.windows(2).all(|w| w[0] <= w[1]));
        assert!((cums.last().unwrap() - 100.0).abs() < EPS);

        // ranked descending by sales
        assert!(pareto
            .windows(2)
            .all(|w| w[0].total_amount >= w[1].total_amount));
    }

    #[test]
    fn pareto_drops_missing_categories() {
        let ds = SalesDataset::from_rows(
            vec![
                row(Some("A"), None, Some(10.0), None, None, None),
                row(None, None, Some(90.0), None, None, None),
            ],
            full_schema(),
        );
        let pareto = pareto_table(&ds, &all(&ds));
        assert_eq!(pareto.len(), 1);
        assert_eq!(pareto[0].category, "A");
        // the uncategorised row is excluded from the share base too
        assert_eq!(pareto[0].percent, Some(100.0));
    }

    #[test]
    fn pareto_zero_grand_total_has_no_percentages() {
        let ds = SalesDataset::from_rows(
            vec![
                row(Some("A"), None, Some(0.0), None, None, None),
                row(Some("B"), None, None, None, None, None),
            ],
            full_schema(),
        );
        let pareto = pareto_table(&ds, &all(&ds));
        assert_eq!(pareto.len(), 2);
        assert!(pareto.iter().all(|r| r.percent.is_none()));
        assert!(pareto.iter().all(|r| r.cumulative_percent.is_none()));
    }

    #[test]
    fn top_products_truncates_and_sorts() {
        let ds = SalesDataset::from_rows(
            vec![
                row(None, Some("Hub"), Some(50.0), Some(0.2), Some(1), None),
                row(None, Some("Lamp"), Some(120.0), Some(0.3), Some(2), None),
                row(None, Some("Stand"), Some(80.0), Some(0.1), Some(1), None),
                row(None, Some("Hub"), Some(50.0), Some(0.2), Some(3), None),
            ],
            full_schema(),
        );
        let top2 = top_products(&ds, &all(&ds), 2).unwrap();
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].product, "Lamp");
        assert_eq!(top2[1].product, "Hub");
        assert_eq!(top2[1].total_amount, 100.0);
        assert_eq!(top2[1].quantity, 4);

        // truncation is a prefix of the full rollup
        let full = top_products(&ds, &all(&ds), usize::MAX).unwrap();
        assert_eq!(full.len(), 3);
        assert_eq!(&full[..2], &top2[..]);
    }

    #[test]
    fn top_products_ties_keep_first_encountered_order() {
        let ds = SalesDataset::from_rows(
            vec![
                row(None, Some("Zeta"), Some(10.0), None, None, None),
                row(None, Some("Alpha"), Some(10.0), None, None, None),
            ],
            full_schema(),
        );
        let top = top_products(&ds, &all(&ds), 10).unwrap();
        assert_eq!(top[0].product, "Zeta");
        assert_eq!(top[1].product, "Alpha");
    }

    #[test]
    fn top_products_rejects_zero_top_n() {
        let ds = SalesDataset::from_rows(Vec::new(), full_schema());
        let err = top_products(&ds, &[], 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter(_)));
    }

    #[test]
    fn week_bucketing_starts_monday() {
        // 2024-01-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(week_start(monday), monday);
        // Wednesday and Sunday of the same ISO week map back to it
        assert_eq!(week_start(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()), monday);
        assert_eq!(week_start(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()), monday);
        // the next Monday starts a new week
        assert_eq!(
            week_start(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
    }

    #[test]
    fn weekly_series_is_sparse_and_sorted() {
        let ds = SalesDataset::from_rows(
            vec![
                row(None, None, Some(10.0), None, None, Some("2024-01-17 09:00:00")),
                row(None, None, Some(5.0), None, None, Some("2024-01-02 09:00:00")),
                row(None, None, Some(7.0), None, None, Some("2024-01-05 09:00:00")),
                // a gap week (Jan 8-14) stays absent
                row(None, None, None, None, None, None),
            ],
            full_schema(),
        );
        let weekly = weekly_series(&ds, &all(&ds));
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].week_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(weekly[0].total_amount, 12.0);
        assert_eq!(weekly[1].week_start, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(weekly[1].total_amount, 10.0);
    }

    #[test]
    fn weekly_series_requires_date_column() {
        let schema = ResolvedSchema {
            date_column: None,
            ..full_schema()
        };
        let ds = SalesDataset::from_rows(
            vec![row(None, None, Some(10.0), None, None, None)],
            schema,
        );
        assert!(weekly_series(&ds, &all(&ds)).is_empty());
    }

    #[test]
    fn scatter_skips_incomplete_rows() {
        let ds = SalesDataset::from_rows(
            vec![
                row(Some("A"), Some("Hub"), Some(50.0), Some(0.2), Some(1), None),
                row(Some("A"), Some("Hub"), Some(50.0), None, Some(1), None),
                row(Some("A"), Some("Hub"), None, Some(0.2), Some(1), None),
            ],
            full_schema(),
        );
        let points = scatter_points(&ds, &all(&ds));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].quantity, 1);
        assert_eq!(points[0].category.as_deref(), Some("A"));
    }

    #[test]
    fn aggregations_are_idempotent() {
        let ds = SalesDataset::from_rows(
            vec![
                row(Some("A"), Some("Hub"), Some(50.0), Some(0.2), Some(1), Some("2024-01-02 09:00:00")),
                row(Some("B"), Some("Lamp"), Some(30.0), Some(0.1), Some(2), Some("2024-01-09 09:00:00")),
            ],
            full_schema(),
        );
        let idx = all(&ds);
        assert_eq!(kpi_snapshot(&ds, &idx), kpi_snapshot(&ds, &idx));
        assert_eq!(pareto_table(&ds, &idx), pareto_table(&ds, &idx));
        assert_eq!(
            top_products(&ds, &idx, 5).unwrap(),
            top_products(&ds, &idx, 5).unwrap()
        );
        assert_eq!(weekly_series(&ds, &idx), weekly_series(&ds, &idx));
    }
}
