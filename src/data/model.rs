use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// CellValue – a single pass-through cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell for columns the pipeline does not interpret.
/// Loaded rows keep these so the raw view and exports can show the full
/// source table, not just the typed columns.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Date or datetime kept as text; the typed `order_date` field holds
    /// the parsed form for the resolved date column.
    Date(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64`, accepting numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to interpret the value as an `i64`.  Floats qualify only when
    /// they carry no fractional part, so `3.0` counts and `3.5` does not.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            CellValue::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0)
                        .map(|v| v as i64)
                })
            }
            _ => None,
        }
    }

    /// Label text for grouping columns (category, product).  Empty strings
    /// and non-label types count as missing.
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            CellValue::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

}

// ---------------------------------------------------------------------------
// ResolvedSchema – which source columns the pipeline recognised
// ---------------------------------------------------------------------------

/// Outcome of the schema-resolution step.  Downstream stages consult this to
/// decide which derived tables are constructible; an absent column degrades
/// the affected output instead of failing the load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSchema {
    /// Source column parsed into `order_date`, if any candidate was present.
    pub date_column: Option<String>,
    /// Source column used as the product label, if any candidate was present.
    pub product_column: Option<String>,
    pub has_category: bool,
    pub has_amount: bool,
    pub has_margin: bool,
    pub has_quantity: bool,
}

// ---------------------------------------------------------------------------
// TransactionRow – one order line
// ---------------------------------------------------------------------------

/// A single transaction.  Every typed field is optional: a cell that failed
/// numeric or date coercion is `None`, never a propagated parse error.
#[derive(Debug, Clone, Default)]
pub struct TransactionRow {
    pub category: Option<String>,
    pub product: Option<String>,
    pub total_amount: Option<f64>,
    pub profit_margin: Option<f64>,
    pub quantity: Option<i64>,
    pub order_date: Option<NaiveDateTime>,
    /// Columns the pipeline ignores, kept for raw display and export.
    pub extra: BTreeMap<String, CellValue>,
}

// ---------------------------------------------------------------------------
// SalesDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with the indices the filter panel needs.
#[derive(Debug, Clone)]
pub struct SalesDataset {
    /// All transactions, in source order.
    pub rows: Vec<TransactionRow>,
    pub schema: ResolvedSchema,
    /// Ordered names of the pass-through columns (excludes typed columns).
    pub extra_columns: Vec<String>,
    /// Sorted distinct categories across all rows.
    pub categories: BTreeSet<String>,
}

impl SalesDataset {
    /// Build the category and pass-through column indices from loaded rows.
    pub fn from_rows(rows: Vec<TransactionRow>, schema: ResolvedSchema) -> Self {
        let mut extra_columns: BTreeSet<String> = BTreeSet::new();
        let mut categories: BTreeSet<String> = BTreeSet::new();

        for row in &rows {
            for col in row.extra.keys() {
                extra_columns.insert(col.clone());
            }
            if let Some(cat) = &row.category {
                categories.insert(cat.clone());
            }
        }

        SalesDataset {
            rows,
            schema,
            extra_columns: extra_columns.into_iter().collect(),
            categories,
        }
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest order dates, for seeding the date-range picker.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for row in &self.rows {
            let Some(ts) = row.order_date else { continue };
            let d = ts.date();
            bounds = Some(match bounds {
                None => (d, d),
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
            });
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn label_coercion() {
        assert_eq!(
            CellValue::String("  Widget ".into()).as_label(),
            Some("Widget".to_string())
        );
        assert_eq!(CellValue::Integer(42).as_label(), Some("42".to_string()));
        assert_eq!(CellValue::String("   ".into()).as_label(), None);
        assert_eq!(CellValue::Null.as_label(), None);
    }

    #[test]
    fn integer_coercion_rejects_fractions() {
        assert_eq!(CellValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(CellValue::Float(3.5).as_i64(), None);
        assert_eq!(CellValue::String("7".into()).as_i64(), Some(7));
        assert_eq!(CellValue::String("7.0".into()).as_i64(), Some(7));
        assert_eq!(CellValue::String("N/A".into()).as_i64(), None);
    }

    #[test]
    fn date_bounds_skip_missing() {
        let mk = |d: Option<&str>| TransactionRow {
            order_date: d.and_then(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            }),
            ..TransactionRow::default()
        };
        let ds = SalesDataset::from_rows(
            vec![mk(Some("2024-03-01")), mk(None), mk(Some("2024-01-15"))],
            ResolvedSchema::default(),
        );
        let (lo, hi) = ds.date_bounds().unwrap();
        assert_eq!(lo.to_string(), "2024-01-15");
        assert_eq!(hi.to_string(), "2024-03-01");
    }
}
