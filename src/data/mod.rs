/// Data layer: core types, loading, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file, resolve schema → SalesDataset
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ SalesDataset │  Vec<TransactionRow>, resolved schema
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  category set + date interval → row indices
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  KPIs, Pareto, top products, weekly, scatter
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  insight  │  heuristic summary sentences
///   └──────────┘
/// ```
///
/// Every derived table is recomputed from scratch on each call to
/// [`compute`]; the only state that survives between interactions is the
/// loader's [`loader::DatasetCache`].
pub mod aggregate;
pub mod export;
pub mod filter;
pub mod insight;
pub mod loader;
pub mod model;

use thiserror::Error;

use self::aggregate::DashboardView;
use self::filter::{filtered_indices, FilterState};
use self::model::SalesDataset;

/// Failures the pipeline can surface to its caller.
///
/// An absent column is deliberately *not* represented here: it degrades the
/// affected output (empty table, `None` scalar) instead of failing the
/// computation, and cell-level coercion failures are already absorbed at
/// load time.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source missing or fundamentally unparseable.  Fatal; shown to the
    /// user with the underlying cause.
    #[error("data unavailable: {0:#}")]
    DataUnavailable(anyhow::Error),

    /// Caller-supplied parameter out of range.  Rejected before any
    /// computation is attempted.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Run the full pipeline: validate parameters, filter, aggregate, and derive
/// insights.  Pure with respect to its inputs; calling it twice on the same
/// arguments yields identical output.
pub fn compute(
    dataset: &SalesDataset,
    filters: &FilterState,
    top_n: usize,
) -> Result<DashboardView, PipelineError> {
    if top_n < 1 {
        return Err(PipelineError::InvalidParameter(format!(
            "top_n must be at least 1, got {top_n}"
        )));
    }
    if let Some((start, end)) = filters.date_range {
        if start > end {
            return Err(PipelineError::InvalidParameter(format!(
                "date interval starts after it ends: {start} > {end}"
            )));
        }
    }

    let visible = filtered_indices(dataset, filters);
    let kpis = aggregate::kpi_snapshot(dataset, &visible);
    let pareto = aggregate::pareto_table(dataset, &visible);
    let top_products = aggregate::top_products(dataset, &visible, top_n)?;
    let weekly = aggregate::weekly_series(dataset, &visible);
    let scatter = aggregate::scatter_points(dataset, &visible);
    let insights = insight::derive(
        &pareto,
        dataset.schema.product_column.is_some(),
        &top_products,
    );

    log::debug!(
        "recomputed view: {}/{} rows visible, {} categories, {} products, {} weeks",
        visible.len(),
        dataset.len(),
        pareto.len(),
        top_products.len(),
        weekly.len()
    );

    Ok(DashboardView {
        visible,
        kpis,
        pareto,
        top_products,
        weekly,
        scatter,
        insights,
    })
}
