use super::aggregate::{ParetoRow, TopProductRow};
use crate::fmt;

/// Derive short natural-language observations from the ranked tables.
///
/// Returns an empty list when neither rule fires; the caller renders a
/// "not enough data" notice in that case.
pub fn derive(
    pareto: &[ParetoRow],
    has_product_column: bool,
    top_products: &[TopProductRow],
) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(top) = pareto.first() {
        if let Some(pct) = top.percent {
            insights.push(format!(
                "Category \"{}\" accounts for {:.2}% of total sales; consider prioritising stock and promotions for it.",
                top.category, pct
            ));
        }
    }

    if has_product_column {
        if let Some(top) = top_products.first() {
            insights.push(format!(
                "Top product: \"{}\" with total sales of {}.",
                top.product,
                fmt::currency(top.total_amount)
            ));
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pareto_row(category: &str, amount: f64, pct: Option<f64>) -> ParetoRow {
        ParetoRow {
            category: category.to_string(),
            total_amount: amount,
            percent: pct,
            cumulative_percent: pct,
        }
    }

    #[test]
    fn both_rules_fire() {
        let pareto = vec![pareto_row("Electronics", 300.0, Some(75.0))];
        let top = vec![TopProductRow {
            product: "USB Hub".into(),
            total_amount: 12345.6,
            profit_margin: 0.2,
            quantity: 10,
        }];
        let insights = derive(&pareto, true, &top);
        assert_eq!(insights.len(), 2);
        assert!(insights[0].contains("Electronics"));
        assert!(insights[0].contains("75.00%"));
        assert!(insights[1].contains("USB Hub"));
        assert!(insights[1].contains("12,346"));
    }

    #[test]
    fn no_product_column_skips_rule_two() {
        let pareto = vec![pareto_row("Toys", 10.0, Some(100.0))];
        let insights = derive(&pareto, false, &[]);
        assert_eq!(insights.len(), 1);
    }

    #[test]
    fn undefined_percent_skips_rule_one() {
        let pareto = vec![pareto_row("Toys", 0.0, None)];
        assert!(derive(&pareto, false, &[]).is_empty());
    }

    #[test]
    fn empty_tables_yield_no_insights() {
        assert!(derive(&[], true, &[]).is_empty());
    }
}
