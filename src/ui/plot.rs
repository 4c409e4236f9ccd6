use std::collections::BTreeMap;

use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Weekly time series (Overview tab)
// ---------------------------------------------------------------------------

/// Render the weekly sales line.
pub fn weekly_chart(ui: &mut Ui, state: &AppState) {
    let (Some(dataset), Some(view)) = (&state.dataset, &state.view) else {
        return;
    };

    ui.strong("Sales Over Time (Weekly)");
    if dataset.schema.date_column.is_none() {
        ui.label("No date column found; the time series is unavailable.");
        return;
    }
    if view.weekly.is_empty() {
        ui.label("No dated transactions in the current selection.");
        return;
    }

    let labels: Vec<String> = view
        .weekly
        .iter()
        .map(|w| w.week_start.format("%Y-%m-%d").to_string())
        .collect();
    let coords: Vec<[f64; 2]> = view
        .weekly
        .iter()
        .enumerate()
        .map(|(i, w)| [i as f64, w.total_amount])
        .collect();

    Plot::new("weekly_plot")
        .height(260.0)
        .legend(Legend::default())
        .y_axis_label("Total Sales")
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(coords.clone()))
                    .name("Weekly sales")
                    .width(2.0),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(coords))
                    .name("Weekly sales")
                    .radius(3.0),
            );
        });
}

// ---------------------------------------------------------------------------
// Pareto chart (Pareto & Top Products tab)
// ---------------------------------------------------------------------------

/// Render category bars with the cumulative-share line on top.
pub fn pareto_chart(ui: &mut Ui, state: &AppState) {
    let (Some(dataset), Some(view)) = (&state.dataset, &state.view) else {
        return;
    };

    ui.strong("Pareto Analysis (Category Contribution)");
    if !dataset.schema.has_category {
        ui.label("No category column in this dataset.");
        return;
    }
    if view.pareto.is_empty() {
        ui.label("No categorised transactions in the current selection.");
        return;
    }

    let labels: Vec<String> = view.pareto.iter().map(|r| r.category.clone()).collect();
    let bars: Vec<Bar> = view
        .pareto
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let color = state
                .color_map
                .as_ref()
                .map(|cm| cm.color_for(Some(&r.category)))
                .unwrap_or(Color32::LIGHT_BLUE);
            Bar::new(i as f64, r.total_amount)
                .width(0.6)
                .name(&r.category)
                .fill(color)
        })
        .collect();

    // cumulative share rescaled onto the sales axis; the line ends at 100%
    let tallest = view
        .pareto
        .iter()
        .map(|r| r.total_amount)
        .fold(0.0_f64, f64::max);
    let cumulative: Vec<[f64; 2]> = view
        .pareto
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.cumulative_percent.map(|c| [i as f64, c / 100.0 * tallest]))
        .collect();

    Plot::new("pareto_plot")
        .height(300.0)
        .legend(Legend::default())
        .y_axis_label("Total Sales")
        .x_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Sales"));
            if !cumulative.is_empty() {
                plot_ui.line(
                    Line::new(PlotPoints::from(cumulative))
                        .name("Cumulative share")
                        .color(Color32::ORANGE)
                        .width(2.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Top products chart
// ---------------------------------------------------------------------------

/// Render the top-N products as horizontal bars, biggest on top.
pub fn top_products_chart(ui: &mut Ui, state: &AppState) {
    let (Some(dataset), Some(view)) = (&state.dataset, &state.view) else {
        return;
    };

    ui.strong(format!("Top {} Products by Sales", state.top_n));
    if dataset.schema.product_column.is_none() {
        ui.label("No product_name/product_title/product_id column; top products are unavailable.");
        return;
    }
    if view.top_products.is_empty() {
        ui.label("No products in the current selection.");
        return;
    }

    // reversed so the best seller sits at the top of the axis
    let labels: Vec<String> = view
        .top_products
        .iter()
        .rev()
        .map(|r| r.product.clone())
        .collect();
    let bars: Vec<Bar> = view
        .top_products
        .iter()
        .rev()
        .enumerate()
        .map(|(i, r)| Bar::new(i as f64, r.total_amount).width(0.6).name(&r.product))
        .collect();

    Plot::new("top_products_plot")
        .height(300.0)
        .x_axis_label("Total Sales")
        .y_axis_formatter(move |mark, _range| index_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().name("Sales"));
        });
}

// ---------------------------------------------------------------------------
// Profit vs quantity scatter
// ---------------------------------------------------------------------------

/// Render the profit/quantity point cloud, coloured by category, point size
/// stepped by order value.
pub fn scatter_chart(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else { return };

    ui.strong("Profit Margin vs Quantity (point size tracks sales)");
    if view.scatter.is_empty() {
        ui.label(
            "quantity / profit_margin / total_amount are incomplete; the scatter chart is unavailable.",
        );
        return;
    }

    let max_amount = view
        .scatter
        .iter()
        .map(|p| p.total_amount)
        .fold(0.0_f64, f64::max)
        .max(1e-9);

    // one Points item per (category, size bucket): egui_plot draws a fixed
    // radius per item, so amounts are stepped into four buckets
    let mut groups: BTreeMap<(String, u8), Vec<[f64; 2]>> = BTreeMap::new();
    for p in &view.scatter {
        let label = p
            .category
            .clone()
            .unwrap_or_else(|| "(uncategorised)".to_string());
        let bucket = ((p.total_amount / max_amount * 4.0).ceil() as u8).clamp(1, 4);
        groups
            .entry((label, bucket))
            .or_default()
            .push([p.quantity as f64, p.profit_margin]);
    }

    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label("Quantity")
        .y_axis_label("Profit Margin")
        .show(ui, |plot_ui| {
            for ((label, bucket), coords) in groups {
                let color = state
                    .color_map
                    .as_ref()
                    .map(|cm| cm.color_for(Some(&label)))
                    .unwrap_or(Color32::LIGHT_BLUE);
                plot_ui.points(
                    Points::new(PlotPoints::from(coords))
                        .name(&label)
                        .color(color)
                        .radius(1.5 + f32::from(bucket) * 1.5),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Label integer axis positions with the matching entry; fractional grid
/// marks stay blank.
fn index_label(labels: &[String], value: f64) -> String {
    let i = value.round();
    if (value - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}
