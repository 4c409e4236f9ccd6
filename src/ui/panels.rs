use anyhow::Result;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, DatePickerButton, TableBuilder};

use crate::data::export;
use crate::data::model::SalesDataset;
use crate::fmt;
use crate::state::AppState;

const RAW_PREVIEW_ROWS: usize = 100;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(dataset) = &state.dataset {
            let visible = state.view.as_ref().map(|v| v.visible.len()).unwrap_or(0);
            ui.label(format!(
                "{} transactions loaded, {} visible",
                dataset.len(),
                visible
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filters & controls
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters & Controls");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Top N products");
            let mut top_n = state.top_n;
            if ui.add(egui::Slider::new(&mut top_n, 1..=30)).changed() {
                state.set_top_n(top_n);
            }
            ui.separator();

            category_filter(ui, state, &dataset);
            ui.separator();

            date_filter(ui, state, &dataset);
            ui.separator();

            export_buttons(ui, state);
        });
}

fn category_filter(ui: &mut Ui, state: &mut AppState, dataset: &SalesDataset) {
    if !dataset.schema.has_category {
        ui.label("No category column in this dataset.");
        return;
    }

    let n_selected = state.filters.categories.len();
    let n_total = dataset.categories.len();
    let header_text = format!("Categories  ({n_selected}/{n_total})");

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_categories();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_categories();
                }
            });
            if state.filters.categories.is_empty() {
                ui.weak("Empty selection shows all rows.");
            }

            let mut toggled: Option<String> = None;
            for cat in &dataset.categories {
                let mut checked = state.filters.categories.contains(cat);
                let mut text = RichText::new(cat);
                if let Some(cm) = &state.color_map {
                    text = text.color(cm.color_for(Some(cat)));
                }
                if ui.checkbox(&mut checked, text).changed() {
                    toggled = Some(cat.clone());
                }
            }
            if let Some(cat) = toggled {
                state.toggle_category(&cat);
            }
        });
}

fn date_filter(ui: &mut Ui, state: &mut AppState, dataset: &SalesDataset) {
    let Some(date_col) = dataset.schema.date_column.clone() else {
        ui.label("No date column found; time filtering is unavailable.");
        return;
    };
    ui.strong(format!("Date range ({date_col})"));

    match state.filters.date_range {
        Some((mut start, mut end)) => {
            let mut changed = false;
            ui.horizontal(|ui: &mut Ui| {
                changed |= ui
                    .add(DatePickerButton::new(&mut start).id_salt("range_start"))
                    .changed();
                ui.label("to");
                changed |= ui
                    .add(DatePickerButton::new(&mut end).id_salt("range_end"))
                    .changed();
            });
            if changed {
                state.set_date_range(Some((start, end)));
            }
            if ui.small_button("Clear").clicked() {
                state.set_date_range(None);
            }
        }
        None => {
            if ui.button("Filter by date…").clicked() {
                state.set_date_range(dataset.date_bounds());
            }
        }
    }
}

fn export_buttons(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Export");

    let mut pending: Option<(String, Result<String>)> = None;
    {
        let (Some(dataset), Some(view)) = (&state.dataset, &state.view) else {
            return;
        };
        if ui.button("Save filtered rows as CSV…").clicked() {
            pending = Some((
                "sales_filtered.csv".to_string(),
                export::filtered_table_csv(dataset, &view.visible),
            ));
        }
        if dataset.schema.product_column.is_some()
            && ui.button("Save top products as CSV…").clicked()
        {
            pending = Some((
                format!("top_{}_products.csv", state.top_n),
                export::top_products_csv(&view.top_products),
            ));
        }
    }

    if let Some((default_name, built)) = pending {
        match built {
            Ok(text) => save_text_dialog(state, &default_name, &text),
            Err(e) => {
                log::error!("building export failed: {e:#}");
                state.status_message = Some(format!("Export failed: {e:#}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// KPI row & insights (Overview tab)
// ---------------------------------------------------------------------------

/// Render the four KPI cards.
pub fn kpi_row(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else { return };
    let k = &view.kpis;

    ui.columns(4, |cols: &mut [Ui]| {
        metric(&mut cols[0], "Total Sales", fmt::currency(k.total_sales));
        metric(
            &mut cols[1],
            "Avg Profit Margin",
            k.avg_profit_margin
                .map(|m| format!("{m:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        );
        metric(&mut cols[2], "Total Qty Sold", fmt::count(k.total_quantity));
        metric(
            &mut cols[3],
            "Avg Order Value",
            k.avg_order_value
                .map(fmt::currency)
                .unwrap_or_else(|| "-".to_string()),
        );
    });
    ui.weak(format!("{} orders", fmt::count(k.order_count as i64)));
}

fn metric(ui: &mut Ui, label: &str, value: String) {
    ui.vertical(|ui: &mut Ui| {
        ui.weak(label);
        ui.heading(value);
    });
}

/// Render the automated-insight list.
pub fn insight_block(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else { return };
    ui.strong("Automated Insights");
    if view.insights.is_empty() {
        ui.label("Not enough data for automated insights. Check column names or the active filters.");
        return;
    }
    for line in &view.insights {
        ui.label(format!("• {line}"));
    }
}

// ---------------------------------------------------------------------------
// Raw data tab
// ---------------------------------------------------------------------------

/// Render the filtered table, previewing the first rows unless expanded.
pub fn raw_table(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.dataset.clone() else {
        return;
    };
    let visible: Vec<usize> = state
        .view
        .as_ref()
        .map(|v| v.visible.clone())
        .unwrap_or_default();

    ui.checkbox(&mut state.show_full_raw, "Show all filtered rows");

    let limit = if state.show_full_raw {
        visible.len()
    } else {
        visible.len().min(RAW_PREVIEW_ROWS)
    };
    let header = export::table_header(&dataset);

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .columns(Column::auto().resizable(true), header.len())
            .header(20.0, |mut row| {
                for name in &header {
                    row.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, limit, |mut table_row| {
                    let idx = visible[table_row.index()];
                    for cell in export::table_record(&dataset, idx) {
                        table_row.col(|ui: &mut Ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });

    if limit < visible.len() {
        ui.weak(format!(
            "Showing {limit} of {} filtered rows.",
            visible.len()
        ));
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sales data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_source(path);
    }
}

fn save_text_dialog(state: &mut AppState, default_name: &str, text: &str) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save CSV")
        .set_file_name(default_name)
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };

    match std::fs::write(&path, text) {
        Ok(()) => {
            log::info!("wrote export to {}", path.display());
            state.status_message = Some(format!("Saved {}", path.display()));
        }
        Err(e) => {
            log::error!("failed to write {}: {e}", path.display());
            state.status_message = Some(format!("Error: failed to write {}: {e}", path.display()));
        }
    }
}
