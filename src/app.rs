use eframe::egui;

use crate::state::{AppState, Tab};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SalesDashApp {
    pub state: AppState,
}

impl eframe::App for SalesDashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar, row counts, status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters & controls ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: tab strip + active view ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.dataset.is_none() {
                ui.centered_and_justified(|ui: &mut egui::Ui| {
                    ui.heading("Open a sales file to begin  (File → Open…)");
                });
                return;
            }

            ui.horizontal(|ui: &mut egui::Ui| {
                for (tab, label) in [
                    (Tab::Overview, "Overview"),
                    (Tab::Pareto, "Pareto & Top Products"),
                    (Tab::Scatter, "Profit vs Quantity"),
                    (Tab::Raw, "Raw Data"),
                ] {
                    if ui
                        .selectable_label(self.state.active_tab == tab, label)
                        .clicked()
                    {
                        self.state.active_tab = tab;
                    }
                }
            });
            ui.separator();

            match self.state.active_tab {
                Tab::Overview => {
                    panels::kpi_row(ui, &self.state);
                    ui.separator();
                    plot::weekly_chart(ui, &self.state);
                    ui.separator();
                    panels::insight_block(ui, &self.state);
                }
                Tab::Pareto => {
                    plot::pareto_chart(ui, &self.state);
                    ui.separator();
                    plot::top_products_chart(ui, &self.state);
                }
                Tab::Scatter => {
                    plot::scatter_chart(ui, &self.state);
                }
                Tab::Raw => {
                    panels::raw_table(ui, &mut self.state);
                }
            }
        });
    }
}
