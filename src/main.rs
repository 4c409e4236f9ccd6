mod app;
mod color;
mod data;
mod fmt;
mod state;
mod ui;

use std::path::PathBuf;

use app::SalesDashApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // optional: open a dataset straight away, like `salesdash sales.csv`
    let initial_source: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SalesDash – E-Commerce Sales Dashboard",
        options,
        Box::new(move |_cc| {
            let mut app = SalesDashApp::default();
            if let Some(path) = initial_source {
                app.state.load_source(path);
            }
            Ok(Box::new(app))
        }),
    )
}
