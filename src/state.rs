use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::data::aggregate::DashboardView;
use crate::data::filter::FilterState;
use crate::data::loader::DatasetCache;
use crate::data::model::SalesDataset;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Central view tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Pareto,
    Scatter,
    Raw,
}

/// The full UI state, independent of rendering.  Every control change runs
/// the whole pipeline again via [`AppState::recompute`]; derived tables are
/// never mutated in place.
pub struct AppState {
    /// Read-through cache of loaded sources.
    pub cache: DatasetCache,

    /// Path of the currently shown source.
    pub source: Option<PathBuf>,

    /// Loaded dataset (None until the user opens a file).
    pub dataset: Option<Arc<SalesDataset>>,

    /// Active filter selections.
    pub filters: FilterState,

    /// Product-table truncation length.
    pub top_n: usize,

    /// Derived tables for the current filters (recomputed each change).
    pub view: Option<DashboardView>,

    /// Category colours for charts and legend.
    pub color_map: Option<ColorMap>,

    pub active_tab: Tab,

    /// Whether the raw tab shows the full table or just a preview.
    pub show_full_raw: bool,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            cache: DatasetCache::default(),
            source: None,
            dataset: None,
            filters: FilterState::default(),
            top_n: 10,
            view: None,
            color_map: None,
            active_tab: Tab::Overview,
            show_full_raw: false,
            status_message: None,
        }
    }
}

impl AppState {
    /// Load (or re-fetch from cache) a source file and make it current.
    pub fn load_source(&mut self, path: PathBuf) {
        match self.cache.load(&path) {
            Ok(dataset) => {
                self.source = Some(path);
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("failed to load {}: {e}", path.display());
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Ingest a loaded dataset: select all categories, seed the date range
    /// from the data, rebuild colours, and compute the first view.
    pub fn set_dataset(&mut self, dataset: Arc<SalesDataset>) {
        self.filters = FilterState {
            categories: dataset.categories.clone(),
            date_range: dataset.date_bounds(),
        };
        self.color_map = Some(ColorMap::new(&dataset.categories));
        self.dataset = Some(dataset);
        self.status_message = None;
        self.recompute();
    }

    /// Run the pipeline for the current filters and top-N.
    pub fn recompute(&mut self) {
        let Some(dataset) = &self.dataset else { return };
        match crate::data::compute(dataset, &self.filters, self.top_n) {
            Ok(view) => {
                self.view = Some(view);
                self.status_message = None;
            }
            Err(e) => {
                // invalid parameters keep the previous view on screen
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Toggle one category in the filter set.
    pub fn toggle_category(&mut self, category: &str) {
        if !self.filters.categories.remove(category) {
            self.filters.categories.insert(category.to_string());
        }
        self.recompute();
    }

    /// Select every category.
    pub fn select_all_categories(&mut self) {
        if let Some(dataset) = &self.dataset {
            self.filters.categories = dataset.categories.clone();
        }
        self.recompute();
    }

    /// Clear the selection; an empty set shows everything.
    pub fn select_no_categories(&mut self) {
        self.filters.categories.clear();
        self.recompute();
    }

    pub fn set_top_n(&mut self, top_n: usize) {
        if self.top_n != top_n {
            self.top_n = top_n;
            self.recompute();
        }
    }

    pub fn set_date_range(&mut self, range: Option<(NaiveDate, NaiveDate)>) {
        if self.filters.date_range != range {
            self.filters.date_range = range;
            self.recompute();
        }
    }
}
