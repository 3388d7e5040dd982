//! Shared dashboard state.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::api::types::{CropImage, CsvFile, ExcelFile};

/// Snapshot of everything the dashboard actions have loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub files: Vec<ExcelFile>,
    pub current_file: Option<ExcelFile>,
    pub processed_data: Vec<Value>,
    pub csv_files: Vec<CsvFile>,
    pub current_csv_file: Option<CsvFile>,
    pub crop_images: Vec<CropImage>,
    pub current_crop_image: Option<CropImage>,
    pub metadata_labels: Vec<String>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: DashboardState,
    in_flight: usize,
}

/// Thread-safe holder of [`DashboardState`].
///
/// `loading` stays true while at least one action is in flight.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<Inner>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.inner.lock().state.clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DashboardState) -> R) -> R {
        f(&mut self.inner.lock().state)
    }

    pub fn set_error(&self, message: Option<String>) {
        self.inner.lock().state.last_error = message;
    }

    /// Mark an action as started; `loading` drops when the guard does.
    pub fn begin(&self) -> LoadingGuard {
        let mut inner = self.inner.lock();
        inner.in_flight += 1;
        inner.state.loading = true;
        LoadingGuard {
            store: self.clone(),
        }
    }
}

pub struct LoadingGuard {
    store: StateStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut inner = self.store.inner.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        inner.state.loading = inner.in_flight > 0;
    }
}
