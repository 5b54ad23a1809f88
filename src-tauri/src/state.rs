use std::path::PathBuf;

use crate::core::settings_store::SettingsStore;
use crate::core::storage::{load_replays, load_upload_jobs};
use crate::overlay::OverlayController;
use crate::settings::default_data_dir;
use crate::types::{Replay, UploadJob};

pub struct AppState {
    pub settings: SettingsStore,
    pub replays: Vec<Replay>,
    pub upload_jobs: Vec<UploadJob>,
    pub overlay: OverlayController,
}

impl AppState {
    pub fn load() -> Self {
        Self::load_from(default_data_dir())
    }

    pub fn load_from(data_dir: PathBuf) -> Self {
        let settings = SettingsStore::load(data_dir);
        let replays = load_replays(settings.data_dir());
        let upload_jobs = load_upload_jobs(settings.data_dir());
        log::info!(
            "loaded {} replays and {} upload jobs from {}",
            replays.len(),
            upload_jobs.len(),
            settings.data_dir().display()
        );

        Self {
            settings,
            replays,
            upload_jobs,
            overlay: OverlayController::default(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.settings.data_dir().to_path_buf()
    }

    /// Inserts or replaces a job in the in-memory list, newest first.
    pub fn record_job(&mut self, job: &UploadJob) {
        match self.upload_jobs.iter_mut().find(|item| item.id == job.id) {
            Some(existing) => *existing = job.clone(),
            None => self.upload_jobs.insert(0, job.clone()),
        }
    }
}
