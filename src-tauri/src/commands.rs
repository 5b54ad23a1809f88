use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tauri::{AppHandle, Emitter, Manager, State};
use uuid::Uuid;

use crate::core::analytics::{self, AnalyticsDashboard, SqliteAnalyticsSource};
use crate::core::error::AutomationError;
use crate::core::notify::{LogNotifier, Notifier, Toast};
use crate::core::orchestrator::{Orchestrator, RunSnapshot, UploadOutcome};
use crate::core::remote::RemoteAnalyticsSource;
use crate::core::settings_store;
use crate::core::storage;
use crate::hud;
use crate::overlay::{OverlayState, OverlayView};
use crate::settings::{AutomationSettings, PathKind, RecordingQuality};
use crate::state::AppState;
use crate::types::{
    now_ms, PathCheck, Replay, UploadJob, UploadMetadata, UploadStatus, VideoFile,
};

/// Sends notifications to the dashboard as `toast` events and to the log.
pub struct AppNotifier {
    app: AppHandle,
}

impl AppNotifier {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl Notifier for AppNotifier {
    fn notify(&self, toast: Toast) {
        let _ = self.app.emit("toast", &toast);
        LogNotifier.notify(toast);
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadProgress {
    job_id: String,
    progress: u8,
}

#[derive(Clone, Serialize)]
pub struct QualityOption {
    value: RecordingQuality,
    label: &'static str,
}

#[derive(Clone, Serialize)]
pub struct OverlayPayload {
    state: OverlayState,
    view: OverlayView,
}

fn lock_poisoned<T>(_: T) -> String {
    "state lock poisoned".to_string()
}

fn current_settings(state: &Mutex<AppState>) -> Result<AutomationSettings, String> {
    state
        .lock()
        .map(|guard| guard.settings.get().clone())
        .map_err(lock_poisoned)
}

fn upload_task_id(job_id: &str) -> String {
    format!("upload:{job_id}")
}

fn publish_job(app: &AppHandle, job: &UploadJob) {
    if let Ok(mut guard) = app.state::<Mutex<AppState>>().lock() {
        guard.record_job(job);
    }
    let _ = app.emit("upload-job", job);
}

fn overlay_payload(state: &OverlayState) -> OverlayPayload {
    OverlayPayload {
        state: state.clone(),
        view: crate::overlay::render(state),
    }
}

#[tauri::command]
pub fn get_default_settings() -> AutomationSettings {
    AutomationSettings::default()
}

#[tauri::command]
pub fn get_settings(state: State<'_, Mutex<AppState>>) -> Result<AutomationSettings, String> {
    current_settings(state.inner())
}

#[tauri::command]
pub fn list_recording_qualities() -> Vec<QualityOption> {
    RecordingQuality::ALL
        .iter()
        .map(|quality| QualityOption {
            value: *quality,
            label: quality.label(),
        })
        .collect()
}

#[tauri::command]
pub fn update_setting(
    state: State<'_, Mutex<AppState>>,
    key: String,
    value: Value,
) -> Result<AutomationSettings, String> {
    let mut guard = state.lock().map_err(lock_poisoned)?;
    let updated = guard.settings.update(&key, value)?;
    Ok(updated.clone())
}

#[tauri::command]
pub fn save_settings(
    state: State<'_, Mutex<AppState>>,
    orchestrator: State<'_, Orchestrator>,
    settings: Option<AutomationSettings>,
) -> Result<AutomationSettings, String> {
    let mut guard = state.lock().map_err(lock_poisoned)?;
    if let Some(settings) = settings {
        guard.settings.replace(settings);
    }

    match guard.settings.save() {
        Ok(()) => {
            orchestrator.notify(
                Toast::success(
                    "Settings Saved",
                    "Automation settings have been saved successfully.",
                )
                .lasting(3000),
            );
            Ok(guard.settings.get().clone())
        }
        Err(err) => {
            orchestrator.notify(Toast::error(
                "Save Failed",
                format!("Could not save automation settings: {err}"),
            ));
            Err(err.into())
        }
    }
}

#[tauri::command]
pub fn reload_settings(state: State<'_, Mutex<AppState>>) -> Result<AutomationSettings, String> {
    let mut guard = state.lock().map_err(lock_poisoned)?;
    let reloaded = guard.settings.reload()?;
    Ok(reloaded.clone())
}

#[tauri::command]
pub fn test_path(
    orchestrator: State<'_, Orchestrator>,
    path: String,
    kind: PathKind,
) -> PathCheck {
    let check = settings_store::check_path(&path, kind);
    let toast = if check.usable() {
        Toast::success(
            "Path Test",
            format!("{} found at {}", kind.label(), check.resolved),
        )
    } else if check.exists {
        Toast::warning(
            "Path Test",
            format!("{} path exists but is not the expected kind: {}", kind.label(), check.resolved),
        )
    } else {
        Toast::warning(
            "Path Test",
            format!("{} not found at {}", kind.label(), check.resolved),
        )
    };
    orchestrator.notify(toast.lasting(3000));
    check
}

pub fn start_automation_with_state(
    state: &Mutex<AppState>,
    orchestrator: &Orchestrator,
) -> Result<RunSnapshot, String> {
    let settings = current_settings(state)?;
    orchestrator.start_run(settings)?;
    Ok(orchestrator.snapshot())
}

#[tauri::command]
pub fn start_automation(
    state: State<'_, Mutex<AppState>>,
    orchestrator: State<'_, Orchestrator>,
) -> Result<RunSnapshot, String> {
    start_automation_with_state(state.inner(), orchestrator.inner())
}

#[tauri::command]
pub fn cancel_automation(orchestrator: State<'_, Orchestrator>) -> bool {
    orchestrator.cancel_run()
}

#[tauri::command]
pub fn get_automation_state(orchestrator: State<'_, Orchestrator>) -> RunSnapshot {
    orchestrator.snapshot()
}

#[tauri::command]
pub fn open_league_client(
    state: State<'_, Mutex<AppState>>,
    orchestrator: State<'_, Orchestrator>,
) -> Result<bool, String> {
    let settings = current_settings(state.inner())?;
    Ok(orchestrator.open_client(&settings))
}

/// Returns once the request is queued; launch success or failure arrives as a toast.
#[tauri::command]
pub fn open_obs_studio(
    state: State<'_, Mutex<AppState>>,
    orchestrator: State<'_, Orchestrator>,
) -> Result<(), String> {
    let settings = current_settings(state.inner())?;
    // Detached: the worker finishes on its own and shutdown cancels its scene hint.
    drop(orchestrator.open_recorder(settings));
    Ok(())
}

/// Queues a simulated upload. Returns `None` without creating a job when auto-upload is off.
#[tauri::command]
pub fn upload_video(
    app: AppHandle,
    state: State<'_, Mutex<AppState>>,
    orchestrator: State<'_, Orchestrator>,
    file: VideoFile,
    metadata: UploadMetadata,
    replay_id: Option<String>,
) -> Result<Option<UploadJob>, String> {
    let (settings, data_dir) = {
        let guard = state.lock().map_err(lock_poisoned)?;
        (guard.settings.get().clone(), guard.data_dir())
    };
    if !settings.auto_upload_to_youtube {
        log::info!("auto upload disabled; not uploading {}", file.name);
        return Ok(None);
    }

    let now = now_ms();
    let title = if metadata.title.trim().is_empty() {
        file.name.clone()
    } else {
        metadata.title.trim().to_string()
    };
    let job = UploadJob {
        id: Uuid::new_v4().to_string(),
        replay_id,
        file_path: file.path.clone(),
        title,
        status: UploadStatus::Uploading,
        progress: 0,
        created_at: now,
        updated_at: now,
        error: None,
    };
    storage::upsert_upload_job(&data_dir, &job)?;
    publish_job(&app, &job);

    let task_id = upload_task_id(&job.id);
    let cancel = orchestrator.register_task(&task_id);
    let orchestrator = orchestrator.inner().clone();
    let mut worker_job = job.clone();

    std::thread::spawn(move || {
        let result = orchestrator.upload_result(&settings, &file, &metadata, &cancel, |progress| {
            worker_job.progress = progress;
            worker_job.updated_at = now_ms();
            let _ = app.emit(
                "upload-progress",
                UploadProgress {
                    job_id: worker_job.id.clone(),
                    progress,
                },
            );
        });

        match result {
            Ok(UploadOutcome::Completed) => {
                worker_job.status = UploadStatus::Completed;
                worker_job.progress = 100;
            }
            Ok(UploadOutcome::Skipped) => {
                worker_job.status = UploadStatus::Cancelled;
                worker_job.error = Some("auto upload was turned off".to_string());
            }
            Err(AutomationError::Cancelled) => {
                worker_job.status = UploadStatus::Cancelled;
            }
            Err(err) => {
                worker_job.status = UploadStatus::Failed;
                worker_job.error = Some(err.to_string());
            }
        }
        worker_job.updated_at = now_ms();

        if let Err(err) = storage::upsert_upload_job(&data_dir, &worker_job) {
            log::error!("failed to persist upload job {}: {err}", worker_job.id);
        }
        publish_job(&app, &worker_job);
        orchestrator.finish_task(&task_id);
    });

    Ok(Some(job))
}

#[tauri::command]
pub fn cancel_upload(orchestrator: State<'_, Orchestrator>, job_id: String) -> bool {
    orchestrator.cancel_task(&upload_task_id(&job_id))
}

#[tauri::command]
pub fn list_upload_jobs(state: State<'_, Mutex<AppState>>) -> Result<Vec<UploadJob>, String> {
    let guard = state.lock().map_err(lock_poisoned)?;
    Ok(guard.upload_jobs.clone())
}

#[tauri::command]
pub fn list_replays(state: State<'_, Mutex<AppState>>) -> Result<Vec<Replay>, String> {
    let guard = state.lock().map_err(lock_poisoned)?;
    Ok(guard.replays.clone())
}

#[tauri::command]
pub fn register_replay(
    state: State<'_, Mutex<AppState>>,
    path: String,
    champion: Option<String>,
) -> Result<Replay, String> {
    if path.trim().is_empty() {
        return Err("replay path is empty".to_string());
    }

    let replay = Replay::discovered(&path, champion);
    let mut guard = state.lock().map_err(lock_poisoned)?;
    storage::insert_replay(guard.settings.data_dir(), &replay)?;
    guard.replays.insert(0, replay.clone());
    Ok(replay)
}

#[tauri::command]
pub fn get_analytics(
    state: State<'_, Mutex<AppState>>,
    orchestrator: State<'_, Orchestrator>,
) -> Result<AnalyticsDashboard, String> {
    let (data_dir, replays, jobs) = {
        let guard = state.lock().map_err(lock_poisoned)?;
        (
            guard.data_dir(),
            guard.replays.clone(),
            guard.upload_jobs.clone(),
        )
    };

    let dashboard = match RemoteAnalyticsSource::from_env() {
        Some(remote) => analytics::load_dashboard(&remote, &replays, &jobs),
        None => analytics::load_dashboard(&SqliteAnalyticsSource::new(data_dir), &replays, &jobs),
    };

    if let Some(status) = &dashboard.status {
        orchestrator.notify(
            Toast::warning(
                "Analytics Unavailable",
                format!("Showing estimated figures ({status})"),
            )
            .lasting(5000),
        );
    }
    Ok(dashboard)
}

fn update_overlay<F>(app: &AppHandle, state: &Mutex<AppState>, apply: F) -> Result<OverlayPayload, String>
where
    F: FnOnce(&mut AppState) -> OverlayState,
{
    let overlay = {
        let mut guard = state.lock().map_err(lock_poisoned)?;
        apply(&mut *guard)
    };
    hud::sync_overlay(app, &overlay);
    Ok(overlay_payload(&overlay))
}

pub fn toggle_overlay_with_state(
    app: &AppHandle,
    state: &Mutex<AppState>,
) -> Result<OverlayPayload, String> {
    update_overlay(app, state, |guard| guard.overlay.toggle().clone())
}

#[tauri::command]
pub fn get_overlay(state: State<'_, Mutex<AppState>>) -> Result<OverlayPayload, String> {
    let guard = state.lock().map_err(lock_poisoned)?;
    Ok(OverlayPayload {
        state: guard.overlay.state().clone(),
        view: guard.overlay.view(),
    })
}

#[tauri::command]
pub fn set_overlay(
    app: AppHandle,
    state: State<'_, Mutex<AppState>>,
    overlay: OverlayState,
) -> Result<OverlayPayload, String> {
    update_overlay(&app, state.inner(), |guard| guard.overlay.set(overlay).clone())
}

#[tauri::command]
pub fn show_overlay(
    app: AppHandle,
    state: State<'_, Mutex<AppState>>,
) -> Result<OverlayPayload, String> {
    update_overlay(&app, state.inner(), |guard| guard.overlay.show().clone())
}

#[tauri::command]
pub fn hide_overlay(
    app: AppHandle,
    state: State<'_, Mutex<AppState>>,
) -> Result<OverlayPayload, String> {
    update_overlay(&app, state.inner(), |guard| guard.overlay.hide().clone())
}

#[tauri::command]
pub fn toggle_overlay(
    app: AppHandle,
    state: State<'_, Mutex<AppState>>,
) -> Result<OverlayPayload, String> {
    toggle_overlay_with_state(&app, state.inner())
}
