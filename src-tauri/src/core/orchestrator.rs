use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::error::AutomationError;
use crate::core::launcher::{LaunchTarget, Launcher};
use crate::core::notify::{Notifier, Toast};
use crate::core::storage;
use crate::settings::AutomationSettings;
use crate::types::{UploadMetadata, VideoFile};

const CANCEL_POLL: Duration = Duration::from_millis(50);
const UPLOAD_PROGRESS_STEP: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct AutomationTimings {
    /// Pause between asking for the client and asking for OBS.
    pub recorder_delay: Duration,
    /// Pause between launching OBS and the scene reminder.
    pub scene_hint_delay: Duration,
    /// Pause before each upload progress tick.
    pub upload_step: Duration,
}

impl Default for AutomationTimings {
    fn default() -> Self {
        Self {
            recorder_delay: Duration::from_millis(3000),
            scene_hint_delay: Duration::from_millis(2000),
            upload_step: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Starting,
    ClientRequested,
    RecorderRequested,
    /// Both launches succeeded. Held until the next run starts or the run is cancelled.
    Ready,
}

impl RunPhase {
    /// True while launch steps are still pending.
    pub fn in_flight(self) -> bool {
        !matches!(self, Self::Idle | Self::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Ready,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    pub running: bool,
    /// True while a run is in flight or ready with folder watching enabled.
    pub watching: bool,
    pub last_outcome: Option<RunOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Auto-upload is off; nothing happened.
    Skipped,
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sleeps for `duration`, waking early with `Cancelled` once the token is cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<(), AutomationError> {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return Err(AutomationError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}

struct RunState {
    phase: RunPhase,
    watching: bool,
    last_outcome: Option<RunOutcome>,
    cancel: Option<CancelToken>,
    worker: Option<JoinHandle<()>>,
}

struct Inner {
    notifier: Arc<dyn Notifier>,
    launcher: Arc<dyn Launcher>,
    timings: AutomationTimings,
    run: Mutex<RunState>,
    tasks: Mutex<HashMap<String, CancelToken>>,
}

/// Drives the client/OBS launch sequence and simulated uploads.
///
/// Every delayed step runs on a worker thread and waits on a [`CancelToken`], so
/// [`Orchestrator::shutdown`] stops anything still pending.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        launcher: Arc<dyn Launcher>,
        timings: AutomationTimings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                notifier,
                launcher,
                timings,
                run: Mutex::new(RunState {
                    phase: RunPhase::Idle,
                    watching: false,
                    last_outcome: None,
                    cancel: None,
                    worker: None,
                }),
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        match self.inner.run.lock() {
            Ok(guard) => RunSnapshot {
                phase: guard.phase,
                running: guard.phase.in_flight(),
                watching: guard.watching,
                last_outcome: guard.last_outcome,
            },
            Err(_) => RunSnapshot {
                phase: RunPhase::Idle,
                running: false,
                watching: false,
                last_outcome: None,
            },
        }
    }

    pub fn notify(&self, toast: Toast) {
        self.inner.notifier.notify(toast);
    }

    fn lock_run(&self) -> Result<MutexGuard<'_, RunState>, AutomationError> {
        self.inner
            .run
            .lock()
            .map_err(|_| AutomationError::Storage("run state lock poisoned".to_string()))
    }

    /// Asks for the League client. Returns false when the launch failed.
    pub fn open_client(&self, settings: &AutomationSettings) -> bool {
        self.inner.open_client(settings)
    }

    /// Asks for OBS on a worker thread; the scene reminder follows after the hint delay.
    ///
    /// The worker yields false when the launch failed or the hint was cancelled.
    pub fn open_recorder(&self, settings: AutomationSettings) -> JoinHandle<bool> {
        let task_id = format!("recorder:{}", uuid::Uuid::new_v4());
        let cancel = self.register_task(&task_id);
        let inner = Arc::clone(&self.inner);
        thread::spawn(move || {
            let opened = match inner.open_recorder(&settings, &cancel) {
                Ok(opened) => opened,
                Err(AutomationError::Cancelled) => {
                    log::debug!("recorder step cancelled");
                    false
                }
                Err(err) => {
                    log::error!("recorder step failed: {err}");
                    false
                }
            };
            inner.finish_task(&task_id);
            opened
        })
    }

    /// Starts the full launch sequence and returns immediately.
    ///
    /// Only one run may be active; a second request while one is in flight is rejected.
    /// A finished run resting in `Ready` is replaced.
    pub fn start_run(&self, settings: AutomationSettings) -> Result<(), AutomationError> {
        let cancel = CancelToken::new();
        {
            let mut guard = self.lock_run()?;
            if guard.phase.in_flight() {
                drop(guard);
                self.notify(
                    Toast::warning(
                        "Automation Running",
                        "An automation run is already in progress",
                    )
                    .lasting(3000),
                );
                return Err(AutomationError::AlreadyRunning);
            }
            guard.phase = RunPhase::Starting;
            guard.watching = settings.watch_for_new_replays;
            guard.cancel = Some(cancel.clone());
        }

        self.notify(
            Toast::info(
                "Starting Automation",
                "Launching League Client and OBS Studio...",
            )
            .lasting(3000),
        );

        if settings.watch_for_new_replays {
            let folder = storage::resolve_user_path(&settings.recording_folder);
            log::info!("Watching folder: {}", folder.display());
        }

        // Held across the spawn: the worker blocks on it before its first phase change.
        let mut guard = self.lock_run()?;
        let inner = Arc::clone(&self.inner);
        guard.worker = Some(thread::spawn(move || {
            let result = inner.run_sequence(&settings, &cancel);
            inner.finish_run(result);
        }));
        Ok(())
    }

    /// Cancels the active run, or clears a `Ready` run back to `Idle`.
    /// Returns false when there was nothing to cancel.
    pub fn cancel_run(&self) -> bool {
        let Ok(mut guard) = self.inner.run.lock() else {
            return false;
        };
        if let Some(cancel) = guard.cancel.as_ref() {
            cancel.cancel();
            return true;
        }
        if guard.phase == RunPhase::Ready {
            guard.phase = RunPhase::Idle;
            guard.watching = false;
            return true;
        }
        false
    }

    /// Waits for the current run's worker thread, if any.
    pub fn join_run(&self) {
        let worker = self
            .inner
            .run
            .lock()
            .ok()
            .and_then(|mut guard| guard.worker.take());
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }

    /// Simulated upload: 11 progress ticks from 0 to 100, no transfer.
    pub fn upload_result<F: FnMut(u8)>(
        &self,
        settings: &AutomationSettings,
        file: &VideoFile,
        metadata: &UploadMetadata,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> Result<UploadOutcome, AutomationError> {
        if !settings.auto_upload_to_youtube {
            return Ok(UploadOutcome::Skipped);
        }

        self.notify(Toast::info("Uploading to YouTube", "Starting video upload...").lasting(3000));
        log::info!(
            "Uploading video: {} with metadata: title={:?} tags={:?}",
            file.name,
            metadata.title,
            metadata.tags
        );

        let transfer = (0..=100usize)
            .step_by(UPLOAD_PROGRESS_STEP)
            .try_for_each(|percent| {
                cancel.sleep(self.inner.timings.upload_step)?;
                log::debug!("Upload progress: {percent}%");
                on_progress(percent as u8);
                Ok::<(), AutomationError>(())
            });

        match transfer {
            Ok(()) => {
                self.notify(
                    Toast::success("Upload Complete", "Video successfully uploaded to YouTube!")
                        .lasting(5000),
                );
                Ok(UploadOutcome::Completed)
            }
            Err(AutomationError::Cancelled) => {
                self.notify(
                    Toast::warning("Upload Cancelled", format!("Stopped uploading {}", file.name))
                        .lasting(3000),
                );
                Err(AutomationError::Cancelled)
            }
            Err(err) => {
                log::error!("YouTube upload failed: {err}");
                self.notify(Toast::error("Upload Failed", "Failed to upload video to YouTube"));
                Err(AutomationError::Upload(err.to_string()))
            }
        }
    }

    pub fn register_task(&self, task_id: &str) -> CancelToken {
        let cancel = CancelToken::new();
        if let Ok(mut guard) = self.inner.tasks.lock() {
            guard.insert(task_id.to_string(), cancel.clone());
        }
        cancel
    }

    pub fn finish_task(&self, task_id: &str) {
        self.inner.finish_task(task_id);
    }

    pub fn cancel_task(&self, task_id: &str) -> bool {
        match self.inner.tasks.lock() {
            Ok(guard) => match guard.get(task_id) {
                Some(cancel) => {
                    cancel.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Cancels the run and every pending task. Called when the dashboard goes away.
    pub fn shutdown(&self) {
        self.cancel_run();
        if let Ok(guard) = self.inner.tasks.lock() {
            for cancel in guard.values() {
                cancel.cancel();
            }
        }
        self.join_run();
    }
}

impl Inner {
    fn notify(&self, toast: Toast) {
        self.notifier.notify(toast);
    }

    fn set_phase(&self, phase: RunPhase) {
        if let Ok(mut guard) = self.run.lock() {
            guard.phase = phase;
        }
    }

    fn finish_task(&self, task_id: &str) {
        if let Ok(mut guard) = self.tasks.lock() {
            guard.remove(task_id);
        }
    }

    fn open_client(&self, settings: &AutomationSettings) -> bool {
        self.notify(
            Toast::info(
                "Opening League Client",
                "Launching League of Legends. Go to Match History to select replays.",
            )
            .lasting(5000),
        );

        match self.launcher.launch(LaunchTarget::LeagueClient, settings) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Failed to open League Client: {err}");
                self.notify(Toast::error(
                    "Error",
                    format!("Failed to open League Client ({err}). Please open it manually."),
                ));
                false
            }
        }
    }

    fn open_recorder(
        &self,
        settings: &AutomationSettings,
        cancel: &CancelToken,
    ) -> Result<bool, AutomationError> {
        self.notify(
            Toast::info(
                "Opening OBS Studio",
                "Launching OBS Studio to set up your recording scene",
            )
            .lasting(5000),
        );

        if let Err(err) = self.launcher.launch(LaunchTarget::ObsStudio, settings) {
            log::error!("Failed to open OBS Studio: {err}");
            self.notify(Toast::error(
                "Error",
                format!("Failed to open OBS Studio ({err}). Please open it manually."),
            ));
            return Ok(false);
        }

        cancel.sleep(self.timings.scene_hint_delay)?;
        self.notify(
            Toast::info(
                "OBS Setup",
                format!(
                    "Set your scene to \"{}\" and start recording when ready",
                    settings.obs_scene_name
                ),
            )
            .lasting(7000),
        );
        Ok(true)
    }

    fn run_sequence(
        &self,
        settings: &AutomationSettings,
        cancel: &CancelToken,
    ) -> Result<bool, AutomationError> {
        self.set_phase(RunPhase::ClientRequested);
        let client_opened = self.open_client(settings);

        cancel.sleep(self.timings.recorder_delay)?;
        self.set_phase(RunPhase::RecorderRequested);
        let recorder_opened = self.open_recorder(settings, cancel)?;

        Ok(client_opened && recorder_opened)
    }

    fn finish_run(&self, result: Result<bool, AutomationError>) {
        let outcome = match result {
            Ok(true) => {
                self.notify(
                    Toast::success(
                        "Automation Ready",
                        "Both applications launched. Start recording in OBS and play replays in League!",
                    )
                    .lasting(10_000),
                );
                RunOutcome::Ready
            }
            Ok(false) => {
                self.notify(Toast::error(
                    "Automation Failed",
                    "Please manually open League Client and OBS Studio",
                ));
                RunOutcome::Failed
            }
            Err(AutomationError::Cancelled) => {
                self.notify(
                    Toast::warning("Automation Cancelled", "Pending launch steps were stopped")
                        .lasting(3000),
                );
                RunOutcome::Cancelled
            }
            Err(err) => {
                log::error!("Automation failed: {err}");
                self.notify(Toast::error(
                    "Automation Failed",
                    "Please manually open League Client and OBS Studio",
                ));
                RunOutcome::Failed
            }
        };

        if let Ok(mut guard) = self.run.lock() {
            guard.cancel = None;
            guard.last_outcome = Some(outcome);
            if outcome == RunOutcome::Ready {
                guard.phase = RunPhase::Ready;
            } else {
                guard.phase = RunPhase::Idle;
                guard.watching = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::launcher::SimulatedLauncher;
    use crate::core::notify::{RecordingNotifier, Severity};

    fn immediate() -> AutomationTimings {
        AutomationTimings {
            recorder_delay: Duration::ZERO,
            scene_hint_delay: Duration::ZERO,
            upload_step: Duration::ZERO,
        }
    }

    fn orchestrator(
        launcher: Arc<dyn Launcher>,
        timings: AutomationTimings,
    ) -> (Orchestrator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = Orchestrator::new(notifier.clone(), launcher, timings);
        (orchestrator, notifier)
    }

    struct ObsMissing;

    impl Launcher for ObsMissing {
        fn launch(
            &self,
            target: LaunchTarget,
            _settings: &AutomationSettings,
        ) -> Result<(), AutomationError> {
            match target {
                LaunchTarget::LeagueClient => Ok(()),
                LaunchTarget::ObsStudio => Err(AutomationError::launch("OBS Studio", "missing")),
            }
        }
    }

    fn video() -> (VideoFile, UploadMetadata) {
        (
            VideoFile {
                path: "/videos/azir.mp4".to_string(),
                name: "azir.mp4".to_string(),
                size_bytes: Some(4_000_000_000),
            },
            UploadMetadata {
                title: "Azir mid".to_string(),
                ..UploadMetadata::default()
            },
        )
    }

    #[test]
    fn run_walks_every_step_and_rests_in_ready() {
        let (orchestrator, notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        orchestrator
            .start_run(AutomationSettings::default())
            .expect("start");
        orchestrator.join_run();

        assert_eq!(
            notifier.titles(),
            vec![
                "Starting Automation",
                "Opening League Client",
                "Opening OBS Studio",
                "OBS Setup",
                "Automation Ready",
            ]
        );
        let scene_hint = &notifier.toasts()[3];
        assert!(scene_hint.description.contains("League of Legends Recording"));

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Ready);
        assert!(!snapshot.running);
        assert!(snapshot.watching);
        assert_eq!(snapshot.last_outcome, Some(RunOutcome::Ready));

        assert!(orchestrator.cancel_run());
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Idle);
        assert!(!snapshot.watching);
        assert_eq!(snapshot.last_outcome, Some(RunOutcome::Ready));
        assert!(!orchestrator.cancel_run());
    }

    fn wait_until_settled(orchestrator: &Orchestrator) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while orchestrator.snapshot().running {
            assert!(Instant::now() < deadline, "run did not settle");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn ready_run_can_be_started_again() {
        let (orchestrator, notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        orchestrator
            .start_run(AutomationSettings::default())
            .expect("first start");
        wait_until_settled(&orchestrator);
        assert_eq!(orchestrator.snapshot().phase, RunPhase::Ready);

        orchestrator
            .start_run(AutomationSettings::default())
            .expect("second start");
        // Joining waits for the second worker, not the finished first one.
        orchestrator.join_run();

        let ready_count = notifier
            .titles()
            .iter()
            .filter(|title| *title == "Automation Ready")
            .count();
        assert_eq!(ready_count, 2);
        assert!(!notifier.titles().contains(&"Automation Running".to_string()));
        assert_eq!(orchestrator.snapshot().phase, RunPhase::Ready);
    }

    #[test]
    fn back_to_back_runs_each_join_their_own_worker() {
        let (orchestrator, notifier) = orchestrator(Arc::new(ObsMissing), immediate());
        for expected in 1..=5 {
            orchestrator
                .start_run(AutomationSettings::default())
                .expect("start");
            orchestrator.join_run();
            let failures = notifier
                .titles()
                .iter()
                .filter(|title| *title == "Automation Failed")
                .count();
            assert_eq!(failures, expected);
            assert_eq!(orchestrator.snapshot().phase, RunPhase::Idle);
        }
    }

    #[test]
    fn recorder_worker_reports_launch_result() {
        let (missing, missing_notifier) = orchestrator(Arc::new(ObsMissing), immediate());
        let opened = missing
            .open_recorder(AutomationSettings::default())
            .join()
            .expect("recorder worker");
        assert!(!opened);
        assert_eq!(missing_notifier.titles(), vec!["Opening OBS Studio", "Error"]);

        let (simulated, notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        let opened = simulated
            .open_recorder(AutomationSettings::default())
            .join()
            .expect("recorder worker");
        assert!(opened);
        assert_eq!(notifier.titles(), vec!["Opening OBS Studio", "OBS Setup"]);
    }

    #[test]
    fn launch_failure_is_surfaced_as_error() {
        let (orchestrator, notifier) = orchestrator(Arc::new(ObsMissing), immediate());
        orchestrator
            .start_run(AutomationSettings::default())
            .expect("start");
        orchestrator.join_run();

        let toasts = notifier.toasts();
        let last = toasts.last().expect("toast");
        assert_eq!(last.title, "Automation Failed");
        assert_eq!(last.severity, Severity::Error);
        assert!(!notifier.titles().contains(&"OBS Setup".to_string()));
        assert_eq!(
            orchestrator.snapshot().last_outcome,
            Some(RunOutcome::Failed)
        );
    }

    #[test]
    fn overlapping_run_is_rejected_until_cancelled() {
        let timings = AutomationTimings {
            recorder_delay: Duration::from_secs(30),
            ..immediate()
        };
        let (orchestrator, notifier) = orchestrator(Arc::new(SimulatedLauncher), timings);
        orchestrator
            .start_run(AutomationSettings::default())
            .expect("start");

        let snapshot = orchestrator.snapshot();
        assert!(snapshot.running);
        assert!(snapshot.watching);

        assert!(matches!(
            orchestrator.start_run(AutomationSettings::default()),
            Err(AutomationError::AlreadyRunning)
        ));

        assert!(orchestrator.cancel_run());
        orchestrator.join_run();

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Idle);
        assert_eq!(snapshot.last_outcome, Some(RunOutcome::Cancelled));
        assert!(notifier.titles().contains(&"Automation Running".to_string()));
        assert_eq!(
            notifier.titles().last().map(String::as_str),
            Some("Automation Cancelled")
        );
        assert!(!orchestrator.cancel_run());
    }

    #[test]
    fn upload_disabled_is_silent() {
        let (orchestrator, notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        let settings = AutomationSettings {
            auto_upload_to_youtube: false,
            ..AutomationSettings::default()
        };
        let (file, metadata) = video();
        let mut ticks = Vec::new();

        let outcome = orchestrator
            .upload_result(&settings, &file, &metadata, &CancelToken::new(), |p| {
                ticks.push(p)
            })
            .expect("upload");

        assert_eq!(outcome, UploadOutcome::Skipped);
        assert!(ticks.is_empty());
        assert!(notifier.toasts().is_empty());
    }

    #[test]
    fn upload_emits_eleven_progress_ticks() {
        let (orchestrator, notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        let (file, metadata) = video();
        let mut ticks = Vec::new();

        let outcome = orchestrator
            .upload_result(
                &AutomationSettings::default(),
                &file,
                &metadata,
                &CancelToken::new(),
                |p| ticks.push(p),
            )
            .expect("upload");

        assert_eq!(outcome, UploadOutcome::Completed);
        assert_eq!(ticks, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
        assert_eq!(
            notifier.titles(),
            vec!["Uploading to YouTube", "Upload Complete"]
        );
    }

    #[test]
    fn cancelled_upload_stops_before_progress() {
        let (orchestrator, notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        let (file, metadata) = video();
        let cancel = orchestrator.register_task("upload:1");
        assert!(orchestrator.cancel_task("upload:1"));
        let mut ticks = Vec::new();

        let result = orchestrator.upload_result(
            &AutomationSettings::default(),
            &file,
            &metadata,
            &cancel,
            |p| ticks.push(p),
        );

        assert!(matches!(result, Err(AutomationError::Cancelled)));
        assert!(ticks.is_empty());
        assert_eq!(
            notifier.titles(),
            vec!["Uploading to YouTube", "Upload Cancelled"]
        );
        orchestrator.finish_task("upload:1");
        assert!(!orchestrator.cancel_task("upload:1"));
    }

    #[test]
    fn shutdown_cancels_pending_tasks() {
        let (orchestrator, _notifier) = orchestrator(Arc::new(SimulatedLauncher), immediate());
        let cancel = orchestrator.register_task("recorder:1");
        orchestrator.shutdown();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn cancel_token_sleep_wakes_early() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let started = Instant::now();
        assert!(cancel.sleep(Duration::from_secs(10)).is_err());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
