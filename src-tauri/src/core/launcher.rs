use std::io;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::core::error::AutomationError;
use crate::core::storage;
use crate::settings::AutomationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchTarget {
    LeagueClient,
    ObsStudio,
}

impl LaunchTarget {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LeagueClient => "League Client",
            Self::ObsStudio => "OBS Studio",
        }
    }

    fn configured_path<'a>(&self, settings: &'a AutomationSettings) -> &'a str {
        match self {
            Self::LeagueClient => &settings.league_client_path,
            Self::ObsStudio => &settings.obs_studio_path,
        }
    }
}

pub trait Launcher: Send + Sync {
    fn launch(&self, target: LaunchTarget, settings: &AutomationSettings)
        -> Result<(), AutomationError>;
}

/// Logs the launch request and reports success. Nothing is started.
pub struct SimulatedLauncher;

impl Launcher for SimulatedLauncher {
    fn launch(
        &self,
        target: LaunchTarget,
        settings: &AutomationSettings,
    ) -> Result<(), AutomationError> {
        log::info!(
            "Attempting to launch: {} ({})",
            target.configured_path(settings),
            target.label()
        );
        Ok(())
    }
}

/// Starts the configured executable as a detached child process.
pub struct ProcessLauncher;

impl ProcessLauncher {
    fn arguments(target: LaunchTarget, settings: &AutomationSettings) -> Vec<String> {
        match target {
            LaunchTarget::LeagueClient => Vec::new(),
            LaunchTarget::ObsStudio => {
                let mut args = Vec::new();
                let scene = settings.obs_scene_name.trim();
                if !scene.is_empty() {
                    args.push("--scene".to_string());
                    args.push(scene.to_string());
                }
                if settings.auto_start_recording {
                    args.push("--startrecording".to_string());
                }
                args
            }
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        target: LaunchTarget,
        settings: &AutomationSettings,
    ) -> Result<(), AutomationError> {
        let configured = target.configured_path(settings);
        if configured.trim().is_empty() {
            return Err(AutomationError::configuration(
                target.label(),
                "no executable path configured",
            ));
        }

        let path = storage::resolve_user_path(configured);
        if !path.is_file() {
            return Err(AutomationError::launch(
                target.label(),
                format!("{} not found", path.display()),
            ));
        }

        let mut command = Command::new(&path);
        command
            .args(Self::arguments(target, settings))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // OBS resolves its data files relative to the working directory.
        if let Some(parent) = path.parent() {
            command.current_dir(parent);
        }

        let (pid, _reaper) = spawn_reaped(&mut command, target.label())
            .map_err(|err| AutomationError::launch(target.label(), err.to_string()))?;
        log::info!("launched {} (pid {pid})", target.label());
        Ok(())
    }
}

/// Spawns the command and waits on it from a detached thread so the exit status is collected.
fn spawn_reaped(command: &mut Command, label: &'static str) -> io::Result<(u32, JoinHandle<()>)> {
    let mut child = command.spawn()?;
    let pid = child.id();
    let reaper = thread::spawn(move || match child.wait() {
        Ok(status) => log::info!("{label} (pid {pid}) exited: {status}"),
        Err(err) => log::warn!("failed to wait on {label} (pid {pid}): {err}"),
    });
    Ok((pid, reaper))
}
