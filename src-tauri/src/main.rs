mod cli;
mod commands;
mod core;
mod hud;
mod overlay;
mod settings;
mod state;
mod types;

use std::sync::{Arc, Mutex};

use tauri::Manager;

use crate::core::launcher::{Launcher, ProcessLauncher, SimulatedLauncher};
use crate::core::orchestrator::{AutomationTimings, Orchestrator};

fn select_launcher() -> Arc<dyn Launcher> {
    // `RIFTCAST_SIMULATE_LAUNCH=1` only logs launch requests; handy without League or OBS installed.
    if std::env::var("RIFTCAST_SIMULATE_LAUNCH").as_deref() == Ok("1") {
        log::info!("launch simulation enabled");
        Arc::new(SimulatedLauncher)
    } else {
        Arc::new(ProcessLauncher)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let initial_action = cli::parse_cli_action(&std::env::args().collect::<Vec<_>>());

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, argv, _cwd| {
            if let Some(action) = cli::parse_cli_action(&argv) {
                cli::handle_action(app, action);
            }
        }))
        .plugin(tauri_plugin_dialog::init())
        .manage(Mutex::new(state::AppState::load()))
        .setup(move |app| {
            let handle = app.handle().clone();
            let notifier = Arc::new(commands::AppNotifier::new(handle.clone()));
            app.manage(Orchestrator::new(
                notifier,
                select_launcher(),
                AutomationTimings::default(),
            ));

            if let Err(err) = hud::ensure_patch_overlay(app) {
                log::warn!("failed to create patch overlay window: {err}");
            }
            let overlay_state = app
                .state::<Mutex<state::AppState>>()
                .lock()
                .map(|guard| guard.overlay.state().clone())
                .ok();
            if let Some(overlay_state) = overlay_state {
                hud::sync_overlay(&handle, &overlay_state);
            }

            if let Some(action) = initial_action {
                cli::handle_action(&handle, action);
            }
            Ok(())
        })
        .on_window_event(|window, event| {
            // The overlay is a utility window; hide instead of destroying it.
            if window.label() == hud::OVERLAY_LABEL {
                if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                    let _ = window.hide();
                    api.prevent_close();
                }
                return;
            }

            if window.label() == "main" {
                if let tauri::WindowEvent::Destroyed = event {
                    if let Some(orchestrator) = window.try_state::<Orchestrator>() {
                        orchestrator.shutdown();
                    }
                    window.app_handle().exit(0);
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_default_settings,
            commands::get_settings,
            commands::list_recording_qualities,
            commands::update_setting,
            commands::save_settings,
            commands::reload_settings,
            commands::test_path,
            commands::start_automation,
            commands::cancel_automation,
            commands::get_automation_state,
            commands::open_league_client,
            commands::open_obs_studio,
            commands::upload_video,
            commands::cancel_upload,
            commands::list_upload_jobs,
            commands::list_replays,
            commands::register_replay,
            commands::get_analytics,
            commands::get_overlay,
            commands::set_overlay,
            commands::show_overlay,
            commands::hide_overlay,
            commands::toggle_overlay,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
