use std::sync::Mutex;

use tauri::{AppHandle, Manager};

use crate::commands;
use crate::core::orchestrator::Orchestrator;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliAction {
    Start,
    Show,
    ToggleOverlay,
    Quit,
}

pub fn parse_cli_action(args: &[String]) -> Option<CliAction> {
    args.iter().find_map(|arg| action_from_arg(arg))
}

pub fn handle_action(app: &AppHandle, action: CliAction) {
    match action {
        CliAction::Start => {
            let state = app.state::<Mutex<AppState>>();
            let orchestrator = app.state::<Orchestrator>();
            if let Err(err) =
                commands::start_automation_with_state(state.inner(), orchestrator.inner())
            {
                log::warn!("automation not started: {err}");
            }
        }
        CliAction::Show => {
            if let Some(window) = app.get_webview_window("main") {
                let _ = window.show();
                let _ = window.set_focus();
            }
        }
        CliAction::ToggleOverlay => {
            let state = app.state::<Mutex<AppState>>();
            let _ = commands::toggle_overlay_with_state(app, state.inner());
        }
        CliAction::Quit => {
            app.exit(0);
        }
    }
}

fn action_from_arg(arg: &str) -> Option<CliAction> {
    match arg {
        "--start" | "start" | "--automate" | "automate" => Some(CliAction::Start),
        "--show" | "show" | "--open" | "open" | "--focus" | "focus" => Some(CliAction::Show),
        "--toggle-overlay" | "toggle-overlay" | "--overlay" | "overlay" => {
            Some(CliAction::ToggleOverlay)
        }
        "--quit" | "quit" | "--exit" | "exit" => Some(CliAction::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cli_action_start() {
        let args = vec!["riftcast".to_string(), "--start".to_string()];
        assert_eq!(parse_cli_action(&args), Some(CliAction::Start));
    }

    #[test]
    fn parse_cli_action_toggle_overlay() {
        let args = vec!["riftcast".to_string(), "--toggle-overlay".to_string()];
        assert_eq!(parse_cli_action(&args), Some(CliAction::ToggleOverlay));
    }

    #[test]
    fn parse_cli_action_first_match_wins() {
        let args = vec![
            "riftcast".to_string(),
            "--verbose".to_string(),
            "show".to_string(),
            "--quit".to_string(),
        ];
        assert_eq!(parse_cli_action(&args), Some(CliAction::Show));
    }

    #[test]
    fn parse_cli_action_ignores_unknown() {
        let args = vec!["riftcast".to_string(), "--record".to_string()];
        assert_eq!(parse_cli_action(&args), None);
    }
}
