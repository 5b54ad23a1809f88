use tauri::{App, AppHandle, Emitter, LogicalPosition, Manager, WebviewWindow};

use crate::overlay::{self, OverlayPosition, OverlayState};

pub const OVERLAY_LABEL: &str = "patch_overlay";

/// Create the patch overlay window at startup so it can receive state events even when hidden.
pub fn ensure_patch_overlay(app: &App) -> Result<(), String> {
    if app.get_webview_window(OVERLAY_LABEL).is_some() {
        return Ok(());
    }

    let url = tauri::WebviewUrl::App("overlay.html".into());

    let window = tauri::WebviewWindowBuilder::new(app, OVERLAY_LABEL, url)
        .title("Riftcast Overlay")
        .decorations(false)
        .transparent(true)
        .shadow(false)
        .resizable(false)
        .closable(false)
        .focused(false)
        .skip_taskbar(true)
        .always_on_top(true)
        .visible_on_all_workspaces(true)
        .visible(false)
        .inner_size(320.0, 280.0)
        .build()
        .map_err(|err| err.to_string())?;

    // Capture software sees the overlay; the mouse goes through it.
    window
        .set_ignore_cursor_events(true)
        .map_err(|err| err.to_string())
}

fn place(window: &WebviewWindow, position: OverlayPosition) -> Result<(), String> {
    let Some(monitor) = window
        .current_monitor()
        .map_err(|err| err.to_string())?
        .or(window.primary_monitor().map_err(|err| err.to_string())?)
    else {
        return Ok(());
    };

    let scale = monitor.scale_factor();
    let area = monitor.size().to_logical::<f64>(scale);
    let origin = monitor.position().to_logical::<f64>(scale);
    let size = window
        .outer_size()
        .map_err(|err| err.to_string())?
        .to_logical::<f64>(scale);

    let (x, y) = position.origin((area.width, area.height), (size.width, size.height));
    window
        .set_position(LogicalPosition::new(origin.x + x, origin.y + y))
        .map_err(|err| err.to_string())
}

/// Pushes the overlay state to the overlay window, the `overlay.json` mirror and any listeners.
pub fn sync_overlay(app: &AppHandle, state: &OverlayState) {
    let view = overlay::render(state);
    let _ = app.emit("overlay-state", &view);

    if let Err(err) = overlay::write_state(state) {
        log::warn!("failed to write overlay state: {err}");
    }

    let Some(window) = app.get_webview_window(OVERLAY_LABEL) else {
        return;
    };

    if state.visible {
        if let Err(err) = place(&window, state.position) {
            log::warn!("failed to position overlay: {err}");
        }
        let _ = window.show();
        let _ = window.set_ignore_cursor_events(true);
    } else {
        let _ = window.hide();
    }
}
