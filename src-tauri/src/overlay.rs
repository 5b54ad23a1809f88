use serde::{Deserialize, Serialize};

/// Gap between the overlay and the screen edges, in logical pixels.
pub const EDGE_OFFSET_PX: u32 = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopRight,
    #[default]
    BottomRight,
    BottomLeft,
    TopLeft,
}

impl OverlayPosition {
    fn is_top(&self) -> bool {
        matches!(self, Self::TopRight | Self::TopLeft)
    }

    fn is_left(&self) -> bool {
        matches!(self, Self::BottomLeft | Self::TopLeft)
    }

    /// Top-left corner for a window of `window` size inside `area`, both `(width, height)`.
    pub fn origin(&self, area: (f64, f64), window: (f64, f64)) -> (f64, f64) {
        let offset = EDGE_OFFSET_PX as f64;
        let x = if self.is_left() {
            offset
        } else {
            (area.0 - window.0 - offset).max(0.0)
        };
        let y = if self.is_top() {
            offset
        } else {
            (area.1 - window.1 - offset).max(0.0)
        };
        (x, y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayState {
    pub patch_version: String,
    pub server_region: String,
    pub rank_tier: String,
    pub is_recording: bool,
    pub position: OverlayPosition,
    pub visible: bool,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            patch_version: "14.20".to_string(),
            server_region: "NA".to_string(),
            rank_tier: "Challenger".to_string(),
            is_recording: false,
            position: OverlayPosition::default(),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayAnchor {
    pub top: Option<u32>,
    pub right: Option<u32>,
    pub bottom: Option<u32>,
    pub left: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub text: String,
    pub font_px: u32,
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingIndicator {
    pub color: String,
    pub pulsing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayView {
    pub visible: bool,
    pub anchor: OverlayAnchor,
    pub badges: Vec<Badge>,
    pub indicator: Option<RecordingIndicator>,
}

fn badge(text: &str, font_px: u32, emphasized: bool) -> Badge {
    Badge {
        text: text.to_uppercase(),
        font_px,
        emphasized,
    }
}

pub fn render(state: &OverlayState) -> OverlayView {
    let position = state.position;
    let anchor = OverlayAnchor {
        top: position.is_top().then_some(EDGE_OFFSET_PX),
        right: (!position.is_left()).then_some(EDGE_OFFSET_PX),
        bottom: (!position.is_top()).then_some(EDGE_OFFSET_PX),
        left: position.is_left().then_some(EDGE_OFFSET_PX),
    };

    let badges = vec![
        badge(&state.server_region, 16, false),
        badge(&state.rank_tier, 14, false),
        badge("REPLAY", 14, false),
        badge("PATCH", 20, true),
        // The version keeps its original casing.
        Badge {
            text: state.patch_version.clone(),
            font_px: 24,
            emphasized: true,
        },
    ];

    let indicator = state.is_recording.then(|| RecordingIndicator {
        color: "#FF0000".to_string(),
        pulsing: true,
    });

    OverlayView {
        visible: state.visible,
        anchor,
        badges,
        indicator,
    }
}

/// Holds the overlay inputs and its visibility.
#[derive(Debug, Default)]
pub struct OverlayController {
    state: OverlayState,
}

impl OverlayController {
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn view(&self) -> OverlayView {
        render(&self.state)
    }

    /// Replaces the inputs. Visibility stays as it was.
    pub fn set(&mut self, state: OverlayState) -> &OverlayState {
        let visible = self.state.visible;
        self.state = OverlayState { visible, ..state };
        &self.state
    }

    pub fn show(&mut self) -> &OverlayState {
        self.state.visible = true;
        &self.state
    }

    pub fn hide(&mut self) -> &OverlayState {
        self.state.visible = false;
        &self.state
    }

    pub fn toggle(&mut self) -> &OverlayState {
        self.state.visible = !self.state.visible;
        &self.state
    }
}

#[cfg(target_os = "linux")]
mod linux_overlay {
    use std::fs;
    use std::path::PathBuf;

    use serde::Serialize;

    use super::OverlayState;
    use crate::types::now_ms;

    const STATE_DIR: &str = "riftcast";
    const STATE_FILE: &str = "overlay.json";

    #[derive(Serialize)]
    struct OverlaySnapshot<'a> {
        #[serde(flatten)]
        state: &'a OverlayState,
        updated_at_ms: i64,
    }

    fn state_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("XDG_STATE_HOME") {
            return PathBuf::from(dir).join(STATE_DIR);
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".local/state").join(STATE_DIR);
        }
        std::env::temp_dir().join(STATE_DIR)
    }

    fn state_path() -> PathBuf {
        state_dir().join(STATE_FILE)
    }

    pub fn write_state(state: &OverlayState) -> Result<(), String> {
        let path = state_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| err.to_string())?;
        }

        let snapshot = OverlaySnapshot {
            state,
            updated_at_ms: now_ms(),
        };
        let payload = serde_json::to_string(&snapshot).map_err(|err| err.to_string())?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, payload).map_err(|err| err.to_string())?;
        fs::rename(&tmp_path, &path).map_err(|err| err.to_string())
    }
}

/// Mirrors the overlay state to `overlay.json` for capture tools that read it.
#[cfg(target_os = "linux")]
pub use linux_overlay::write_state;

#[cfg(not(target_os = "linux"))]
pub fn write_state(_state: &OverlayState) -> Result<(), String> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(is_recording: bool) -> OverlayState {
        OverlayState {
            patch_version: "14.20b".to_string(),
            server_region: "euw".to_string(),
            rank_tier: "grandmaster".to_string(),
            is_recording,
            ..OverlayState::default()
        }
    }

    #[test]
    fn indicator_follows_recording_flag_only() {
        for position in [
            OverlayPosition::TopRight,
            OverlayPosition::BottomRight,
            OverlayPosition::BottomLeft,
            OverlayPosition::TopLeft,
        ] {
            let idle = OverlayState {
                position,
                ..state(false)
            };
            assert!(render(&idle).indicator.is_none());

            let recording = OverlayState {
                position,
                ..state(true)
            };
            let indicator = render(&recording).indicator.expect("indicator");
            assert!(indicator.pulsing);
        }

        let empty = OverlayState {
            patch_version: String::new(),
            server_region: String::new(),
            rank_tier: String::new(),
            ..state(true)
        };
        assert!(render(&empty).indicator.is_some());
    }

    #[test]
    fn badges_are_ordered_and_uppercased_except_version() {
        let view = render(&state(false));
        let texts: Vec<_> = view.badges.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["EUW", "GRANDMASTER", "REPLAY", "PATCH", "14.20b"]);
        let emphasized: Vec<_> = view.badges.iter().map(|b| b.emphasized).collect();
        assert_eq!(emphasized, vec![false, false, false, true, true]);
    }

    #[test]
    fn default_anchor_is_bottom_right() {
        let view = render(&OverlayState::default());
        assert_eq!(
            view.anchor,
            OverlayAnchor {
                top: None,
                right: Some(16),
                bottom: Some(16),
                left: None,
            }
        );
        assert!(view.visible);
    }

    #[test]
    fn origin_places_window_in_corner() {
        let area = (1920.0, 1080.0);
        let window = (300.0, 240.0);
        assert_eq!(OverlayPosition::TopLeft.origin(area, window), (16.0, 16.0));
        assert_eq!(
            OverlayPosition::BottomRight.origin(area, window),
            (1604.0, 824.0)
        );
        assert_eq!(OverlayPosition::TopRight.origin(area, window), (1604.0, 16.0));
        assert_eq!(OverlayPosition::BottomLeft.origin(area, window), (16.0, 824.0));
    }

    #[test]
    fn controller_toggles_visibility_and_keeps_it_on_set() {
        let mut controller = OverlayController::default();
        assert!(controller.state().visible);
        assert!(!controller.toggle().visible);
        assert!(!controller.set(state(true)).visible);
        assert!(controller.view().indicator.is_some());
        assert!(controller.show().visible);
        assert!(!controller.hide().visible);
    }

    #[test]
    fn position_parses_kebab_case() {
        let parsed: OverlayState =
            serde_json::from_str(r#"{"position":"bottom-left","isRecording":true}"#)
                .expect("state");
        assert_eq!(parsed.position, OverlayPosition::BottomLeft);
        assert_eq!(parsed.server_region, "NA");
    }
}
