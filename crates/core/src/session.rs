use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the widget's message log. At least one of text/image is
/// present; the constructors below are the only way other crates build one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    pub fn user(text: &str) -> Self {
        Self {
            sender: Sender::User,
            text: Some(text.to_string()),
            image: None,
        }
    }

    pub fn user_with_image(text: Option<&str>, image: &str) -> Self {
        Self {
            sender: Sender::User,
            text: text.filter(|t| !t.is_empty()).map(|t| t.to_string()),
            image: Some(image.to_string()),
        }
    }

    pub fn bot(text: &str) -> Self {
        Self {
            sender: Sender::Bot,
            text: Some(text.to_string()),
            image: None,
        }
    }
}

/// Widget placement. Fresh installs anchor to the bottom-right corner;
/// the first drag switches to absolute top/left coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetPosition {
    Absolute { top: f64, left: f64 },
    Anchored { bottom: f64, right: f64 },
}

impl WidgetPosition {
    /// Resolve to on-screen top/left coordinates, clamped per axis to
    /// `[0, viewport - widget]` so a saved position from a larger screen
    /// never lands off-screen.
    pub fn resolve(
        &self,
        viewport_width: f64,
        viewport_height: f64,
        widget_width: f64,
        widget_height: f64,
    ) -> (f64, f64) {
        let max_top = (viewport_height - widget_height).max(0.0);
        let max_left = (viewport_width - widget_width).max(0.0);
        let (top, left) = match *self {
            WidgetPosition::Absolute { top, left } => (top, left),
            WidgetPosition::Anchored { bottom, right } => {
                (viewport_height - widget_height - bottom, viewport_width - widget_width - right)
            }
        };
        (top.clamp(0.0, max_top), left.clamp(0.0, max_left))
    }
}

impl Default for WidgetPosition {
    fn default() -> Self {
        WidgetPosition::Anchored {
            bottom: 20.0,
            right: 20.0,
        }
    }
}

/// The complete widget state persisted between page loads. Saved and
/// loaded as one unit; see `pagebot_storage::SnapshotStore`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub position: WidgetPosition,
}
