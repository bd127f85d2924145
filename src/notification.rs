//! Notification content and the notification center seam.

use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use crate::cli::Args;
use crate::errors::Error;
use crate::focus::FocusRequest;

/// User-info keys carried by a notification so a click can be traced back to its window.
pub mod keys {
    pub const PROJECT_PATH: &str = "projectPath";
    pub const PROJECT_NAME: &str = "projectName";
    pub const HOST_BUNDLE_ID: &str = "hostBundleId";
    pub const TTY: &str = "tty";
    pub const STATUS: &str = "status";
    pub const SUBTITLE: &str = "subtitle";
    pub const DURATION: &str = "duration";
}

/// Named sound used when nothing else is requested.
pub const DEFAULT_SOUND: &str = "Glass";
/// Replaces [`DEFAULT_SOUND`] for failed tasks.
pub const FAILURE_SOUND: &str = "Basso";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Warning,
}

impl Status {
    fn title_prefix(self) -> &'static str {
        match self {
            Status::Success => "",
            Status::Failure => "❌ ",
            Status::Warning => "⚠️ ",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Warning => "warning",
        })
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "success" => Ok(Status::Success),
            "failure" => Ok(Status::Failure),
            "warning" => Ok(Status::Warning),
            _ => Err(Error::InvalidInput(format!("unknown status {value:?}"))),
        }
    }
}

/// Renders a task duration as `Ns`, `Mm` or `Mm Ss`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    match (minutes, seconds) {
        (0, seconds) => format!("{seconds}s"),
        (minutes, 0) => format!("{minutes}m"),
        (minutes, seconds) => format!("{minutes}m {seconds}s"),
    }
}

/// A fully prepared notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub subtitle: Option<String>,
    /// Named sound, `None` when muted.
    pub sound: Option<String>,
    pub user_info: HashMap<String, String>,
}

impl Notification {
    /// Builds the notification content from the command line.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command line.
    /// * `custom_sound` - Name of a sound file installed for this run, it wins over `--sound`.
    pub fn new(args: &Args, custom_sound: Option<String>) -> Self {
        let status = args.status();
        let title = format!(
            "{}{}",
            status.map_or("", Status::title_prefix),
            args.title
        );
        let body = match args.duration() {
            Some(duration) => format!("{} ({})", args.message, format_duration(duration)),
            None => args.message.clone(),
        };

        let sound = if args.no_sound {
            None
        } else {
            let sound = custom_sound.unwrap_or_else(|| args.sound.clone());
            if status == Some(Status::Failure) && sound == DEFAULT_SOUND {
                Some(FAILURE_SOUND.to_string())
            } else {
                Some(sound)
            }
        };

        let mut user_info = HashMap::new();
        let status = status.map(|status| status.to_string());
        let duration = args.duration().map(|duration| duration.as_secs().to_string());
        let entries = [
            (keys::PROJECT_PATH, args.project_path.as_deref()),
            (keys::PROJECT_NAME, args.project_name.as_deref()),
            (keys::HOST_BUNDLE_ID, args.host_bundle_id.as_deref()),
            (keys::TTY, args.tty.as_deref()),
            (keys::STATUS, status.as_deref()),
            (keys::SUBTITLE, args.subtitle.as_deref()),
            (keys::DURATION, duration.as_deref()),
        ];
        for (key, value) in entries {
            if let Some(value) = value.filter(|value| !value.is_empty()) {
                user_info.insert(key.to_string(), value.to_string());
            }
        }

        Self {
            title,
            body,
            subtitle: args.subtitle.clone().filter(|subtitle| !subtitle.is_empty()),
            sound,
            user_info,
        }
    }

    /// Whether a click on this notification can be traced back to a host application.
    pub fn has_host(&self) -> bool {
        self.user_info.contains_key(keys::HOST_BUNDLE_ID)
    }
}

/// How posting a notification went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The notification center accepted the request.
    Confirmed,
    /// The user has not authorized notifications.
    Denied,
    /// Authorization or delivery reported an error.
    Failed,
    /// No confirmation within the delivery timeout. The notification may still show up.
    TimedOut,
    /// No notification center on this platform.
    Unsupported,
}

impl Delivery {
    /// Whether it makes sense to wait for a click after this delivery.
    pub fn may_be_clicked(self) -> bool {
        matches!(self, Delivery::Confirmed | Delivery::TimedOut)
    }
}

/// A click on the body of one of our notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickEvent {
    pub user_info: HashMap<String, String>,
}

impl ClickEvent {
    pub fn focus_request(&self) -> Option<FocusRequest> {
        FocusRequest::from_user_info(&self.user_info)
    }
}

/// The platform notification center.
pub trait NotificationCenterApi {
    /// Requests authorization and posts `notification`. Bounded by the delivery timeout.
    fn post(&self, notification: &Notification) -> Delivery;

    /// Services the run loop until a notification is clicked or `timeout` elapses.
    /// Dismissals and secondary actions do not count as clicks.
    fn wait_for_click(&self, timeout: Duration) -> Option<ClickEvent>;

    /// Removes every notification this process has delivered.
    fn withdraw_all(&self);

    /// Services the run loop for `duration`.
    fn pump(&self, duration: Duration);
}
