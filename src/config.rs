use serde::Deserialize;
use std::{
    collections::HashMap,
    env,
    fs::read_to_string,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};
use stdext::function_name;
use tracing::{debug, warn};

use crate::errors::{Error, Result};

/// Placeholder substituted with the shell-escaped project path in app command templates.
pub const PATH_PLACEHOLDER: &str = "{path}";

pub const APP_COMMANDS_FILE_NAME: &str = "notifier-app-commands.json";
pub const LOG_FILE_NAME: &str = "notifier-all.log";
pub const HISTORY_FILE_NAME: &str = "notifier-history.jsonl";

/// Upper bound for authorization plus delivery of one notification.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for launching a host application that is not running yet.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(3);
/// How long the process stays alive waiting for a click.
pub const CLICK_TIMEOUT: Duration = Duration::from_secs(60);
/// Delay between handling a click and exiting, so the platform can finish its callback.
pub const EXIT_GRACE: Duration = Duration::from_millis(300);
/// Run loop time granted to a notification posted without focus metadata.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Run loop time granted to a LaunchServices relaunch carrying no arguments.
pub const RELAUNCH_DELAY: Duration = Duration::from_secs(2);
/// Slice of run loop time between polls of the click queue.
pub const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

/// The notifier's state directory. `$CLAUDE_NOTIFIER_HOME` wins, otherwise `$HOME/.claude`.
/// Falls back to the temp directory when neither is set.
pub static NOTIFIER_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Ok(path) = env::var("CLAUDE_NOTIFIER_HOME") {
        return PathBuf::from(path);
    }
    env::var("HOME").map_or_else(
        |_| {
            warn!(
                "{}: $HOME is not set, using the temp directory.",
                function_name!()
            );
            env::temp_dir().join(".claude")
        },
        |home| PathBuf::from(home).join(".claude"),
    )
});

pub fn app_commands_file() -> PathBuf {
    NOTIFIER_DIR.join(APP_COMMANDS_FILE_NAME)
}

pub fn history_file() -> PathBuf {
    NOTIFIER_DIR.join(HISTORY_FILE_NAME)
}

/// Per-user sound directory the notification center searches for named sounds.
pub fn sounds_dir() -> Option<PathBuf> {
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join("Library/Sounds"))
}

/// Per-application shell command templates, keyed by host bundle identifier.
///
/// ```json
/// { "dev.zed.Zed": "zed {path}", "com.microsoft.VSCode": "code -r {path}" }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct AppCommands(HashMap<String, String>);

impl AppCommands {
    /// Reads and parses the command table. Not cached.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the JSON command table.
    ///
    /// # Returns
    ///
    /// `Ok(AppCommands)` if the file exists and is a JSON object of strings, otherwise `Err(Error)`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "{}: {} does not exist.",
                function_name!(),
                path.display()
            )));
        }
        let input = read_to_string(path)?;
        let commands = Self::parse(&input)?;
        debug!(
            "loaded {} app command(s) from {}",
            commands.0.len(),
            path.display()
        );
        Ok(commands)
    }

    fn parse(input: &str) -> Result<Self> {
        let commands: AppCommands = serde_json::from_str(input).map_err(|err| {
            Error::InvalidConfig(format!("{}: {err}", function_name!()))
        })?;
        for (bundle_id, template) in &commands.0 {
            if !template.contains(PATH_PLACEHOLDER) {
                warn!("command for {bundle_id} has no {PATH_PLACEHOLDER} placeholder: {template}");
            }
        }
        Ok(commands)
    }

    /// Returns the command template configured for a host application, if any.
    pub fn template(&self, bundle_id: &str) -> Option<&str> {
        self.0.get(bundle_id).map(String::as_str)
    }
}
