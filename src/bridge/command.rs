use std::{
    path::PathBuf,
    process::{Command, Stdio},
};
use tracing::{Level, debug, info, instrument, warn};

use crate::config::{AppCommands, PATH_PLACEHOLDER};
use crate::errors::Error;

/// Quotes `value` as a single POSIX shell word: wrapped in single quotes, with every
/// embedded single quote written as `'\''`.
pub fn shell_escape(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Substitutes every path placeholder of `template` with the shell-quoted `path`.
pub fn render(template: &str, path: &str) -> String {
    template.replace(PATH_PLACEHOLDER, &shell_escape(path))
}

/// Runs the per-application command templates from the user's config file.
#[derive(Clone, Debug)]
pub struct CommandInvoker {
    config_path: PathBuf,
    shell: PathBuf,
}

impl CommandInvoker {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            shell: PathBuf::from("/bin/sh"),
        }
    }

    /// Loads the config file and looks up the template for `bundle_id`. The file is read on
    /// every call, a missing or broken file just means nothing is configured.
    pub fn template(&self, bundle_id: &str) -> Option<String> {
        match AppCommands::load(&self.config_path) {
            Ok(commands) => commands.template(bundle_id).map(str::to_string),
            Err(Error::NotFound(_)) => {
                debug!("no app commands at {}", self.config_path.display());
                None
            }
            Err(err) => {
                warn!("ignoring {}: {err}", self.config_path.display());
                None
            }
        }
    }

    /// Runs `template` with `path` substituted.
    ///
    /// # Returns
    ///
    /// `true` if the shell exited with status zero. Spawn failures count as failure.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub fn run(&self, template: &str, path: &str) -> bool {
        let command = render(template, path);
        info!("running app command: {command}");
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => true,
            Ok(status) => {
                warn!("app command exited with {status}");
                false
            }
            Err(err) => {
                warn!("app command could not start: {err}");
                false
            }
        }
    }
}
