use std::{
    io::Write as _,
    process::{Command, Stdio},
    str::FromStr,
};
use stdext::function_name;
use tracing::{Level, debug, instrument};

use crate::errors::{Error, Result};

/// Escapes a value for use inside a double-quoted AppleScript string literal.
/// Backslashes are doubled first, then quotes are escaped.
pub fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// What the generated script should do with the host's windows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptAction {
    /// Raise the window whose title equals `window`.
    RaiseByName { window: String },
    /// Raise the first window whose title contains any needle, else the first window.
    RaiseContaining { needles: Vec<String> },
    /// Raise the first window.
    RaiseFirst,
}

impl ScriptAction {
    /// Builds a containment search, or a plain first-window raise when there is nothing to
    /// search for.
    pub fn raise_containing(needles: Vec<String>) -> Self {
        if needles.is_empty() {
            ScriptAction::RaiseFirst
        } else {
            ScriptAction::RaiseContaining { needles }
        }
    }

    /// Renders the AppleScript source for `app_name`'s process.
    pub fn render(&self, app_name: &str) -> String {
        let mut body = String::new();
        match self {
            ScriptAction::RaiseByName { window } => {
                let window = escape_applescript(window);
                body.push_str(&format!(
                    "        if exists (window \"{window}\") then\n            perform action \"AXRaise\" of window \"{window}\"\n            return \"{}\"\n        end if\n        return \"{}\"\n",
                    ScriptOutcome::Matched,
                    ScriptOutcome::NotFound,
                ));
            }
            ScriptAction::RaiseContaining { needles } => {
                let predicate = needles
                    .iter()
                    .map(|needle| format!("name of w contains \"{}\"", escape_applescript(needle)))
                    .collect::<Vec<_>>()
                    .join(" or ");
                body.push_str(&format!(
                    "        repeat with w in (every window)\n            if {predicate} then\n                perform action \"AXRaise\" of w\n                return \"{}\"\n            end if\n        end repeat\n",
                    ScriptOutcome::Matched,
                ));
                Self::first_window(&mut body);
            }
            ScriptAction::RaiseFirst => Self::first_window(&mut body),
        }

        format!(
            "tell application \"System Events\"\n    tell process \"{}\"\n        set frontmost to true\n{body}    end tell\nend tell\n",
            escape_applescript(app_name),
        )
    }

    fn first_window(body: &mut String) {
        body.push_str(&format!(
            "        if (count of windows) > 0 then\n            perform action \"AXRaise\" of window 1\n            return \"{}\"\n        end if\n        return \"{}\"\n",
            ScriptOutcome::Fallback,
            ScriptOutcome::NoWindows,
        ));
    }
}

/// Machine-readable result printed by every generated script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptOutcome {
    Matched,
    Fallback,
    NotFound,
    NoWindows,
}

impl ScriptOutcome {
    fn as_str(self) -> &'static str {
        match self {
            ScriptOutcome::Matched => "matched",
            ScriptOutcome::Fallback => "fallback",
            ScriptOutcome::NotFound => "not_found",
            ScriptOutcome::NoWindows => "no_windows",
        }
    }
}

impl std::fmt::Display for ScriptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptOutcome {
    type Err = Error;

    fn from_str(output: &str) -> Result<Self> {
        match output.trim() {
            "matched" => Ok(ScriptOutcome::Matched),
            "fallback" => Ok(ScriptOutcome::Fallback),
            "not_found" => Ok(ScriptOutcome::NotFound),
            "no_windows" => Ok(ScriptOutcome::NoWindows),
            other => Err(Error::Script(format!(
                "{}: unexpected script output {other:?}",
                function_name!()
            ))),
        }
    }
}

/// Executes script source and returns its standard output.
pub trait ScriptRunner {
    fn run(&self, source: &str) -> Result<String>;
}

/// Runs scripts through `osascript`, feeding the source on standard input.
#[derive(Debug, Default)]
pub struct OsaScript;

impl ScriptRunner for OsaScript {
    fn run(&self, source: &str) -> Result<String> {
        let mut child = Command::new("/usr/bin/osascript")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::Script(format!(
                "{}: osascript exited with {}: {}",
                function_name!(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Generates, runs and interprets window scripts.
pub struct ScriptBridge<'a> {
    runner: &'a dyn ScriptRunner,
}

impl<'a> ScriptBridge<'a> {
    pub fn new(runner: &'a dyn ScriptRunner) -> Self {
        Self { runner }
    }

    /// # Arguments
    ///
    /// * `app_name` - Process name of the host as System Events knows it.
    /// * `action` - What to do with its windows.
    ///
    /// # Returns
    ///
    /// The outcome printed by the script, or `Err(Error)` if it could not run or printed
    /// something unexpected.
    #[instrument(level = Level::DEBUG, skip(self))]
    pub fn execute(&self, app_name: &str, action: &ScriptAction) -> Result<ScriptOutcome> {
        let source = action.render(app_name);
        let output = self.runner.run(&source)?;
        debug!("script printed {:?}", output.trim());
        output.parse()
    }
}
