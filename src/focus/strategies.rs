use std::{fmt, thread, time::Duration};
use tracing::{debug, warn};

use super::resolver::{Attempt, ResolutionContext, ResolutionStrategy};
use super::scoring::{ANCESTOR_SCORE, MatchBand, best_match, workspace_root};
use super::{FocusRequest, Window};
use crate::bridge::command::CommandInvoker;
use crate::bridge::script::{ScriptAction, ScriptBridge, ScriptOutcome};

/// Directory names too generic to identify a project window.
const GENERIC_COMPONENTS: [&str; 6] = ["Users", "home", "var", "tmp", "usr", "opt"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    DirectRaise,
    ExternalCommand,
    ScriptByName,
    ScriptGeneric,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::DirectRaise => "direct raise",
            StrategyKind::ExternalCommand => "external command",
            StrategyKind::ScriptByName => "script by name",
            StrategyKind::ScriptGeneric => "generic script",
        };
        f.write_str(name)
    }
}

/// Scores the accessibility tree and raises the best window.
pub struct DirectRaise {
    attempts: usize,
    backoff: Duration,
}

impl Default for DirectRaise {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(150))
    }
}

impl DirectRaise {
    /// # Arguments
    ///
    /// * `attempts` - Enumerate-and-raise rounds before giving up, a freshly launched host may
    ///   not have its windows yet.
    /// * `backoff` - Pause between rounds.
    pub fn new(attempts: usize, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }
}

impl ResolutionStrategy for DirectRaise {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectRaise
    }

    fn attempt(&self, ctx: &mut ResolutionContext<'_>) -> Attempt {
        if !ctx.desktop.is_trusted(false) {
            debug!("no accessibility permission");
            return Attempt::NotApplicable;
        }

        let mut enumerated = false;
        for round in 1..=self.attempts {
            let windows = ctx.desktop.accessibility_windows(ctx.process.pid);
            if !windows.is_empty() {
                enumerated = true;
                let candidates = windows.iter().map(Window::candidate).collect::<Vec<_>>();
                if let Some(best) = best_match(&candidates, ctx.request) {
                    debug!(
                        "round {round}: best window {:?} scored {}",
                        best.title(),
                        best.score
                    );
                    match windows[best.index].raise() {
                        Ok(()) => return Attempt::Succeeded,
                        Err(err) => debug!("round {round}: raise failed: {err}"),
                    }
                }
            }
            if round < self.attempts {
                thread::sleep(self.backoff);
            }
        }

        if enumerated {
            Attempt::Failed
        } else {
            Attempt::NotApplicable
        }
    }
}

/// Asks the host itself to open the project through a configured shell command. Only runs
/// when a matching window already exists, so it cannot open a fresh one.
pub struct ExternalCommand<'a> {
    invoker: &'a CommandInvoker,
}

impl<'a> ExternalCommand<'a> {
    pub fn new(invoker: &'a CommandInvoker) -> Self {
        Self { invoker }
    }
}

impl ResolutionStrategy for ExternalCommand<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExternalCommand
    }

    fn attempt(&self, ctx: &mut ResolutionContext<'_>) -> Attempt {
        let Some(path) = ctx.request.project_path() else {
            return Attempt::NotApplicable;
        };
        let Some(template) = self.invoker.template(&ctx.process.bundle_id) else {
            return Attempt::NotApplicable;
        };
        let Some(best) = ctx.system_best_match() else {
            debug!("no existing window matches, not running the command");
            return Attempt::NotApplicable;
        };
        if best.score < ANCESTOR_SCORE {
            debug!("best window scored {}, too weak for the command", best.score);
            return Attempt::NotApplicable;
        }

        // An ancestor title means the host has a parent directory open.
        let target = match best.band() {
            MatchBand::Ancestor => best
                .title()
                .and_then(|title| workspace_root(title, path))
                .unwrap_or_else(|| path.to_string()),
            MatchBand::Direct | MatchBand::Weak => path.to_string(),
        };

        if self.invoker.run(&template, &target) {
            Attempt::Succeeded
        } else {
            Attempt::Failed
        }
    }
}

/// Raises the system window list's best match by its exact title through the scripting bridge.
pub struct ScriptByName<'a> {
    bridge: &'a ScriptBridge<'a>,
}

impl<'a> ScriptByName<'a> {
    pub fn new(bridge: &'a ScriptBridge<'a>) -> Self {
        Self { bridge }
    }
}

impl ResolutionStrategy for ScriptByName<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ScriptByName
    }

    fn attempt(&self, ctx: &mut ResolutionContext<'_>) -> Attempt {
        let Some(app_name) = ctx.process.app_name() else {
            return Attempt::NotApplicable;
        };
        let Some(best) = ctx.system_best_match() else {
            return Attempt::NotApplicable;
        };
        let Some(title) = best.title() else {
            return Attempt::NotApplicable;
        };

        let action = ScriptAction::RaiseByName {
            window: title.to_string(),
        };
        match self.bridge.execute(app_name, &action) {
            Ok(ScriptOutcome::Matched) => Attempt::Succeeded,
            Ok(outcome) => {
                debug!("window {title:?} not raised: {outcome:?}");
                Attempt::Failed
            }
            Err(err) => {
                warn!("script failed: {err}");
                Attempt::Failed
            }
        }
    }
}

/// Last resort: raise any window whose title contains a project hint, else the first window.
pub struct ScriptGeneric<'a> {
    bridge: &'a ScriptBridge<'a>,
}

impl<'a> ScriptGeneric<'a> {
    pub fn new(bridge: &'a ScriptBridge<'a>) -> Self {
        Self { bridge }
    }
}

impl ResolutionStrategy for ScriptGeneric<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ScriptGeneric
    }

    fn attempt(&self, ctx: &mut ResolutionContext<'_>) -> Attempt {
        let Some(app_name) = ctx.process.app_name() else {
            return Attempt::NotApplicable;
        };

        let action = ScriptAction::raise_containing(title_needles(ctx.request));
        match self.bridge.execute(app_name, &action) {
            Ok(ScriptOutcome::Matched | ScriptOutcome::Fallback) => Attempt::Succeeded,
            Ok(outcome) => {
                debug!("no window raised: {outcome:?}");
                Attempt::Failed
            }
            Err(err) => {
                warn!("script failed: {err}");
                Attempt::Failed
            }
        }
    }
}

/// Substrings a project window title is likely to contain: the project name and the
/// distinctive directories of the project path.
fn title_needles(request: &FocusRequest) -> Vec<String> {
    let mut needles = Vec::new();
    if let Some(name) = request.project_name() {
        needles.push(name.to_string());
    }
    if let Some(path) = request.project_path() {
        needles.extend(meaningful_components(path));
    }
    let mut seen = Vec::new();
    needles.retain(|needle| {
        let fresh = !seen.contains(needle);
        seen.push(needle.clone());
        fresh
    });
    needles
}

/// Path components of at least two characters that are not generic system directories.
fn meaningful_components(path: &str) -> Vec<String> {
    path.split(std::path::is_separator)
        .filter(|component| component.chars().count() >= 2)
        .filter(|component| {
            !GENERIC_COMPONENTS
                .iter()
                .any(|generic| generic.eq_ignore_ascii_case(component))
        })
        .map(str::to_string)
        .collect()
}
