use tracing::{Level, debug, instrument};

use super::scoring::{BestMatch, best_match};
use super::strategies::{DirectRaise, ExternalCommand, ScriptByName, ScriptGeneric, StrategyKind};
use super::{DesktopApi, FocusRequest, HostProcess};
use crate::bridge::command::CommandInvoker;
use crate::bridge::script::ScriptBridge;

/// Outcome of one strategy for one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// A window was brought to the front; no further strategy runs.
    Succeeded,
    /// The strategy's preconditions are not met, e.g. no permission or no config entry.
    NotApplicable,
    /// The strategy ran and did not focus a window.
    Failed,
}

/// State shared by the strategies of one resolution.
pub struct ResolutionContext<'a> {
    pub request: &'a FocusRequest,
    pub process: &'a HostProcess,
    pub desktop: &'a dyn DesktopApi,
    system_scan: Option<Option<BestMatch>>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        desktop: &'a dyn DesktopApi,
        request: &'a FocusRequest,
        process: &'a HostProcess,
    ) -> Self {
        Self {
            request,
            process,
            desktop,
            system_scan: None,
        }
    }

    /// Best match of the system window list for the host process. The list is enumerated
    /// at most once per resolution, later strategies see the same scan.
    pub fn system_best_match(&mut self) -> Option<BestMatch> {
        let (desktop, request, pid) = (self.desktop, self.request, self.process.pid);
        self.system_scan
            .get_or_insert_with(|| {
                let candidates = desktop.system_windows(pid);
                debug!("system window list: {} window(s)", candidates.len());
                best_match(&candidates, request)
            })
            .clone()
    }
}

/// One way of bringing a specific window to the front.
pub trait ResolutionStrategy {
    fn kind(&self) -> StrategyKind;

    /// Runs the strategy. Failures are reported as an [`Attempt`], never as an error.
    fn attempt(&self, ctx: &mut ResolutionContext<'_>) -> Attempt;
}

/// What happened while resolving one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// The strategy that focused a window, if any.
    pub focused_by: Option<StrategyKind>,
    /// Every strategy that ran, in order.
    pub attempts: Vec<(StrategyKind, Attempt)>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.focused_by.is_some()
    }
}

/// Runs strategies from least to most invasive and stops at the first success.
pub struct WindowResolver<'a> {
    strategies: Vec<Box<dyn ResolutionStrategy + 'a>>,
}

impl<'a> WindowResolver<'a> {
    pub fn new(strategies: Vec<Box<dyn ResolutionStrategy + 'a>>) -> Self {
        Self { strategies }
    }

    /// Direct raise, external command, script by name, then generic script.
    pub fn standard(bridge: &'a ScriptBridge<'a>, invoker: &'a CommandInvoker) -> Self {
        Self::new(vec![
            Box::new(DirectRaise::default()),
            Box::new(ExternalCommand::new(invoker)),
            Box::new(ScriptByName::new(bridge)),
            Box::new(ScriptGeneric::new(bridge)),
        ])
    }

    /// # Arguments
    ///
    /// * `desktop` - Enumeration backends.
    /// * `request` - Project hints; nothing runs when there are none.
    /// * `process` - The already activated host application.
    ///
    /// # Returns
    ///
    /// A [`Resolution`] listing each strategy that ran and which one, if any, succeeded.
    #[instrument(level = Level::DEBUG, skip_all, fields(host = %process.bundle_id))]
    pub fn resolve(
        &self,
        desktop: &dyn DesktopApi,
        request: &FocusRequest,
        process: &HostProcess,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        if !request.has_hints() {
            return resolution;
        }

        let mut ctx = ResolutionContext::new(desktop, request, process);
        for strategy in &self.strategies {
            let kind = strategy.kind();
            let attempt = strategy.attempt(&mut ctx);
            debug!("{kind}: {attempt:?}");
            resolution.attempts.push((kind, attempt));
            if attempt == Attempt::Succeeded {
                resolution.focused_by = Some(kind);
                break;
            }
        }
        resolution
    }
}
