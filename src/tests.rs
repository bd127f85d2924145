use std::collections::{HashMap, VecDeque};
use std::fs;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use stdext::function_name;
use stdext::prelude::RwLockExt;
use tracing::{Level, debug, instrument};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::bridge::command::CommandInvoker;
use crate::cli::Invocation;
use crate::bridge::script::{ScriptBridge, ScriptRunner};
use crate::click::{ClickEventBridge, ClickOutcome};
use crate::config::APP_COMMANDS_FILE_NAME;
use crate::errors::{Error, Result};
use crate::focus::{
    Attempt, DesktopApi, DirectRaise, ExternalCommand, FocusOutcome, FocusPipeline, FocusRequest,
    HostApi, HostProcess, Resolution, ResolutionContext, ResolutionStrategy, ScriptByName,
    ScriptGeneric, StrategyKind, Window, WindowApi, WindowCandidate, WindowResolver,
};
use crate::notification::{ClickEvent, Delivery, Notification, NotificationCenterApi, keys};
use crate::platform::Pid;

const TEST_PROCESS_ID: Pid = 42;
const TEST_BUNDLE_ID: &str = "dev.zed.Zed";
const TEST_APP_NAME: &str = "Zed";

fn setup_logging() {
    static DONE: OnceLock<()> = OnceLock::new();
    DONE.get_or_init(|| {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(
                fmt::layer()
                    .with_level(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    });
}

#[derive(Clone, Debug)]
struct MockWindowAttrs {
    title: Option<String>,
    document: Option<String>,
    raise_ok: bool,
}

#[derive(Debug, Default)]
struct InnerMockDesktop {
    trusted: bool,
    prompts: usize,
    ax_windows: Vec<MockWindowAttrs>,
    /// Number of empty accessibility enumerations before the windows show up.
    ax_empty_rounds: usize,
    ax_enumerations: usize,
    system_windows: Vec<WindowCandidate>,
    system_enumerations: usize,
    raised: Vec<String>,
}

/// A mock implementation of `DesktopApi` recording every enumeration and raise.
#[derive(Clone, Debug, Default)]
struct MockDesktop {
    inner: Arc<RwLock<InnerMockDesktop>>,
}

impl MockDesktop {
    fn new(trusted: bool) -> Self {
        let desktop = MockDesktop::default();
        desktop.inner.force_write().trusted = trusted;
        desktop
    }

    fn with_ax_window(self, title: &str, document: Option<&str>, raise_ok: bool) -> Self {
        self.inner.force_write().ax_windows.push(MockWindowAttrs {
            title: Some(title.to_string()),
            document: document.map(str::to_string),
            raise_ok,
        });
        self
    }

    fn with_ax_empty_rounds(self, rounds: usize) -> Self {
        self.inner.force_write().ax_empty_rounds = rounds;
        self
    }

    fn with_system_window(self, title: &str) -> Self {
        self.inner
            .force_write()
            .system_windows
            .push(WindowCandidate::new(Some(title), None, TEST_PROCESS_ID));
        self
    }

    fn ax_enumerations(&self) -> usize {
        self.inner.force_read().ax_enumerations
    }

    fn system_enumerations(&self) -> usize {
        self.inner.force_read().system_enumerations
    }

    fn prompts(&self) -> usize {
        self.inner.force_read().prompts
    }

    fn raised(&self) -> Vec<String> {
        self.inner.force_read().raised.clone()
    }
}

impl DesktopApi for MockDesktop {
    #[instrument(level = Level::DEBUG, skip(self), ret)]
    fn is_trusted(&self, prompt: bool) -> bool {
        debug!("{}:", function_name!());
        let mut inner = self.inner.force_write();
        if prompt {
            inner.prompts += 1;
        }
        inner.trusted
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    fn accessibility_windows(&self, pid: Pid) -> Vec<Window> {
        let mut inner = self.inner.force_write();
        inner.ax_enumerations += 1;
        debug!("{}: round {}", function_name!(), inner.ax_enumerations);
        if !inner.trusted || inner.ax_enumerations <= inner.ax_empty_rounds {
            return vec![];
        }
        inner
            .ax_windows
            .iter()
            .map(|attrs| {
                Window::new(Box::new(MockWindow {
                    attrs: attrs.clone(),
                    pid,
                    desktop: self.clone(),
                }))
            })
            .collect()
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    fn system_windows(&self, pid: Pid) -> Vec<WindowCandidate> {
        debug!("{}:", function_name!());
        let mut inner = self.inner.force_write();
        inner.system_enumerations += 1;
        inner
            .system_windows
            .iter()
            .filter(|candidate| candidate.owner_pid == pid)
            .cloned()
            .collect()
    }
}

/// A mock implementation of `WindowApi`. Raises are reported back to its desktop.
#[derive(Debug)]
struct MockWindow {
    attrs: MockWindowAttrs,
    pid: Pid,
    desktop: MockDesktop,
}

impl WindowApi for MockWindow {
    fn title(&self) -> Option<String> {
        self.attrs.title.clone()
    }

    fn document(&self) -> Option<String> {
        self.attrs.document.clone()
    }

    fn pid(&self) -> Pid {
        self.pid
    }

    #[instrument(level = Level::DEBUG, skip(self), ret)]
    fn raise(&self) -> Result<()> {
        debug!("{}: {:?}", function_name!(), self.attrs.title);
        if !self.attrs.raise_ok {
            return Err(Error::NotFound(format!(
                "{}: window closed",
                function_name!()
            )));
        }
        let title = self.attrs.title.clone().unwrap_or_default();
        self.desktop.inner.force_write().raised.push(title);
        Ok(())
    }
}

/// A mock implementation of `HostApi`.
#[derive(Clone, Debug, Default)]
struct MockHost {
    process: Option<HostProcess>,
    activations: Arc<RwLock<Vec<String>>>,
}

impl MockHost {
    fn running() -> Self {
        MockHost {
            process: Some(host_process()),
            ..Default::default()
        }
    }

    fn activations(&self) -> Vec<String> {
        self.activations.force_read().clone()
    }
}

impl HostApi for MockHost {
    #[instrument(level = Level::DEBUG, skip(self), ret)]
    fn activate(&self, bundle_id: &str) -> Option<HostProcess> {
        debug!("{}: {bundle_id}", function_name!());
        self.activations.force_write().push(bundle_id.to_string());
        self.process
            .clone()
            .filter(|process| process.bundle_id == bundle_id)
    }
}

#[derive(Debug, Default)]
struct InnerMockScriptRunner {
    outputs: VecDeque<Result<String>>,
    sources: Vec<String>,
}

/// A mock implementation of `ScriptRunner` replaying canned outputs in order.
/// Once they run out, every script reports `not_found`.
#[derive(Clone, Debug, Default)]
struct MockScriptRunner {
    inner: Arc<RwLock<InnerMockScriptRunner>>,
}

impl MockScriptRunner {
    fn replying(outputs: Vec<Result<String>>) -> Self {
        let runner = MockScriptRunner::default();
        runner.inner.force_write().outputs = outputs.into();
        runner
    }

    fn sources(&self) -> Vec<String> {
        self.inner.force_read().sources.clone()
    }
}

impl ScriptRunner for MockScriptRunner {
    #[instrument(level = Level::DEBUG, skip_all, ret)]
    fn run(&self, source: &str) -> Result<String> {
        debug!("{}:", function_name!());
        let mut inner = self.inner.force_write();
        inner.sources.push(source.to_string());
        inner
            .outputs
            .pop_front()
            .unwrap_or_else(|| Ok("not_found\n".to_string()))
    }
}

#[derive(Debug, Default)]
struct InnerMockNotificationCenter {
    posted: Vec<Notification>,
    clicks: VecDeque<ClickEvent>,
    waits: Vec<Duration>,
    withdrawals: usize,
    pumps: Vec<Duration>,
}

/// A mock implementation of `NotificationCenterApi` with a queue of pending clicks.
#[derive(Clone, Debug, Default)]
struct MockNotificationCenter {
    inner: Arc<RwLock<InnerMockNotificationCenter>>,
}

impl MockNotificationCenter {
    fn click(self, user_info: &[(&str, &str)]) -> Self {
        let user_info = user_info
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        self.inner
            .force_write()
            .clicks
            .push_back(ClickEvent { user_info });
        self
    }
}

impl NotificationCenterApi for MockNotificationCenter {
    #[instrument(level = Level::DEBUG, skip_all, ret)]
    fn post(&self, notification: &Notification) -> Delivery {
        debug!("{}: {}", function_name!(), notification.title);
        self.inner.force_write().posted.push(notification.clone());
        Delivery::Confirmed
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    fn wait_for_click(&self, timeout: Duration) -> Option<ClickEvent> {
        debug!("{}:", function_name!());
        let mut inner = self.inner.force_write();
        inner.waits.push(timeout);
        inner.clicks.pop_front()
    }

    fn withdraw_all(&self) {
        debug!("{}:", function_name!());
        self.inner.force_write().withdrawals += 1;
    }

    fn pump(&self, duration: Duration) {
        debug!("{}: {duration:?}", function_name!());
        self.inner.force_write().pumps.push(duration);
    }
}

/// A strategy with a fixed outcome, logging the order it ran in.
struct MockStrategy {
    kind: StrategyKind,
    outcome: Attempt,
    log: Arc<RwLock<Vec<StrategyKind>>>,
}

impl ResolutionStrategy for MockStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn attempt(&self, _ctx: &mut ResolutionContext<'_>) -> Attempt {
        self.log.force_write().push(self.kind);
        self.outcome
    }
}

fn host_process() -> HostProcess {
    HostProcess {
        pid: TEST_PROCESS_ID,
        bundle_id: TEST_BUNDLE_ID.to_string(),
        name: Some(TEST_APP_NAME.to_string()),
    }
}

fn request(path: Option<&str>, name: Option<&str>) -> FocusRequest {
    FocusRequest::new(TEST_BUNDLE_ID, path, name, None)
}

/// Writes an app command config mapping the test host to `template`.
fn app_commands(dir: &std::path::Path, template: &str) -> CommandInvoker {
    let config = dir.join(APP_COMMANDS_FILE_NAME);
    let commands = HashMap::from([(TEST_BUNDLE_ID, template)]);
    fs::write(&config, serde_json::to_string(&commands).unwrap()).unwrap();
    CommandInvoker::new(config)
}

fn no_app_commands(dir: &std::path::Path) -> CommandInvoker {
    CommandInvoker::new(dir.join(APP_COMMANDS_FILE_NAME))
}

/// The standard escalation, with the direct raise backoff removed.
fn resolver<'a>(scripts: &'a ScriptBridge<'a>, commands: &'a CommandInvoker) -> WindowResolver<'a> {
    WindowResolver::new(vec![
        Box::new(DirectRaise::new(2, Duration::ZERO)),
        Box::new(ExternalCommand::new(commands)),
        Box::new(ScriptByName::new(scripts)),
        Box::new(ScriptGeneric::new(scripts)),
    ])
}

#[test]
fn test_resolver_stops_at_first_success() {
    setup_logging();
    let log = Arc::new(RwLock::new(vec![]));
    let strategy = |kind, outcome| -> Box<dyn ResolutionStrategy> {
        Box::new(MockStrategy {
            kind,
            outcome,
            log: log.clone(),
        })
    };
    let resolver = WindowResolver::new(vec![
        strategy(StrategyKind::DirectRaise, Attempt::NotApplicable),
        strategy(StrategyKind::ExternalCommand, Attempt::Failed),
        strategy(StrategyKind::ScriptByName, Attempt::Succeeded),
        strategy(StrategyKind::ScriptGeneric, Attempt::Succeeded),
    ]);

    let desktop = MockDesktop::new(true);
    let resolution = resolver.resolve(
        &desktop,
        &request(Some("/work/api"), None),
        &host_process(),
    );

    assert_eq!(
        *log.force_read(),
        vec![
            StrategyKind::DirectRaise,
            StrategyKind::ExternalCommand,
            StrategyKind::ScriptByName
        ]
    );
    assert_eq!(resolution.focused_by, Some(StrategyKind::ScriptByName));
    assert_eq!(
        resolution.attempts,
        vec![
            (StrategyKind::DirectRaise, Attempt::NotApplicable),
            (StrategyKind::ExternalCommand, Attempt::Failed),
            (StrategyKind::ScriptByName, Attempt::Succeeded),
        ]
    );
}

#[test]
fn test_resolver_without_hints_runs_nothing() {
    setup_logging();
    let log = Arc::new(RwLock::new(vec![]));
    let resolver = WindowResolver::new(vec![Box::new(MockStrategy {
        kind: StrategyKind::DirectRaise,
        outcome: Attempt::Succeeded,
        log: log.clone(),
    })]);

    let desktop = MockDesktop::new(true);
    let resolution = resolver.resolve(&desktop, &request(None, Some("")), &host_process());

    assert_eq!(resolution, Resolution::default());
    assert!(log.force_read().is_empty());
}

#[test]
fn test_direct_raise_picks_best_window() {
    setup_logging();
    let desktop = MockDesktop::new(true)
        .with_ax_window("notes", None, true)
        .with_ax_window("api", Some("/work/api/src/main.rs"), true)
        .with_ax_window("api", None, true);
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());

    let resolution = resolver(&scripts, &commands).resolve(
        &desktop,
        &request(Some("/work/api"), Some("api")),
        &host_process(),
    );

    assert_eq!(resolution.focused_by, Some(StrategyKind::DirectRaise));
    assert_eq!(resolution.attempts.len(), 1);
    assert_eq!(desktop.raised(), vec!["api"]);
    assert_eq!(desktop.ax_enumerations(), 1);
    assert_eq!(desktop.system_enumerations(), 0);
    assert!(runner.sources().is_empty());
}

#[test]
fn test_direct_raise_retries_once() {
    setup_logging();
    let request = request(Some("/work/api"), Some("api"));
    let process = host_process();

    // Windows of a freshly launched host show up on the second round.
    let desktop = MockDesktop::new(true)
        .with_ax_window("api", None, true)
        .with_ax_empty_rounds(1);
    let mut ctx = ResolutionContext::new(&desktop, &request, &process);
    let strategy = DirectRaise::new(2, Duration::ZERO);
    assert_eq!(strategy.attempt(&mut ctx), Attempt::Succeeded);
    assert_eq!(desktop.ax_enumerations(), 2);

    // Never more than two rounds, even when every raise fails.
    let desktop = MockDesktop::new(true).with_ax_window("api", None, false);
    let mut ctx = ResolutionContext::new(&desktop, &request, &process);
    assert_eq!(strategy.attempt(&mut ctx), Attempt::Failed);
    assert_eq!(desktop.ax_enumerations(), 2);
    assert!(desktop.raised().is_empty());

    // Nothing to enumerate at all.
    let desktop = MockDesktop::new(true);
    let mut ctx = ResolutionContext::new(&desktop, &request, &process);
    assert_eq!(strategy.attempt(&mut ctx), Attempt::NotApplicable);
    assert_eq!(desktop.ax_enumerations(), 2);
}

#[test]
fn test_direct_raise_ignores_unmatched_windows() {
    setup_logging();
    let desktop = MockDesktop::new(true).with_ax_window("notes", None, true);
    let request = request(Some("/work/api"), Some("api"));
    let process = host_process();
    let mut ctx = ResolutionContext::new(&desktop, &request, &process);

    assert_eq!(
        DirectRaise::new(2, Duration::ZERO).attempt(&mut ctx),
        Attempt::Failed
    );
    assert!(desktop.raised().is_empty());
}

#[test]
fn test_ancestor_window_runs_command_on_workspace_root() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("opened");
    let commands = app_commands(
        dir.path(),
        &format!("printf '%s' {{path}} > '{}'", out.display()),
    );
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);

    // No permission, so only the system window list sees the `.claude` window.
    let desktop = MockDesktop::new(false).with_system_window(".claude");
    let resolution = resolver(&scripts, &commands).resolve(
        &desktop,
        &request(Some("/Users/bob/.claude/repos/app"), Some("app")),
        &host_process(),
    );

    assert_eq!(resolution.focused_by, Some(StrategyKind::ExternalCommand));
    assert_eq!(
        resolution.attempts,
        vec![
            (StrategyKind::DirectRaise, Attempt::NotApplicable),
            (StrategyKind::ExternalCommand, Attempt::Succeeded),
        ]
    );
    assert_eq!(fs::read_to_string(&out).unwrap(), "/Users/bob/.claude");
    assert_eq!(desktop.ax_enumerations(), 0);
    assert!(runner.sources().is_empty());
}

#[test]
fn test_direct_match_runs_command_on_project_path() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("opened");
    let commands = app_commands(
        dir.path(),
        &format!("printf '%s' {{path}} > '{}'", out.display()),
    );
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);

    let desktop = MockDesktop::new(false).with_system_window("app");
    let resolution = resolver(&scripts, &commands).resolve(
        &desktop,
        &request(Some("/Users/bob/.claude/repos/app"), Some("app")),
        &host_process(),
    );

    assert_eq!(resolution.focused_by, Some(StrategyKind::ExternalCommand));
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "/Users/bob/.claude/repos/app"
    );
}

#[test]
fn test_weak_match_never_runs_command() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let commands = app_commands(dir.path(), &format!("touch '{}'", marker.display()));
    let runner = MockScriptRunner::replying(vec![
        Ok("not_found\n".to_string()),
        Ok("fallback\n".to_string()),
    ]);
    let scripts = ScriptBridge::new(&runner);

    // A partial title match scores 25, below the command threshold.
    let desktop = MockDesktop::new(false).with_system_window("myproj — Editor");
    let resolution = resolver(&scripts, &commands).resolve(
        &desktop,
        &request(Some("/work/myproj"), Some("myproj")),
        &host_process(),
    );

    assert!(!marker.exists());
    assert_eq!(desktop.system_enumerations(), 1);
    assert_eq!(
        resolution.attempts,
        vec![
            (StrategyKind::DirectRaise, Attempt::NotApplicable),
            (StrategyKind::ExternalCommand, Attempt::NotApplicable),
            (StrategyKind::ScriptByName, Attempt::Failed),
            (StrategyKind::ScriptGeneric, Attempt::Succeeded),
        ]
    );
    let sources = runner.sources();
    assert_eq!(sources.len(), 2);
    assert!(sources[0].contains("window \"myproj — Editor\""));
    assert!(sources[1].contains("name of w contains \"myproj\""));
    assert!(sources[1].contains("name of w contains \"work\""));
}

#[test]
fn test_missing_permission_escalates_to_scripts() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::replying(vec![Ok("matched\n".to_string())]);
    let scripts = ScriptBridge::new(&runner);

    let desktop = MockDesktop::new(false)
        .with_ax_window("myproj", None, true)
        .with_system_window("Welcome")
        .with_system_window("myproj — Editor");
    let resolution = resolver(&scripts, &commands).resolve(
        &desktop,
        &request(Some("/work/myproj"), Some("myproj")),
        &host_process(),
    );

    assert_eq!(resolution.focused_by, Some(StrategyKind::ScriptByName));
    assert_eq!(
        resolution.attempts,
        vec![
            (StrategyKind::DirectRaise, Attempt::NotApplicable),
            (StrategyKind::ExternalCommand, Attempt::NotApplicable),
            (StrategyKind::ScriptByName, Attempt::Succeeded),
        ]
    );
    assert_eq!(desktop.ax_enumerations(), 0);
    assert_eq!(desktop.system_enumerations(), 1);
    assert_eq!(runner.sources().len(), 1);
    assert!(runner.sources()[0].contains(&format!("tell process \"{TEST_APP_NAME}\"")));
}

#[test]
fn test_script_errors_do_not_stop_escalation() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::replying(vec![
        Err(Error::Script("execution error: not allowed".to_string())),
        Ok("matched\n".to_string()),
    ]);
    let scripts = ScriptBridge::new(&runner);

    let desktop = MockDesktop::new(false).with_system_window("api");
    let resolution = resolver(&scripts, &commands).resolve(
        &desktop,
        &request(None, Some("api")),
        &host_process(),
    );

    assert_eq!(resolution.focused_by, Some(StrategyKind::ScriptGeneric));
    assert_eq!(
        resolution.attempts[2],
        (StrategyKind::ScriptByName, Attempt::Failed)
    );
}

#[test]
fn test_exhausted_strategies_leave_host_active() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::replying(vec![Ok("no_windows\n".to_string())]);
    let scripts = ScriptBridge::new(&runner);
    let desktop = MockDesktop::new(true)
        .with_ax_window("notes", None, true)
        .with_system_window("notes");
    let host = MockHost::running();
    let pipeline = FocusPipeline::new(&desktop, &host, resolver(&scripts, &commands));

    let outcome = pipeline.focus(&request(Some("/work/api"), Some("api")));

    let FocusOutcome::Activated(resolution) = outcome else {
        panic!("host should be active: {outcome:?}");
    };
    assert!(!resolution.is_resolved());
    assert_eq!(
        resolution.attempts,
        vec![
            (StrategyKind::DirectRaise, Attempt::Failed),
            (StrategyKind::ExternalCommand, Attempt::NotApplicable),
            (StrategyKind::ScriptByName, Attempt::NotApplicable),
            (StrategyKind::ScriptGeneric, Attempt::Failed),
        ]
    );
    assert_eq!(host.activations(), vec![TEST_BUNDLE_ID]);
    assert!(desktop.raised().is_empty());
}

#[test]
fn test_pipeline_activation() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);
    let desktop = MockDesktop::new(true).with_ax_window("api", None, true);

    // A host that cannot be found stops the pipeline before any window work.
    let host = MockHost::default();
    let pipeline = FocusPipeline::new(&desktop, &host, resolver(&scripts, &commands));
    let outcome = pipeline.focus(&request(Some("/work/api"), Some("api")));
    assert!(matches!(outcome, FocusOutcome::NotActivated));
    assert_eq!(desktop.prompts(), 0);
    assert_eq!(desktop.ax_enumerations(), 0);

    // Without hints the host is only activated.
    let host = MockHost::running();
    let pipeline = FocusPipeline::new(&desktop, &host, resolver(&scripts, &commands));
    let outcome = pipeline.focus(&request(None, None));
    assert!(
        matches!(outcome, FocusOutcome::Activated(ref resolution) if *resolution == Resolution::default())
    );
    assert_eq!(desktop.prompts(), 0);

    // With hints the permission is checked, prompting once, before resolving.
    let outcome = pipeline.focus(&request(Some("/work/api"), Some("api")));
    assert!(matches!(
        outcome,
        FocusOutcome::Activated(Resolution {
            focused_by: Some(StrategyKind::DirectRaise),
            ..
        })
    ));
    assert_eq!(desktop.prompts(), 1);
    assert_eq!(desktop.raised(), vec!["api"]);
}

#[test]
fn test_click_timeout() {
    setup_logging();
    let center = MockNotificationCenter::default();
    let bridge =
        ClickEventBridge::with_timing(&center, Duration::from_secs(60), Duration::from_millis(300));

    let outcome = bridge.run(|_| panic!("nothing was clicked"));

    assert!(matches!(outcome, ClickOutcome::TimedOut));
    let inner = center.inner.force_read();
    assert_eq!(inner.waits, vec![Duration::from_secs(60)]);
    assert_eq!(inner.withdrawals, 0);
    assert!(inner.pumps.is_empty());
}

#[test]
fn test_click_without_host() {
    setup_logging();
    let center = MockNotificationCenter::default().click(&[(keys::PROJECT_PATH, "/work/api")]);
    let bridge = ClickEventBridge::with_timing(&center, Duration::from_secs(1), Duration::ZERO);

    let outcome = bridge.run(|_| panic!("no host to focus"));

    assert!(matches!(outcome, ClickOutcome::NoHost));
    let inner = center.inner.force_read();
    assert_eq!(inner.withdrawals, 1);
    assert_eq!(inner.pumps, vec![Duration::ZERO]);
}

#[test]
fn test_click_runs_focus_once_and_cleans_up() {
    setup_logging();
    let center = MockNotificationCenter::default()
        .click(&[
            (keys::HOST_BUNDLE_ID, TEST_BUNDLE_ID),
            (keys::PROJECT_PATH, "/work/api"),
            (keys::PROJECT_NAME, "api"),
        ])
        .click(&[(keys::HOST_BUNDLE_ID, "com.apple.Terminal")]);
    let grace = Duration::from_millis(300);
    let bridge = ClickEventBridge::with_timing(&center, Duration::from_secs(1), grace);

    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);
    let desktop = MockDesktop::new(true).with_ax_window("api", None, true);
    let host = MockHost::running();
    let pipeline = FocusPipeline::new(&desktop, &host, resolver(&scripts, &commands));

    let outcome = bridge.run(|request| pipeline.focus(request));

    assert!(matches!(
        outcome,
        ClickOutcome::Handled(FocusOutcome::Activated(Resolution {
            focused_by: Some(StrategyKind::DirectRaise),
            ..
        }))
    ));
    assert_eq!(host.activations(), vec![TEST_BUNDLE_ID]);
    let inner = center.inner.force_read();
    assert_eq!(inner.waits.len(), 1);
    assert_eq!(inner.clicks.len(), 1);
    assert_eq!(inner.withdrawals, 1);
    assert_eq!(inner.pumps, vec![grace]);
}

#[test]
fn test_posted_notification_carries_focus_metadata() {
    setup_logging();
    let args = crate::cli::parse(
        "claude-notifier",
        &[
            "--host-bundle-id",
            TEST_BUNDLE_ID,
            "--project-path",
            "/work/api",
            "--project-name",
            "api",
        ]
        .map(str::to_string),
    )
    .unwrap();
    let center = MockNotificationCenter::default();

    let notification = Notification::new(&args, None);
    assert!(center.post(&notification).may_be_clicked());

    let posted = center.inner.force_read().posted[0].clone();
    let clicked = ClickEvent {
        user_info: posted.user_info,
    }
    .focus_request()
    .unwrap();
    assert_eq!(clicked, request(Some("/work/api"), Some("api")));
}

fn raw_args(args: &[&str]) -> Vec<String> {
    args.iter().map(ToString::to_string).collect()
}

#[test]
fn test_relaunch_handles_pending_click() {
    setup_logging();
    let center = MockNotificationCenter::default().click(&[
        (keys::HOST_BUNDLE_ID, TEST_BUNDLE_ID),
        (keys::PROJECT_NAME, "api"),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);
    let desktop = MockDesktop::new(true).with_ax_window("api", None, true);
    let host = MockHost::running();
    let pipeline = FocusPipeline::new(&desktop, &host, resolver(&scripts, &commands));

    let args = raw_args(&["-psn_0_1"]);
    let outcome = crate::run(
        "claude-notifier",
        &args,
        Invocation::scan(&args),
        &center,
        &pipeline,
    );

    assert!(matches!(
        outcome,
        Some(ClickOutcome::Handled(FocusOutcome::Activated(_)))
    ));
    assert_eq!(host.activations(), vec![TEST_BUNDLE_ID]);
    assert_eq!(desktop.raised(), vec!["api"]);
    let inner = center.inner.force_read();
    assert_eq!(inner.waits, vec![crate::config::RELAUNCH_DELAY]);
    assert!(inner.posted.is_empty());
    assert_eq!(inner.withdrawals, 1);
}

#[test]
fn test_unrecognized_arguments_post_nothing() {
    setup_logging();
    let center =
        MockNotificationCenter::default().click(&[(keys::HOST_BUNDLE_ID, TEST_BUNDLE_ID)]);
    let dir = tempfile::tempdir().unwrap();
    let commands = no_app_commands(dir.path());
    let runner = MockScriptRunner::default();
    let scripts = ScriptBridge::new(&runner);
    let desktop = MockDesktop::new(true);
    let host = MockHost::running();
    let pipeline = FocusPipeline::new(&desktop, &host, resolver(&scripts, &commands));

    let args = raw_args(&["--verbose", "stray"]);
    let outcome = crate::run(
        "claude-notifier",
        &args,
        Invocation::scan(&args),
        &center,
        &pipeline,
    );

    assert!(outcome.is_none());
    assert!(host.activations().is_empty());
    let inner = center.inner.force_read();
    assert!(inner.posted.is_empty());
    assert!(inner.waits.is_empty());
    assert!(inner.pumps.is_empty());
}
