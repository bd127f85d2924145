//! Window targeting: find the host application's window that belongs to a project and
//! bring it to the front.
//!
//! The platform is reached only through [`DesktopApi`] and [`HostApi`], so the whole engine
//! can be driven by the mocks in `tests.rs`.

use derive_more::{DerefMut, with_trait::Deref};
use std::collections::HashMap;
use std::fmt;
use tracing::{Level, debug, info, instrument, warn};

use crate::errors::Result;
use crate::notification::keys;
use crate::platform::Pid;

pub use resolver::{Attempt, Resolution, ResolutionContext, ResolutionStrategy, WindowResolver};
pub use strategies::{DirectRaise, ExternalCommand, ScriptByName, ScriptGeneric, StrategyKind};

mod resolver;
pub mod scoring;
mod strategies;

/// Which window to focus, rebuilt from the metadata of a clicked notification.
/// Empty strings are treated as absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusRequest {
    host_bundle_id: String,
    project_path: Option<String>,
    project_name: Option<String>,
    tty: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}

impl FocusRequest {
    pub fn new(
        host_bundle_id: &str,
        project_path: Option<&str>,
        project_name: Option<&str>,
        tty: Option<&str>,
    ) -> Self {
        Self {
            host_bundle_id: host_bundle_id.to_string(),
            project_path: non_empty(project_path),
            project_name: non_empty(project_name),
            tty: non_empty(tty),
        }
    }

    /// Rebuilds a request from notification user info.
    ///
    /// # Returns
    ///
    /// `None` if the user info carries no host application identifier.
    pub fn from_user_info(user_info: &HashMap<String, String>) -> Option<Self> {
        let get = |key: &str| user_info.get(key).map(String::as_str);
        let host = get(keys::HOST_BUNDLE_ID).filter(|host| !host.is_empty())?;
        Some(Self::new(
            host,
            get(keys::PROJECT_PATH),
            get(keys::PROJECT_NAME),
            get(keys::TTY),
        ))
    }

    pub fn host_bundle_id(&self) -> &str {
        &self.host_bundle_id
    }

    pub fn project_path(&self) -> Option<&str> {
        self.project_path.as_deref()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn tty(&self) -> Option<&str> {
        self.tty.as_deref()
    }

    /// True when there is anything to match windows against.
    pub fn has_hints(&self) -> bool {
        self.project_path.is_some() || self.project_name.is_some()
    }
}

/// Attributes of one window as seen by an enumeration backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowCandidate {
    pub title: Option<String>,
    /// Document or content path, only the accessibility tree reports it.
    pub document: Option<String>,
    pub owner_pid: Pid,
}

impl WindowCandidate {
    pub fn new(title: Option<&str>, document: Option<&str>, owner_pid: Pid) -> Self {
        Self {
            title: title.map(str::to_string),
            document: document.map(str::to_string),
            owner_pid,
        }
    }
}

/// A window reachable through the accessibility tree, which can be raised directly.
pub trait WindowApi {
    fn title(&self) -> Option<String>;
    fn document(&self) -> Option<String>;
    fn pid(&self) -> Pid;
    /// Performs the raise action on the window.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the platform reported success, otherwise `Err(Error)`.
    fn raise(&self) -> Result<()>;
}

#[derive(Deref, DerefMut)]
pub struct Window(Box<dyn WindowApi>);

impl Window {
    pub fn new(window: Box<dyn WindowApi>) -> Self {
        Window(window)
    }

    pub fn candidate(&self) -> WindowCandidate {
        WindowCandidate {
            title: self.title(),
            document: self.document(),
            owner_pid: self.pid(),
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("title", &self.title())
            .field("pid", &self.pid())
            .finish()
    }
}

/// Window enumeration backends.
pub trait DesktopApi {
    /// Checks the accessibility permission.
    ///
    /// # Arguments
    ///
    /// * `prompt` - Ask the system to show its permission dialog when not yet granted.
    fn is_trusted(&self, prompt: bool) -> bool;

    /// Windows of `pid` from the accessibility tree, with document paths where available.
    /// Empty when the permission is missing.
    fn accessibility_windows(&self, pid: Pid) -> Vec<Window>;

    /// Windows of `pid` from the system-wide window list. Titles only, but includes
    /// windows on other Spaces and needs no permission.
    fn system_windows(&self, pid: Pid) -> Vec<WindowCandidate>;
}

/// A running instance of the host application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostProcess {
    pub pid: Pid,
    pub bundle_id: String,
    /// Localized name as reported by the running application.
    pub name: Option<String>,
}

/// Process names of well known hosts, used when the running application reports none.
const KNOWN_APPS: [(&str, &str); 4] = [
    ("dev.zed.Zed", "Zed"),
    ("com.microsoft.VSCode", "Code"),
    ("com.apple.Terminal", "Terminal"),
    ("com.googlecode.iterm2", "iTerm2"),
];

impl HostProcess {
    /// Process name as understood by the scripting bridge.
    pub fn app_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty()).or_else(|| {
            KNOWN_APPS
                .iter()
                .find_map(|(id, name)| (*id == self.bundle_id).then_some(*name))
        })
    }
}

/// Finds or launches the host application and brings it to the front.
pub trait HostApi {
    /// # Returns
    ///
    /// The activated process, or `None` if it could not be located or launched in time.
    fn activate(&self, bundle_id: &str) -> Option<HostProcess>;
}

/// Result of handling one focus request.
#[derive(Debug)]
pub enum FocusOutcome {
    /// The host application could not be activated; no window strategy ran.
    NotActivated,
    /// The application is frontmost; the resolution says whether a specific window followed.
    Activated(Resolution),
}

/// Host activation followed by window resolution.
pub struct FocusPipeline<'a> {
    desktop: &'a dyn DesktopApi,
    host: &'a dyn HostApi,
    resolver: WindowResolver<'a>,
}

impl<'a> FocusPipeline<'a> {
    pub fn new(
        desktop: &'a dyn DesktopApi,
        host: &'a dyn HostApi,
        resolver: WindowResolver<'a>,
    ) -> Self {
        Self {
            desktop,
            host,
            resolver,
        }
    }

    #[instrument(level = Level::DEBUG, skip(self))]
    pub fn focus(&self, request: &FocusRequest) -> FocusOutcome {
        let Some(process) = self.host.activate(request.host_bundle_id()) else {
            warn!("could not activate {}", request.host_bundle_id());
            return FocusOutcome::NotActivated;
        };
        debug!(
            "activated {} pid {} tty {:?}",
            process.bundle_id,
            process.pid,
            request.tty()
        );

        if !request.has_hints() {
            info!("no project hint, skipping window focus");
            return FocusOutcome::Activated(Resolution::default());
        }

        if !self.desktop.is_trusted(true) {
            warn!("accessibility permission not granted, direct window raise unavailable");
        }

        let resolution = self.resolver.resolve(self.desktop, request, &process);
        if let Some(kind) = resolution.focused_by {
            info!("focused window of {} via {kind}", process.bundle_id);
        }
        if !resolution.is_resolved() {
            warn!(
                "{} is active but no specific window could be focused",
                process.bundle_id
            );
        }
        FocusOutcome::Activated(resolution)
    }
}
