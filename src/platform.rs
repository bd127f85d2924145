//! Operating system bindings behind the engine's traits.
//!
//! Only macOS has real implementations. Elsewhere the same types exist but report that
//! nothing is available, which keeps the binary and the engine's tests building everywhere.

pub type Pid = libc::pid_t;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{DesktopOS, HostOS, NotificationCenterOS};

#[cfg(not(target_os = "macos"))]
mod unsupported;
#[cfg(not(target_os = "macos"))]
pub use unsupported::{DesktopOS, HostOS, NotificationCenterOS};
