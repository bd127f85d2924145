use std::{thread, time::Duration};
use tracing::warn;

use super::Pid;
use crate::focus::{DesktopApi, HostApi, HostProcess, Window, WindowCandidate};
use crate::notification::{ClickEvent, Delivery, Notification, NotificationCenterApi};

#[derive(Debug, Default)]
pub struct DesktopOS;

impl DesktopApi for DesktopOS {
    fn is_trusted(&self, _prompt: bool) -> bool {
        false
    }

    fn accessibility_windows(&self, _pid: Pid) -> Vec<Window> {
        Vec::new()
    }

    fn system_windows(&self, _pid: Pid) -> Vec<WindowCandidate> {
        Vec::new()
    }
}

#[derive(Debug)]
pub struct HostOS;

impl HostOS {
    pub fn new(_launch_timeout: Duration) -> Self {
        HostOS
    }
}

impl HostApi for HostOS {
    fn activate(&self, bundle_id: &str) -> Option<HostProcess> {
        warn!("cannot activate {bundle_id}: application activation is not supported here");
        None
    }
}

#[derive(Debug, Default)]
pub struct NotificationCenterOS;

impl NotificationCenterOS {
    pub fn new() -> Self {
        NotificationCenterOS
    }
}

impl NotificationCenterApi for NotificationCenterOS {
    fn post(&self, notification: &Notification) -> Delivery {
        warn!(
            "notifications are not supported here, dropping {:?}",
            notification.title
        );
        Delivery::Unsupported
    }

    fn wait_for_click(&self, _timeout: Duration) -> Option<ClickEvent> {
        None
    }

    fn withdraw_all(&self) {}

    fn pump(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
