use scopeguard::defer;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{CLICK_TIMEOUT, EXIT_GRACE};
use crate::focus::{FocusOutcome, FocusRequest};
use crate::notification::NotificationCenterApi;

#[derive(Debug)]
pub enum ClickOutcome {
    /// Nobody clicked before the deadline.
    TimedOut,
    /// The clicked notification carried no host application.
    NoHost,
    /// The focus pipeline ran for the clicked notification.
    Handled(FocusOutcome),
}

/// Keeps the process alive until the notification is clicked, hands the click to the
/// focus pipeline and cleans up afterwards.
pub struct ClickEventBridge<'a> {
    center: &'a dyn NotificationCenterApi,
    timeout: Duration,
    grace: Duration,
}

impl<'a> ClickEventBridge<'a> {
    pub fn new(center: &'a dyn NotificationCenterApi) -> Self {
        Self::with_timing(center, CLICK_TIMEOUT, EXIT_GRACE)
    }

    pub fn with_timing(
        center: &'a dyn NotificationCenterApi,
        timeout: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            center,
            timeout,
            grace,
        }
    }

    /// Waits for the first click and runs `focus` for it, at most once.
    ///
    /// # Arguments
    ///
    /// * `focus` - The focus pipeline, called with the request rebuilt from the click.
    ///
    /// # Returns
    ///
    /// What happened. Delivered notifications are withdrawn after any click.
    pub fn run<F>(&self, focus: F) -> ClickOutcome
    where
        F: FnOnce(&FocusRequest) -> FocusOutcome,
    {
        let Some(click) = self.center.wait_for_click(self.timeout) else {
            info!("no click within {:?}, exiting", self.timeout);
            return ClickOutcome::TimedOut;
        };

        defer! {
            self.center.withdraw_all();
            self.center.pump(self.grace);
        }

        let Some(request) = click.focus_request() else {
            warn!("clicked notification has no host application");
            return ClickOutcome::NoHost;
        };
        info!("notification clicked, focusing {}", request.host_bundle_id());
        ClickOutcome::Handled(focus(&request))
    }
}
