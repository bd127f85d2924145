use objc2::MainThreadMarker;
use objc2_app_kit::{NSApplication, NSEventMask};
use objc2_core_foundation::{CFRunLoop, CFRunLoopRunResult, kCFRunLoopDefaultMode};
use objc2_foundation::{NSDate, NSDefaultRunLoopMode};
use std::{
    thread,
    time::{Duration, Instant},
};

use super::Pid;
use crate::config::RUN_LOOP_SLICE;
use crate::focus::{DesktopApi, Window, WindowCandidate};

mod ax;
mod user_notifications;
mod window_list;
mod workspace;

pub use user_notifications::NotificationCenterOS;
pub use workspace::HostOS;

/// Accessibility tree plus the system window list.
#[derive(Debug, Default)]
pub struct DesktopOS;

impl DesktopApi for DesktopOS {
    fn is_trusted(&self, prompt: bool) -> bool {
        ax::is_trusted(prompt)
    }

    fn accessibility_windows(&self, pid: Pid) -> Vec<Window> {
        ax::application_windows(pid)
    }

    fn system_windows(&self, pid: Pid) -> Vec<WindowCandidate> {
        window_list::windows_of(pid)
    }
}

/// Services the main run loop for `duration`, so callbacks dispatched to the main queue
/// get a chance to run. On the main thread AppKit events are dequeued and dispatched the way
/// `NSApplication::run` does, which notification responses rely on.
pub(crate) fn run_loop_for(duration: Duration) {
    let app = MainThreadMarker::new().map(NSApplication::sharedApplication);
    let deadline = Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let slice = remaining.min(RUN_LOOP_SLICE);
        match &app {
            Some(app) => dispatch_events(app, slice),
            None => run_current_loop(slice),
        }
    }
}

/// Waits up to `slice` for the next AppKit event and dispatches it.
fn dispatch_events(app: &NSApplication, slice: Duration) {
    let until = NSDate::dateWithTimeIntervalSinceNow(slice.as_secs_f64());
    let event = unsafe {
        app.nextEventMatchingMask_untilDate_inMode_dequeue(
            NSEventMask::Any,
            Some(&until),
            NSDefaultRunLoopMode,
            true,
        )
    };
    if let Some(event) = event {
        app.sendEvent(&event);
    }
}

fn run_current_loop(slice: Duration) {
    let result =
        unsafe { CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, slice.as_secs_f64(), true) };
    // Without any sources the run loop returns at once.
    if result == CFRunLoopRunResult::Finished {
        thread::sleep(slice);
    }
}
