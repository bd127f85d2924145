use objc2_core_foundation::{CFArray, CFDictionary, CFNumber, CFString, CFType};
use objc2_core_graphics::{
    CGWindowID, CGWindowListCopyWindowInfo, CGWindowListOption, kCGWindowName, kCGWindowOwnerPID,
};
use tracing::{Level, instrument, trace, warn};

use crate::focus::WindowCandidate;
use crate::platform::Pid;

const NULL_WINDOW_ID: CGWindowID = 0;

/// Windows of `pid` from the system window list, across all Spaces. The list reports
/// titles only; untitled windows are skipped.
#[instrument(level = Level::DEBUG)]
pub fn windows_of(pid: Pid) -> Vec<WindowCandidate> {
    let options = CGWindowListOption::OptionAll | CGWindowListOption::ExcludeDesktopElements;
    let Some(list) = (unsafe { CGWindowListCopyWindowInfo(options, NULL_WINDOW_ID) }) else {
        warn!("window list is unavailable");
        return Vec::new();
    };
    let list: &CFArray<CFDictionary<CFString, CFType>> = unsafe { list.cast_unchecked() };

    let (name_key, pid_key) = unsafe { (kCGWindowName, kCGWindowOwnerPID) };
    let windows = list
        .iter()
        .filter(|info| {
            info.get(pid_key)
                .and_then(|owner| owner.downcast_ref::<CFNumber>().and_then(CFNumber::as_i32))
                == Some(pid)
        })
        .filter_map(|info| {
            let title = info
                .get(name_key)?
                .downcast_ref::<CFString>()
                .map(ToString::to_string)
                .filter(|title| !title.is_empty())?;
            Some(WindowCandidate::new(Some(&title), None, pid))
        })
        .collect::<Vec<_>>();
    trace!("{} titled window(s) in the window list", windows.len());
    windows
}
