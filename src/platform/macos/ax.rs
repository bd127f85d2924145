use accessibility_sys::{
    AXError, AXIsProcessTrusted, AXIsProcessTrustedWithOptions, AXUIElementRef,
    kAXDocumentAttribute, kAXErrorSuccess, kAXRaiseAction, kAXTitleAttribute,
    kAXTrustedCheckOptionPrompt, kAXWindowsAttribute,
};
use core::ptr::NonNull;
use objc2_core_foundation::{
    CFArray, CFDictionary, CFRetained, CFString, CFType, CFURL, kCFBooleanTrue,
};
use std::ptr::null_mut;
use stdext::function_name;
use tracing::{Level, debug, instrument, trace};

use crate::errors::{Error, Result};
use crate::focus::{Window, WindowApi};
use crate::platform::Pid;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXUIElementCreateApplication(pid: Pid) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: &CFString,
        value: *mut *mut CFType,
    ) -> AXError;
    fn AXUIElementPerformAction(element: AXUIElementRef, action: &CFString) -> AXError;
}

trait AxResult {
    fn to_result(self, caller: &str) -> Result<()>;
}

impl AxResult for AXError {
    fn to_result(self, caller: &str) -> Result<()> {
        if self == kAXErrorSuccess {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "{caller}: accessibility call failed with {self}."
            )))
        }
    }
}

/// Checks if the process has Accessibility privileges.
///
/// # Arguments
///
/// * `prompt` - Ask the system to show the permission dialog if not granted yet.
///
/// # Returns
///
/// `true` if Accessibility privileges are granted, `false` otherwise.
pub fn is_trusted(prompt: bool) -> bool {
    if !prompt {
        return unsafe { AXIsProcessTrusted() };
    }
    unsafe {
        let (Some(key), Some(value)) = (
            kAXTrustedCheckOptionPrompt.cast::<CFString>().as_ref(),
            kCFBooleanTrue,
        ) else {
            return AXIsProcessTrusted();
        };
        let opts = CFDictionary::from_slices(&[key], &[value]);
        AXIsProcessTrustedWithOptions((&raw const *opts).cast())
    }
}

/// An owned reference to an accessibility element.
#[derive(Debug)]
struct AxElement(CFRetained<CFType>);

impl AxElement {
    fn application(pid: Pid) -> Result<Self> {
        let raw = unsafe { AXUIElementCreateApplication(pid) };
        NonNull::new(raw.cast::<CFType>())
            .map(|ptr| AxElement(unsafe { CFRetained::from_raw(ptr) }))
            .ok_or(Error::NotFound(format!(
                "{}: no accessibility element for pid {pid}.",
                function_name!()
            )))
    }

    fn as_ptr(&self) -> AXUIElementRef {
        (&raw const *self.0).cast_mut().cast()
    }

    fn attribute(&self, name: &'static str) -> Result<CFRetained<CFType>> {
        let mut value: *mut CFType = null_mut();
        unsafe {
            AXUIElementCopyAttributeValue(
                self.as_ptr(),
                &CFString::from_static_str(name),
                &mut value,
            )
        }
        .to_result(function_name!())?;
        NonNull::new(value)
            .map(|ptr| unsafe { CFRetained::from_raw(ptr) })
            .ok_or(Error::NotFound(format!(
                "{}: attribute {name} is empty.",
                function_name!()
            )))
    }

    fn string_attribute(&self, name: &'static str) -> Option<String> {
        let value = self.attribute(name).ok()?;
        string_value(&value)
    }

    fn children(&self, name: &'static str) -> Result<Vec<AxElement>> {
        let value = self.attribute(name)?;
        let array = value.downcast_ref::<CFArray>().ok_or(Error::InvalidInput(format!(
            "{}: attribute {name} is not an array.",
            function_name!()
        )))?;
        let array = unsafe { array.cast_unchecked::<CFType>() };
        Ok(array.iter().map(AxElement).collect())
    }

    fn perform(&self, action: &'static str) -> Result<()> {
        unsafe { AXUIElementPerformAction(self.as_ptr(), &CFString::from_static_str(action)) }
            .to_result(function_name!())
    }
}

/// Text of an attribute value. File URLs, as some hosts report for documents, become their
/// path.
fn string_value(value: &CFType) -> Option<String> {
    if let Some(text) = value.downcast_ref::<CFString>() {
        return Some(text.to_string());
    }
    value
        .downcast_ref::<CFURL>()
        .and_then(CFURL::to_file_path)
        .map(|path| path.to_string_lossy().into_owned())
}

/// A window of the accessibility tree.
#[derive(Debug)]
pub struct AxWindow {
    element: AxElement,
    pid: Pid,
}

impl WindowApi for AxWindow {
    fn title(&self) -> Option<String> {
        self.element.string_attribute(kAXTitleAttribute)
    }

    /// The document shown in the window, as a path.
    fn document(&self) -> Option<String> {
        self.element.string_attribute(kAXDocumentAttribute)
    }

    fn pid(&self) -> Pid {
        self.pid
    }

    fn raise(&self) -> Result<()> {
        self.element.perform(kAXRaiseAction)
    }
}

/// Enumerates the windows of an application through the accessibility tree.
///
/// # Returns
///
/// The windows in the order the application reports them, empty when the permission is
/// missing or the application exposes none.
#[instrument(level = Level::DEBUG)]
pub fn application_windows(pid: Pid) -> Vec<Window> {
    if !is_trusted(false) {
        debug!("not trusted, skipping accessibility enumeration");
        return Vec::new();
    }
    let windows = AxElement::application(pid).and_then(|app| app.children(kAXWindowsAttribute));
    match windows {
        Ok(windows) => {
            trace!("{} accessibility window(s)", windows.len());
            windows
                .into_iter()
                .map(|element| Window::new(Box::new(AxWindow { element, pid })))
                .collect()
        }
        Err(err) => {
            debug!("no accessibility windows: {err}");
            Vec::new()
        }
    }
}
