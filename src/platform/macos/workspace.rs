use block2::RcBlock;
use objc2_app_kit::{
    NSApplicationActivationOptions, NSRunningApplication, NSWorkspace, NSWorkspaceOpenConfiguration,
};
use objc2_foundation::{NSError, NSString};
use std::{sync::mpsc, time::Duration};
use tracing::{Level, debug, info, instrument, warn};

use crate::focus::{HostApi, HostProcess};

/// Activates running applications through `NSRunningApplication`, launching them through
/// `NSWorkspace` when needed.
#[derive(Debug)]
pub struct HostOS {
    launch_timeout: Duration,
}

impl HostOS {
    pub fn new(launch_timeout: Duration) -> Self {
        Self { launch_timeout }
    }

    fn launch(&self, bundle_id: &str) -> Option<HostProcess> {
        let workspace = NSWorkspace::sharedWorkspace();
        let Some(url) =
            workspace.URLForApplicationWithBundleIdentifier(&NSString::from_str(bundle_id))
        else {
            warn!("no application installed for {bundle_id}");
            return None;
        };

        let (tx, rx) = mpsc::channel();
        let owned_id = bundle_id.to_string();
        let completion = RcBlock::new(
            move |app: *mut NSRunningApplication, error: *mut NSError| {
                if let Some(error) = unsafe { error.as_ref() } {
                    warn!("launch failed: {}", error.localizedDescription());
                }
                let process = unsafe { app.as_ref() }.map(|app| HostProcess {
                    pid: app.processIdentifier(),
                    bundle_id: owned_id.clone(),
                    name: app.localizedName().map(|name| name.to_string()),
                });
                let _ = tx.send(process);
            },
        );
        let configuration = unsafe { NSWorkspaceOpenConfiguration::configuration() };
        unsafe {
            workspace.openApplicationAtURL_configuration_completionHandler(
                &url,
                &configuration,
                Some(&*completion),
            );
        }

        match rx.recv_timeout(self.launch_timeout) {
            Ok(process) => process,
            Err(_) => {
                warn!("{bundle_id} did not launch within {:?}", self.launch_timeout);
                None
            }
        }
    }
}

impl HostApi for HostOS {
    #[instrument(level = Level::DEBUG, skip(self))]
    fn activate(&self, bundle_id: &str) -> Option<HostProcess> {
        let running =
            NSRunningApplication::runningApplicationsWithBundleIdentifier(&NSString::from_str(
                bundle_id,
            ));
        if let Some(app) = running.firstObject() {
            #[allow(deprecated)]
            let activated =
                app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps);
            debug!("activated running {bundle_id}: {activated}");
            return Some(HostProcess {
                pid: app.processIdentifier(),
                bundle_id: bundle_id.to_string(),
                name: app.localizedName().map(|name| name.to_string()),
            });
        }

        info!("{bundle_id} is not running, launching it");
        self.launch(bundle_id)
    }
}
