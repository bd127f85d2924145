use std::env;
use tracing::{info, warn};

mod bridge;
mod cli;
mod click;
mod config;
mod errors;
mod focus;
mod history;
mod logging;
mod notification;
mod platform;
mod sound;

#[cfg(test)]
mod tests;

#[cfg(target_os = "macos")]
embed_plist::embed_info_plist!("../assets/Info.plist");

use bridge::command::CommandInvoker;
use bridge::script::{OsaScript, ScriptBridge};
use cli::Invocation;
use click::{ClickEventBridge, ClickOutcome};
use config::{
    EXIT_GRACE, LAUNCH_TIMEOUT, LOG_FILE_NAME, NOTIFIER_DIR, RELAUNCH_DELAY, SETTLE_DELAY,
};
use focus::{FocusPipeline, WindowResolver};
use history::NotificationRecord;
use notification::{Notification, NotificationCenterApi};
use platform::{DesktopOS, HostOS, NotificationCenterOS};

/// The main entry point of the notifier.
/// Posts one notification and, when it carries a host application, waits for a click and
/// focuses the originating window. Every outcome exits with status zero.
fn main() {
    logging::init(&NOTIFIER_DIR, LOG_FILE_NAME);
    info!("=== claude-notifier starting ===");
    let mut raw = env::args();
    let program = raw.next().unwrap_or_else(|| clap::crate_name!().to_string());
    let args = raw.collect::<Vec<_>>();
    info!("pid {} args {args:?}", std::process::id());

    let invocation = Invocation::scan(&args);
    if !invocation.recognized && !invocation.launch_services {
        info!("no recognized arguments, exiting without a notification");
        return;
    }

    // The delegate must be in place before a relaunch hands over its click.
    let center = NotificationCenterOS::new();
    let desktop = DesktopOS;
    let host = HostOS::new(LAUNCH_TIMEOUT);
    let runner = OsaScript;
    let scripts = ScriptBridge::new(&runner);
    let commands = CommandInvoker::new(config::app_commands_file());
    let pipeline = FocusPipeline::new(
        &desktop,
        &host,
        WindowResolver::standard(&scripts, &commands),
    );

    let outcome = run(&program, &args, invocation, &center, &pipeline);
    info!("done: {outcome:?}");
}

/// One invocation after the platform is set up.
///
/// # Arguments
///
/// * `program` - Program name for the parser.
/// * `args` - Raw arguments without the program name.
/// * `invocation` - The first look at `args`.
/// * `center` - Notification center to post to and wait on.
/// * `pipeline` - Runs for the clicked notification.
///
/// # Returns
///
/// The click handling outcome, or `None` when no click was waited for.
fn run(
    program: &str,
    args: &[String],
    invocation: Invocation,
    center: &dyn NotificationCenterApi,
    pipeline: &FocusPipeline<'_>,
) -> Option<ClickOutcome> {
    if !invocation.recognized {
        if !invocation.launch_services {
            return None;
        }
        info!("relaunched by the system, waiting for a pending click");
        let bridge = ClickEventBridge::with_timing(center, RELAUNCH_DELAY, EXIT_GRACE);
        return Some(bridge.run(|request| pipeline.focus(request)));
    }

    let args = match cli::parse(program, args) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return None;
        }
    };
    for ignored in args.ignored_values() {
        warn!("ignoring invalid value {ignored}");
    }

    if let Err(err) = history::append(&config::history_file(), &NotificationRecord::new(&args)) {
        warn!("history not written: {err}");
    }

    let custom_sound = args.sound_file.as_deref().and_then(|path| {
        let sounds_dir = config::sounds_dir()?;
        sound::install_custom_sound(path, &sounds_dir)
    });
    let notification = Notification::new(&args, custom_sound);
    let delivery = center.post(&notification);

    if !notification.has_host() {
        center.pump(SETTLE_DELAY);
        info!("no host application, exiting");
        return None;
    }
    if !delivery.may_be_clicked() {
        info!("notification not delivered ({delivery:?}), not waiting for a click");
        return None;
    }

    Some(ClickEventBridge::new(center).run(|request| pipeline.focus(request)))
}
