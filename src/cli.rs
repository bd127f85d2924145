use clap::Parser;
use std::{path::PathBuf, time::Duration};
use tracing::debug;

use crate::notification::{DEFAULT_SOUND, Status};

/// Prefix of the process serial number argument LaunchServices adds to app launches.
const PSN_PREFIX: &str = "-psn_";

/// Flags taking a value, as long form and optional short form.
const VALUE_FLAGS: [(&str, Option<&str>); 11] = [
    ("--title", Some("-t")),
    ("--message", Some("-m")),
    ("--sound", Some("-s")),
    ("--sound-file", Some("-f")),
    ("--project-path", None),
    ("--project-name", None),
    ("--host-bundle-id", None),
    ("--tty", None),
    ("--status", None),
    ("--subtitle", None),
    ("--duration", None),
];

/// Flags without a value.
const SWITCH_FLAGS: [&str; 3] = ["--no-sound", "-h", "--help"];

fn long_form(flag: &str) -> Option<&'static str> {
    VALUE_FLAGS
        .iter()
        .find_map(|(long, short)| (flag == *long || *short == Some(flag)).then_some(*long))
}

/// Splits an inline `--flag=value` argument.
fn inline_value(arg: &str) -> Option<(&'static str, &str)> {
    let (flag, value) = arg.split_once('=')?;
    long_form(flag).map(|long| (long, value))
}

/// Sends a desktop notification and, when it is clicked, brings the originating
/// window back to the front.
#[derive(Clone, Debug, Parser)]
#[command(
    about = clap::crate_description!(),
    after_help = "System sounds: Basso, Blow, Bottle, Frog, Funk, Glass, Hero, Morse,\n\
                  Ping, Pop, Purr, Sosumi, Submarine, Tink\n\n\
                  Custom sound files are copied to ~/Library/Sounds/."
)]
pub struct Args {
    /// Notification title.
    #[arg(short, long, default_value = "Claude Code")]
    pub title: String,

    /// Notification message.
    #[arg(short, long, default_value = "Task completed")]
    pub message: String,

    /// System sound name.
    #[arg(short, long, default_value = DEFAULT_SOUND)]
    pub sound: String,

    /// Custom sound file (.aiff, .wav, .caf, .m4a).
    #[arg(short = 'f', long, value_name = "PATH")]
    pub sound_file: Option<PathBuf>,

    /// Disable the notification sound.
    #[arg(long)]
    pub no_sound: bool,

    /// Full project path.
    #[arg(long, value_name = "PATH")]
    pub project_path: Option<String>,

    /// Project folder name.
    #[arg(long, value_name = "NAME")]
    pub project_name: Option<String>,

    /// Bundle identifier of the host application, e.g. dev.zed.Zed.
    #[arg(long, value_name = "ID")]
    pub host_bundle_id: Option<String>,

    /// Terminal device of the session, e.g. /dev/ttys003.
    #[arg(long)]
    pub tty: Option<String>,

    /// Task status: success, failure or warning.
    #[arg(long)]
    status: Option<String>,

    /// Notification subtitle.
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Task duration in seconds.
    #[arg(long, value_name = "SECONDS")]
    duration: Option<String>,
}

impl Args {
    /// The task status; unknown values are ignored.
    pub fn status(&self) -> Option<Status> {
        self.status.as_deref().and_then(|status| status.parse().ok())
    }

    /// The task duration; values that are not a whole number of seconds are ignored.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
            .as_deref()
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Values given on the command line that could not be understood.
    pub fn ignored_values(&self) -> Vec<String> {
        let mut ignored = Vec::new();
        if let Some(status) = &self.status
            && self.status().is_none()
        {
            ignored.push(format!("--status {status}"));
        }
        if let Some(duration) = &self.duration
            && self.duration().is_none()
        {
            ignored.push(format!("--duration {duration}"));
        }
        ignored
    }
}

/// What a first look at the raw arguments tells about this launch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    /// At least one known flag is present.
    pub recognized: bool,
    /// The process was started by LaunchServices, e.g. when a notification of an
    /// already exited notifier is clicked.
    pub launch_services: bool,
}

impl Invocation {
    pub fn scan(args: &[String]) -> Self {
        Self {
            recognized: args.iter().any(|arg| {
                long_form(arg).is_some()
                    || inline_value(arg).is_some()
                    || SWITCH_FLAGS.contains(&arg.as_str())
            }),
            launch_services: args.iter().any(|arg| arg.starts_with(PSN_PREFIX)),
        }
    }
}

/// Rewrites raw arguments into a form the parser accepts unconditionally: LaunchServices
/// arguments and unknown tokens are dropped, value flags become `--long=value` so values
/// starting with a dash survive, and a value flag without a value is dropped.
///
/// # Arguments
///
/// * `args` - Arguments without the program name.
///
/// # Returns
///
/// The normalized arguments, without the program name.
pub fn normalize(args: &[String]) -> Vec<String> {
    let mut normalized = Vec::new();
    let mut tokens = args.iter();
    while let Some(arg) = tokens.next() {
        if arg.starts_with(PSN_PREFIX) {
            continue;
        }
        if let Some((long, value)) = inline_value(arg) {
            normalized.push(format!("{long}={value}"));
        } else if let Some(long) = long_form(arg) {
            match tokens.next() {
                Some(value) => normalized.push(format!("{long}={value}")),
                None => debug!("{arg} has no value, ignoring it"),
            }
        } else if SWITCH_FLAGS.contains(&arg.as_str()) {
            normalized.push(arg.clone());
        } else {
            debug!("ignoring unknown argument {arg:?}");
        }
    }
    normalized
}

/// Parses raw arguments after [`normalize`].
///
/// # Returns
///
/// `Err(clap::Error)` only for help requests, which the caller prints.
pub fn parse(program: &str, args: &[String]) -> Result<Args, clap::Error> {
    Args::try_parse_from(std::iter::once(program.to_string()).chain(normalize(args)))
}
