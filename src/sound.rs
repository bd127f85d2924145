use std::{
    fs::{copy, create_dir_all},
    path::Path,
};
use stdext::function_name;
use tracing::{info, warn};

use crate::errors::{Error, Result};

/// Audio formats the notification center can play.
const SOUND_EXTENSIONS: [&str; 5] = ["aiff", "aif", "wav", "caf", "m4a"];

/// Copies a custom sound file into the user's sound directory so notifications can refer
/// to it by name. An existing file of the same name is replaced.
///
/// # Arguments
///
/// * `source` - The sound file given on the command line.
/// * `sounds_dir` - Destination directory, created when missing.
///
/// # Returns
///
/// The sound name (the file stem), or `None` if the file could not be installed.
pub fn install_custom_sound(source: &Path, sounds_dir: &Path) -> Option<String> {
    match try_install(source, sounds_dir) {
        Ok(name) => {
            info!("installed sound {name} from {}", source.display());
            Some(name)
        }
        Err(err) => {
            warn!("custom sound not installed: {err}");
            None
        }
    }
}

fn try_install(source: &Path, sounds_dir: &Path) -> Result<String> {
    if !source.is_file() {
        return Err(Error::NotFound(format!(
            "{}: {} does not exist.",
            function_name!(),
            source.display()
        )));
    }
    let supported = source
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOUND_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
    if !supported {
        return Err(Error::InvalidInput(format!(
            "{}: {} is not one of {SOUND_EXTENSIONS:?}.",
            function_name!(),
            source.display()
        )));
    }
    let (Some(file_name), Some(stem)) = (
        source.file_name(),
        source.file_stem().and_then(|stem| stem.to_str()),
    ) else {
        return Err(Error::InvalidInput(format!(
            "{}: {} has no usable file name.",
            function_name!(),
            source.display()
        )));
    };

    create_dir_all(sounds_dir)?;
    copy(source, sounds_dir.join(file_name))?;
    Ok(stem.to_string())
}
