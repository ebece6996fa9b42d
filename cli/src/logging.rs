//! File logging for the shell. Stdout belongs to the prompt, so without a
//! writable log file nothing is recorded.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use courier_engine::LogSettings;

const FILE_NAME: &str = "courier.log";

/// Install the global subscriber. Returns the file being written, if any.
pub fn init(settings: &LogSettings) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let mut skipped = Vec::new();
    let opened = candidates(settings.dir.as_deref()).find_map(|path| match open(&path) {
        Ok(file) => Some((path, file)),
        Err(e) => {
            skipped.push(format!("{}: {e}", path.display()));
            None
        }
    });

    let Some((path, file)) = opened else {
        tracing_subscriber::registry().with(filter).init();
        return None;
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();
    tracing::info!(path = %path.display(), filter = %settings.filter, "Logging initialized");
    for reason in skipped {
        tracing::warn!("Log file unavailable: {reason}");
    }
    Some(path)
}

/// The configured directory, then `./.courier/logs`.
fn candidates(dir: Option<&Path>) -> impl Iterator<Item = PathBuf> {
    dir.map(Path::to_path_buf)
        .into_iter()
        .chain([PathBuf::from(".courier").join("logs")])
        .map(|dir| dir.join(FILE_NAME))
}

fn open(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
