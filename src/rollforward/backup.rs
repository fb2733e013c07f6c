use chrono::Local;
use chrono::NaiveDateTime;
use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use tracing::warn;

#[derive(Error, Debug)]
pub enum FileOperationError {
    #[error("Access denied to '{0}', close the workbook and check its permissions")]
    AccessDenied(String),

    #[error("File '{0}' does not exist")]
    NotFound(String),

    #[error("Cannot back up '{path}': {source}")]
    BackupFailed { path: String, source: io::Error },

    #[error("Cannot open '{path}' for writing: {source}")]
    NotWritable { path: String, source: io::Error },

    #[error("Cannot restore '{path}' from '{backup}': {source}")]
    RestoreFailed {
        path: String,
        backup: String,
        source: io::Error,
    },
}

/// Where the backup of `path` taken at `time` is stored:
/// `<parent>/<dir_name>/<stem>_backup_<YYYYmmdd_HHMMSS>.<ext>`.
pub fn backup_path(path: &Path, dir_name: &str, time: NaiveDateTime) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path.file_stem().map(|it| it.to_string_lossy()).unwrap_or_default();
    let mut file_name = format!("{}_backup_{}", stem, time.format("%Y%m%d_%H%M%S"));
    if let Some(extension) = path.extension() {
        file_name.push('.');
        file_name.push_str(&extension.to_string_lossy());
    }
    parent.join(dir_name).join(file_name)
}

/// Copies `path` into its backup directory and returns the backup location.
pub fn create_backup(path: &Path, dir_name: &str) -> Result<PathBuf, FileOperationError> {
    if !path.exists() {
        return Err(FileOperationError::NotFound(path.display().to_string()));
    }
    let backup = backup_path(path, dir_name, Local::now().naive_local());
    let failed = |source: io::Error| FileOperationError::BackupFailed {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = backup.parent() {
        fs::create_dir_all(dir).map_err(failed)?;
    }
    fs::copy(path, &backup).map_err(failed)?;
    info!(file = %path.display(), backup = %backup.display(), "backup created");
    Ok(backup)
}

/// Puts a backup back in place of `path`.
pub fn restore_backup(backup: &Path, path: &Path) -> Result<(), FileOperationError> {
    fs::copy(backup, path).map_err(|source| FileOperationError::RestoreFailed {
        path: path.display().to_string(),
        backup: backup.display().to_string(),
        source,
    })?;
    info!(file = %path.display(), backup = %backup.display(), "restored from backup");
    Ok(())
}

/// Makes sure `path` can be opened for writing.
///
/// A read-only attribute is cleared once. Any remaining permission failure,
/// such as a lock held by another program, is `AccessDenied`; other open
/// failures are `NotWritable`.
#[allow(clippy::permissions_set_readonly_false)]
pub fn ensure_writable(path: &Path) -> Result<(), FileOperationError> {
    let denied = || FileOperationError::AccessDenied(path.display().to_string());
    let metadata = fs::metadata(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => FileOperationError::NotFound(path.display().to_string()),
        _ => denied(),
    })?;
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        warn!(file = %path.display(), "clear read-only attribute");
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions).map_err(|_| denied())?;
    }
    match OpenOptions::new().append(true).open(path) {
        Ok(_) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::PermissionDenied => Err(denied()),
        Err(error) => Err(FileOperationError::NotWritable {
            path: path.display().to_string(),
            source: error,
        }),
    }
}
