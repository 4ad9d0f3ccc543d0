//! # File I/O Module
//!
//! Workbook file operations with safety features:
//! - **Atomic saves**: Write to .tmp, fsync, rename, so readers never see a
//!   partially written workbook
//! - **File locking**: Keep a second process (or a colleague on a shared
//!   drive) from writing the same project
//! - **Version validation**: Refuse workbooks written by a newer schema
//!
//! ## File Format
//!
//! Projects are saved as `.ccp` files containing JSON (see
//! [`crate::project::Workbook`]). Lock files use the `.ccp.lock` extension
//! and hold metadata about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cable_core::file_io::{load_workbook, save_workbook, FileLock};
//! use cable_core::project::Workbook;
//! use std::path::Path;
//!
//! let path = Path::new("24-017.ccp");
//! let lock = FileLock::acquire(path, "engineer@company.com")?;
//!
//! save_workbook(&Workbook::default(), path)?;
//! let workbook = load_workbook(path)?;
//!
//! // Lock is released when dropped
//! drop(lock);
//! # Ok::<(), cable_core::errors::CalcError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{CalcError, CalcResult};
use crate::project::{Workbook, PROJECT_EXTENSION, SCHEMA_VERSION};

/// Locks older than this are taken over regardless of the holder
const STALE_LOCK_AGE_HOURS: i64 = 24;

fn io_error<'a>(operation: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> CalcError + 'a {
    move |e| CalcError::file_error(operation, path.display().to_string(), e.to_string())
}

/// Lock file metadata stored in .ccp.lock files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// A lock is stale when its process is gone (same machine only) or it
    /// is older than a day.
    pub fn is_stale(&self) -> bool {
        let same_machine = hostname().is_some_and(|ours| ours == self.machine);
        if same_machine && !process_alive(self.pid) {
            return true;
        }
        Utc::now() - self.locked_at > Duration::hours(STALE_LOCK_AGE_HOURS)
    }

    fn holder(&self) -> String {
        format!("{} ({})", self.user_id, self.machine)
    }
}

/// Machine name for lock metadata. Shells rarely export `HOSTNAME`, so on
/// unix `/etc/hostname` is read when the environment has nothing.
fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok().filter(|h| !h.trim().is_empty())
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
            .filter(|h| !h.trim().is_empty())
            .or_else(|| fs::read_to_string("/etc/hostname").ok())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
    }
}

fn process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        fs::metadata(format!("/proc/{}", pid)).is_ok()
    }
    #[cfg(windows)]
    {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(true)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        true
    }
}

/// Exclusive lock on a workbook, released on drop.
///
/// Combines an OS-level lock (fs2) on the `.ccp.lock` file, which protects
/// against other processes, with JSON metadata in that file so a blocked
/// user can see who holds it.
#[derive(Debug)]
pub struct FileLock {
    workbook_path: PathBuf,
    lock_path: PathBuf,
    // Keeps the OS lock alive
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a workbook file.
    ///
    /// Returns `CalcError::FileLocked` when another live process holds it.
    /// Stale locks are taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);

        if let Some(existing) = read_lock_info(&lock_path) {
            if !existing.is_stale() {
                return Err(CalcError::file_locked(
                    path.display().to_string(),
                    existing.holder(),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            warn!(path = %path.display(), holder = %existing.holder(), "taking over stale lock");
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(io_error("create lock", &lock_path))?;

        // Only the holder of the OS lock may rewrite the metadata
        lock_file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;
        lock_file.set_len(0).map_err(io_error("truncate lock", &lock_path))?;

        let info = LockInfo::new(user_id);
        let lock_json = serde_json::to_string_pretty(&info).map_err(|e| CalcError::serialization(e.to_string()))?;
        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(io_error("write lock", &lock_path))?;
        lock_file.sync_all().map_err(io_error("sync lock", &lock_path))?;

        debug!(path = %path.display(), user = %info.user_id, "lock acquired");
        Ok(FileLock {
            workbook_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Who holds a live lock on `path`, if anyone
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path)).filter(|info| !info.is_stale())
    }

    pub fn workbook_path(&self) -> &Path {
        &self.workbook_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `<file>.ccp` → `<file>.ccp.lock`
fn lock_path_for(workbook_path: &Path) -> PathBuf {
    let mut lock_path = workbook_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

/// Lock metadata, or `None` when there is no readable lock file
fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save a workbook with atomic write semantics.
///
/// 1. Serialize to JSON
/// 2. Write `<file>.ccp.tmp`
/// 3. fsync
/// 4. Rename over the target (atomic on most filesystems)
///
/// A failed save leaves the previous file untouched.
pub fn save_workbook(workbook: &Workbook, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(workbook).map_err(|e| CalcError::serialization(e.to_string()))?;

    let tmp_path = path.with_extension(format!("{}.tmp", PROJECT_EXTENSION));
    let mut tmp_file = File::create(&tmp_path).map_err(io_error("create temp file", &tmp_path))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(io_error("write temp file", &tmp_path))?;
    tmp_file.sync_all().map_err(io_error("sync temp file", &tmp_path))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), rows = workbook.calc.rows.len(), "workbook saved");
    Ok(())
}

/// Load a workbook, validating its schema version.
///
/// # Returns
///
/// * `Err(CalcError::VersionMismatch)` - written by an incompatible schema
/// * `Err(CalcError::SerializationError)` - not a workbook
/// * `Err(CalcError::FileError)` - I/O error
pub fn load_workbook(path: &Path) -> CalcResult<Workbook> {
    let contents = fs::read_to_string(path).map_err(io_error("read", path))?;

    let mut workbook: Workbook = serde_json::from_str(&contents)
        .map_err(|e| CalcError::serialization(format!("Invalid workbook {}: {}", path.display(), e)))?;

    validate_version(&workbook.version)?;
    workbook.calc.normalize();
    Ok(workbook)
}

/// Load a workbook together with the live lock on it, if any.
pub fn load_workbook_with_lock_check(path: &Path) -> CalcResult<(Workbook, Option<LockInfo>)> {
    let workbook = load_workbook(path)?;
    Ok((workbook, FileLock::check(path)))
}

/// Check a file version against [`SCHEMA_VERSION`].
///
/// Major versions must match. While the schema is 0.x, a file with a newer
/// minor version is rejected too.
pub fn validate_version(file_version: &str) -> CalcResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.trim().parse().ok()).collect() };
    let file_parts = parse(file_version);
    let current_parts = parse(SCHEMA_VERSION);

    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    match (file_parts.as_slice(), current_parts.as_slice()) {
        ([], _) | (_, []) => Err(mismatch()),
        ([file_major, ..], [major, ..]) if file_major != major => Err(mismatch()),
        ([0, file_minor, ..], [0, minor, ..]) if file_minor > minor => Err(mismatch()),
        _ => Ok(()),
    }
}

/// Project workbooks in `dir` whose file name contains `query`
/// (case-insensitive), sorted by file name. A blank query lists all.
pub fn find_projects(dir: &Path, query: &str) -> CalcResult<Vec<PathBuf>> {
    let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped_dir)
        .join(format!("*.{}", PROJECT_EXTENSION))
        .to_string_lossy()
        .into_owned();
    let needle = query.trim().to_lowercase();

    let entries = glob::glob(&pattern).map_err(|e| CalcError::invalid_input("query", query, e.to_string()))?;
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .collect();
    found.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(found)
}
