//! # File I/O Module
//!
//! Handles project and combination files with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **File locking**: Prevent two runs from writing the same study
//! - **Version validation**: Ensure schema compatibility
//!
//! ## File Format
//!
//! Projects are saved as `.lcg` files containing JSON. Generated
//! combinations are written in the [`serializer`](crate::serializer) format.
//! Lock files use the `.lcg.lock` extension with metadata about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lcgen_core::file_io::{save_project, save_combinations, FileLock};
//! use lcgen_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::new("Engineer", "25-001", "Viaduct");
//! let path = Path::new("viaduct.lcg");
//!
//! // Acquire lock before saving
//! let lock = FileLock::acquire(path, "engineer@company.com")?;
//!
//! // Save with atomic write
//! save_project(&project, path)?;
//! let outcome = project.generate()?;
//! save_combinations(&outcome.container, Path::new("viaduct.json"))?;
//!
//! // Lock is released when dropped
//! drop(lock);
//! # Ok::<(), lcgen_core::errors::CombError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::{debug, info};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::combinations::CombinationContainer;
use crate::errors::{CombError, CombResult};
use crate::project::{Project, SCHEMA_VERSION};
use crate::serializer;

/// Lock file metadata stored in .lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

/// Get the hostname of the current machine
fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// File lock guard that releases the lock when dropped.
///
/// Uses both:
/// 1. OS-level file locking (via fs2) for process safety
/// 2. .lock file with metadata for user visibility
pub struct FileLock {
    /// Path to the locked file
    target_path: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS lock
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a project file.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock acquired successfully
    /// * `Err(CombError::FileLocked)` - Another process holds the lock
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CombResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                if !is_lock_stale(&existing) {
                    return Err(CombError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                info!(
                    "Taking over stale lock on {} held by {} since {}",
                    path.display(),
                    existing.user_id,
                    existing.locked_at
                );
            }
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| CombError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        // Non-blocking
        lock_file.try_lock_exclusive().map_err(|_| {
            CombError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info)?;
        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(|e| CombError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;
        lock_file
            .sync_all()
            .map_err(|e| CombError::file_error("sync lock", lock_path.display().to_string(), e.to_string()))?;

        debug!("Locked {} for {}", path.display(), info.user_id);
        Ok(FileLock {
            target_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Check if a file is locked without acquiring the lock.
    ///
    /// Returns `Some(LockInfo)` if locked, `None` if available.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }

    /// Get the path of the locked file
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
        // OS lock is released when _lock_file is dropped
    }
}

/// Get the lock file path for a file
fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn read_lock_info(lock_path: &Path) -> CombResult<LockInfo> {
    let contents = read_to_string(lock_path, "read lock")?;
    Ok(serde_json::from_str(&contents)?)
}

/// Check if a lock is stale (the process that created it is no longer running)
fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    // If lock is more than 24 hours old, consider it stale
    let age = Utc::now() - info.locked_at;
    age.num_hours() > 24
}

fn read_to_string(path: &Path, operation: &str) -> CombResult<String> {
    let mut file =
        File::open(path).map_err(|e| CombError::file_error(operation, path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CombError::file_error(operation, path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Write `contents` next to `path` with a `.tmp` suffix, sync, then rename
/// over `path`.
fn write_atomic(path: &Path, contents: &str) -> CombResult<()> {
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| CombError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .write_all(contents.as_bytes())
        .map_err(|e| CombError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .sync_all()
        .map_err(|e| CombError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CombError::file_error("rename to final", path.display().to_string(), e.to_string())
    })
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let extension = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    path.with_extension(extension)
}

/// Save a project to a file with atomic write semantics.
///
/// # Example
///
/// ```rust,no_run
/// use lcgen_core::file_io::save_project;
/// use lcgen_core::project::Project;
/// use std::path::Path;
///
/// let project = Project::new("Engineer", "25-001", "Viaduct");
/// save_project(&project, Path::new("viaduct.lcg"))?;
/// # Ok::<(), lcgen_core::errors::CombError>(())
/// ```
pub fn save_project(project: &Project, path: &Path) -> CombResult<()> {
    let json = serde_json::to_string_pretty(project)?;
    write_atomic(path, &json)?;
    debug!("Saved project {} to {}", project.meta.job_id, path.display());
    Ok(())
}

/// Load a project from a file.
///
/// # Returns
///
/// * `Ok(Project)` - Successfully loaded project
/// * `Err(CombError::VersionMismatch)` - File version is incompatible
/// * `Err(CombError::SerializationError)` - Invalid JSON or an invalid catalogue
/// * `Err(CombError::FileError)` - I/O error
pub fn load_project(path: &Path) -> CombResult<Project> {
    let contents = read_to_string(path, "open")?;

    let project: Project = serde_json::from_str(&contents).map_err(|e| CombError::SerializationError {
        reason: format!("Invalid project in {}: {}", path.display(), e),
    })?;

    validate_version(&project.meta.version)?;

    info!(
        "Loaded project {} '{}' ({} actions)",
        project.meta.job_id,
        project.meta.title,
        project.actions.len()
    );
    Ok(project)
}

/// Load a project, returning whether another user holds its lock.
pub fn load_project_with_lock_check(path: &Path) -> CombResult<(Project, Option<LockInfo>)> {
    let project = load_project(path)?;
    let lock_info = FileLock::check(path);
    Ok((project, lock_info))
}

/// Write generated combinations atomically.
pub fn save_combinations(container: &CombinationContainer, path: &Path) -> CombResult<()> {
    let text = serializer::write(container)?;
    write_atomic(path, &text)?;
    info!("Wrote {} combinations to {}", container.len(), path.display());
    Ok(())
}

/// Read combinations written by [`save_combinations`].
pub fn load_combinations(path: &Path) -> CombResult<CombinationContainer> {
    let text = read_to_string(path, "open")?;
    serializer::read(&text)
}

/// Validate that a file version is compatible with the current schema.
///
/// The major version must match; within `0.x` a newer minor is rejected.
fn validate_version(file_version: &str) -> CombResult<()> {
    let mismatch = || CombError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file = Version::parse(file_version).map_err(|_| mismatch())?;
    let current = Version::parse(SCHEMA_VERSION).map_err(|_| mismatch())?;

    if file.major != current.major {
        return Err(mismatch());
    }
    if current.major == 0 && file.minor > current.minor {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use std::env::temp_dir;

    fn temp_path(name: &str, extension: &str) -> PathBuf {
        temp_dir().join(format!("lcgen_test_{}_{}.{}", name, std::process::id(), extension))
    }

    #[test]
    fn test_lock_path_generation() {
        let path = Path::new("/path/to/project.lcg");
        assert_eq!(lock_path_for(path), Path::new("/path/to/project.lcg.lock"));
        assert_eq!(tmp_path_for(path), Path::new("/path/to/project.lcg.tmp"));
        assert_eq!(lock_path_for(Path::new("/tmp/noext")), Path::new("/tmp/noext.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("test@example.com");
        assert_eq!(info.user_id, "test@example.com");
        assert!(info.pid > 0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("roundtrip", "lcg");

        let mut project = Project::new("Test Engineer", "TEST-001", "Test Bridge");
        project.add_action(Action::permanent("G1", "en1990.set_b.permanent")).unwrap();
        project.add_action(Action::accidental("A1")).unwrap();
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded, project);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_path("atomic", "lcg");
        let tmp = tmp_path_for(&path);

        save_project(&Project::new("Test", "TEST", "T"), &path).unwrap();

        assert!(!tmp.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_combinations_roundtrip() {
        let path = temp_path("combinations", "json");

        let mut project = Project::new("Test", "TEST", "T");
        project.add_action(Action::permanent("G1", "en1990.set_b.permanent")).unwrap();
        project
            .add_action(Action::variable("Q1", "en1990.set_b.variable", "en1990.category_a"))
            .unwrap();
        let outcome = project.generate().unwrap();

        save_combinations(&outcome.container, &path).unwrap();
        let loaded = load_combinations(&path).unwrap();
        assert_eq!(loaded, outcome.container);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_project(&temp_path("does_not_exist", "lcg")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_load_rejects_newer_schema() {
        let path = temp_path("newer", "lcg");
        let mut project = Project::new("Test", "TEST", "T");
        project.meta.version = "0.2.0".to_string();
        save_project(&project, &path).unwrap();

        let err = load_project(&path).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_path("lock_test", "lcg");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");
        assert_eq!(lock.target_path(), path.as_path());

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_old_lock_is_stale() {
        let mut info = LockInfo::new("someone");
        info.machine = "elsewhere".to_string();
        assert!(!is_lock_stale(&info));
        info.locked_at = Utc::now() - chrono::Duration::hours(30);
        assert!(is_lock_stale(&info));
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("zero").is_err());
    }

    #[test]
    fn test_load_with_lock_check() {
        let path = temp_path("lock_check", "lcg");
        save_project(&Project::new("Test", "TEST", "T"), &path).unwrap();

        let (loaded, lock_info) = load_project_with_lock_check(&path).unwrap();
        assert_eq!(loaded.meta.job_id, "TEST");
        assert!(lock_info.is_none());

        let _ = fs::remove_file(&path);
    }
}
