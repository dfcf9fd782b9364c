//! One fitsync-sync per database.
//!
//! Each database gets its own flock'd file under `$XDG_RUNTIME_DIR/fitsync/`,
//! named after a hash of the database path. The file records the owner's pid
//! and database so a refused run can say who holds it.

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

const SYNC_LOCK_PREFIX: &str = "fitsync-sync.lock";

/// Held for the lifetime of a sync run; releases the lock on drop.
pub struct SyncProcessGuard {
    lock: ProcessLock,
}

impl SyncProcessGuard {
    pub fn lock_path(&self) -> &Path {
        &self.lock.path
    }
}

/// Take the sync lock for `db_path`, failing if another run holds it.
pub fn acquire_sync_guard(db_path: &Path) -> Result<SyncProcessGuard> {
    let path = lock_dir().join(lock_file_name(db_path));
    match ProcessLock::try_acquire(&path, db_path)? {
        Some(lock) => Ok(SyncProcessGuard { lock }),
        None => {
            let owner = read_owner(&path).unwrap_or_else(|| "unknown owner".to_string());
            anyhow::bail!(
                "another fitsync-sync is already writing to {} ({})",
                db_path.display(),
                owner
            )
        }
    }
}

struct ProcessLock {
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    fn try_acquire(path: &Path, db_path: &Path) -> Result<Option<Self>> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create lock directory: {}", dir.display()))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open lock file: {}", path.display()))?;

        match flock(&file, LOCK_EX | LOCK_NB) {
            Ok(()) => {}
            Err(e) if is_lock_busy(&e) => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to lock {}", path.display()))
            }
        }

        // Truncate only once locked; the loser must not wipe the owner line.
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(
            file,
            "pid={} db={}",
            std::process::id(),
            db_path.display()
        )?;
        file.flush()?;

        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        let _ = flock(&self.file, LOCK_UN);
    }
}

fn read_owner(path: &Path) -> Option<String> {
    let mut contents = String::new();
    File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    let owner = contents.trim();
    (!owner.is_empty()).then(|| owner.to_string())
}

fn lock_dir() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    base.join("fitsync")
}

fn lock_file_name(db_path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    db_path.to_string_lossy().hash(&mut hasher);
    format!("{SYNC_LOCK_PREFIX}.{:016x}", hasher.finish())
}

fn is_lock_busy(error: &io::Error) -> bool {
    // EAGAIN on Linux, EWOULDBLOCK on macOS.
    error.kind() == io::ErrorKind::WouldBlock || matches!(error.raw_os_error(), Some(11 | 35))
}

const LOCK_EX: i32 = 2;
const LOCK_NB: i32 = 4;
const LOCK_UN: i32 = 8;

#[cfg(unix)]
fn flock(file: &File, operation: i32) -> io::Result<()> {
    // SAFETY: the descriptor stays valid while `file` is borrowed.
    let rc = unsafe { sys::flock(file.as_raw_fd(), operation) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
mod sys {
    unsafe extern "C" {
        pub fn flock(fd: i32, operation: i32) -> i32;
    }
}

#[cfg(not(unix))]
compile_error!("fitsync-sync locking needs flock (Linux or macOS)");
