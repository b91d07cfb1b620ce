//! Exclusive access to the scratch file.
//!
//! [`IoGuard`] owns the location of the scratch file, so the only way to get at the file is to
//! hold an [`IoSection`]. At most one section exists at any time. Waiters are served in the
//! order they arrived.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::{Mutex, MutexGuard};

/// Serializes all reads and writes against the scratch file.
#[derive(Debug)]
pub struct IoGuard {
    path: Mutex<PathBuf>,
}

impl IoGuard {
    /// Creates a guard for the scratch file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(path.into()),
        }
    }

    /// Waits for exclusive access to the scratch file.
    pub async fn enter(&self) -> IoSection<'_> {
        let start = Instant::now();
        let path = self.path.lock().await;
        tracing::trace!(waited = ?start.elapsed(), "entered scratch file section");
        IoSection { path }
    }
}

/// A held exclusive section. Dropping it lets the next waiter in.
#[derive(Debug)]
pub struct IoSection<'a> {
    path: MutexGuard<'a, PathBuf>,
}

impl Deref for IoSection<'_> {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sections_are_exclusive() {
        let guard = Arc::new(IoGuard::new("/unused"));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let active = Arc::clone(&active);
                let max_active = Arc::clone(&max_active);
                tokio::spawn(async move {
                    let _section = guard.enter().await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn section_exposes_path() {
        let guard = IoGuard::new("/tmp/scratch.bin");
        let section = guard.enter().await;
        assert_eq!(&*section, Path::new("/tmp/scratch.bin"));
    }
}
