//! The shared scratch file used to generate disk I/O.
//!
//! The contents of the file are random bytes and carry no meaning. What matters is the latency
//! of writing, syncing and reading them. The file grows with every append until it reaches its
//! size cap, after which appends are skipped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::RngCore;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::guard::IoGuard;

/// Default cap for the size of the scratch file.
pub const DEFAULT_MAX_SIZE: u64 = 5 * 1024 * 1024; // 5 MiB

/// Default size of a freshly created scratch file.
pub const DEFAULT_INITIAL_SIZE: u64 = 1024 * 1024; // 1 MiB

/// Configuration to initialize a [`ScratchFile`].
#[derive(Debug, Clone)]
pub struct ScratchConfig {
    /// Location of the scratch file.
    pub path: PathBuf,
    /// The file never grows beyond this many bytes.
    pub max_size: u64,
    /// Number of random bytes written when the file is created.
    ///
    /// Clamped to `max_size`.
    pub initial_size: u64,
}

impl ScratchConfig {
    /// Creates a configuration for `path` with the default sizes.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: DEFAULT_MAX_SIZE,
            initial_size: DEFAULT_INITIAL_SIZE,
        }
    }
}

/// Result of [`ScratchFile::append`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AppendOutcome {
    /// This many bytes were appended and synced to disk.
    Written(u64),
    /// The file had already reached its size cap.
    Skipped,
}

/// Handle to the scratch file, shared by all concurrent workloads.
///
/// Every operation runs inside the [`IoGuard`], so no two operations ever overlap.
#[derive(Debug)]
pub struct ScratchFile {
    pub(crate) guard: IoGuard,
    ready: OnceCell<()>,
    max_size: u64,
    initial_size: u64,
}

impl ScratchFile {
    /// Creates a handle. The file itself is created lazily by [`ensure`](Self::ensure).
    pub fn new(config: ScratchConfig) -> Self {
        Self {
            guard: IoGuard::new(config.path),
            ready: OnceCell::new(),
            max_size: config.max_size,
            initial_size: config.initial_size.min(config.max_size),
        }
    }

    /// Returns the size cap of the file.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Creates the file with random contents if it does not exist yet.
    ///
    /// The new file is fully written and synced before the section is released, so concurrent
    /// callers either create it or find it complete. Once the file is known to exist, this
    /// returns without entering the section.
    pub async fn ensure(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.create_if_missing())
            .await?;
        Ok(())
    }

    async fn create_if_missing(&self) -> Result<()> {
        let section = self.guard.enter().await;
        let path: &Path = &section;

        if tokio::fs::try_exists(path)
            .await
            .map_err(Error::scratch("stat"))?
        {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::scratch("create"))?;
        }

        // The contents go to a sibling first, so `path` never holds a partial file.
        let partial = partial_path(path);
        let contents = random_bytes(self.initial_size as usize);
        let created = match write_new(&partial, &contents).await {
            Ok(()) => tokio::fs::rename(&partial, path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = created {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(Error::scratch("create")(err));
        }

        tracing::info!(path = %path.display(), size = contents.len(), "created scratch file");
        Ok(())
    }

    /// Appends `data` and forces it to disk, unless the file has reached its cap.
    ///
    /// An append that would cross the cap is cut short so that the file ends exactly at the cap.
    pub async fn append(&self, data: &[u8]) -> Result<AppendOutcome> {
        let section = self.guard.enter().await;
        let path: &Path = &section;

        let size = file_size(path).await?;
        if size >= self.max_size {
            tracing::trace!(size, "scratch file at capacity, skipping append");
            return Ok(AppendOutcome::Skipped);
        }

        let room = usize::try_from(self.max_size - size).unwrap_or(usize::MAX);
        let data = &data[..data.len().min(room)];

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await
            .map_err(Error::scratch("open"))?;
        write_synced(&mut file, data)
            .await
            .map_err(Error::scratch("append"))?;

        Ok(AppendOutcome::Written(data.len() as u64))
    }

    /// Reads up to `len` bytes from the start of the file and discards them.
    ///
    /// Returns the number of bytes read, which is less than `len` if the file is shorter.
    pub async fn read_back(&self, len: u64) -> Result<u64> {
        let section = self.guard.enter().await;

        let file = File::open(&*section)
            .await
            .map_err(Error::scratch("open"))?;

        let capacity = usize::try_from(len).unwrap_or(usize::MAX);
        let mut buf = Vec::with_capacity(capacity);
        file.take(len)
            .read_to_end(&mut buf)
            .await
            .map_err(Error::scratch("read"))?;

        Ok(buf.len() as u64)
    }

    /// Returns the current size of the file, or `0` if it does not exist.
    pub async fn size(&self) -> Result<u64> {
        let section = self.guard.enter().await;
        file_size(&section).await
    }
}

async fn file_size(path: &Path) -> Result<u64> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.len()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
        Err(err) => Err(Error::scratch("stat")(err)),
    }
}

async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await?;
    write_synced(&mut file, data).await
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

async fn write_synced(file: &mut File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Fills a buffer of `len` bytes from the thread-local RNG.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0; len];
    rand::rng().fill_bytes(&mut buf);
    buf
}
