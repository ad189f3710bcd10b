//! Access to the run artifact written asynchronously by the agent,
//! and the bounded polling used to wait for it.
use crate::errors::{EvalError, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Fingerprint of an artifact content, only meant to tell two contents apart
pub fn content_digest(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// State of the run artifact at a given time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArtifactSnapshot {
    /// Whether the artifact exists
    pub exists: bool,
    /// Size in bytes (0 when missing)
    pub len: u64,
    /// Last modification time if available
    pub modified: Option<SystemTime>,
    /// Fingerprint of the whole content if it could be read
    pub digest: Option<u64>,
}

impl ArtifactSnapshot {
    /// Snapshot of a missing artifact
    pub fn missing() -> Self {
        ArtifactSnapshot::default()
    }

    /// Snapshot of an existing artifact whose content is unknown
    pub fn present(len: u64, modified: Option<SystemTime>) -> Self {
        ArtifactSnapshot {
            exists: true,
            len,
            modified,
            digest: None,
        }
    }

    /// Snapshot of an existing artifact with the given content
    pub fn of_content(content: &[u8], modified: Option<SystemTime>) -> Self {
        ArtifactSnapshot {
            exists: true,
            len: content.len() as u64,
            modified,
            digest: Some(content_digest(content)),
        }
    }

    /// Whether `self`, taken after a run, denotes an artifact produced by that run
    /// given the snapshot `before` taken before the run.
    ///
    /// Any difference in size, modification time or content counts, so an
    /// overwrite of the same size within the mtime resolution is still detected.
    /// An artifact rewritten with identical bytes and mtime is not fresh.
    pub fn is_fresh_since(&self, before: &ArtifactSnapshot) -> bool {
        self.exists && (!before.exists || self != before)
    }

    /// Part of `content`, read after a run, written by that run given `self`
    /// taken before the run.
    ///
    /// Only the bytes past the previous end are returned when `content` starts
    /// with exactly the previous content (the log was appended to). Otherwise
    /// (created, overwritten, or no previous fingerprint) the whole content is.
    pub fn new_content<'a>(&self, content: &'a [u8]) -> &'a [u8] {
        let prev_len = usize::try_from(self.len).unwrap_or(usize::MAX);
        match self.digest {
            Some(digest)
                if self.exists
                    && content.len() > prev_len
                    && content_digest(&content[..prev_len]) == digest =>
            {
                &content[prev_len..]
            }
            _ => content,
        }
    }
}

/// An interface to the run artifact
pub trait ArtifactSource {
    /// Location of the artifact, used for reporting
    fn path(&self) -> &Path;
    /// Current state of the artifact, any error is reported as a missing artifact
    fn snapshot(&self) -> ArtifactSnapshot;
    /// Whole artifact content
    fn read(&self) -> Result<Vec<u8>>;
}

/// Run artifact stored as a file
#[derive(Clone, Debug)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    /// Constructor
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileArtifact { path: path.into() }
    }
}

impl ArtifactSource for FileArtifact {
    fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> ArtifactSnapshot {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => {
                let modified = meta.modified().ok();
                match std::fs::read(&self.path) {
                    Ok(content) => ArtifactSnapshot::of_content(&content, modified),
                    Err(_) => ArtifactSnapshot::present(meta.len(), modified),
                }
            }
            _ => ArtifactSnapshot::missing(),
        }
    }

    fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(EvalError::ArtifactRead)
    }
}

/// An interface to suspend the calling thread between two polling attempts
pub trait Sleeper {
    /// Waits for the given duration
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Sleeper blocking the current thread
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Fixed-interval, fixed-count polling
#[derive(Clone, Copy, Debug)]
pub struct Poller {
    wait_time: Duration,
    max_retries: usize,
}

impl Poller {
    /// Constructor
    pub fn new(wait_time: Duration, max_retries: usize) -> Self {
        Poller {
            wait_time,
            max_retries,
        }
    }

    /// Number of checks
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Runs `check` with the attempt number (starting at 1) at most `max_retries`
    /// times, waiting `wait_time` between two consecutive checks, until it returns
    /// something. No wait follows the last check.
    pub fn poll<T, S, F>(&self, sleeper: &S, mut check: F) -> Option<T>
    where
        S: Sleeper,
        F: FnMut(usize) -> Option<T>,
    {
        for attempt in 1..=self.max_retries {
            if let Some(found) = check(attempt) {
                return Some(found);
            }
            if attempt < self.max_retries {
                sleeper.sleep(self.wait_time);
            }
        }
        None
    }
}
