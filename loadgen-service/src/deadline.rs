use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Point in time after which a workload gives up.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Option<Instant>,
    limit: Duration,
}

impl Deadline {
    /// A deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(limit),
            limit,
        }
    }

    /// A deadline that never expires.
    pub fn never() -> Self {
        Self {
            at: None,
            limit: Duration::MAX,
        }
    }

    /// Returns [`Error::Timeout`] once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        match self.at {
            Some(at) if Instant::now() >= at => Err(Error::Timeout(self.limit)),
            _ => Ok(()),
        }
    }
}
