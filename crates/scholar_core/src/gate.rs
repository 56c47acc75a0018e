use std::fmt;

use crate::Timestamp;

/// Why a background harvest was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestSkip {
    /// The last harvest, successful or failed, is younger than the interval.
    CoolingDown { remaining_ms: u64 },
    /// A harvest request has not completed yet.
    Outstanding,
}

impl fmt::Display for HarvestSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestSkip::CoolingDown { remaining_ms } => {
                write!(f, "cooling down ({remaining_ms} ms left)")
            }
            HarvestSkip::Outstanding => write!(f, "harvest already running"),
        }
    }
}

/// Single source of truth for whether a background harvest may start.
///
/// A harvest may start only when none is outstanding and either no harvest
/// has ever succeeded or `now - last_harvest >= interval_ms`. `last_harvest`
/// only moves on success; a failure instead closes the gate until one full
/// interval after the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestGate {
    last_harvest: Option<Timestamp>,
    retry_not_before: Option<Timestamp>,
    interval_ms: u64,
    outstanding: bool,
}

impl HarvestGate {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            last_harvest: None,
            retry_not_before: None,
            interval_ms,
            outstanding: false,
        }
    }

    pub fn last_harvest(&self) -> Option<Timestamp> {
        self.last_harvest
    }

    pub fn is_outstanding(&self) -> bool {
        self.outstanding
    }

    pub fn check(&self, now: Timestamp) -> Result<(), HarvestSkip> {
        if self.outstanding {
            return Err(HarvestSkip::Outstanding);
        }
        if let Some(retry_at) = self.retry_not_before {
            if now < retry_at {
                return Err(HarvestSkip::CoolingDown {
                    remaining_ms: retry_at - now,
                });
            }
        }
        match self.last_harvest {
            None => Ok(()),
            Some(last) => {
                let elapsed = now.saturating_sub(last);
                if elapsed >= self.interval_ms {
                    Ok(())
                } else {
                    Err(HarvestSkip::CoolingDown {
                        remaining_ms: self.interval_ms - elapsed,
                    })
                }
            }
        }
    }

    /// Checks the gate and, if open, marks a harvest as outstanding.
    pub fn try_begin(&mut self, now: Timestamp) -> Result<(), HarvestSkip> {
        self.check(now)?;
        self.outstanding = true;
        Ok(())
    }

    pub fn complete_success(&mut self, now: Timestamp) {
        self.outstanding = false;
        self.last_harvest = Some(now);
        self.retry_not_before = None;
    }

    /// Clears the outstanding flag and holds off retries for one interval from `now`.
    pub fn complete_failure(&mut self, now: Timestamp) {
        self.outstanding = false;
        self.retry_not_before = Some(now.saturating_add(self.interval_ms));
    }
}
