use std::fmt;
use std::ops::Sub;
use std::time::Duration;

/// A non-negative duration with microsecond resolution.
///
/// Renders as `MM:SS.cc`; the fraction is rounded to centiseconds with carry
/// so it always fits two digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSample(Duration);

impl TimeSample {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Rebuild a sample from the two fields stored in a save file.
    pub fn from_parts(seconds: u64, microseconds: u32) -> Self {
        Self(Duration::from_secs(seconds) + Duration::from_micros(u64::from(microseconds)))
    }

    pub fn duration(self) -> Duration {
        self.0
    }

    pub fn seconds(self) -> u64 {
        self.0.as_secs()
    }

    pub fn subsec_micros(self) -> u32 {
        self.0.subsec_micros()
    }
}

impl Sub for TimeSample {
    type Output = TimeSample;

    fn sub(self, other: TimeSample) -> TimeSample {
        TimeSample(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for TimeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // round to centiseconds first so a .995+ fraction carries into the seconds
        let centis = (self.0.as_micros() + 5_000) / 10_000;
        let secs = centis / 100;
        write!(f, "{:02}:{:02}.{:02}", secs / 60, secs % 60, centis % 100)
    }
}

/// A value plus a one-deep history. `revert` toggles between the two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSlot {
    current: Option<TimeSample>,
    backup: Option<TimeSample>,
}

impl TimeSlot {
    pub fn get(&self) -> Option<TimeSample> {
        self.current
    }

    /// Install a new value, keeping the old one reachable through `revert`.
    pub fn set(&mut self, value: TimeSample) {
        self.backup = self.current.replace(value);
    }

    pub fn revert(&mut self) {
        std::mem::swap(&mut self.current, &mut self.backup);
    }

    /// Clear the live value, moving it into the backup. Clearing an empty
    /// slot leaves the existing backup alone.
    pub fn clear(&mut self) {
        if self.current.is_some() {
            self.backup = self.current.take();
        }
    }
}

/// Session time, personal best, and the revert history that levels and
/// chapters both carry.
///
/// `modified` tracks whether the personal best differs from the value that
/// was loaded at startup, which is what decides whether a save is due.
#[derive(Debug, Clone, Default)]
pub struct TimeRecord {
    session_time: TimeSlot,
    personal_best: TimeSlot,
    loaded_best: Option<TimeSample>,
    modified: bool,
}

impl TimeRecord {
    pub fn new(personal_best: Option<TimeSample>) -> Self {
        let mut best = TimeSlot::default();
        if let Some(pb) = personal_best {
            best.set(pb);
        }
        Self {
            session_time: TimeSlot::default(),
            personal_best: best,
            loaded_best: personal_best,
            modified: false,
        }
    }

    pub fn session_time(&self) -> Option<TimeSample> {
        self.session_time.get()
    }

    pub fn personal_best(&self) -> Option<TimeSample> {
        self.personal_best.get()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn record_session(&mut self, time: TimeSample) {
        self.session_time.set(time);
    }

    /// Promote the current session time to a personal best if it beats the
    /// standing one. Returns whether a new best was set.
    pub(crate) fn promote_session_pb(&mut self) -> bool {
        let Some(session) = self.session_time.get() else {
            return false;
        };
        match self.personal_best.get() {
            Some(best) if session >= best => false,
            _ => {
                self.personal_best.set(session);
                self.modified = true;
                true
            }
        }
    }

    pub fn revert_session_time(&mut self) {
        self.session_time.revert();
    }

    pub fn revert_personal_best(&mut self) {
        self.personal_best.revert();
        self.modified = self.personal_best.get() != self.loaded_best;
    }

    pub fn delete_session_time(&mut self) {
        self.session_time.clear();
    }

    pub fn delete_personal_best(&mut self) {
        self.personal_best.clear();
    }

    /// Signed delta between the session time and the personal best, or
    /// `None` when either is missing.
    pub fn diff(&self) -> Option<String> {
        let session = self.session_time.get()?;
        let best = self.personal_best.get()?;
        Some(if session < best {
            format!("-{}", best - session)
        } else {
            format!("+{}", session - best)
        })
    }
}
