use std::time::SystemTime;

use crate::error::TimerError;
use crate::level::{self, Level, DOOM2_CHAPTER};
use crate::persist::{SavedChapter, SavedLevel};
use crate::records;
use crate::timing::{TimeRecord, TimeSample};

/// What came out of stopping the active level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    /// Index of the finished level within the chapter.
    pub level: usize,
    pub is_level_pb: bool,
    /// Whether this stop produced a full-chapter time.
    pub is_chapter_session: bool,
    pub is_chapter_pb: bool,
}

/// An ordered, fixed-length run of levels plus the chapter's own aggregate
/// record for clearing them all in sequence.
///
/// At most one owned level is timing at any moment; `active_level` is the
/// cursor to it. `previous_level` is an index, kept only for sequence checks.
#[derive(Debug)]
pub struct Chapter {
    chapter_number: u8,
    name: &'static str,
    levels: Vec<Level>,
    record: TimeRecord,
    valid_sequence: bool,
    previous_level: Option<usize>,
    active_level: Option<usize>,
}

impl Chapter {
    /// Build a chapter, hydrating levels by code match from the saved entry
    /// and filling every gap with a blank level so the sequence is always
    /// complete and contiguous.
    pub fn new(chapter_number: u8, saved: Option<&SavedChapter>) -> Result<Self, TimerError> {
        let name = records::chapter_name_by_number(chapter_number)?;
        let personal_best = saved.and_then(|chapter| {
            match (chapter.pb_seconds, chapter.pb_microseconds) {
                (Some(seconds), Some(micros)) => Some(TimeSample::from_parts(seconds, micros)),
                _ => None,
            }
        });

        let count = if chapter_number < DOOM2_CHAPTER { 9 } else { 32 };
        let mut levels = Vec::with_capacity(count);
        for number in 1..=count as u8 {
            let code = level::level_code(chapter_number, number);
            let best = saved
                .and_then(|chapter| chapter.levels.iter().find(|l| l.code == code))
                .map(|l| TimeSample::from_parts(l.pb_seconds, l.pb_microseconds));
            levels.push(Level::new(&code, best)?);
        }

        Ok(Self {
            chapter_number,
            name,
            levels,
            record: TimeRecord::new(personal_best),
            valid_sequence: false,
            previous_level: None,
            active_level: None,
        })
    }

    pub fn chapter_number(&self) -> u8 {
        self.chapter_number
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn level_mut(&mut self, index: usize) -> Option<&mut Level> {
        self.levels.get_mut(index)
    }

    pub fn active_level(&self) -> Option<&Level> {
        self.active_level.map(|index| &self.levels[index])
    }

    pub fn valid_sequence(&self) -> bool {
        self.valid_sequence
    }

    /// Start timing the owned level that `code` names.
    ///
    /// Starting the chapter's first level always resets the sequence to
    /// valid. Any other start keeps a valid sequence only when it is the
    /// next level in order or a secret edge of the previous one; otherwise
    /// the sequence is invalid until the next level-1 start.
    pub fn start_timer(&mut self, now: SystemTime, code: &str) -> Result<&Level, TimerError> {
        let index = self.level_index(code)?;
        if self.active_level.is_some() {
            return Err(TimerError::BadState(
                "start_timer called while another level is timing",
            ));
        }
        self.levels[index].start_timer(now)?;

        if self.levels[index].level_number() == 1 {
            self.valid_sequence = true;
            self.previous_level = None;
        } else if self.valid_sequence {
            let previous = self.previous_level.map(|i| &self.levels[i]);
            // an absent previous level counts as level 1
            let expected = previous.map_or(1, Level::level_number) + 1;
            if self.levels[index].level_number() != expected {
                let via_secret = previous.is_some_and(|p| {
                    p.secret_exit() == Some(code) || p.secret_of() == Some(code)
                });
                if !via_secret {
                    self.valid_sequence = false;
                }
            }
        }

        self.active_level = Some(index);
        Ok(&self.levels[index])
    }

    /// Stop the active level. When it is the chapter's final level and the
    /// sequence is still valid, also produce the chapter aggregate time and
    /// check it against the chapter personal best.
    pub fn stop_timer(&mut self, now: SystemTime) -> Result<StopOutcome, TimerError> {
        let index = self
            .active_level
            .take()
            .ok_or(TimerError::BadState("stop_timer called with no level timing"))?;
        let is_level_pb = self.levels[index].stop_timer(now)?;

        let mut is_chapter_session = false;
        let mut is_chapter_pb = false;
        if self.levels[index].is_final() && self.valid_sequence {
            let total = self
                .levels
                .iter()
                .filter_map(Level::session_time)
                .map(TimeSample::duration)
                .sum();
            self.record.record_session(TimeSample::new(total));
            is_chapter_session = true;
            is_chapter_pb = self.record.promote_session_pb();
        }

        self.previous_level = Some(index);
        Ok(StopOutcome {
            level: index,
            is_level_pb,
            is_chapter_session,
            is_chapter_pb,
        })
    }

    /// Cancel whatever is timing and give up on the current attempt.
    /// Safe to call with nothing active.
    pub fn abort_timer(&mut self) -> Result<(), TimerError> {
        if let Some(index) = self.active_level.take() {
            self.levels[index].abort_timer()?;
        }
        self.previous_level = None;
        self.valid_sequence = false;
        Ok(())
    }

    /// Elapsed time of the level currently timing.
    pub fn current_time(&self) -> Result<TimeSample, TimerError> {
        let index = self.active_level.ok_or(TimerError::BadState(
            "current_time queried with no level timing",
        ))?;
        self.levels[index].current_time()
    }

    pub fn session_time(&self) -> Option<TimeSample> {
        self.record.session_time()
    }

    pub fn personal_best(&self) -> Option<TimeSample> {
        self.record.personal_best()
    }

    pub fn diff(&self) -> Option<String> {
        self.record.diff()
    }

    /// Whether this chapter or any of its levels carries an unsaved best.
    pub fn is_modified(&self) -> bool {
        self.record.is_modified() || self.levels.iter().any(Level::is_modified)
    }

    pub fn revert_session_time(&mut self) {
        self.record.revert_session_time();
    }

    pub fn revert_personal_best(&mut self) {
        self.record.revert_personal_best();
    }

    pub fn delete_session_time(&mut self) {
        self.record.delete_session_time();
    }

    pub fn delete_personal_best(&mut self) {
        self.record.delete_personal_best();
    }

    /// Wire form of this chapter. Levels without a personal best are
    /// omitted, not null-padded.
    pub fn serialize(&self) -> Result<SavedChapter, TimerError> {
        let levels: Vec<SavedLevel> = self
            .levels
            .iter()
            .filter_map(|level| level.serialize().ok())
            .collect();
        let best = self.record.personal_best();
        if best.is_none() && levels.is_empty() {
            return Err(TimerError::Empty(format!("chapter {}", self.chapter_number)));
        }
        Ok(SavedChapter {
            chapter_number: self.chapter_number,
            pb_seconds: best.map(TimeSample::seconds),
            pb_microseconds: best.map(TimeSample::subsec_micros),
            levels,
        })
    }

    fn level_index(&self, code: &str) -> Result<usize, TimerError> {
        let (chapter, level) = level::parse_code(code)?;
        if chapter != self.chapter_number {
            return Err(TimerError::WrongChapter {
                code: code.to_string(),
                chapter: self.chapter_number,
                owner: chapter,
            });
        }
        Ok(level as usize - 1)
    }
}
