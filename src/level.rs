use std::time::SystemTime;

use crate::error::TimerError;
use crate::persist::SavedLevel;
use crate::timing::{TimeRecord, TimeSample};

/// Level names for the four episode chapters, indexed by chapter then level.
const EPISODE_NAMES: [[&str; 9]; 4] = [
    [
        "Hangar",
        "Nuclear Plant",
        "Toxin Refinery",
        "Command Control",
        "Phobos Lab",
        "Central Processing",
        "Computer Station",
        "Phobos Anomaly",
        "Military Base",
    ],
    [
        "Deimos Anomaly",
        "Containment Area",
        "Refinery",
        "Deimos Lab",
        "Command Center",
        "Halls of The Damned",
        "Spawning Vats",
        "Tower of Babel",
        "Fortress of Mystery",
    ],
    [
        "Hell Keep",
        "Slough of Despair",
        "Pandemonium",
        "House of Pain",
        "Unholy Cathedral",
        "Mt. Erebus",
        "Limbo",
        "Dis",
        "Warrens",
    ],
    [
        "Hell Beneath",
        "Perfect Hatred",
        "Sever the Wicked",
        "Unruly Evil",
        "They Will Repent",
        "Against Thee Wickedly",
        "And Hell Followed",
        "Unto the Cruel",
        "Fear",
    ],
];

/// Doom 2 level names; the whole game is treated as one 32-level chapter.
const DOOM2_NAMES: [&str; 32] = [
    "Entryway",
    "Underhalls",
    "The Gantlet",
    "The Focus",
    "The Waste Tunnels",
    "The Crusher",
    "Dead Simple",
    "Tricks and Traps",
    "The Pit",
    "Refueling Base",
    "\"O\" of Destruction!",
    "The Factory",
    "Downtown",
    "The Inmost Dens",
    "Industrial Zone",
    "Suburbs",
    "Tenements",
    "The Courtyard",
    "The Citadel",
    "Gotcha!",
    "Nirvana",
    "The Catacombs",
    "Barrels o' Fun",
    "The Chasm",
    "Bloodfalls",
    "The Abandoned Mines",
    "Monster Condo",
    "The Spirit World",
    "The Living End",
    "Icon of Sin",
    "Wolfenstein",
    "Grosse",
];

/// Levels in chapters 1-3 whose exit leads to that chapter's secret level.
const SECRET_EXIT_SOURCES: [u8; 3] = [3, 5, 6];

pub(crate) const DOOM2_CHAPTER: u8 = 5;

/// Split a level code into chapter and level numbers.
///
/// Accepts `E1M1`-style episode codes and flat `MAP01`-style codes.
pub(crate) fn parse_code(code: &str) -> Result<(u8, u8), TimerError> {
    if let Some(rest) = code.strip_prefix('E') {
        if let Some((chapter, level)) = rest.split_once('M') {
            if let (Ok(chapter), Ok(level)) = (chapter.parse::<u8>(), level.parse::<u8>()) {
                if (1..DOOM2_CHAPTER).contains(&chapter) && (1..=9).contains(&level) {
                    return Ok((chapter, level));
                }
            }
        }
    } else if let Some(rest) = code.strip_prefix("MAP") {
        if let Ok(level) = rest.parse::<u8>() {
            if (1..=32).contains(&level) {
                return Ok((DOOM2_CHAPTER, level));
            }
        }
    }
    Err(TimerError::UnknownCode(code.to_string()))
}

/// The canonical code for a chapter/level pair.
pub(crate) fn level_code(chapter: u8, level: u8) -> String {
    if chapter < DOOM2_CHAPTER {
        format!("E{chapter}M{level}")
    } else {
        format!("MAP{level:02}")
    }
}

/// One game level: identity, secret-routing links, and its timing record.
///
/// Secret links are computed once from the code and never change. Chapters
/// 1-3 hide a secret level behind slot 9; the fifth chapter has a two-deep
/// secret chain off MAP15.
#[derive(Debug)]
pub struct Level {
    code: String,
    name: &'static str,
    chapter_number: u8,
    level_number: u8,
    secret_exit: Option<String>,
    secret_of: Option<String>,
    is_final: bool,
    record: TimeRecord,
    run_start: Option<SystemTime>,
}

impl Level {
    pub fn new(code: &str, personal_best: Option<TimeSample>) -> Result<Self, TimerError> {
        let (chapter_number, level_number) = parse_code(code)?;
        let mut secret_exit = None;
        let mut secret_of = None;
        let mut is_final = false;
        let name;

        if chapter_number < DOOM2_CHAPTER {
            if let Some(&source) = SECRET_EXIT_SOURCES.get(chapter_number as usize - 1) {
                if level_number == 9 {
                    // the secret level returns play to one past its source
                    secret_of = Some(level_code(chapter_number, source + 1));
                } else if level_number == source {
                    secret_exit = Some(level_code(chapter_number, 9));
                }
            }
            is_final = level_number == 8;
            name = EPISODE_NAMES[chapter_number as usize - 1][level_number as usize - 1];
        } else {
            match level_number {
                15 => secret_exit = Some("MAP31".to_string()),
                31 => {
                    secret_of = Some("MAP16".to_string());
                    secret_exit = Some("MAP32".to_string());
                }
                32 => secret_of = Some("MAP16".to_string()),
                30 => is_final = true,
                _ => {}
            }
            name = DOOM2_NAMES[level_number as usize - 1];
        }

        Ok(Self {
            code: code.to_string(),
            name,
            chapter_number,
            level_number,
            secret_exit,
            secret_of,
            is_final,
            record: TimeRecord::new(personal_best),
            run_start: None,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn chapter_number(&self) -> u8 {
        self.chapter_number
    }

    pub fn level_number(&self) -> u8 {
        self.level_number
    }

    pub fn secret_exit(&self) -> Option<&str> {
        self.secret_exit.as_deref()
    }

    pub fn secret_of(&self) -> Option<&str> {
        self.secret_of.as_deref()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_running(&self) -> bool {
        self.run_start.is_some()
    }

    /// Start recording an attempt. Starting twice is a coordination fault.
    pub fn start_timer(&mut self, now: SystemTime) -> Result<(), TimerError> {
        if self.run_start.is_some() {
            return Err(TimerError::BadState(
                "start_timer called while a timer is already running",
            ));
        }
        self.run_start = Some(now);
        Ok(())
    }

    /// Stop the attempt, record the session time, and report whether it set
    /// a new personal best. A negative interval clamps to zero.
    pub fn stop_timer(&mut self, now: SystemTime) -> Result<bool, TimerError> {
        let start = self
            .run_start
            .take()
            .ok_or(TimerError::BadState("stop_timer called before start_timer"))?;
        let elapsed = now.duration_since(start).unwrap_or_default();
        self.record.record_session(TimeSample::new(elapsed));
        Ok(self.record.promote_session_pb())
    }

    /// Discard the attempt in progress without recording anything.
    pub fn abort_timer(&mut self) -> Result<(), TimerError> {
        if self.run_start.take().is_none() {
            return Err(TimerError::BadState(
                "abort_timer called when no timer was running",
            ));
        }
        Ok(())
    }

    /// Elapsed time of the attempt in progress. Display-only accuracy.
    pub fn current_time(&self) -> Result<TimeSample, TimerError> {
        let start = self.run_start.ok_or(TimerError::BadState(
            "current_time queried with no timer running",
        ))?;
        Ok(TimeSample::new(start.elapsed().unwrap_or_default()))
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

    pub fn is_modified(&self) -> bool {
        self.record.is_modified()
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

    /// Wire form of this level. Session time and diff are never persisted.
    pub fn serialize(&self) -> Result<SavedLevel, TimerError> {
        let best = self
            .record
            .personal_best()
            .ok_or_else(|| TimerError::Empty(self.code.clone()))?;
        Ok(SavedLevel {
            code: self.code.clone(),
            pb_seconds: best.seconds(),
            pb_microseconds: best.subsec_micros(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn at(s: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(s)
    }

    #[test]
    fn parses_episode_codes() {
        assert_eq!(parse_code("E1M1").unwrap(), (1, 1));
        assert_eq!(parse_code("E4M9").unwrap(), (4, 9));
    }

    #[test]
    fn parses_flat_codes() {
        assert_eq!(parse_code("MAP01").unwrap(), (5, 1));
        assert_eq!(parse_code("MAP32").unwrap(), (5, 32));
    }

    #[test]
    fn rejects_garbage_codes() {
        for code in ["", "E5M1", "E1M0", "E1M10", "MAP00", "MAP33", "D2M1", "hello"] {
            assert_matches!(parse_code(code), Err(TimerError::UnknownCode(_)));
        }
    }

    #[test]
    fn looks_up_names_from_the_static_tables() {
        assert_eq!(Level::new("E1M1", None).unwrap().name(), "Hangar");
        assert_eq!(Level::new("E2M2", None).unwrap().name(), "Containment Area");
        assert_eq!(Level::new("MAP01", None).unwrap().name(), "Entryway");
        assert_eq!(Level::new("MAP30", None).unwrap().name(), "Icon of Sin");
    }

    #[test]
    fn episode_secret_routing_links_through_slot_nine() {
        let source = Level::new("E1M3", None).unwrap();
        assert_eq!(source.secret_exit(), Some("E1M9"));
        assert_eq!(source.secret_of(), None);

        let secret = Level::new("E1M9", None).unwrap();
        assert_eq!(secret.secret_of(), Some("E1M4"));
        assert_eq!(secret.secret_exit(), None);

        assert_eq!(Level::new("E2M5", None).unwrap().secret_exit(), Some("E2M9"));
        assert_eq!(Level::new("E2M9", None).unwrap().secret_of(), Some("E2M6"));
        assert_eq!(Level::new("E3M6", None).unwrap().secret_exit(), Some("E3M9"));
        assert_eq!(Level::new("E3M9", None).unwrap().secret_of(), Some("E3M7"));
    }

    #[test]
    fn chapter_four_has_no_secret_routing() {
        for number in 1..=9 {
            let level = Level::new(&format!("E4M{number}"), None).unwrap();
            assert_eq!(level.secret_exit(), None);
            assert_eq!(level.secret_of(), None);
        }
    }

    #[test]
    fn doom2_secret_chain_is_two_levels_deep() {
        let entry = Level::new("MAP15", None).unwrap();
        assert_eq!(entry.secret_exit(), Some("MAP31"));
        let first = Level::new("MAP31", None).unwrap();
        assert_eq!(first.secret_of(), Some("MAP16"));
        assert_eq!(first.secret_exit(), Some("MAP32"));
        let second = Level::new("MAP32", None).unwrap();
        assert_eq!(second.secret_of(), Some("MAP16"));
        assert_eq!(second.secret_exit(), None);
    }

    #[test]
    fn final_flags_mark_the_end_of_the_normal_sequence() {
        assert!(Level::new("E1M8", None).unwrap().is_final());
        assert!(!Level::new("E1M9", None).unwrap().is_final());
        assert!(Level::new("MAP30", None).unwrap().is_final());
        assert!(!Level::new("MAP32", None).unwrap().is_final());
    }

    #[test]
    fn stop_measures_the_interval_between_start_and_stop() {
        let mut level = Level::new("E1M1", None).unwrap();
        level.start_timer(at(100)).unwrap();
        assert!(level.stop_timer(at(163)).unwrap());
        assert_eq!(
            level.session_time(),
            Some(TimeSample::new(Duration::from_secs(63)))
        );
        assert!(!level.is_running());
    }

    #[test]
    fn stop_clamps_a_backwards_clock_to_zero() {
        let mut level = Level::new("E1M1", None).unwrap();
        level.start_timer(at(100)).unwrap();
        level.stop_timer(at(50)).unwrap();
        assert_eq!(level.session_time(), Some(TimeSample::default()));
    }

    #[test]
    fn starting_twice_is_a_state_error() {
        let mut level = Level::new("E1M1", None).unwrap();
        level.start_timer(at(0)).unwrap();
        assert_matches!(level.start_timer(at(1)), Err(TimerError::BadState(_)));
    }

    #[test]
    fn stop_and_abort_without_a_start_are_state_errors() {
        let mut level = Level::new("E1M1", None).unwrap();
        assert_matches!(level.stop_timer(at(1)), Err(TimerError::BadState(_)));
        assert_matches!(level.abort_timer(), Err(TimerError::BadState(_)));
        assert_matches!(level.current_time(), Err(TimerError::BadState(_)));
    }

    #[test]
    fn abort_discards_the_attempt() {
        let mut level = Level::new("E1M1", None).unwrap();
        level.start_timer(at(0)).unwrap();
        level.abort_timer().unwrap();
        assert_eq!(level.session_time(), None);
        assert_eq!(level.personal_best(), None);
        assert!(!level.is_running());
    }

    #[test]
    fn slower_attempt_keeps_the_loaded_best() {
        let pb = TimeSample::new(Duration::from_secs(30));
        let mut level = Level::new("E1M1", Some(pb)).unwrap();
        level.start_timer(at(0)).unwrap();
        assert!(!level.stop_timer(at(45)).unwrap());
        assert_eq!(level.personal_best(), Some(pb));
        assert!(!level.is_modified());
        assert_eq!(level.diff(), Some("+00:15.00".to_string()));
    }

    #[test]
    fn serialize_requires_a_personal_best() {
        let level = Level::new("E1M2", None).unwrap();
        assert_matches!(level.serialize(), Err(TimerError::Empty(_)));

        let mut level = Level::new("E1M2", None).unwrap();
        level.start_timer(at(0)).unwrap();
        level.stop_timer(at(61)).unwrap();
        let saved = level.serialize().unwrap();
        assert_eq!(saved.code, "E1M2");
        assert_eq!(saved.pb_seconds, 61);
        assert_eq!(saved.pb_microseconds, 0);
    }
}
