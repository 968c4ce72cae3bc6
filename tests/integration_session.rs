// Drives the library across its seams the way the binary does: decoder
// events feed chapter timers inside a grid, and the result round-trips
// through the file store.

use std::time::{Duration, SystemTime};

use serde_json::json;
use tempfile::tempdir;

use gzsplit::decoder::{GameEvent, StreamDecoder};
use gzsplit::persist::{FileRecordStore, RecordStore, SavedRuns};
use gzsplit::records::{Category, Difficulty, RecordGrid};
use gzsplit::timing::TimeSample;

const HEADER: &str = "----------------------------------------";

fn at(s: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(s)
}

fn secs(s: u64) -> TimeSample {
    TimeSample::new(Duration::from_secs(s))
}

fn announce(lines: &mut Vec<String>, code: &str, name: &str) {
    lines.push(HEADER.to_string());
    lines.push(String::new());
    lines.push(format!("{code} - {name}"));
}

fn unload(lines: &mut Vec<String>) {
    lines.push("Starting all scripts of type 13 (Unloading)".to_string());
}

/// The stream a full first-episode clear produces, with the secret detour
/// and its reveal block in the middle.
fn episode_one_stream() -> Vec<String> {
    let mut lines = Vec::new();
    announce(&mut lines, "E1M1", "Hangar");
    unload(&mut lines);
    announce(&mut lines, "E1M2", "Nuclear Plant");
    unload(&mut lines);
    announce(&mut lines, "E1M3", "Toxin Refinery");
    // the player trips the secret exit; gzdoom prints a reveal block
    lines.push(HEADER.to_string());
    lines.push("A secret is revealed!".to_string());
    lines.push(HEADER.to_string());
    unload(&mut lines);
    announce(&mut lines, "E1M9", "Military Base");
    unload(&mut lines);
    announce(&mut lines, "E1M4", "Command Control");
    unload(&mut lines);
    for (code, name) in [
        ("E1M5", "Phobos Lab"),
        ("E1M6", "Central Processing"),
        ("E1M7", "Computer Station"),
        ("E1M8", "Phobos Anomaly"),
    ] {
        announce(&mut lines, code, name);
        unload(&mut lines);
    }
    lines
}

#[test]
fn a_full_episode_clear_produces_a_chapter_time() {
    let mut grid = RecordGrid::new(&SavedRuns::new()).unwrap();
    let mut decoder = StreamDecoder::new();
    let mut clock = 0;
    let mut finals = 0;

    for line in episode_one_stream() {
        match decoder.feed_line(&line) {
            Some(GameEvent::LevelStarted { code, .. }) => {
                let chapter = grid
                    .chapter_by_number_mut(Category::AnyPercent, Difficulty::UltraViolence, 1)
                    .unwrap();
                chapter.start_timer(at(clock), &code).unwrap();
            }
            Some(GameEvent::LevelFinished) => {
                let chapter = grid
                    .chapter_by_number_mut(Category::AnyPercent, Difficulty::UltraViolence, 1)
                    .unwrap();
                clock += 60;
                let outcome = chapter.stop_timer(at(clock)).unwrap();
                assert!(outcome.is_level_pb);
                if outcome.is_chapter_session {
                    assert!(outcome.is_chapter_pb);
                    finals += 1;
                }
            }
            Some(other) => panic!("unexpected event {other:?}"),
            None => {}
        }
    }

    assert_eq!(finals, 1);
    let chapter = grid
        .chapter(Category::AnyPercent, Difficulty::UltraViolence, "Knee-Deep In The Dead")
        .unwrap();
    // nine levels at sixty seconds each, secret level included
    assert_eq!(chapter.session_time(), Some(secs(9 * 60)));
    assert_eq!(chapter.personal_best(), Some(secs(9 * 60)));
    assert!(chapter.valid_sequence());
    assert!(chapter.is_modified());
}

#[test]
fn a_death_mid_run_spoils_the_chapter_but_keeps_level_bests() {
    let mut grid = RecordGrid::new(&SavedRuns::new()).unwrap();
    let chapter = grid
        .chapter_by_number_mut(Category::AnyPercent, Difficulty::Nightmare, 1)
        .unwrap();

    chapter.start_timer(at(0), "E1M1").unwrap();
    chapter.stop_timer(at(50)).unwrap();
    chapter.start_timer(at(50), "E1M2").unwrap();
    // the player dies; the coordinator aborts
    chapter.abort_timer().unwrap();

    // picking the run back up mid-episode never yields a chapter time
    let mut clock = 100;
    for code in ["E1M2", "E1M3", "E1M4", "E1M5", "E1M6", "E1M7", "E1M8"] {
        chapter.start_timer(at(clock), code).unwrap();
        clock += 45;
        let outcome = chapter.stop_timer(at(clock)).unwrap();
        assert!(!outcome.is_chapter_session);
    }
    assert_eq!(chapter.session_time(), None);
    assert_eq!(chapter.levels()[0].personal_best(), Some(secs(50)));
    assert_eq!(chapter.levels()[1].personal_best(), Some(secs(45)));
}

#[test]
fn bests_survive_a_restart_through_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");

    // first session: set a couple of bests and save
    {
        let mut store = FileRecordStore::with_path(&path);
        let (runs, _) = store.load().unwrap();
        let mut grid = RecordGrid::new(&runs).unwrap();
        let chapter = grid
            .chapter_by_number_mut(Category::Pacifist, Difficulty::HurtMePlenty, 5)
            .unwrap();
        chapter.start_timer(at(0), "MAP01").unwrap();
        chapter.stop_timer(at(42)).unwrap();
        chapter.start_timer(at(42), "MAP02").unwrap();
        chapter.stop_timer(at(90)).unwrap();
        assert!(store
            .save(&grid, &json!({"category": "Pacifist"}))
            .unwrap());
    }

    // second session: the bests are back and beating one persists again
    {
        let mut store = FileRecordStore::with_path(&path);
        let (runs, config) = store.load().unwrap();
        assert_eq!(config["category"], "Pacifist");
        let mut grid = RecordGrid::new(&runs).unwrap();
        {
            let chapter = grid
                .chapter(Category::Pacifist, Difficulty::HurtMePlenty, "Doom 2")
                .unwrap();
            assert_eq!(chapter.levels()[0].personal_best(), Some(secs(42)));
            assert_eq!(chapter.levels()[1].personal_best(), Some(secs(48)));
            assert!(!chapter.is_modified());
        }

        let chapter = grid
            .chapter_by_number_mut(Category::Pacifist, Difficulty::HurtMePlenty, 5)
            .unwrap();
        chapter.start_timer(at(0), "MAP01").unwrap();
        let outcome = chapter.stop_timer(at(30)).unwrap();
        assert!(outcome.is_level_pb);
        assert!(store
            .save(&grid, &json!({"category": "Pacifist"}))
            .unwrap());
    }

    // third session sees the improved best
    {
        let mut store = FileRecordStore::with_path(&path);
        let (runs, _) = store.load().unwrap();
        let grid = RecordGrid::new(&runs).unwrap();
        let chapter = grid
            .chapter(Category::Pacifist, Difficulty::HurtMePlenty, "Doom 2")
            .unwrap();
        assert_eq!(chapter.levels()[0].personal_best(), Some(secs(30)));
    }
}

#[test]
fn reverting_a_freshly_set_best_makes_the_grid_unmodified_again() {
    let mut grid = RecordGrid::new(&SavedRuns::new()).unwrap();
    let chapter = grid
        .chapter_by_number_mut(Category::AnyPercent, Difficulty::TooYoungToDie, 3)
        .unwrap();
    chapter.start_timer(at(0), "E3M1").unwrap();
    chapter.stop_timer(at(25)).unwrap();
    assert!(grid.is_modified());

    let chapter = grid
        .chapter_by_number_mut(Category::AnyPercent, Difficulty::TooYoungToDie, 3)
        .unwrap();
    let level = chapter.level_mut(0).unwrap();
    level.revert_personal_best();
    assert_eq!(level.personal_best(), None);
    assert!(!grid.is_modified());
}
