use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use clap::Parser;
use serde_json::{json, Value};

use gzsplit::decoder::GameEvent;
use gzsplit::error::TimerError;
use gzsplit::persist::{FileRecordStore, RecordStore};
use gzsplit::records::{self, Category, Difficulty, RecordGrid};
use gzsplit::runtime::{AppEvent, FixedTicker, LineEventSource, Runner};

const TICK_RATE_MS: u64 = 100;

/// headless speedrun split timer for gzdoom
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Reads gzdoom's `+developer 3` output on stdin, times every level, and keeps per-level and per-chapter personal bests across sessions.\n\nExample: gzdoom +developer 3 | gzsplit -c any-percent -d ultra-violence"
)]
struct Cli {
    /// category to record times under (defaults to the last one used)
    #[clap(short, long, value_enum)]
    category: Option<Category>,

    /// difficulty to record times under (defaults to the last one used)
    #[clap(short, long, value_enum)]
    difficulty: Option<Difficulty>,

    /// path of the save file
    #[clap(short, long)]
    save_file: Option<PathBuf>,
}

struct App {
    grid: RecordGrid,
    category: Category,
    difficulty: Difficulty,
    chapter_number: Option<u8>,
}

impl App {
    fn level_started(&mut self, code: &str, name: &str, now: SystemTime) {
        let number = match records::chapter_number_by_code(code) {
            Ok(number) => number,
            Err(e) => {
                println!("not timing this level: {e}");
                return;
            }
        };
        // follow the game into whatever chapter it announced
        self.chapter_number = Some(number);
        let Some(chapter) = self.current_chapter_mut() else {
            return;
        };
        if let Err(e) = chapter.start_timer(now, code) {
            match e {
                TimerError::BadState(_) => {
                    // a new level began while one was still timing; the old
                    // attempt is dead, so drop it and time the new one
                    if chapter.abort_timer().is_err()
                        || chapter.start_timer(now, code).is_err()
                    {
                        println!("could not start the timer for {code}");
                        return;
                    }
                }
                other => {
                    println!("could not start the timer for {code}: {other}");
                    return;
                }
            }
        }
        println!("new level started: {code} {name}");
    }

    fn level_finished(&mut self, now: SystemTime) {
        let Some(chapter) = self.current_chapter_mut() else {
            println!("level finished with nothing being timed");
            return;
        };
        match chapter.stop_timer(now) {
            Ok(outcome) => {
                let level = &chapter.levels()[outcome.level];
                if let Some(time) = level.session_time() {
                    println!("{} finished in {time}", level.name());
                }
                if outcome.is_level_pb {
                    println!("new personal best for {}!", level.name());
                } else if let Some(diff) = level.diff() {
                    println!("off the best by {diff}");
                }
                if outcome.is_chapter_session {
                    if let Some(total) = chapter.session_time() {
                        println!("complete chapter time for {}: {total}", chapter.name());
                    }
                    if outcome.is_chapter_pb {
                        println!("new chapter personal best!");
                    } else if let Some(diff) = chapter.diff() {
                        println!("chapter is off the best by {diff}");
                    }
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    fn abort_run(&mut self, reason: &str) {
        if let Some(chapter) = self.current_chapter_mut() {
            if let Err(e) = chapter.abort_timer() {
                println!("{e}");
            }
        }
        println!("{reason}");
    }

    fn on_tick(&self) {
        let Some(chapter) = self.current_chapter() else {
            return;
        };
        // only a display refresh; with no level timing there is nothing to show
        if let Ok(time) = chapter.current_time() {
            print!("\r{time} ");
            let _ = io::stdout().flush();
        }
    }

    fn current_chapter(&self) -> Option<&gzsplit::chapter::Chapter> {
        let number = self.chapter_number?;
        self.grid
            .chapter_by_number(self.category, self.difficulty, number)
            .ok()
    }

    fn current_chapter_mut(&mut self) -> Option<&mut gzsplit::chapter::Chapter> {
        let number = self.chapter_number?;
        self.grid
            .chapter_by_number_mut(self.category, self.difficulty, number)
            .ok()
    }

    /// Selection state carried across sessions inside the save file.
    fn gui_config(&self) -> Value {
        json!({
            "category": self.category.to_string(),
            "difficulty": self.difficulty.to_string(),
            "chapter_name": self
                .chapter_number
                .and_then(|number| records::chapter_name_by_number(number).ok()),
        })
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut store = cli
        .save_file
        .as_ref()
        .map(FileRecordStore::with_path)
        .unwrap_or_default();
    let (runs, gui_config) = store.load()?;
    if runs.is_empty() {
        println!("no records found at {}, starting fresh", store.path().display());
    }
    let grid = RecordGrid::new(&runs)?;

    let category = cli
        .category
        .or_else(|| {
            gui_config
                .get("category")
                .and_then(Value::as_str)
                .and_then(Category::from_name)
        })
        .unwrap_or(Category::AnyPercent);
    let difficulty = cli
        .difficulty
        .or_else(|| {
            gui_config
                .get("difficulty")
                .and_then(Value::as_str)
                .and_then(Difficulty::from_name)
        })
        .unwrap_or(Difficulty::TooYoungToDie);

    let mut app = App {
        grid,
        category,
        difficulty,
        chapter_number: None,
    };
    println!("recording {} / {}", app.category, app.difficulty);

    let runner = Runner::new(
        LineEventSource::new(io::stdin()),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    loop {
        match runner.step() {
            AppEvent::Game(GameEvent::ProcessStarted) => {
                println!("reading the game's output stream");
            }
            AppEvent::Game(GameEvent::LevelStarted { code, name }) => {
                app.level_started(&code, &name, SystemTime::now());
            }
            AppEvent::Game(GameEvent::LevelFinished) => {
                app.level_finished(SystemTime::now());
            }
            AppEvent::Game(GameEvent::PlayerDied) => {
                app.abort_run("player died, run aborted");
            }
            AppEvent::Game(GameEvent::ProcessExited) => {
                app.abort_run("game exited");
                break;
            }
            AppEvent::Tick => app.on_tick(),
        }
    }

    if store.save(&app.grid, &app.gui_config())? {
        println!("records saved to {}", store.path().display());
    }
    Ok(())
}
