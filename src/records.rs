use std::collections::HashMap;

use clap::ValueEnum;

use crate::chapter::Chapter;
use crate::error::TimerError;
use crate::level;
use crate::persist::SavedRuns;

/// Run-rule variants times are recorded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, strum_macros::Display)]
pub enum Category {
    #[strum(serialize = "Any%")]
    AnyPercent,
    #[strum(serialize = "100%")]
    HundredPercent,
    Pacifist,
    Noclip,
}

pub const CATEGORIES: [Category; 4] = [
    Category::AnyPercent,
    Category::HundredPercent,
    Category::Pacifist,
    Category::Noclip,
];

/// Game skill settings; each gets its own set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, strum_macros::Display)]
pub enum Difficulty {
    #[strum(serialize = "I'm Too Young To Die")]
    TooYoungToDie,
    #[strum(serialize = "Hey, Not Too Rough")]
    NotTooRough,
    #[strum(serialize = "Hurt Me Plenty")]
    HurtMePlenty,
    #[strum(serialize = "Ultra-Violence")]
    UltraViolence,
    #[strum(serialize = "Nightmare!")]
    Nightmare,
}

pub const DIFFICULTIES: [Difficulty; 5] = [
    Difficulty::TooYoungToDie,
    Difficulty::NotTooRough,
    Difficulty::HurtMePlenty,
    Difficulty::UltraViolence,
    Difficulty::Nightmare,
];

impl Category {
    /// Match a display name, e.g. from a save file.
    pub fn from_name(name: &str) -> Option<Self> {
        CATEGORIES.into_iter().find(|c| c.to_string() == name)
    }
}

impl Difficulty {
    pub fn from_name(name: &str) -> Option<Self> {
        DIFFICULTIES.into_iter().find(|d| d.to_string() == name)
    }
}

pub const CHAPTER_NAMES: [&str; 5] = [
    "Knee-Deep In The Dead",
    "The Shores of Hell",
    "Inferno",
    "Thy Flesh Consumed",
    "Doom 2",
];

pub fn chapter_name_by_number(number: u8) -> Result<&'static str, TimerError> {
    number
        .checked_sub(1)
        .and_then(|i| CHAPTER_NAMES.get(i as usize))
        .copied()
        .ok_or_else(|| TimerError::NotFound(format!("chapter {number}")))
}

pub fn chapter_number_by_name(name: &str) -> Result<u8, TimerError> {
    CHAPTER_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| i as u8 + 1)
        .ok_or_else(|| TimerError::NotFound(name.to_string()))
}

pub fn chapter_number_by_code(code: &str) -> Result<u8, TimerError> {
    Ok(level::parse_code(code)?.0)
}

pub fn chapter_name_by_code(code: &str) -> Result<&'static str, TimerError> {
    chapter_name_by_number(chapter_number_by_code(code)?)
}

/// Every record in the database, keyed by category and difficulty.
///
/// All category x difficulty x chapter slots exist from construction;
/// chapters with no saved data are blank. The grid exclusively owns its
/// chapters and, through them, every level.
#[derive(Debug)]
pub struct RecordGrid {
    grid: HashMap<(Category, Difficulty), Vec<Chapter>>,
}

impl RecordGrid {
    /// Hydrate the grid from saved runs. Unknown category or difficulty
    /// keys in the input are ignored; missing ones mean no recorded data.
    pub fn new(saved: &SavedRuns) -> Result<Self, TimerError> {
        let mut grid = HashMap::new();
        for category in CATEGORIES {
            let saved_category = saved.get(&category.to_string());
            for difficulty in DIFFICULTIES {
                let saved_chapters =
                    saved_category.and_then(|diffs| diffs.get(&difficulty.to_string()));
                let mut chapters = Vec::with_capacity(CHAPTER_NAMES.len());
                for number in 1..=CHAPTER_NAMES.len() as u8 {
                    let entry = saved_chapters
                        .and_then(|list| list.iter().find(|c| c.chapter_number == number));
                    chapters.push(Chapter::new(number, entry)?);
                }
                grid.insert((category, difficulty), chapters);
            }
        }
        Ok(Self { grid })
    }

    pub fn chapter(
        &self,
        category: Category,
        difficulty: Difficulty,
        chapter_name: &str,
    ) -> Result<&Chapter, TimerError> {
        let number = chapter_number_by_name(chapter_name)?;
        Ok(&self.slot(category, difficulty)[number as usize - 1])
    }

    pub fn chapter_mut(
        &mut self,
        category: Category,
        difficulty: Difficulty,
        chapter_name: &str,
    ) -> Result<&mut Chapter, TimerError> {
        let number = chapter_number_by_name(chapter_name)?;
        Ok(&mut self.slot_mut(category, difficulty)[number as usize - 1])
    }

    pub fn chapter_by_number(
        &self,
        category: Category,
        difficulty: Difficulty,
        number: u8,
    ) -> Result<&Chapter, TimerError> {
        let index = Self::chapter_index(number)?;
        Ok(&self.slot(category, difficulty)[index])
    }

    pub fn chapter_by_number_mut(
        &mut self,
        category: Category,
        difficulty: Difficulty,
        number: u8,
    ) -> Result<&mut Chapter, TimerError> {
        let index = Self::chapter_index(number)?;
        Ok(&mut self.slot_mut(category, difficulty)[index])
    }

    /// Every chapter in the grid, in enumeration order.
    pub fn chapters(&self) -> impl Iterator<Item = (Category, Difficulty, &Chapter)> + '_ {
        CATEGORIES.into_iter().flat_map(move |category| {
            DIFFICULTIES.into_iter().flat_map(move |difficulty| {
                self.slot(category, difficulty)
                    .iter()
                    .map(move |chapter| (category, difficulty, chapter))
            })
        })
    }

    pub fn is_modified(&self) -> bool {
        self.chapters().any(|(_, _, chapter)| chapter.is_modified())
    }

    /// Wire form of the grid. Chapters with nothing recorded are skipped,
    /// and so are category/difficulty keys left with no chapters at all.
    pub fn to_saved(&self) -> SavedRuns {
        let mut runs = SavedRuns::new();
        for (category, difficulty, chapter) in self.chapters() {
            if let Ok(saved) = chapter.serialize() {
                runs.entry(category.to_string())
                    .or_default()
                    .entry(difficulty.to_string())
                    .or_default()
                    .push(saved);
            }
        }
        runs
    }

    fn chapter_index(number: u8) -> Result<usize, TimerError> {
        if (1..=CHAPTER_NAMES.len() as u8).contains(&number) {
            Ok(number as usize - 1)
        } else {
            Err(TimerError::NotFound(format!("chapter {number}")))
        }
    }

    // the constructor fills every key, so indexing cannot miss
    fn slot(&self, category: Category, difficulty: Difficulty) -> &[Chapter] {
        &self.grid[&(category, difficulty)]
    }

    fn slot_mut(&mut self, category: Category, difficulty: Difficulty) -> &mut Vec<Chapter> {
        self.grid
            .get_mut(&(category, difficulty))
            .expect("grid slots are fixed at construction")
    }
}
