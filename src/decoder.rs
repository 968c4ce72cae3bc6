/// Literal lines matched in gzdoom's `+developer 3` output.
const HEADER: &str = "----------------------------------------";
const SECRET_REVEALED: &str = "A secret is revealed!";
const LEVEL_UNLOADING: &str = "Starting all scripts of type 13 (Unloading)";
const PLAYER_DEATH: &str = "Starting all scripts of type 3 (Death)";

/// Something the game told us. The timing core receives nothing else from
/// the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    ProcessStarted,
    LevelStarted { code: String, name: String },
    LevelFinished,
    PlayerDied,
    ProcessExited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    AfterHeader,
}

/// Line classifier for the diagnostic stream.
///
/// A level announcement is a header line, a blank line, then `CODE - Name`.
/// A secret-reveal message is followed by its own closing header, which must
/// not be mistaken for the start of an announcement. A malformed
/// announcement never wedges the decoder: one failed parse drops back to
/// scanning, trading a missed level start for resynchronization.
#[derive(Debug)]
pub struct StreamDecoder {
    state: State,
    skip_next_header: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Scanning,
            skip_next_header: false,
        }
    }

    /// Classify one line, given without its trailing newline.
    pub fn feed_line(&mut self, line: &str) -> Option<GameEvent> {
        // script triggers fire in any state and leave it untouched
        if line == LEVEL_UNLOADING {
            return Some(GameEvent::LevelFinished);
        }
        if line == PLAYER_DEATH {
            return Some(GameEvent::PlayerDied);
        }

        match self.state {
            State::Scanning => {
                if line == HEADER {
                    if self.skip_next_header {
                        // consume the header that closes a secret-reveal block
                        self.skip_next_header = false;
                    } else {
                        self.state = State::AfterHeader;
                    }
                }
                None
            }
            State::AfterHeader => {
                if line.is_empty() {
                    // the blank line between the header and the announcement
                    return None;
                }
                if line == SECRET_REVEALED {
                    self.skip_next_header = true;
                    self.state = State::Scanning;
                    return None;
                }
                self.state = State::Scanning;
                let mut parts = line.trim().split(" - ");
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(code), Some(name), None) => Some(GameEvent::LevelStarted {
                        code: code.to_string(),
                        name: name.to_string(),
                    }),
                    _ => None,
                }
            }
        }
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}
