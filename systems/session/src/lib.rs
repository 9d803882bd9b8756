#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure top-level session system that drives the Gridblast state machine.
//!
//! The session consumes one [`FrameInput`] per rendered frame and emits the
//! command batch the world should execute. Simulation time only advances
//! while the session is in [`SessionState::Running`]; the menu, countdown,
//! and pause states swallow the frame without producing a `Tick`.

use std::time::Duration;

use gridblast_core::{Command, Direction, PlayerId};
use log::debug;

/// Entries shown on the main menu, in display order.
pub const MENU_OPTIONS: [&str; 2] = ["Neues Spiel", "Beenden"];

const COUNTDOWN: Duration = Duration::from_secs(3);

/// Top-level game states reachable during a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Navigating the main menu; no simulation time passes.
    MainMenu,
    /// Pre-round countdown shown after starting a new game.
    Countdown,
    /// The round is live; every frame becomes one simulation tick.
    Running,
    /// The round is frozen until the pause toggle fires again.
    Paused,
    /// Terminal state; the adapter should tear the process down.
    Exit,
}

/// Action a single player requested on this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    /// Start walking one tile in the given direction.
    Move(Direction),
    /// Arm a bomb on the player's current tile.
    PlantBomb,
}

/// One player's intent for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerIntent {
    /// Player the intent belongs to.
    pub player: PlayerId,
    /// Requested action.
    pub action: PlayerAction,
}

/// Input snapshot distilled from adapter-provided device events.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Move the menu cursor up one entry.
    pub menu_up: bool,
    /// Move the menu cursor down one entry.
    pub menu_down: bool,
    /// Confirm the highlighted menu entry.
    pub menu_select: bool,
    /// Flip between running and paused.
    pub pause_toggle: bool,
    /// Per-player movement and bomb intents.
    pub intents: Vec<PlayerIntent>,
}

/// Pure system owning the menu/countdown/running/pause state machine.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    selected_option: usize,
    countdown: Duration,
}

impl Session {
    /// Creates a new session sitting on the main menu.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::MainMenu,
            selected_option: 0,
            countdown: COUNTDOWN,
        }
    }

    /// Consumes one frame of input and emits the commands for this frame.
    ///
    /// Player intents are pushed before the `Tick`, so a move requested this
    /// frame starts progressing within the same frame.
    pub fn handle(&mut self, input: &FrameInput, dt: Duration, out: &mut Vec<Command>) {
        match self.state {
            SessionState::MainMenu => {
                let options = MENU_OPTIONS.len();
                if input.menu_up {
                    self.selected_option = (self.selected_option + options - 1) % options;
                }
                if input.menu_down {
                    self.selected_option = (self.selected_option + 1) % options;
                }
                if input.menu_select {
                    if self.selected_option == 0 {
                        self.countdown = COUNTDOWN;
                        self.transition(SessionState::Countdown);
                    } else {
                        self.transition(SessionState::Exit);
                    }
                }
            }
            SessionState::Countdown => {
                self.countdown = self.countdown.saturating_sub(dt);
                if self.countdown.is_zero() {
                    self.transition(SessionState::Running);
                }
            }
            SessionState::Running => {
                if input.pause_toggle {
                    self.transition(SessionState::Paused);
                    return;
                }
                for intent in &input.intents {
                    out.push(match intent.action {
                        PlayerAction::Move(direction) => Command::MovePlayer {
                            player: intent.player,
                            direction,
                        },
                        PlayerAction::PlantBomb => Command::PlantBomb {
                            player: intent.player,
                        },
                    });
                }
                out.push(Command::Tick { dt });
            }
            SessionState::Paused => {
                if input.pause_toggle {
                    self.transition(SessionState::Running);
                }
            }
            SessionState::Exit => {}
        }
    }

    /// Current position of the state machine.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Menu entry the cursor currently highlights.
    #[must_use]
    pub const fn selected_option(&self) -> usize {
        self.selected_option
    }

    /// Time left on the pre-round countdown.
    #[must_use]
    pub const fn countdown_remaining(&self) -> Duration {
        self.countdown
    }

    /// Reports whether the session reached its terminal state.
    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.state == SessionState::Exit
    }

    fn transition(&mut self, next: SessionState) {
        debug!("session state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
