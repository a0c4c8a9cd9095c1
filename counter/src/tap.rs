use std::time::{Duration, Instant};

use crate::input::{Classifier, InputEvent, TapAction};
use crate::press::PressState;
use crate::score::ScoreBuffer;

/// What an input event changed, so the embedder knows what to re-render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
    pub scored: bool,
    pub press_changed: bool,
}

impl Activity {
    pub const NONE: Activity = Activity {
        scored: false,
        press_changed: false,
    };

    pub fn any(self) -> bool {
        self.scored || self.press_changed
    }
}

/// Classifier, score buffer and press visual wired together.
///
/// Carries no clock and does no I/O; the caller supplies the monotonic `now`
/// with every event, which keeps the cooldown testable and lets an embedder
/// timestamp events at intake rather than at processing.
#[derive(Debug)]
pub struct TapCore {
    classifier: Classifier,
    score: ScoreBuffer,
    press: PressState,
}

impl TapCore {
    pub fn new(initial_total: u64, cooldown: Duration) -> Self {
        Self {
            classifier: Classifier::new(),
            score: ScoreBuffer::new(initial_total, cooldown),
            press: PressState::None,
        }
    }

    pub fn score(&self) -> &ScoreBuffer {
        &self.score
    }

    pub fn score_mut(&mut self) -> &mut ScoreBuffer {
        &mut self.score
    }

    pub fn press(&self) -> PressState {
        self.press
    }

    pub fn handle(&mut self, event: InputEvent, now: Instant) -> Activity {
        match self.classifier.classify(event) {
            TapAction::Score(_) => {
                // Release clears the visual whether or not the increment
                // beats the cooldown.
                Activity {
                    scored: self.score.try_increment(now),
                    press_changed: self.press.clear(),
                }
            }
            TapAction::Press(side) => Activity {
                scored: false,
                press_changed: self.press.set(side),
            },
            TapAction::Release => Activity {
                scored: false,
                press_changed: self.press.clear(),
            },
            TapAction::Ignore => Activity::NONE,
        }
    }
}
