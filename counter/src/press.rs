use serde::{Deserialize, Serialize};

use crate::input::Side;

/// Mutually exclusive presentation states for the tap visual.
///
/// Setting a side replaces whatever was shown before; there is never more
/// than one active state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressState {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl PressState {
    pub fn from_side(side: Side) -> Self {
        match side {
            Side::Left => PressState::Left,
            Side::Right => PressState::Right,
            Side::Both => PressState::Both,
        }
    }

    pub fn is_pressed(self) -> bool {
        self != PressState::None
    }

    /// Returns whether the visible state actually changed.
    pub fn set(&mut self, side: Side) -> bool {
        let next = Self::from_side(side);
        let changed = *self != next;
        *self = next;
        changed
    }

    /// Returns whether the visible state actually changed.
    pub fn clear(&mut self) -> bool {
        let changed = self.is_pressed();
        *self = PressState::None;
        changed
    }
}
