use serde::{Deserialize, Serialize};

/// Logical press side. Drives the press visual only; counting never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Both,
}

/// Keys the classifier can tell apart. Anything it has no opinion on is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCode {
    Space,
    Enter,
    /// Top-row digit 0-9.
    Digit(u8),
    /// Numpad digit 0-9.
    Numpad(u8),
    /// A single character key, as typed (case preserved).
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn any(self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Raw input relative to the tap surface.
///
/// `in_text_entry` is true when the event was destined for a text-editing
/// element (input, textarea, content-editable); such keystrokes belong to
/// typing, never to scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerDown {
        primary: bool,
    },
    PointerUp {
        primary: bool,
    },
    PointerCancel,
    PointerLeave,
    ContextMenu,
    KeyDown {
        key: KeyCode,
        modifiers: Modifiers,
        repeat: bool,
        in_text_entry: bool,
    },
    KeyUp {
        key: KeyCode,
        modifiers: Modifiers,
        in_text_entry: bool,
    },
}

/// What an input event means to the counter.
///
/// `Score` fires on release and both counts and clears the press visual;
/// `Press`/`Release` only move the visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapAction {
    Score(Side),
    Press(Side),
    Release,
    Ignore,
}

// Static hand-split of the QWERTY letter rows. `b` belongs to the left
// index finger.
const LEFT_CHARS: &[char] = &[
    'q', 'w', 'e', 'r', 't', 'a', 's', 'd', 'f', 'g', 'z', 'x', 'c', 'v', 'b',
];
const RIGHT_CHARS: &[char] = &['y', 'u', 'i', 'o', 'p', 'h', 'j', 'k', 'l', 'n', 'm'];

/// Side a key maps to, or `None` when the key can never score.
pub fn side_for_key(key: KeyCode) -> Option<Side> {
    match key {
        KeyCode::Space | KeyCode::Enter => Some(Side::Both),
        KeyCode::Digit(d) | KeyCode::Numpad(d) => match d {
            1..=5 => Some(Side::Left),
            0 | 6..=9 => Some(Side::Right),
            _ => None,
        },
        KeyCode::Char(c) => {
            if !c.is_ascii_alphanumeric() {
                return None;
            }
            let lower = c.to_ascii_lowercase();
            if LEFT_CHARS.contains(&lower) {
                Some(Side::Left)
            } else if RIGHT_CHARS.contains(&lower) {
                Some(Side::Right)
            } else {
                // Digits arriving as characters, and anything else single and
                // alphanumeric, falls back to the right hand.
                match lower {
                    '1'..='5' => Some(Side::Left),
                    _ => Some(Side::Right),
                }
            }
        }
        KeyCode::Other => None,
    }
}

/// Turns raw events into tap actions.
///
/// Holds one bit of state: whether a primary pointer press is currently armed
/// on the tap surface. Only a press-then-release cycle counts; cancel, leave
/// and context-menu all disarm.
#[derive(Debug, Default)]
pub struct Classifier {
    pointer_armed: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, event: InputEvent) -> TapAction {
        match event {
            InputEvent::PointerDown { primary: true } => {
                self.pointer_armed = true;
                TapAction::Press(Side::Both)
            }
            InputEvent::PointerDown { primary: false } => TapAction::Ignore,
            InputEvent::PointerUp { primary: true } => {
                if self.pointer_armed {
                    self.pointer_armed = false;
                    TapAction::Score(Side::Both)
                } else {
                    TapAction::Ignore
                }
            }
            InputEvent::PointerUp { primary: false } => TapAction::Ignore,
            InputEvent::PointerCancel | InputEvent::PointerLeave | InputEvent::ContextMenu => {
                self.pointer_armed = false;
                TapAction::Release
            }
            InputEvent::KeyDown {
                key,
                modifiers,
                repeat: _,
                in_text_entry,
            } => {
                // OS auto-repeat re-presses sustain the visual but counting
                // happens at key-up, so repeats can never double-count.
                if in_text_entry || modifiers.any() {
                    return TapAction::Ignore;
                }
                match side_for_key(key) {
                    Some(side) => TapAction::Press(side),
                    None => TapAction::Ignore,
                }
            }
            InputEvent::KeyUp {
                key,
                modifiers,
                in_text_entry,
            } => {
                let Some(side) = side_for_key(key) else {
                    return TapAction::Ignore;
                };
                if in_text_entry || modifiers.any() {
                    // The key could have set the visual on its way down;
                    // clear it rather than leaving it stuck.
                    return TapAction::Release;
                }
                TapAction::Score(side)
            }
        }
    }
}

/// Whether the embedder should swallow the platform's default reaction:
/// space scrolls the page, context-menu breaks the pressed state.
pub fn wants_default_suppressed(event: InputEvent) -> bool {
    match event {
        InputEvent::ContextMenu => true,
        InputEvent::KeyDown {
            key: KeyCode::Space,
            in_text_entry,
            ..
        } => !in_text_entry,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_down(key: KeyCode) -> InputEvent {
        InputEvent::KeyDown {
            key,
            modifiers: Modifiers::NONE,
            repeat: false,
            in_text_entry: false,
        }
    }

    fn key_up(key: KeyCode) -> InputEvent {
        InputEvent::KeyUp {
            key,
            modifiers: Modifiers::NONE,
            in_text_entry: false,
        }
    }

    #[test]
    fn digits_split_left_and_right() {
        assert_eq!(side_for_key(KeyCode::Digit(1)), Some(Side::Left));
        assert_eq!(side_for_key(KeyCode::Digit(5)), Some(Side::Left));
        assert_eq!(side_for_key(KeyCode::Digit(6)), Some(Side::Right));
        assert_eq!(side_for_key(KeyCode::Digit(0)), Some(Side::Right));
        assert_eq!(side_for_key(KeyCode::Numpad(3)), Some(Side::Left));
        assert_eq!(side_for_key(KeyCode::Numpad(8)), Some(Side::Right));
    }

    #[test]
    fn qwerty_blocks_map_to_hands() {
        assert_eq!(side_for_key(KeyCode::Char('q')), Some(Side::Left));
        assert_eq!(side_for_key(KeyCode::Char('b')), Some(Side::Left));
        assert_eq!(side_for_key(KeyCode::Char('p')), Some(Side::Right));
        assert_eq!(side_for_key(KeyCode::Char('m')), Some(Side::Right));
        // Case does not change the hand.
        assert_eq!(side_for_key(KeyCode::Char('Q')), Some(Side::Left));
    }

    #[test]
    fn space_and_enter_are_both_hands() {
        assert_eq!(side_for_key(KeyCode::Space), Some(Side::Both));
        assert_eq!(side_for_key(KeyCode::Enter), Some(Side::Both));
    }

    #[test]
    fn non_alphanumeric_chars_never_score() {
        assert_eq!(side_for_key(KeyCode::Char('-')), None);
        assert_eq!(side_for_key(KeyCode::Char('é')), None);
        assert_eq!(side_for_key(KeyCode::Other), None);
    }

    #[test]
    fn key_up_scores_key_down_presses() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(key_down(KeyCode::Space)),
            TapAction::Press(Side::Both)
        );
        assert_eq!(
            c.classify(key_up(KeyCode::Space)),
            TapAction::Score(Side::Both)
        );
    }

    #[test]
    fn modifier_chords_are_ignored_on_the_way_down() {
        let mut c = Classifier::new();
        let chord = InputEvent::KeyDown {
            key: KeyCode::Char('a'),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
            repeat: false,
            in_text_entry: false,
        };
        assert_eq!(c.classify(chord), TapAction::Ignore);
    }

    #[test]
    fn modifier_on_key_up_releases_instead_of_scoring() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(key_down(KeyCode::Char('f'))),
            TapAction::Press(Side::Left)
        );
        let up_with_ctrl = InputEvent::KeyUp {
            key: KeyCode::Char('f'),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
            in_text_entry: false,
        };
        assert_eq!(c.classify(up_with_ctrl), TapAction::Release);
    }

    #[test]
    fn text_entry_keystrokes_never_score() {
        let mut c = Classifier::new();
        let down = InputEvent::KeyDown {
            key: KeyCode::Char('a'),
            modifiers: Modifiers::NONE,
            repeat: false,
            in_text_entry: true,
        };
        let up = InputEvent::KeyUp {
            key: KeyCode::Char('a'),
            modifiers: Modifiers::NONE,
            in_text_entry: true,
        };
        assert_eq!(c.classify(down), TapAction::Ignore);
        assert_eq!(c.classify(up), TapAction::Release);
    }

    #[test]
    fn auto_repeat_sustains_press_without_scoring() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(key_down(KeyCode::Char('j'))),
            TapAction::Press(Side::Right)
        );
        let repeat = InputEvent::KeyDown {
            key: KeyCode::Char('j'),
            modifiers: Modifiers::NONE,
            repeat: true,
            in_text_entry: false,
        };
        // Repeats keep the visual alive; only the eventual key-up scores.
        assert_eq!(c.classify(repeat), TapAction::Press(Side::Right));
        assert_eq!(
            c.classify(key_up(KeyCode::Char('j'))),
            TapAction::Score(Side::Right)
        );
    }

    #[test]
    fn pointer_press_then_release_scores_both() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(InputEvent::PointerDown { primary: true }),
            TapAction::Press(Side::Both)
        );
        assert_eq!(
            c.classify(InputEvent::PointerUp { primary: true }),
            TapAction::Score(Side::Both)
        );
    }

    #[test]
    fn pointer_release_without_press_does_not_score() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(InputEvent::PointerUp { primary: true }),
            TapAction::Ignore
        );
    }

    #[test]
    fn leave_and_cancel_disarm_the_pointer() {
        for interrupt in [
            InputEvent::PointerCancel,
            InputEvent::PointerLeave,
            InputEvent::ContextMenu,
        ] {
            let mut c = Classifier::new();
            assert_eq!(
                c.classify(InputEvent::PointerDown { primary: true }),
                TapAction::Press(Side::Both)
            );
            assert_eq!(c.classify(interrupt), TapAction::Release);
            // The later release no longer completes a cycle.
            assert_eq!(
                c.classify(InputEvent::PointerUp { primary: true }),
                TapAction::Ignore
            );
        }
    }

    #[test]
    fn secondary_button_is_ignored() {
        let mut c = Classifier::new();
        assert_eq!(
            c.classify(InputEvent::PointerDown { primary: false }),
            TapAction::Ignore
        );
        assert_eq!(
            c.classify(InputEvent::PointerUp { primary: false }),
            TapAction::Ignore
        );
    }

    #[test]
    fn space_down_and_context_menu_suppress_defaults() {
        assert!(wants_default_suppressed(key_down(KeyCode::Space)));
        assert!(wants_default_suppressed(InputEvent::ContextMenu));
        assert!(!wants_default_suppressed(key_down(KeyCode::Enter)));
        let typing = InputEvent::KeyDown {
            key: KeyCode::Space,
            modifiers: Modifiers::NONE,
            repeat: false,
            in_text_entry: true,
        };
        assert!(!wants_default_suppressed(typing));
    }
}
