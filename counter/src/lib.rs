pub mod input;
pub mod press;
pub mod score;
pub mod tap;

pub use input::{Classifier, InputEvent, KeyCode, Modifiers, Side, TapAction};
pub use press::PressState;
pub use score::{FlushTicket, ScoreBuffer, ScoreSnapshot};
pub use tap::{Activity, TapCore};
