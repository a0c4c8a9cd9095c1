pub mod config;
pub mod remote;
pub mod runtime;
pub mod serde_duration;
pub mod session;

pub use config::{ConfigStore, SessionConfig};
pub use remote::{HttpScoreAuthority, ScoreAuthority, SyncError};
pub use runtime::{SessionClosed, SessionHandle, spawn_session};
pub use session::{FlushOutcome, PressDisplay, ScoreDisplay, SessionSnapshot, TapSession};
