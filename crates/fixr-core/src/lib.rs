pub mod config;
pub mod error;
pub mod model;
pub mod money;
pub mod random;
pub mod sequencer;
pub mod session;
pub mod terms;

pub use config::ArenaConfig;
pub use error::{ArenaError, Result};
pub use model::{Agent, BackendResult, FinalResult, RunInput, UploadDocument, UserDetails};
pub use random::{RandomSource, ScriptedSource};
pub use sequencer::{RunEvent, Sequencer, Step};
pub use session::{Session, Stage};
pub use terms::{Terms, resolve_terms};
