//! Application session: which screen the visitor is on and what it holds.
//!
//! Transitions are explicit methods; calling one from the wrong stage is an
//! [`ArenaError::InvalidTransition`] and leaves the session untouched.
//! Failures and resets always land back on [`Stage::Idle`], dropping the
//! uploaded document and any result.

use tracing::info;

use crate::error::{ArenaError, Result};
use crate::model::{BackendResult, FinalResult, RunInput};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Stage {
    #[default]
    Idle,
    Uploading {
        file_name: String,
    },
    Negotiating {
        file_name: String,
        backend: BackendResult,
    },
    ShowingResults {
        result: FinalResult,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading { .. } => "uploading",
            Self::Negotiating { .. } => "negotiating",
            Self::ShowingResults { .. } => "showing results",
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    stage: Stage,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The negotiated result, once the run has completed.
    pub fn result(&self) -> Option<&FinalResult> {
        match &self.stage {
            Stage::ShowingResults { result } => Some(result),
            _ => None,
        }
    }

    pub fn begin_upload(&mut self, file_name: &str) -> Result<()> {
        self.expect(matches!(self.stage, Stage::Idle), "start an upload")?;
        self.enter(Stage::Uploading {
            file_name: file_name.to_string(),
        });
        Ok(())
    }

    /// Record the backend's answer and hand back the run parameters.
    pub fn upload_succeeded(&mut self, backend: BackendResult) -> Result<RunInput> {
        let Stage::Uploading { file_name } = &self.stage else {
            return Err(self.invalid("accept an upload result"));
        };
        let file_name = file_name.clone();
        let input = RunInput::from_backend(&file_name, &backend);
        self.enter(Stage::Negotiating { file_name, backend });
        Ok(input)
    }

    pub fn upload_failed(&mut self) {
        self.enter(Stage::Idle);
    }

    pub fn negotiation_complete(&mut self, result: FinalResult) -> Result<()> {
        self.expect(
            matches!(self.stage, Stage::Negotiating { .. }),
            "show results",
        )?;
        self.enter(Stage::ShowingResults { result });
        Ok(())
    }

    pub fn reset(&mut self) {
        self.enter(Stage::Idle);
    }

    fn enter(&mut self, stage: Stage) {
        info!(from = self.stage.name(), to = stage.name(), "session transition");
        self.stage = stage;
    }

    fn expect(&self, allowed: bool, action: &'static str) -> Result<()> {
        if allowed { Ok(()) } else { Err(self.invalid(action)) }
    }

    fn invalid(&self, action: &'static str) -> ArenaError {
        ArenaError::InvalidTransition {
            stage: self.stage.name(),
            action,
        }
    }
}
