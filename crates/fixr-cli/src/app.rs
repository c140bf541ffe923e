//! Application controller: owns the session and walks it through upload,
//! negotiation, results and contact capture.

use std::fmt;
use std::future::Future;
use std::path::Path;

use anyhow::{Context, bail};
use fixr_arena::negotiate_until;
use fixr_client::{ClientError, DocumentError, LoanBackend, read_document};
use fixr_core::{
    ArenaConfig, FinalResult, RandomSource, RunEvent, RunInput, Sequencer, Session, Stage,
    UploadDocument, UserDetails,
};
use futures::StreamExt;
use tracing::{info, warn};

/// Shown when the backend rejects an upload without saying why.
pub const GENERIC_UPLOAD_ERROR: &str = "Backend server error. Please try again.";

/// A message the user has to see before carrying on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UploadFailed(Option<String>),
    /// The backend could not be reached, or answered with something unreadable.
    BackendUnreachable(String),
    DetailsSubmitted,
    DetailsFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UploadFailed(message) => write!(
                f,
                "Upload failed: {}",
                message.as_deref().unwrap_or(GENERIC_UPLOAD_ERROR)
            ),
            Self::BackendUnreachable(url) => write!(
                f,
                "Failed to connect to backend server. Please ensure the server is running at {url}."
            ),
            Self::DetailsSubmitted => f.write_str("Your details have been submitted successfully!"),
            Self::DetailsFailed => f.write_str("Failed to submit details. Please try again."),
        }
    }
}

impl std::error::Error for Notice {}

pub struct App<B> {
    backend: B,
    session: Session,
    config: ArenaConfig,
}

impl<B: LoanBackend> App<B> {
    pub fn new(backend: B, config: ArenaConfig) -> Self {
        Self {
            backend,
            session: Session::new(),
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send `document` to the backend and return the run it asks for.
    ///
    /// Every failure puts the session back to idle; backend and transport
    /// failures come back as a [`Notice`].
    pub async fn upload(&mut self, document: &UploadDocument) -> anyhow::Result<RunInput> {
        self.session.begin_upload(&document.file_name)?;
        match self.backend.upload(document).await {
            Ok(backend) => Ok(self.session.upload_succeeded(backend)?),
            Err(err) => {
                warn!(file = %document.file_name, error = %err, "upload failed");
                self.session.upload_failed();
                Err(self.upload_notice(err).into())
            }
        }
    }

    /// Play the negotiation for the uploaded document.
    ///
    /// Returns `None` when `cancel` resolves first; the session is then idle
    /// again, as it is when the run cannot be prepared.
    pub async fn negotiate<S, F>(
        &mut self,
        input: &RunInput,
        source: S,
        cancel: F,
        on_event: impl FnMut(&RunEvent),
    ) -> anyhow::Result<Option<FinalResult>>
    where
        S: RandomSource + Send + 'static,
        F: Future + Send,
        F::Output: Send,
    {
        if !matches!(self.session.stage(), Stage::Negotiating { .. }) {
            bail!("no uploaded document to negotiate (session is {})", self.session.stage().name());
        }
        match play(input, &self.config, source, cancel, on_event).await {
            Ok(Some(result)) => {
                self.session.negotiation_complete(result.clone())?;
                Ok(Some(result))
            }
            Ok(None) => {
                self.session.reset();
                Ok(None)
            }
            Err(err) => {
                self.session.reset();
                Err(err)
            }
        }
    }

    /// Submit contact details along with the negotiated result.
    pub async fn submit_details(&self, details: &UserDetails) -> anyhow::Result<Notice> {
        let result = self
            .session
            .result()
            .context("no negotiated result to submit details for")?;
        match self.backend.submit_user_details(details, result).await {
            Ok(()) => {
                info!(email = %details.email, "details submitted");
                Ok(Notice::DetailsSubmitted)
            }
            Err(err) => {
                warn!(error = %err, "submitting details failed");
                Ok(Notice::DetailsFailed)
            }
        }
    }

    fn upload_notice(&self, err: ClientError) -> Notice {
        match err {
            ClientError::Backend { message, .. } => Notice::UploadFailed(message),
            ClientError::Rejected(reason) => Notice::UploadFailed(Some(reason.to_string())),
            ClientError::Network(_) | ClientError::Json(_) => {
                Notice::BackendUnreachable(self.backend.endpoint().to_string())
            }
        }
    }
}

/// Read `path` for upload. A document the backend would refuse is reported
/// the same way as a refused upload.
pub async fn load_document(path: &Path) -> anyhow::Result<UploadDocument> {
    match read_document(path).await {
        Ok(document) => Ok(document),
        Err(DocumentError::Rejected(reason)) => {
            warn!(path = %path.display(), error = %reason, "document refused");
            Err(Notice::UploadFailed(Some(reason.to_string())).into())
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!("loading {}", path.display()))),
    }
}

/// Run a negotiation to the end (or until `cancel`), handing each event to
/// `on_event` as it happens.
pub async fn play<S, F>(
    input: &RunInput,
    config: &ArenaConfig,
    mut source: S,
    cancel: F,
    mut on_event: impl FnMut(&RunEvent),
) -> anyhow::Result<Option<FinalResult>>
where
    S: RandomSource + Send + 'static,
    F: Future + Send,
    F::Output: Send,
{
    let sequencer = Sequencer::new(input, config.clone(), &mut source)
        .context("preparing negotiation run")?;
    info!(
        file = %input.file_name,
        original = sequencer.terms().original_amount,
        target = sequencer.terms().new_amount,
        "negotiation started"
    );

    let events = negotiate_until(sequencer, source, cancel);
    futures::pin_mut!(events);
    let mut result = None;
    while let Some(event) = events.next().await {
        on_event(&event);
        if let RunEvent::Completed(done) = event {
            result = Some(done);
        }
    }

    match &result {
        Some(done) => info!(savings = done.savings, "negotiation complete"),
        None => info!("negotiation cancelled"),
    }
    Ok(result)
}
