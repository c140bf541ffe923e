//! Shared types exchanged between the arena, the REST backend, and the front end.

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, Result};

/// Fixed, ordered agent roster. Ids are 1-based positions in this list.
pub const AGENT_NAMES: [&str; 12] = [
    "Agent_Alpha",
    "Agent_Beta",
    "Agent_Gamma",
    "Agent_Delta",
    "Agent_Epsilon",
    "Agent_Zeta",
    "Agent_Eta",
    "Agent_Theta",
    "Agent_Iota",
    "Agent_Kappa",
    "Agent_Lambda",
    "Agent_Mu",
];

/// Largest document the upload endpoint accepts.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// A simulated negotiator.
///
/// `best_offer` only ever moves down; `current_offer` follows whatever the
/// agent last bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: u32,
    pub name: String,
    pub current_offer: u64,
    pub best_offer: u64,
    pub is_active: bool,
}

impl Agent {
    /// The first `count` roster agents, all opening at `opening_offer`.
    pub fn roster(count: usize, opening_offer: u64) -> Vec<Agent> {
        AGENT_NAMES
            .iter()
            .take(count)
            .zip(1..)
            .map(|(name, id)| Agent {
                id,
                name: (*name).to_string(),
                current_offer: opening_offer,
                best_offer: opening_offer,
                is_active: true,
            })
            .collect()
    }

    pub fn record_offer(&mut self, offer: u64) {
        self.current_offer = offer;
        if offer < self.best_offer {
            self.best_offer = offer;
        }
    }
}

/// The negotiated outcome handed to the results screen and, verbatim, to
/// `POST /api/user-details` as `loanResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub original_amount: u64,
    pub new_amount: u64,
    pub savings: u64,
    pub savings_percentage: f64,
    pub interest_rate: String,
    pub tenure: String,
    pub provider: String,
    pub product: String,
    /// ISO 8601 timestamp string.
    pub processed_at: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body of a successful `POST /api/upload`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendResult {
    pub original_amount: Option<f64>,
    pub new_amount: Option<f64>,
    pub savings: Option<f64>,
    pub savings_percentage: Option<f64>,
    pub interest_rate: Option<String>,
    pub tenure: Option<String>,
    pub provider: Option<String>,
    pub product: Option<String>,
    pub processed_at: Option<String>,
    pub file_name: Option<String>,
    pub note: Option<String>,
}

/// Parameters of one negotiation run.
///
/// Amounts are signed so malformed caller values can be reported instead of
/// silently wrapping; they are checked when the run is prepared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInput {
    /// Name of the uploaded document, shown while "analyzing".
    pub file_name: String,
    /// File name reported by the backend, if it differs from the upload.
    pub reported_file_name: Option<String>,
    pub original_amount: Option<i64>,
    pub new_amount: Option<i64>,
    pub savings: Option<i64>,
    pub savings_percentage: Option<f64>,
    pub interest_rate: Option<String>,
    pub tenure: Option<String>,
    pub provider: Option<String>,
    pub product: Option<String>,
    pub processed_at: Option<String>,
    pub note: Option<String>,
}

impl RunInput {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Map an upload response onto run parameters.
    ///
    /// Zero, non-finite and empty values count as absent, so a sparse
    /// backend answer degrades into the fallback policy field by field.
    pub fn from_backend(file_name: &str, backend: &BackendResult) -> Self {
        Self {
            file_name: file_name.to_string(),
            reported_file_name: present_text(&backend.file_name),
            original_amount: present_amount(backend.original_amount),
            new_amount: present_amount(backend.new_amount),
            savings: present_amount(backend.savings),
            savings_percentage: backend
                .savings_percentage
                .filter(|p| p.is_finite() && *p != 0.0),
            interest_rate: present_text(&backend.interest_rate),
            tenure: present_text(&backend.tenure),
            provider: present_text(&backend.provider),
            product: present_text(&backend.product),
            processed_at: present_text(&backend.processed_at),
            note: present_text(&backend.note),
        }
    }
}

fn present_amount(value: Option<f64>) -> Option<i64> {
    value
        .filter(|v| v.is_finite() && *v != 0.0)
        .map(|v| v.round() as i64)
}

fn present_text(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

/// Contact details captured on the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub name: String,
    pub email: String,
    pub mobile: String,
}

impl UserDetails {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("mobile", &self.mobile),
        ] {
            if value.trim().is_empty() {
                return Err(ArenaError::InvalidInput(format!("{field} is required")));
            }
        }
        if !self.email.contains('@') {
            return Err(ArenaError::InvalidInput(format!(
                "email address {:?} is not valid",
                self.email
            )));
        }
        Ok(())
    }
}

/// A loan-offer document queued for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadDocument")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lower-cased extension, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("pdf") => "application/pdf",
            Some("doc") => "application/msword",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            _ => "application/octet-stream",
        }
    }

    /// Size as shown next to the selected file, e.g. `0.25 MB`.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.bytes.len() as f64 / 1024.0 / 1024.0)
    }

    pub fn validate(&self) -> Result<()> {
        match self.extension() {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(ArenaError::InvalidInput(format!(
                    "{} is not a PDF, DOC or DOCX file",
                    self.file_name
                )));
            }
        }
        if self.bytes.is_empty() {
            return Err(ArenaError::InvalidInput(format!(
                "{} is empty",
                self.file_name
            )));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ArenaError::InvalidInput(format!(
                "{} is {}, the limit is 10 MB",
                self.file_name,
                self.size_label()
            )));
        }
        Ok(())
    }
}
