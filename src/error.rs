// taxforms-pdf: error types

use thiserror::Error;

use crate::relay::RelayError;
use crate::validation::ValidationErrors;

/// Fatal errors. Anything in here stops the current run.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Failed to read form data: {0}")]
    InputError(String),
    #[error("Form data is invalid:\n{0}")]
    ValidationError(ValidationErrors),
    #[error("Invalid date format: {0}")]
    DateError(String),
    #[error("Failed to load image: {0}")]
    ImageError(String),
    #[error("Signature capture failed: {0}")]
    SignatureError(#[from] crate::signature::SignatureError),
    #[error("Email relay failed: {0}")]
    RelayError(#[from] RelayError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Defects that leave a blank or omitted element but never abort rendering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderWarning {
    #[error("could not decode {what} image: {reason}")]
    ImageDecode { what: String, reason: String },
    #[error("could not read {what} data URI: {reason}")]
    DataUri { what: String, reason: String },
    #[error("row of height {height:.1}mm is taller than a page and overflows it")]
    OversizedRow { height: f32 },
}
