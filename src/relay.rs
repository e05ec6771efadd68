//! Client for the email relay that forwards a finished PDF to the
//! administrator and, as a courtesy copy, to the submitter.
//!
//! The admin copy decides success. A failed customer copy is reported on the
//! [`Delivery`] next to it and never turns the send into a failure.

use std::error::Error as _;
use std::io;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builders::{FormType, Submitter};
use crate::output::PdfOutput;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    #[error("Relay request timed out")]
    Timeout,
    #[error("Relay unreachable: {0}")]
    Transport(String),
    #[error("Relay rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected relay response: {0}")]
    InvalidResponse(String),
}

impl RelayError {
    /// Worth retrying later. The client itself never retries.
    pub fn is_transient(&self) -> bool {
        match self {
            RelayError::Timeout | RelayError::Transport(_) => true,
            RelayError::Rejected { status, .. } => *status >= 500 || *status == 429,
            RelayError::InvalidResponse(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl RelayConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Body posted to the relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub name: String,
    pub email: String,
    pub pps: String,
    /// Bare base64, no `data:` prefix
    pub pdf_data: String,
    #[serde(rename = "type")]
    pub form_type: FormType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl RelayRequest {
    pub fn new(submitter: &Submitter, output: &PdfOutput) -> Self {
        Self {
            name: submitter.name.clone(),
            email: submitter.email.clone(),
            pps: submitter.pps.clone(),
            pdf_data: output.to_base64(),
            form_type: output.form_type,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Option<serde_json::Value>) -> Self {
        self.meta = meta;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerOutcome {
    Sent { email_id: Option<String> },
    Failed { error: String },
    NotAttempted,
}

/// Two-phase result: the admin copy decides success, the customer copy is
/// reported alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Admin email id, or why the submission failed
    pub primary: Result<String, RelayError>,
    pub secondary: CustomerOutcome,
}

impl Delivery {
    pub fn failed(error: RelayError) -> Self {
        Self {
            primary: Err(error),
            secondary: CustomerOutcome::NotAttempted,
        }
    }

    pub fn is_success(&self) -> bool {
        self.primary.is_ok()
    }

    pub fn admin_email_id(&self) -> Option<&str> {
        self.primary.as_deref().ok()
    }

    /// Message to show the user when the form went through but the customer
    /// copy did not.
    pub fn warning(&self) -> Option<String> {
        if self.primary.is_err() {
            return None;
        }
        match &self.secondary {
            CustomerOutcome::Sent { .. } => None,
            CustomerOutcome::Failed { error } => Some(format!(
                "Your form was submitted, but the confirmation email could not be sent: {}",
                error
            )),
            CustomerOutcome::NotAttempted => {
                Some("Your form was submitted; no confirmation email was sent.".to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody {
    success: bool,
    admin_email_id: Option<String>,
    customer: Option<CustomerBody>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerBody {
    sent: bool,
    email_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Interpret a relay reply.
pub fn parse_response(status: u16, body: &str) -> Delivery {
    match parse_success(status, body) {
        Ok((admin_email_id, secondary)) => Delivery {
            primary: Ok(admin_email_id),
            secondary,
        },
        Err(e) => Delivery::failed(e),
    }
}

fn parse_success(status: u16, body: &str) -> Result<(String, CustomerOutcome), RelayError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(RelayError::Rejected { status, message });
    }

    let parsed: SuccessBody = serde_json::from_str(body)
        .map_err(|e| RelayError::InvalidResponse(format!("Invalid JSON: {}", e)))?;
    if !parsed.success {
        return Err(RelayError::Rejected {
            status,
            message: parsed.error.unwrap_or_else(|| "success was false".to_string()),
        });
    }
    let admin_email_id = parsed
        .admin_email_id
        .ok_or_else(|| RelayError::InvalidResponse("missing adminEmailId".to_string()))?;

    let customer = match parsed.customer {
        None => CustomerOutcome::NotAttempted,
        Some(c) if c.sent => CustomerOutcome::Sent { email_id: c.email_id },
        Some(c) => CustomerOutcome::Failed {
            error: c.error.unwrap_or_else(|| "unknown error".to_string()),
        },
    };
    Ok((admin_email_id, customer))
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = transport.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return matches!(io_err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock);
        }
        source = err.source();
    }
    false
}

pub struct RelayClient {
    config: RelayConfig,
    agent: ureq::Agent,
}

impl RelayClient {
    pub fn new(config: RelayConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Post `request` once. Never retries.
    pub fn send(&self, request: &RelayRequest) -> Delivery {
        info!(
            "Sending {} ({} bytes of base64) to {}",
            request.form_type,
            request.pdf_data.len(),
            self.config.endpoint
        );

        let delivery = match self.post(request) {
            Ok((status, text)) => parse_response(status, &text),
            Err(e) => Delivery::failed(e),
        };

        match (&delivery.primary, &delivery.secondary) {
            (Err(e), _) => warn!("Relay send failed: {}", e),
            (Ok(id), CustomerOutcome::Failed { error }) => {
                info!("Relay accepted submission, admin email {}", id);
                warn!("Customer copy not sent: {}", error);
            }
            (Ok(id), _) => info!("Relay accepted submission, admin email {}", id),
        }
        delivery
    }

    fn post(&self, request: &RelayRequest) -> Result<(u16, String), RelayError> {
        let body = serde_json::to_string(request)
            .map_err(|e| RelayError::InvalidResponse(format!("Failed to encode request: {}", e)))?;

        let result = self
            .agent
            .post(&self.config.endpoint)
            .set("content-type", "application/json")
            .send_string(&body);

        match result {
            Ok(response) => {
                let status = response.status();
                let text = response.into_string().map_err(|e| {
                    RelayError::InvalidResponse(format!("Failed to read response: {}", e))
                })?;
                Ok((status, text))
            }
            Err(ureq::Error::Status(status, response)) => {
                Ok((status, response.into_string().unwrap_or_default()))
            }
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout(&transport) {
                    return Err(RelayError::Timeout);
                }
                Err(RelayError::Transport(transport.to_string()))
            }
        }
    }
}
