//! Per-attempt state machine of the signed upload flow.
//!
//! `Requesting → Uploading → Verifying → Published`, with any step able to
//! move the attempt to `Failed`. A failed verification keeps the relative
//! path so the attempt can go back to `Verifying` without uploading again.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

use crate::error::{UploadError, UploadResult};
use crate::models::{
    SignedUrlRequest, StoredObject, UploadOutcome, UploadTicket, VerifyResponse,
};
use crate::public_url::PublicUrlResolver;

/// The network step an attempt is in (or failed in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Requesting,
    Uploading,
    Verifying,
}

impl Display for UploadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStage::Requesting => write!(f, "requesting"),
            UploadStage::Uploading => write!(f, "uploading"),
            UploadStage::Verifying => write!(f, "verifying"),
        }
    }
}

/// Something that happened to an attempt.
#[derive(Debug)]
pub enum UploadEvent {
    /// The backend issued a signed upload target
    TicketIssued(UploadTicket),
    /// Storage accepted the bytes
    Stored,
    /// The backend answered the verify-and-publish call
    Verified(VerifyResponse),
    /// The current step failed
    StepFailed(UploadError),
}

impl UploadEvent {
    fn name(&self) -> &'static str {
        match self {
            UploadEvent::TicketIssued(_) => "ticket_issued",
            UploadEvent::Stored => "stored",
            UploadEvent::Verified(_) => "verified",
            UploadEvent::StepFailed(_) => "step_failed",
        }
    }
}

#[derive(Debug)]
pub enum UploadState {
    Requesting {
        request: SignedUrlRequest,
    },
    Uploading {
        ticket: UploadTicket,
    },
    Verifying {
        relative_path: String,
    },
    Published {
        outcome: UploadOutcome,
    },
    Failed {
        stage: UploadStage,
        /// Known once a ticket was issued
        relative_path: Option<String>,
        error: UploadError,
    },
}

impl UploadState {
    pub fn start(request: SignedUrlRequest) -> Self {
        UploadState::Requesting { request }
    }

    /// Enter the chain at verification for bytes that are already stored.
    pub fn resume_verification(relative_path: impl Into<String>) -> Self {
        UploadState::Verifying {
            relative_path: relative_path.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Requesting { .. } => "requesting",
            UploadState::Uploading { .. } => "uploading",
            UploadState::Verifying { .. } => "verifying",
            UploadState::Published { .. } => "published",
            UploadState::Failed { .. } => "failed",
        }
    }

    /// Step in progress; `None` once the attempt is over.
    pub fn stage(&self) -> Option<UploadStage> {
        match self {
            UploadState::Requesting { .. } => Some(UploadStage::Requesting),
            UploadState::Uploading { .. } => Some(UploadStage::Uploading),
            UploadState::Verifying { .. } => Some(UploadStage::Verifying),
            UploadState::Published { .. } | UploadState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }

    pub fn relative_path(&self) -> Option<&str> {
        match self {
            UploadState::Requesting { .. } => None,
            UploadState::Uploading { ticket } => Some(&ticket.relative_path),
            UploadState::Verifying { relative_path } => Some(relative_path),
            UploadState::Published { outcome } => Some(&outcome.relative_path),
            UploadState::Failed { relative_path, .. } => relative_path.as_deref(),
        }
    }

    /// Storage-side view of the object this attempt targets.
    pub fn stored_object(&self) -> Option<StoredObject> {
        let mut object = StoredObject::pending(self.relative_path()?);
        match self {
            UploadState::Uploading { .. } => {}
            UploadState::Verifying { .. } => {
                object.mark_uploaded().ok()?;
            }
            UploadState::Published { .. } => {
                object.mark_uploaded().ok()?;
                object.mark_published().ok()?;
            }
            // Bytes are in storage even though publishing failed.
            UploadState::Failed {
                stage: UploadStage::Verifying,
                ..
            } => {
                object.mark_uploaded().ok()?;
            }
            UploadState::Requesting { .. } | UploadState::Failed { .. } => return None,
        }
        Some(object)
    }

    /// Apply an event, returning the next state.
    pub fn apply(self, event: UploadEvent, resolver: &PublicUrlResolver) -> UploadResult<Self> {
        let from = self.name();
        let event_name = event.name();

        match (self, event) {
            (UploadState::Requesting { .. }, UploadEvent::TicketIssued(ticket)) => {
                Ok(UploadState::Uploading { ticket })
            }
            (UploadState::Uploading { ticket }, UploadEvent::Stored) => {
                Ok(UploadState::Verifying {
                    relative_path: ticket.relative_path,
                })
            }
            (UploadState::Verifying { relative_path }, UploadEvent::Verified(response)) => {
                if !response.success {
                    return Ok(UploadState::Failed {
                        stage: UploadStage::Verifying,
                        error: UploadError::Verification {
                            status: None,
                            message: response
                                .message
                                .unwrap_or_else(|| "Backend rejected the upload".to_string()),
                        },
                        relative_path: Some(relative_path),
                    });
                }
                Ok(UploadState::Published {
                    outcome: UploadOutcome {
                        public_url: resolver.resolve(&relative_path),
                        relative_path,
                        backend_public_url: response.public_url,
                        file_details: response.file_details,
                    },
                })
            }
            (state, UploadEvent::StepFailed(error)) if !state.is_terminal() => {
                let stage = state.stage().unwrap_or(UploadStage::Requesting);
                let relative_path = state.relative_path().map(str::to_string);
                Ok(UploadState::Failed {
                    stage,
                    relative_path,
                    error,
                })
            }
            _ => Err(UploadError::InvalidTransition {
                from,
                event: event_name,
            }),
        }
    }

    /// Go back to `Verifying` after a failed verification. The stored bytes are reused.
    pub fn retry_verification(self) -> UploadResult<Self> {
        match self {
            UploadState::Failed {
                stage: UploadStage::Verifying,
                relative_path: Some(relative_path),
                ..
            } => Ok(UploadState::Verifying { relative_path }),
            other => Err(UploadError::InvalidTransition {
                from: other.name(),
                event: "retry_verification",
            }),
        }
    }

    /// Final result of the attempt: the outcome if published, the error if failed.
    pub fn into_result(self) -> UploadResult<UploadOutcome> {
        match self {
            UploadState::Published { outcome } => Ok(outcome),
            UploadState::Failed { error, .. } => Err(error),
            other => Err(UploadError::InvalidTransition {
                from: other.name(),
                event: "into_result",
            }),
        }
    }
}
