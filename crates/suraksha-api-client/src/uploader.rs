//! Drives upload attempts through the state machine.
//!
//! Steps run strictly one after another; a failed step ends the attempt.
//! There is no automatic retry. A caller holding a state that failed during
//! verification can hand it back to [`SignedUploader::retry_verification`],
//! which re-runs only the verify-and-publish call.

use futures::future::join_all;
use suraksha_core::models::{UploadFile, UploadOutcome};
use suraksha_core::upload_state::UploadEvent;
use suraksha_core::{
    ClientConfig, ErrorMetadata, LogLevel, PublicUrlResolver, UploadError, UploadFolder,
    UploadResult, UploadState,
};

use crate::ApiClient;

/// Runs the signed upload chain against one backend and storage host.
#[derive(Clone, Debug)]
pub struct SignedUploader {
    client: ApiClient,
    resolver: PublicUrlResolver,
    max_upload_bytes: u64,
}

impl SignedUploader {
    pub fn new(client: ApiClient, resolver: PublicUrlResolver, max_upload_bytes: u64) -> Self {
        Self {
            client,
            resolver,
            max_upload_bytes,
        }
    }

    pub fn from_config(client: ApiClient, config: &ClientConfig) -> Self {
        Self::new(
            client,
            config.public_url_resolver(),
            config.max_upload_bytes,
        )
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn resolver(&self) -> &PublicUrlResolver {
        &self.resolver
    }

    /// Upload a file into a folder: signed URL, storage POST, verify-and-publish.
    #[tracing::instrument(skip(self, folder, file), fields(folder = %folder, file_name = %file.file_name))]
    pub async fn upload(&self, folder: UploadFolder, file: &UploadFile) -> UploadResult<UploadOutcome> {
        let state = UploadState::start(file.signed_url_request(folder));
        self.run(state, Some(file)).await?.into_result()
    }

    /// Upload several files. Each file gets its own independent chain; the
    /// chains run concurrently and results come back in input order.
    pub async fn upload_many(
        &self,
        items: &[(UploadFolder, UploadFile)],
    ) -> Vec<UploadResult<UploadOutcome>> {
        join_all(
            items
                .iter()
                .map(|(folder, file)| self.upload(folder.clone(), file)),
        )
        .await
    }

    /// Re-run verification for an attempt whose verify step failed.
    pub async fn retry_verification(&self, state: UploadState) -> UploadResult<UploadOutcome> {
        let state = state.retry_verification()?;
        self.run(state, None).await?.into_result()
    }

    /// Drive a state until it is `Published` or `Failed`.
    ///
    /// `file` is only needed while the state is `Requesting` or `Uploading`.
    /// The returned error is reserved for misuse (an event the state cannot
    /// accept); step failures end in `UploadState::Failed`.
    pub async fn run(
        &self,
        mut state: UploadState,
        file: Option<&UploadFile>,
    ) -> UploadResult<UploadState> {
        while !state.is_terminal() {
            let from = state.name();
            let event = self.next_event(&state, file).await;
            state = state.apply(event, &self.resolver)?;
            log_transition(from, &state);
        }
        Ok(state)
    }

    async fn next_event(&self, state: &UploadState, file: Option<&UploadFile>) -> UploadEvent {
        let result = match state {
            UploadState::Requesting { request } => {
                match request.validate_with_limit(self.max_upload_bytes) {
                    Ok(()) => self
                        .client
                        .request_signed_url(request)
                        .await
                        .map(UploadEvent::TicketIssued),
                    Err(e) => Err(e),
                }
            }
            UploadState::Uploading { ticket } => match file {
                Some(file) => self
                    .client
                    .upload_to_storage(ticket, file)
                    .await
                    .map(|()| UploadEvent::Stored),
                None => Err(UploadError::InvalidInput(
                    "File contents are required to upload".to_string(),
                )),
            },
            UploadState::Verifying { relative_path } => self
                .client
                .verify_and_publish(relative_path)
                .await
                .map(UploadEvent::Verified),
            UploadState::Published { .. } | UploadState::Failed { .. } => {
                Err(UploadError::InvalidTransition {
                    from: state.name(),
                    event: "next_event",
                })
            }
        };

        result.unwrap_or_else(UploadEvent::StepFailed)
    }
}

fn log_transition(from: &'static str, state: &UploadState) {
    match state {
        UploadState::Failed { stage, error, .. } => match error.log_level() {
            LogLevel::Debug => tracing::debug!(
                from,
                stage = %stage,
                error_code = error.error_code(),
                error = %error,
                "Upload attempt failed"
            ),
            LogLevel::Warn => tracing::warn!(
                from,
                stage = %stage,
                error_code = error.error_code(),
                status = ?error.status(),
                error = %error,
                "Upload attempt failed"
            ),
            LogLevel::Error => tracing::error!(
                from,
                stage = %stage,
                error_code = error.error_code(),
                error = %error,
                "Upload attempt failed"
            ),
        },
        UploadState::Published { outcome } => tracing::info!(
            from,
            relative_path = %outcome.relative_path,
            public_url = %outcome.public_url,
            "Upload published"
        ),
        other => tracing::debug!(
            from,
            to = other.name(),
            relative_path = ?other.relative_path(),
            "Upload state changed"
        ),
    }
}
