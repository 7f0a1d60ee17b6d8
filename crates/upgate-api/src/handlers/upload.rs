use std::io;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use upgate_core::{AdmissionOutcome, RejectionReason, StorageDescriptor, UploadRequest};

use crate::error::{no_file_response, HttpAppError, RejectionResponse};
use crate::middleware::identity::ClientIdentity;
use crate::state::AppState;

/// Multipart field holding the upload.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub size: u64,
    pub hash: String,
    pub media_type: String,
    pub message: String,
}

impl From<StorageDescriptor> for UploadResponse {
    fn from(descriptor: StorageDescriptor) -> Self {
        Self {
            success: true,
            filename: descriptor.safe_name,
            size: descriptor.size,
            hash: descriptor.hash,
            media_type: descriptor.media_type,
            message: "File uploaded successfully".to_string(),
        }
    }
}

fn multipart_rejection(err: &MultipartError) -> RejectionReason {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RejectionReason::FileTooLarge
    } else {
        RejectionReason::Incomplete
    }
}

/// `POST /upload`: hand the `file` field to the admission pipeline.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(ClientIdentity(identity)): Extension<ClientIdentity>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpAppError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Request is not a multipart upload");
            return Ok(no_file_response());
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(no_file_response()),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read multipart body");
                return Ok(RejectionResponse::new(multipart_rejection(&e)).into_response());
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared_filename = field.file_name().unwrap_or_default().to_string();
        let declared_content_type = field.content_type().map(str::to_string);
        let body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));

        let mut request = UploadRequest::new(identity.as_str(), declared_filename, body);
        if let Some(content_type) = declared_content_type {
            request = request.with_content_type(content_type);
        }

        let outcome = state.pipeline.admit(request).await?;
        return match outcome {
            AdmissionOutcome::Admitted(descriptor) => {
                Ok((StatusCode::OK, Json(UploadResponse::from(descriptor))).into_response())
            }
            AdmissionOutcome::Rejected(RejectionReason::RateLimitExceeded) => {
                let retry_after = state.pipeline.retry_after(&identity).await?;
                Ok(
                    RejectionResponse::new(RejectionReason::RateLimitExceeded)
                        .with_retry_after(retry_after)
                        .into_response(),
                )
            }
            AdmissionOutcome::Rejected(reason) => {
                Ok(RejectionResponse::new(reason).into_response())
            }
        };
    }
}
