// Verification handlers - public, no authentication
// Every failure answers 200 with a not-verified result

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    Json,
};

use crate::api::state::AppState;
use crate::domain;
use crate::models::VerificationResult;

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("multipart request rejected: {0}")]
    Rejected(#[from] MultipartRejection),

    #[error("failed to read multipart body: {0}")]
    Read(#[from] MultipartError),

    #[error("upload contains no file field")]
    NoFile,
}

/// POST /verify
/// Multipart upload; the first file field is the artifact to check
#[tracing::instrument(skip(state, multipart), fields(endpoint = "verify_artifact"))]
pub async fn verify_artifact_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<VerificationResult> {
    let upload = match multipart {
        Ok(mut multipart) => read_first_file(&mut multipart).await,
        Err(rejection) => Err(UploadError::from(rejection)),
    };

    Json(domain::verify_upload(state.store.as_ref(), upload).await)
}

/// GET /verify/{token}
#[tracing::instrument(skip(state, token), fields(endpoint = "verify_token"))]
pub async fn verify_token_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Json<VerificationResult> {
    Json(domain::verify_by_token(state.store.as_ref(), &token).await)
}

async fn read_first_file(multipart: &mut Multipart) -> Result<Vec<u8>, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(UploadError::NoFile)
}
