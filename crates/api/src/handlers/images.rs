use axum::extract::Multipart;
use axum::Json;
use serde::Serialize;
use studio_core::imaging;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;

/// A processed reference image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    /// `data:` URL to pass as `referenceImage` when starting a generation.
    pub reference_image: String,
    pub file_name: Option<String>,
    /// Size of the uploaded file in bytes.
    pub size: usize,
}

/// POST /api/v1/images
///
/// Accepts a multipart form with a required `file` field. The image is
/// validated, downscaled to at most 1920px on its longest side and
/// returned as a data URL.
pub async fn upload_image(mut multipart: Multipart) -> AppResult<Json<DataResponse<UploadedImage>>> {
    let mut upload: Option<(Option<String>, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let mime = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((file_name, mime, data.to_vec()));
    }

    let (file_name, mime, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    let size = data.len();

    // Decoding and resizing are CPU-bound.
    let reference_image =
        tokio::task::spawn_blocking(move || imaging::prepare_reference_image(&mime, &data))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))??;

    tracing::debug!(size, file_name = ?file_name, "Reference image prepared");

    Ok(Json(DataResponse {
        data: UploadedImage {
            reference_image,
            file_name,
            size,
        },
    }))
}
