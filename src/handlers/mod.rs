pub mod agents;
pub mod properties;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use axum::http::header::HOST;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ApiError;
use crate::images::UploadedImage;

/// Per-file upload cap.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;
/// Whole-request cap: a property update may carry up to 10 full-size images.
pub const MAX_REQUEST_BYTES: usize = 225 * 1024 * 1024;

/// Scheme+host of the current request, used to turn stored relative image
/// paths into absolute URLs.
pub fn base_url(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

/// Text fields plus validated file uploads collected from a multipart body.
pub struct FormData {
    fields: HashMap<String, String>,
    pub uploads: Vec<UploadedImage>,
}

impl FormData {
    /// Field value, blank when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.fields.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// Drains a multipart request. Files must arrive under `file_field`; each one
/// is checked against `validate` and the per-file size cap before being
/// buffered. Everything else is treated as a text field.
pub async fn read_form(
    multipart: &mut Multipart,
    file_field: &str,
    max_files: usize,
    validate: fn(&str, &str) -> Result<(), ApiError>,
) -> Result<FormData, ApiError> {
    let mut fields = HashMap::new();
    let mut uploads = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field && field.file_name().is_some() {
            if uploads.len() == max_files {
                return Err(ApiError::BadRequest(format!(
                    "Too many files: at most {} allowed",
                    max_files
                )));
            }
            let original_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            validate(&original_name, &content_type)?;
            let data = read_limited(&mut field).await?;
            uploads.push(UploadedImage { original_name, data });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Invalid form field {}: {}", name, e)))?;
            fields.insert(name, value);
        }
    }

    Ok(FormData { fields, uploads })
}

async fn read_limited(field: &mut Field<'_>) -> Result<Vec<u8>, ApiError> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::BadRequest(
                "Image file size exceeds the 20MB limit. Please upload a smaller file.".to_string(),
            ));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Property uploads accept any image MIME type.
pub fn property_image_rule(_original_name: &str, content_type: &str) -> Result<(), ApiError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Only image files are allowed!".to_string()))
    }
}

const AGENT_IMAGE_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

/// Agent uploads are gated by both extension and MIME allow-list.
pub fn agent_image_rule(original_name: &str, content_type: &str) -> Result<(), ApiError> {
    let ext = Path::new(original_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let ext_ok = AGENT_IMAGE_TYPES.contains(&ext.as_str());
    let mime_ok = AGENT_IMAGE_TYPES.iter().any(|t| content_type.contains(t));
    if ext_ok && mime_ok {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Error: Images only!".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_combines_forwarded_proto_and_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, "example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(base_url(&headers), "https://example.com");
    }

    #[test]
    fn base_url_defaults_to_http() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, "localhost:8080".parse().unwrap());
        assert_eq!(base_url(&headers), "http://localhost:8080");
    }

    #[test]
    fn property_rule_accepts_any_image_mime() {
        assert!(property_image_rule("a.webp", "image/webp").is_ok());
        assert!(property_image_rule("a.pdf", "application/pdf").is_err());
    }

    #[test]
    fn agent_rule_requires_extension_and_mime() {
        assert!(agent_image_rule("face.png", "image/png").is_ok());
        assert!(agent_image_rule("face.webp", "image/webp").is_err());
        assert!(agent_image_rule("face.png", "application/octet-stream").is_err());
    }
}
