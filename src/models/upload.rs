// src/models/upload.rs

use axum::body::Bytes;
use image::ImageFormat;

use crate::error::FieldErrors;

/// Upload cap for avatars and post images.
pub const MAX_IMAGE_KILOBYTES: usize = 2048;

/// Formats the image rule accepts (jpeg, png, jpg, gif).
const ACCEPTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// A file part received in a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Accepted format announced by the file signature. The client's mime
    /// type and file name are not consulted.
    pub fn image_format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes)
            .ok()
            .filter(|format| ACCEPTED_FORMATS.contains(format))
    }

    /// Whether the bytes actually decode as `format`.
    pub fn decodes_as(&self, format: ImageFormat) -> bool {
        image::load_from_memory_with_format(&self.bytes, format).is_ok()
    }

    pub fn size_kilobytes(&self) -> usize {
        self.bytes.len().div_ceil(1024)
    }

    /// File extension for storage, falling back to the client name.
    pub fn extension(&self) -> String {
        match self.image_format() {
            Some(ImageFormat::Jpeg) => "jpg".to_string(),
            Some(format) => format
                .extensions_str()
                .first()
                .copied()
                .unwrap_or("bin")
                .to_string(),
            None => self
                .file_name
                .as_deref()
                .and_then(|n| n.rsplit_once('.'))
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_else(|| "bin".to_string()),
        }
    }
}

/// Applies the image rules (jpeg/png/jpg/gif, at most 2048 KB) to an optional upload.
///
/// Oversized files are not decoded.
pub fn check_image(errors: &mut FieldErrors, field: &str, file: Option<&UploadedFile>) {
    let Some(file) = file else {
        return;
    };

    let oversized = file.size_kilobytes() > MAX_IMAGE_KILOBYTES;
    let mut messages = Vec::new();

    match file.image_format() {
        None => {
            messages.push(format!("The {} field must be an image.", field));
            messages.push(format!(
                "The {} field must be a file of type: jpeg, png, jpg, gif.",
                field
            ));
        }
        Some(format) if !oversized && !file.decodes_as(format) => {
            messages.push(format!("The {} field must be an image.", field));
        }
        Some(_) => {}
    }
    if oversized {
        messages.push(format!(
            "The {} field must not be greater than {} kilobytes.",
            field, MAX_IMAGE_KILOBYTES
        ));
    }

    if !messages.is_empty() {
        errors.entry(field.to_string()).or_default().extend(messages);
    }
}
