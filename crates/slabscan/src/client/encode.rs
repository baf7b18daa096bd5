//! Local image intake: file to embeddable data URL.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::EncodeError;

/// One locally selected image, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    /// Original filename, used for display only.
    pub name: String,
    /// `data:<mime>;base64,<payload>` form sent to the relay.
    pub data_url: String,
}

/// Reads an image file and encodes it as a data URL. Files whose extension
/// does not map to an image mime type are rejected.
pub fn encode_image_file(path: &Path) -> Result<SelectedImage, EncodeError> {
    let mime = mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .ok_or_else(|| EncodeError::NotAnImage {
            path: path.to_path_buf(),
        })?;

    let bytes = std::fs::read(path).map_err(|e| EncodeError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(SelectedImage {
        name,
        data_url: format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(&bytes)),
    })
}
