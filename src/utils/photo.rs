use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ServiceError;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PhotoError {
    #[error("photo is empty")]
    Empty,
    #[error("photo data URL must be base64-encoded")]
    NotBase64DataUrl,
    #[error("photo data URL must carry an image/* media type")]
    NotAnImage,
    #[error("photo is not valid base64")]
    InvalidEncoding,
    #[error("photo exceeds the {0} byte limit")]
    TooLarge(usize),
}

/// Decodes a `data:image/...;base64,` URL or a bare base64 string.
pub fn decode_photo(raw: &str, max_bytes: usize) -> Result<Vec<u8>, PhotoError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PhotoError::Empty);
    }

    let encoded = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or(PhotoError::NotBase64DataUrl)?;
            let media_type = header
                .strip_suffix(";base64")
                .ok_or(PhotoError::NotBase64DataUrl)?;
            if !media_type.starts_with("image/") {
                return Err(PhotoError::NotAnImage);
            }
            payload
        }
        None => raw,
    };

    // base64 expands 3 bytes into 4 characters
    if encoded.len() / 4 * 3 > max_bytes.saturating_add(2) {
        return Err(PhotoError::TooLarge(max_bytes));
    }

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| PhotoError::InvalidEncoding)?;
    if bytes.is_empty() {
        return Err(PhotoError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(PhotoError::TooLarge(max_bytes));
    }
    Ok(bytes)
}

/// Checks a photo field and returns it trimmed, ready to store.
pub fn validate_photo(field: &str, raw: &str, max_bytes: usize) -> Result<String, ServiceError> {
    decode_photo(raw, max_bytes)
        .map(|_| raw.trim().to_string())
        .map_err(|e| ServiceError::Validation(format!("{field}: {e}")))
}
