//! Pending attachment intake from clipboard pastes.
//!
//! Only image payloads become attachments; anything else is silently
//! ignored: no error surface, no state change. The attachment lives
//! from paste until the next send and is never persisted.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Turn pasted clipboard bytes into a data-URI attachment, or None for
/// non-image content.
pub fn attachment_from_paste(bytes: &[u8]) -> Option<String> {
    let mime = sniff_image_mime(bytes)?;
    debug!(mime = %mime, size = bytes.len(), "Clipboard image accepted as pending attachment");
    Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}
