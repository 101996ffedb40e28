//! Plaintext frame carried inside the ciphertext.
//!
//! Payloads are not compressed, so a frame's length depends only on the
//! payload length and never on its content.

use crate::error::ModuleError;

/// Frames are padded to a multiple of this many bytes.
pub const PADDING_BLOCK: usize = 32;

const HEADER_LENGTH: usize = 8 + 4;

/// Build `expires_at | length | payload | zero padding`.
pub fn encode(payload: &[u8], expires_at: u64) -> Result<Vec<u8>, ModuleError> {
    let length = u32::try_from(payload.len())
        .map_err(|_| ModuleError::InvalidArgument("payload too large".into()))?;

    let unpadded = HEADER_LENGTH + payload.len();
    let padded = unpadded.div_ceil(PADDING_BLOCK) * PADDING_BLOCK;

    let mut frame = Vec::with_capacity(padded);
    frame.extend_from_slice(&expires_at.to_be_bytes());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(payload);
    frame.resize(padded, 0);
    Ok(frame)
}

/// Split a frame into its expiry and payload.
pub fn decode(frame: &[u8]) -> Result<(u64, Vec<u8>), ModuleError> {
    if frame.len() < HEADER_LENGTH {
        return Err(ModuleError::Malformed("frame shorter than its header".into()));
    }
    let (expiry_bytes, rest) = frame.split_at(8);
    let (length_bytes, body) = rest.split_at(4);

    let mut expiry = [0u8; 8];
    expiry.copy_from_slice(expiry_bytes);
    let mut length = [0u8; 4];
    length.copy_from_slice(length_bytes);

    let length = u32::from_be_bytes(length) as usize;
    if length > body.len() {
        return Err(ModuleError::Malformed(format!(
            "frame declares {length} bytes, carries {}",
            body.len()
        )));
    }
    Ok((u64::from_be_bytes(expiry), body[..length].to_vec()))
}
