//! Base64 helpers.
//!
//! Keys arrive from discovery documents and configuration with or without
//! padding, so decoding accepts both.

use crate::CryptoError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as padded standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    LENIENT.encode(bytes)
}

/// Decode standard base64, padded or not.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    LENIENT
        .decode(encoded.trim())
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}
