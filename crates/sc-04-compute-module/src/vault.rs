//! Vault documents sealed with a password-derived key.
//!
//! `base64(nonce | seal(length u32 BE | zstd(document) | zero padding) | tag)`,
//! the plaintext padded to a multiple of 32 bytes.
//!
//! Only vault documents are compressed. A vault is written by its owner
//! alone, while channel payloads mix caller-chosen text with secrets and
//! their ciphertext length is visible on the wire.

use crate::error::ModuleError;
use shared_crypto::encoding::{decode_base64, encode_base64};
use shared_crypto::SecretKey;
use std::io::Read;
use zeroize::Zeroizing;

const PADDING_BLOCK: usize = 32;

/// zstd level used when sealing.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Largest document [`open_document`] will inflate.
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Seal a UTF-8 document.
pub fn seal_document(key: &SecretKey, document: &str) -> Result<String, ModuleError> {
    let compressed = Zeroizing::new(
        zstd::encode_all(document.as_bytes(), COMPRESSION_LEVEL)
            .map_err(|e| ModuleError::InvalidArgument(format!("compression failed: {e}")))?,
    );
    let length = u32::try_from(compressed.len())
        .map_err(|_| ModuleError::InvalidArgument("document too large".into()))?;
    let padded = (4 + compressed.len()).div_ceil(PADDING_BLOCK) * PADDING_BLOCK;

    let mut plaintext = Zeroizing::new(Vec::with_capacity(padded));
    plaintext.extend_from_slice(&length.to_be_bytes());
    plaintext.extend_from_slice(&compressed);
    plaintext.resize(padded, 0);

    let sealed = shared_crypto::seal(key, &plaintext)?;
    Ok(encode_base64(&sealed))
}

/// Open a sealed document. Any failure is reported as an invalid vault.
pub fn open_document(key: &SecretKey, sealed: &str) -> Result<String, ModuleError> {
    let sealed = decode_base64(sealed).map_err(|_| ModuleError::InvalidVault)?;
    let plaintext =
        Zeroizing::new(shared_crypto::open(key, &sealed).map_err(|_| ModuleError::InvalidVault)?);

    if plaintext.len() < 4 {
        return Err(ModuleError::InvalidVault);
    }
    let mut length = [0u8; 4];
    length.copy_from_slice(&plaintext[..4]);
    let length = u32::from_be_bytes(length) as usize;

    let body = plaintext
        .get(4..4 + length)
        .ok_or(ModuleError::InvalidVault)?;
    let document = inflate(body)?;
    String::from_utf8(document).map_err(|_| ModuleError::InvalidVault)
}

fn inflate(body: &[u8]) -> Result<Vec<u8>, ModuleError> {
    let decoder = zstd::stream::Decoder::new(body).map_err(|_| ModuleError::InvalidVault)?;
    let mut document = Vec::new();
    decoder
        .take(MAX_DOCUMENT_SIZE as u64 + 1)
        .read_to_end(&mut document)
        .map_err(|_| ModuleError::InvalidVault)?;
    if document.len() > MAX_DOCUMENT_SIZE {
        return Err(ModuleError::InvalidVault);
    }
    Ok(document)
}
