//! Packing and unpacking of channel messages.

use super::{check_expiry, expiry_now, frame, Mode, KEY_CONTEXT, MAGIC, SIGNATURE_CONTEXT,
    SIGNATURE_LENGTH};
use crate::error::ModuleError;
use shared_crypto::exchange::KEY_LENGTH;
use shared_crypto::kdf::{derive_symmetric_key, keyed_hash};
use shared_crypto::symmetric::{NONCE_LENGTH, TAG_LENGTH};
use shared_crypto::{
    CryptoError, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, ExchangePublicKey,
    ExchangeSecret, SecretKey, SharedSecret,
};

const HEADER_LENGTH: usize = MAGIC.len() + 1;
const SEALED_MINIMUM: usize = NONCE_LENGTH + TAG_LENGTH;

/// An outgoing query and the secret needed to read its response.
#[derive(Debug, Clone)]
pub struct PackedQuery {
    pub bytes: Vec<u8>,
    pub shared_secret: SharedSecret,
    pub expires_at: u64,
}

/// A decrypted message of any mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub mode: Mode,
    pub payload: Vec<u8>,
    pub expires_at: u64,
}

/// A query as seen by the server.
#[derive(Debug, Clone)]
pub struct UnpackedQuery {
    pub mode: Mode,
    pub payload: Vec<u8>,
    pub expires_at: u64,
    /// Secret for packing the response.
    pub shared_secret: SharedSecret,
    signature: Option<(Vec<u8>, Ed25519Signature)>,
}

impl UnpackedQuery {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Check the query's signature against the caller's access key.
    pub fn verify_signature(&self, signer: &Ed25519PublicKey) -> Result<(), ModuleError> {
        let (digest, signature) = self
            .signature
            .as_ref()
            .ok_or(ModuleError::Crypto(CryptoError::SignatureVerificationFailed))?;
        signer.verify(digest, signature)?;
        Ok(())
    }
}

/// Borrowed view of a message's parts.
struct Parts<'a> {
    mode: Mode,
    client_key: Option<&'a [u8]>,
    sealed: &'a [u8],
    /// Signed prefix and signature bytes.
    signature: Option<(&'a [u8], &'a [u8])>,
}

fn split(bytes: &[u8]) -> Result<Parts<'_>, ModuleError> {
    if bytes.len() < HEADER_LENGTH {
        return Err(ModuleError::Malformed("shorter than the header".into()));
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(ModuleError::Malformed("unknown protocol version".into()));
    }
    let mode = Mode::try_from(bytes[MAGIC.len()])?;

    let key_length = if mode.carries_client_key() { KEY_LENGTH } else { 0 };
    let signature_length = if mode == Mode::SignedQuery { SIGNATURE_LENGTH } else { 0 };
    let minimum = HEADER_LENGTH + key_length + SEALED_MINIMUM + signature_length;
    if bytes.len() < minimum {
        return Err(ModuleError::Malformed(format!(
            "{} bytes, need at least {minimum}",
            bytes.len()
        )));
    }

    let (unsigned, signature) = bytes.split_at(bytes.len() - signature_length);
    let body = &unsigned[HEADER_LENGTH..];
    let (client_key, sealed) = body.split_at(key_length);

    Ok(Parts {
        mode,
        client_key: (key_length > 0).then_some(client_key),
        sealed,
        signature: (signature_length > 0).then_some((unsigned, signature)),
    })
}

fn message_key(shared_secret: &SharedSecret, mode: Mode) -> SecretKey {
    derive_symmetric_key(KEY_CONTEXT, &[mode.byte()], shared_secret.as_bytes())
}

fn seal_frame(
    shared_secret: &SharedSecret,
    mode: Mode,
    payload: &[u8],
    expires_at: u64,
) -> Result<Vec<u8>, ModuleError> {
    let frame = frame::encode(payload, expires_at)?;
    Ok(shared_crypto::seal(&message_key(shared_secret, mode), &frame)?)
}

fn open_frame(
    shared_secret: &SharedSecret,
    mode: Mode,
    sealed: &[u8],
) -> Result<(u64, Vec<u8>), ModuleError> {
    let frame = shared_crypto::open(&message_key(shared_secret, mode), sealed).map_err(|e| match e {
        CryptoError::DecryptionFailed => ModuleError::Unauthenticated,
        other => ModuleError::Crypto(other),
    })?;
    frame::decode(&frame)
}

fn pack_query(
    payload: &[u8],
    server_key: &ExchangePublicKey,
    signer: Option<&Ed25519KeyPair>,
    expires_at: u64,
) -> Result<PackedQuery, ModuleError> {
    let mode = if signer.is_some() { Mode::SignedQuery } else { Mode::Query };
    let ephemeral = ExchangeSecret::random();
    let shared_secret = ephemeral.agree(server_key)?;
    let sealed = seal_frame(&shared_secret, mode, payload, expires_at)?;

    let mut bytes = Vec::with_capacity(
        HEADER_LENGTH + KEY_LENGTH + sealed.len() + signer.map_or(0, |_| SIGNATURE_LENGTH),
    );
    bytes.extend_from_slice(&MAGIC);
    bytes.push(mode.byte());
    bytes.extend_from_slice(ephemeral.public_key().as_bytes());
    bytes.extend_from_slice(&sealed);

    if let Some(signer) = signer {
        let digest = keyed_hash(SIGNATURE_CONTEXT, &bytes, 32);
        bytes.extend_from_slice(signer.sign(&digest).as_bytes());
    }

    Ok(PackedQuery {
        bytes,
        shared_secret,
        expires_at,
    })
}

/// Pack an anonymous query for `server_key`.
pub fn pack_unsigned_query(
    payload: &[u8],
    server_key: &ExchangePublicKey,
) -> Result<PackedQuery, ModuleError> {
    pack_query(payload, server_key, None, expiry_now())
}

/// [`pack_unsigned_query`] with an explicit expiry.
pub fn pack_unsigned_query_at(
    payload: &[u8],
    server_key: &ExchangePublicKey,
    expires_at: u64,
) -> Result<PackedQuery, ModuleError> {
    pack_query(payload, server_key, None, expires_at)
}

/// Pack a query signed with the caller's access key.
pub fn pack_signed_query(
    payload: &[u8],
    server_key: &ExchangePublicKey,
    signer: &Ed25519KeyPair,
) -> Result<PackedQuery, ModuleError> {
    pack_query(payload, server_key, Some(signer), expiry_now())
}

/// [`pack_signed_query`] with an explicit expiry.
pub fn pack_signed_query_at(
    payload: &[u8],
    server_key: &ExchangePublicKey,
    signer: &Ed25519KeyPair,
    expires_at: u64,
) -> Result<PackedQuery, ModuleError> {
    pack_query(payload, server_key, Some(signer), expires_at)
}

/// Pack the server's response to a query.
pub fn pack_response(payload: &[u8], shared_secret: &SharedSecret) -> Result<Vec<u8>, ModuleError> {
    pack_response_at(payload, shared_secret, expiry_now())
}

/// [`pack_response`] with an explicit expiry.
pub fn pack_response_at(
    payload: &[u8],
    shared_secret: &SharedSecret,
    expires_at: u64,
) -> Result<Vec<u8>, ModuleError> {
    let sealed = seal_frame(shared_secret, Mode::Response, payload, expires_at)?;
    let mut bytes = Vec::with_capacity(HEADER_LENGTH + sealed.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.push(Mode::Response.byte());
    bytes.extend_from_slice(&sealed);
    Ok(bytes)
}

/// Decrypt a query with the server's long-lived secret.
pub fn unpack_query(bytes: &[u8], server_secret: &ExchangeSecret) -> Result<UnpackedQuery, ModuleError> {
    unpack_query_at(bytes, server_secret, expiry_now())
}

/// [`unpack_query`] judged at time `now`.
pub fn unpack_query_at(
    bytes: &[u8],
    server_secret: &ExchangeSecret,
    now: u64,
) -> Result<UnpackedQuery, ModuleError> {
    let parts = split(bytes)?;
    let client_key = parts.client_key.ok_or(ModuleError::WrongMode {
        expected: Mode::Query.byte(),
        found: parts.mode.byte(),
    })?;
    let client_key = ExchangePublicKey::from_slice(client_key)?;
    let shared_secret = server_secret.agree(&client_key)?;

    let (expires_at, payload) = open_frame(&shared_secret, parts.mode, parts.sealed)?;
    check_expiry(expires_at, now)?;

    let signature = match parts.signature {
        Some((signed, signature)) => Some((
            keyed_hash(SIGNATURE_CONTEXT, signed, 32),
            Ed25519Signature::from_slice(signature)?,
        )),
        None => None,
    };

    Ok(UnpackedQuery {
        mode: parts.mode,
        payload,
        expires_at,
        shared_secret,
        signature,
    })
}

/// Decrypt a response with the secret kept from its query.
pub fn unpack_response(bytes: &[u8], shared_secret: &SharedSecret) -> Result<Vec<u8>, ModuleError> {
    unpack_response_at(bytes, shared_secret, expiry_now())
}

/// [`unpack_response`] judged at time `now`.
pub fn unpack_response_at(
    bytes: &[u8],
    shared_secret: &SharedSecret,
    now: u64,
) -> Result<Vec<u8>, ModuleError> {
    let opened = open_at(bytes, shared_secret, now)?;
    if opened.mode != Mode::Response {
        return Err(ModuleError::WrongMode {
            expected: Mode::Response.byte(),
            found: opened.mode.byte(),
        });
    }
    Ok(opened.payload)
}

/// Decrypt a message of any mode with its shared secret.
pub fn open(bytes: &[u8], shared_secret: &SharedSecret) -> Result<Opened, ModuleError> {
    open_at(bytes, shared_secret, expiry_now())
}

/// [`open`] judged at time `now`.
pub fn open_at(bytes: &[u8], shared_secret: &SharedSecret, now: u64) -> Result<Opened, ModuleError> {
    let parts = split(bytes)?;
    let (expires_at, payload) = open_frame(shared_secret, parts.mode, parts.sealed)?;
    check_expiry(expires_at, now)?;
    Ok(Opened {
        mode: parts.mode,
        payload,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::PADDING_BLOCK;
    use crate::protocol::EXPIRY_TOLERANCE_SECS;
    use proptest::prelude::*;

    const NOW: u64 = 1_700_000_000;

    fn server() -> (ExchangeSecret, ExchangePublicKey) {
        let secret = ExchangeSecret::random();
        let public = secret.public_key();
        (secret, public)
    }

    #[test]
    fn test_query_layout() {
        let (_, public) = server();
        let query = pack_unsigned_query_at(b"{}", &public, NOW).unwrap();

        assert_eq!(&query.bytes[..4], &MAGIC);
        assert_eq!(query.bytes[4], b'Q');
        let sealed = query.bytes.len() - HEADER_LENGTH - KEY_LENGTH;
        assert_eq!((sealed - NONCE_LENGTH - TAG_LENGTH) % PADDING_BLOCK, 0);
        assert_eq!(query.shared_secret.as_bytes().len(), 32);
    }

    #[test]
    fn test_server_reads_query_and_client_reads_response() {
        let (secret, public) = server();
        let query = pack_unsigned_query_at(b"{\"graphql\":\"{ping}\"}", &public, NOW).unwrap();

        let received = unpack_query_at(&query.bytes, &secret, NOW).unwrap();
        assert_eq!(received.payload, b"{\"graphql\":\"{ping}\"}");
        assert_eq!(received.mode, Mode::Query);
        assert!(!received.is_signed());
        assert_eq!(received.shared_secret, query.shared_secret);

        let response =
            pack_response_at(b"{\"data\":{\"ping\":\"pong\"}}", &received.shared_secret, NOW).unwrap();
        let payload = unpack_response_at(&response, &query.shared_secret, NOW).unwrap();
        assert_eq!(payload, b"{\"data\":{\"ping\":\"pong\"}}");
    }

    #[test]
    fn test_sealed_length_ignores_content() {
        let (_, public) = server();
        let repeated = format!("{{\"graphql\":\"{}\"}}", "token".repeat(40));
        let varied: String = (0..200u32)
            .map(|i| char::from(b'a' + (i.wrapping_mul(7_919) % 26) as u8))
            .collect();
        let varied = format!("{{\"graphql\":\"{varied}\"}}");
        assert_eq!(repeated.len(), varied.len());

        let a = pack_unsigned_query_at(repeated.as_bytes(), &public, NOW).unwrap();
        let b = pack_unsigned_query_at(varied.as_bytes(), &public, NOW).unwrap();
        assert_eq!(a.bytes.len(), b.bytes.len());

        let a = pack_response_at(repeated.as_bytes(), &a.shared_secret, NOW).unwrap();
        let b = pack_response_at(varied.as_bytes(), &b.shared_secret, NOW).unwrap();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let (_, public) = server();
        let first = pack_unsigned_query_at(b"a", &public, NOW).unwrap();
        let second = pack_unsigned_query_at(b"b", &public, NOW).unwrap();

        let response = pack_response_at(b"secret", &first.shared_secret, NOW).unwrap();
        let err = unpack_response_at(&response, &second.shared_secret, NOW).unwrap_err();
        assert_eq!(err, ModuleError::Unauthenticated);
    }

    #[test]
    fn test_tampering_detected() {
        let (_, public) = server();
        let query = pack_unsigned_query_at(b"x", &public, NOW).unwrap();
        let mut response = pack_response_at(b"payload", &query.shared_secret, NOW).unwrap();
        let last = response.len() - 1;
        response[last] ^= 0x01;
        assert_eq!(
            unpack_response_at(&response, &query.shared_secret, NOW).unwrap_err(),
            ModuleError::Unauthenticated
        );
    }

    #[test]
    fn test_expired_response_rejected() {
        let (_, public) = server();
        let query = pack_unsigned_query_at(b"x", &public, NOW).unwrap();
        let response = pack_response_at(b"late", &query.shared_secret, NOW).unwrap();

        assert!(unpack_response_at(&response, &query.shared_secret, NOW + EXPIRY_TOLERANCE_SECS).is_ok());
        assert!(matches!(
            unpack_response_at(&response, &query.shared_secret, NOW + EXPIRY_TOLERANCE_SECS + 1),
            Err(ModuleError::Expired { .. })
        ));
    }

    #[test]
    fn test_expired_query_rejected_by_server() {
        let (secret, public) = server();
        let query = pack_unsigned_query_at(b"x", &public, NOW - 3_600).unwrap();
        assert!(matches!(
            unpack_query_at(&query.bytes, &secret, NOW),
            Err(ModuleError::Expired { .. })
        ));
    }

    #[test]
    fn test_reflected_query_is_not_a_response() {
        let (_, public) = server();
        let query = pack_unsigned_query_at(b"x", &public, NOW).unwrap();
        assert!(matches!(
            unpack_response_at(&query.bytes, &query.shared_secret, NOW),
            Err(ModuleError::WrongMode { .. })
        ));
    }

    #[test]
    fn test_response_is_not_a_query() {
        let (secret, public) = server();
        let query = pack_unsigned_query_at(b"x", &public, NOW).unwrap();
        let response = pack_response_at(b"y", &query.shared_secret, NOW).unwrap();
        assert!(matches!(
            unpack_query_at(&response, &secret, NOW),
            Err(ModuleError::WrongMode { .. })
        ));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let (_, public) = server();
        let mut query = pack_unsigned_query_at(b"x", &public, NOW).unwrap();
        query.bytes[0] ^= 0xff;
        assert!(matches!(
            open_at(&query.bytes, &query.shared_secret, NOW),
            Err(ModuleError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_rejected() {
        assert!(matches!(open_at(b"SC", &SharedSecret::from_slice(&[1; 32]).unwrap(), NOW),
            Err(ModuleError::Malformed(_))));
    }

    #[test]
    fn test_signed_query_verifies() {
        let (secret, public) = server();
        let signer = Ed25519KeyPair::generate();
        let query = pack_signed_query_at(b"{\"whoami\":1}", &public, &signer, NOW).unwrap();
        assert_eq!(query.bytes[4], b'S');

        let received = unpack_query_at(&query.bytes, &secret, NOW).unwrap();
        assert!(received.is_signed());
        assert_eq!(received.mode, Mode::SignedQuery);
        received.verify_signature(&signer.public_key()).unwrap();

        let stranger = Ed25519KeyPair::generate();
        assert!(received.verify_signature(&stranger.public_key()).is_err());
    }

    #[test]
    fn test_signature_covers_ciphertext() {
        let (secret, public) = server();
        let signer = Ed25519KeyPair::generate();
        let mut query = pack_signed_query_at(b"abc", &public, &signer, NOW).unwrap();
        let signature_start = query.bytes.len() - SIGNATURE_LENGTH;
        query.bytes[signature_start + 3] ^= 0x40;

        let received = unpack_query_at(&query.bytes, &secret, NOW).unwrap();
        assert!(received.verify_signature(&signer.public_key()).is_err());
    }

    #[test]
    fn test_unsigned_query_has_no_signature() {
        let (secret, public) = server();
        let query = pack_unsigned_query_at(b"abc", &public, NOW).unwrap();
        let received = unpack_query_at(&query.bytes, &secret, NOW).unwrap();
        let signer = Ed25519KeyPair::generate();
        assert!(received.verify_signature(&signer.public_key()).is_err());
    }

    proptest! {
        #[test]
        fn prop_open_recovers_payload(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let (_, public) = server();
            let query = pack_unsigned_query_at(&payload, &public, NOW).unwrap();
            let opened = open_at(&query.bytes, &query.shared_secret, NOW).unwrap();
            prop_assert_eq!(opened.payload, payload.clone());
            prop_assert_eq!(opened.expires_at, NOW);

            let response = pack_response_at(&payload, &query.shared_secret, NOW).unwrap();
            prop_assert_eq!(unpack_response_at(&response, &query.shared_secret, NOW).unwrap(), payload);
        }
    }
}
