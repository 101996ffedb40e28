//! # Crypto Module
//!
//! The [`ComputeModule`] served inside the computation context. Every call is
//! routed through a function table built once at construction; a name missing
//! from the table is reported as an unknown function.
//!
//! | Scope | Function | Arguments | Result |
//! |-------|----------|-----------|--------|
//! | free | `identifier` | input | base64 string |
//! | free | `password_check_hash` | password, size | hex string |
//! | free | `access_public_key` | identifier, password | base64 string |
//! | free | `vault_seal` | VaultKey, document | base64 string |
//! | free | `vault_open` | VaultKey, sealed | document |
//! | free | `unpack_response` | bytes, shared secret | bytes |
//! | static Channel | `from_signed_key` | key, signature, anchor (base64) | Channel |
//! | Channel | `pack_unsigned_query` | bytes | Query |
//! | Channel | `pack_signed_query` | bytes, AccessKey | Query |
//! | Channel | `server_key` | | base64 string |
//! | Query | `get_query`, `get_shared_secret`, `get_expiry` | | bytes / int |
//! | static Rng | `from_entropy` | pool bytes | Rng |
//! | static ExchangeKey | `generate` | Rng | ExchangeKey |
//! | static ExchangeKey | `from_base64` | secret | ExchangeKey |
//! | ExchangeKey | `public_key`, `to_base64` | | base64 string |
//! | static AccessKey | `generate` | Rng | AccessKey |
//! | static AccessKey | `derive` | identifier, password | AccessKey |
//! | static AccessKey | `from_base64` | seed | AccessKey |
//! | AccessKey | `public_key`, `to_base64` | | base64 string |
//! | static VaultKey | `derive` | identifier, password | VaultKey |
//!
//! Query objects are meant to be preloaded with their accessors and released
//! immediately.

pub mod class;
pub mod object;

pub use class::ClassTag;
pub use object::NativeObject;

use crate::channel::Channel;
use crate::error::ModuleError;
use crate::keys::EntropyRng;
use crate::{derive, protocol, vault};
use sc_02_call_bridge::{Args, BridgeFault, ComputeModule, Invocation, Outcome, Target, WireValue};
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, ExchangeSecret, SharedSecret};
use std::collections::HashMap;
use tracing::debug;
use zeroize::Zeroizing;

type Call<'a> = Invocation<'a, ClassTag, NativeObject>;
type Handler = fn(Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault>;

/// Where a function lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Scope {
    Free,
    Static(ClassTag),
    Instance(ClassTag),
}

impl From<Target<ClassTag>> for Scope {
    fn from(target: Target<ClassTag>) -> Self {
        match target {
            Target::Free => Scope::Free,
            Target::Static(class) => Scope::Static(class),
            Target::Instance { class, .. } => Scope::Instance(class),
        }
    }
}

/// The computation module.
pub struct CryptoModule {
    functions: HashMap<(Scope, &'static str), Handler>,
}

impl CryptoModule {
    pub fn new() -> Self {
        let entries: [((Scope, &'static str), Handler); 24] = [
            ((Scope::Free, "identifier"), identifier),
            ((Scope::Free, "password_check_hash"), password_check_hash),
            ((Scope::Free, "access_public_key"), access_public_key),
            ((Scope::Free, "vault_seal"), vault_seal),
            ((Scope::Free, "vault_open"), vault_open),
            ((Scope::Free, "unpack_response"), unpack_response),
            ((Scope::Static(ClassTag::Channel), "from_signed_key"), channel_from_signed_key),
            ((Scope::Instance(ClassTag::Channel), "pack_unsigned_query"), pack_unsigned_query),
            ((Scope::Instance(ClassTag::Channel), "pack_signed_query"), pack_signed_query),
            ((Scope::Instance(ClassTag::Channel), "server_key"), channel_server_key),
            ((Scope::Instance(ClassTag::Query), "get_query"), query_accessor),
            ((Scope::Instance(ClassTag::Query), "get_shared_secret"), query_accessor),
            ((Scope::Instance(ClassTag::Query), "get_expiry"), query_accessor),
            ((Scope::Static(ClassTag::Rng), "from_entropy"), rng_from_entropy),
            ((Scope::Static(ClassTag::ExchangeKey), "generate"), exchange_key_generate),
            ((Scope::Static(ClassTag::ExchangeKey), "from_base64"), exchange_key_from_base64),
            ((Scope::Instance(ClassTag::ExchangeKey), "public_key"), exchange_key_public),
            ((Scope::Instance(ClassTag::ExchangeKey), "to_base64"), exchange_key_to_base64),
            ((Scope::Static(ClassTag::AccessKey), "generate"), access_key_generate),
            ((Scope::Static(ClassTag::AccessKey), "derive"), access_key_derive),
            ((Scope::Static(ClassTag::AccessKey), "from_base64"), access_key_from_base64),
            ((Scope::Instance(ClassTag::AccessKey), "public_key"), access_key_public),
            ((Scope::Instance(ClassTag::AccessKey), "to_base64"), access_key_to_base64),
            ((Scope::Static(ClassTag::VaultKey), "derive"), vault_key_derive),
        ];
        let functions = HashMap::from(entries);

        debug!(functions = functions.len(), "crypto module function table built");
        Self { functions }
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

impl Default for CryptoModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeModule for CryptoModule {
    type Class = ClassTag;
    type Object = NativeObject;

    fn invoke(&mut self, call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
        let handler = self
            .functions
            .get(&(Scope::from(call.target), call.function))
            .ok_or_else(|| BridgeFault::unknown_function(call.function))?;
        handler(call)
    }

    fn accessor(&mut self, object: &NativeObject, name: &str) -> Result<WireValue, BridgeFault> {
        read_accessor(object, name)
    }
}

/// Zero-argument accessors usable in a preload.
fn read_accessor(object: &NativeObject, name: &str) -> Result<WireValue, BridgeFault> {
    match object {
        NativeObject::Query(query) => match name {
            "get_query" => Ok(WireValue::Bytes(query.bytes.clone())),
            "get_shared_secret" => Ok(WireValue::Bytes(query.shared_secret.as_bytes().to_vec())),
            "get_expiry" => i64::try_from(query.expires_at)
                .map(WireValue::Int)
                .map_err(|_| BridgeFault::internal("expiry out of range")),
            other => Err(BridgeFault::unknown_function(other)),
        },
        NativeObject::Channel(channel) if name == "server_key" => {
            Ok(WireValue::Str(channel.server_key().to_base64()))
        }
        NativeObject::ExchangeKey(key) if name == "public_key" => {
            Ok(WireValue::Str(key.public_key().to_base64()))
        }
        NativeObject::AccessKey(key) if name == "public_key" => {
            Ok(WireValue::Str(key.public_key().to_base64()))
        }
        _ => Err(BridgeFault::unknown_function(name)),
    }
}

fn module_fault(err: ModuleError) -> BridgeFault {
    err.into()
}

fn identifier(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let id = derive::identifier(call.args.str(0)?).map_err(module_fault)?;
    Ok(Outcome::string(id))
}

fn password_check_hash(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let hash = derive::password_check_hash(call.args.str(0)?, call.args.usize(1)?)
        .map_err(module_fault)?;
    Ok(Outcome::string(hash))
}

fn access_public_key(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = derive::access_key(call.args.str(0)?, call.args.str(1)?).map_err(module_fault)?;
    Ok(Outcome::string(key.public_key().to_base64()))
}

fn vault_seal(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = call.object(0)?.vault_key()?;
    let sealed = vault::seal_document(key, call.args.str(1)?).map_err(module_fault)?;
    Ok(Outcome::string(sealed))
}

fn vault_open(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = call.object(0)?.vault_key()?;
    let document = vault::open_document(key, call.args.str(1)?).map_err(module_fault)?;
    Ok(Outcome::string(document))
}

/// Move secret key material out of the arguments; it is wiped on drop.
fn take_secret(args: &mut Args, index: usize) -> Result<Zeroizing<Vec<u8>>, BridgeFault> {
    args.take_bytes(index).map(Zeroizing::new)
}

fn unpack_response(mut call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let bytes = call.args.take_bytes(0)?;
    let secret = take_secret(&mut call.args, 1)?;
    let secret = SharedSecret::from_slice(&secret).map_err(|e| module_fault(e.into()))?;
    let payload = protocol::unpack_response(&bytes, &secret).map_err(module_fault)?;
    Ok(Outcome::bytes(payload))
}

fn channel_from_signed_key(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let anchor = Ed25519PublicKey::from_base64(call.args.str(2)?)
        .map_err(|e| module_fault(e.into()))?;
    let channel = Channel::from_signed_key(call.args.str(0)?, call.args.str(1)?, &anchor)
        .map_err(module_fault)?;
    Ok(Outcome::Object(NativeObject::Channel(channel)))
}

fn pack_unsigned_query(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let channel = call.receiver()?.channel()?;
    let query = channel
        .pack_unsigned_query(call.args.bytes(0)?)
        .map_err(module_fault)?;
    Ok(Outcome::Object(NativeObject::Query(query)))
}

fn pack_signed_query(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let channel = call.receiver()?.channel()?;
    let signer = call.object(1)?.access_key()?;
    let query = channel
        .pack_signed_query(call.args.bytes(0)?, signer)
        .map_err(module_fault)?;
    Ok(Outcome::Object(NativeObject::Query(query)))
}

fn channel_server_key(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let channel = call.receiver()?.channel()?;
    Ok(Outcome::string(channel.server_key().to_base64()))
}

fn query_accessor(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let value = read_accessor(call.receiver()?, call.function)?;
    Ok(Outcome::Value(value))
}

fn rng_from_entropy(mut call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let pool = take_secret(&mut call.args, 0)?;
    let rng = EntropyRng::from_entropy(&pool);
    Ok(Outcome::Object(NativeObject::Rng(rng.map_err(module_fault)?)))
}

fn exchange_key_generate(mut call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let rng = call.object_mut(0)?.rng_mut()?;
    Ok(Outcome::Object(NativeObject::ExchangeKey(ExchangeSecret::generate(rng))))
}

fn exchange_key_from_base64(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = ExchangeSecret::from_base64(call.args.str(0)?).map_err(|e| module_fault(e.into()))?;
    Ok(Outcome::Object(NativeObject::ExchangeKey(key)))
}

fn exchange_key_public(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = call.receiver()?.exchange_key()?;
    Ok(Outcome::string(key.public_key().to_base64()))
}

fn exchange_key_to_base64(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = call.receiver()?.exchange_key()?;
    Ok(Outcome::string(key.to_base64()))
}

fn access_key_generate(mut call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let rng = call.object_mut(0)?.rng_mut()?;
    Ok(Outcome::Object(NativeObject::AccessKey(Ed25519KeyPair::generate_from(rng))))
}

fn access_key_derive(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = derive::access_key(call.args.str(0)?, call.args.str(1)?).map_err(module_fault)?;
    Ok(Outcome::Object(NativeObject::AccessKey(key)))
}

fn access_key_from_base64(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = Ed25519KeyPair::from_base64(call.args.str(0)?).map_err(|e| module_fault(e.into()))?;
    Ok(Outcome::Object(NativeObject::AccessKey(key)))
}

fn access_key_public(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = call.receiver()?.access_key()?;
    Ok(Outcome::string(key.public_key().to_base64()))
}

fn access_key_to_base64(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = call.receiver()?.access_key()?;
    Ok(Outcome::string(key.to_base64()))
}

fn vault_key_derive(call: Call<'_>) -> Result<Outcome<NativeObject>, BridgeFault> {
    let key = derive::vault_key(call.args.str(0)?, call.args.str(1)?).map_err(module_fault)?;
    Ok(Outcome::Object(NativeObject::VaultKey(key)))
}
