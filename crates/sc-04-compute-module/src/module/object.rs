//! Objects living in the computation context's handle table.

use super::class::ClassTag;
use crate::channel::Channel;
use crate::keys::EntropyRng;
use crate::protocol::PackedQuery;
use sc_02_call_bridge::{BridgeFault, Tagged};
use shared_crypto::{Ed25519KeyPair, ExchangeSecret, SecretKey};

pub enum NativeObject {
    Channel(Channel),
    Query(PackedQuery),
    Rng(EntropyRng),
    ExchangeKey(ExchangeSecret),
    AccessKey(Ed25519KeyPair),
    VaultKey(SecretKey),
}

impl Tagged for NativeObject {
    type Tag = ClassTag;

    fn tag(&self) -> ClassTag {
        match self {
            NativeObject::Channel(_) => ClassTag::Channel,
            NativeObject::Query(_) => ClassTag::Query,
            NativeObject::Rng(_) => ClassTag::Rng,
            NativeObject::ExchangeKey(_) => ClassTag::ExchangeKey,
            NativeObject::AccessKey(_) => ClassTag::AccessKey,
            NativeObject::VaultKey(_) => ClassTag::VaultKey,
        }
    }
}

fn wrong_class(expected: ClassTag, found: &NativeObject) -> BridgeFault {
    BridgeFault::invalid_argument(format!("expected {expected}, found {}", found.tag()))
}

impl NativeObject {
    pub fn channel(&self) -> Result<&Channel, BridgeFault> {
        match self {
            NativeObject::Channel(channel) => Ok(channel),
            other => Err(wrong_class(ClassTag::Channel, other)),
        }
    }

    pub fn query(&self) -> Result<&PackedQuery, BridgeFault> {
        match self {
            NativeObject::Query(query) => Ok(query),
            other => Err(wrong_class(ClassTag::Query, other)),
        }
    }

    pub fn rng_mut(&mut self) -> Result<&mut EntropyRng, BridgeFault> {
        match self {
            NativeObject::Rng(rng) => Ok(rng),
            other => Err(wrong_class(ClassTag::Rng, other)),
        }
    }

    pub fn exchange_key(&self) -> Result<&ExchangeSecret, BridgeFault> {
        match self {
            NativeObject::ExchangeKey(key) => Ok(key),
            other => Err(wrong_class(ClassTag::ExchangeKey, other)),
        }
    }

    pub fn access_key(&self) -> Result<&Ed25519KeyPair, BridgeFault> {
        match self {
            NativeObject::AccessKey(key) => Ok(key),
            other => Err(wrong_class(ClassTag::AccessKey, other)),
        }
    }

    pub fn vault_key(&self) -> Result<&SecretKey, BridgeFault> {
        match self {
            NativeObject::VaultKey(key) => Ok(key),
            other => Err(wrong_class(ClassTag::VaultKey, other)),
        }
    }
}
