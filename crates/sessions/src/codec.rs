//! Payload serialization adapters.
//!
//! The repository never looks inside stored bytes; it hands them to a
//! [`SessionCodec`] selected at construction time.

use std::sync::Arc;

use ms_domain::config::SerializerKind;
use ms_domain::error::{Error, Result};

use crate::Payload;

/// Encode/decode capability for session payloads.
///
/// Implementations must round-trip every JSON-compatible value losslessly.
pub trait SessionCodec: Send + Sync {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Payload>;
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// JSON text; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl SessionCodec for JsonCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(payload)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Compact binary encoding (CBOR).
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl SessionCodec for CborCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(payload, &mut buf)
            .map_err(|e| Error::Codec(format!("cbor encode: {e}")))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload> {
        ciborium::from_reader(bytes).map_err(|e| Error::Codec(format!("cbor decode: {e}")))
    }

    fn name(&self) -> &'static str {
        "cbor"
    }
}

/// Build the codec named by the `store.serializer` config field.
pub fn codec_for(kind: SerializerKind) -> Arc<dyn SessionCodec> {
    match kind {
        SerializerKind::Json => Arc::new(JsonCodec),
        SerializerKind::Cbor => Arc::new(CborCodec),
    }
}
