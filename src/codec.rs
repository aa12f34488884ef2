//! # Codec
//!
//! Turns raw inbound bytes into [`Message`]s and outbound values into bytes.
//!
//! Both operations are single-result futures that cannot fail from the caller's point of
//! view: a decode failure becomes a `MESSAGE_DECODE_ERROR` sentinel message, and an encode
//! failure hands back a `MESSAGE_ENCODE_ERROR` sentinel instead of bytes. The bus never
//! sees a codec error type, which keeps the dispatch path free of a second error channel.
//!
//! Plug a different representation in with [`BusBuilder::codec`](crate::bus::BusBuilder::codec).

use crate::message::Message;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

#[async_trait]
pub trait Codec: Send + Sync + 'static {
    /// Decodes one inbound item. Yields a decode sentinel when `raw` is not a message.
    async fn decode(&self, raw: &[u8]) -> Message;

    /// Encodes one outbound value. The `Err` side carries the encode sentinel.
    async fn encode(&self, value: &Value) -> Result<Bytes, Message>;
}

/// The default JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[async_trait]
impl Codec for JsonCodec {
    async fn decode(&self, raw: &[u8]) -> Message {
        serde_json::from_slice(raw).unwrap_or_else(Message::decode_error)
    }

    async fn encode(&self, value: &Value) -> Result<Bytes, Message> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(Message::encode_error)
    }
}
