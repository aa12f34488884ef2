//! # Commands
//!
//! Every decoded [`Message`] is classified exactly once into a [`Command`]. The bus then
//! matches on the enum, so adding a control type means adding a variant and the compiler
//! points at every place that has to handle it.

use crate::message::{
    Message, DEREGISTER_ACTOR, MESSAGE_DECODE_ERROR, REGISTER_ACTOR, TEST_CACHE_GET,
    UPDATE_ACTOR_ADDRESS,
};
use serde_json::Value;

/// What the bus should do with one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register { actor_id: String, address: String },
    UpdateAddress { actor_id: String, address: String },
    Deregister { actor_id: String },
    TestGet { actor_id: String },
    /// Not a control message: forward `action` to `receiver_id`.
    Passthrough(Message),
    /// A decode sentinel. Never forwarded.
    Undecodable(Message),
    /// A control type whose payload lacks a required field.
    Malformed { kind: String, reason: &'static str },
}

impl Command {
    pub fn classify(message: Message) -> Self {
        let kind = match message.kind() {
            Some(kind) => kind.to_string(),
            None => return Command::Passthrough(message),
        };

        match kind.as_str() {
            REGISTER_ACTOR => match registration(&message) {
                Ok((actor_id, address)) => Command::Register { actor_id, address },
                Err(reason) => malformed(&kind, reason),
            },
            UPDATE_ACTOR_ADDRESS => match registration(&message) {
                Ok((actor_id, address)) => Command::UpdateAddress { actor_id, address },
                Err(reason) => malformed(&kind, reason),
            },
            DEREGISTER_ACTOR => match actor_id(&message) {
                Ok(actor_id) => Command::Deregister { actor_id },
                Err(reason) => malformed(&kind, reason),
            },
            TEST_CACHE_GET => match actor_id(&message) {
                Ok(actor_id) => Command::TestGet { actor_id },
                Err(reason) => malformed(&kind, reason),
            },
            MESSAGE_DECODE_ERROR => Command::Undecodable(message),
            _ => Command::Passthrough(message),
        }
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::UpdateAddress { .. } => "update_address",
            Command::Deregister { .. } => "deregister",
            Command::TestGet { .. } => "test_get",
            Command::Passthrough(_) => "passthrough",
            Command::Undecodable(_) => "undecodable",
            Command::Malformed { .. } => "malformed",
        }
    }
}

impl From<Message> for Command {
    fn from(message: Message) -> Self {
        Command::classify(message)
    }
}

fn actor_id(message: &Message) -> Result<String, &'static str> {
    message.payload.as_ref().ok_or("missing payload")?;
    match message.payload_field("actor_id") {
        Some(Value::String(actor_id)) => Ok(actor_id.clone()),
        Some(_) => Err("payload.actor_id is not a string"),
        None => Err("missing payload.actor_id"),
    }
}

fn registration(message: &Message) -> Result<(String, String), &'static str> {
    let actor_id = actor_id(message)?;
    let address = match message.payload_field("actor_address") {
        Some(Value::String(address)) => address.clone(),
        Some(_) => return Err("payload.actor_address is not a string"),
        None => return Err("missing payload.actor_address"),
    };
    Ok((actor_id, address))
}

fn malformed(kind: &str, reason: &'static str) -> Command {
    Command::Malformed {
        kind: kind.to_string(),
        reason,
    }
}
