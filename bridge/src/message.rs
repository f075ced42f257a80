//! The cross-chain message and its wire encoding.

use crate::error::BridgeError;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tidal_types::{ChainId, HolderId, MessageId, Rate};

/// Version byte carried in every frame.
pub const WIRE_VERSION: u8 = 1;

/// Frames larger than this are rejected before decoding.
pub const MAX_FRAME_BYTES: u64 = 4096;

/// One cross-chain move: `amount` debited from `sender` on `source_chain`,
/// to be credited to `beneficiary` on `dest_chain` at `carried_rate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub source_chain: ChainId,
    pub dest_chain: ChainId,
    pub sender: HolderId,
    pub beneficiary: HolderId,
    pub amount: u128,
    /// The sender's locked rate at debit time.
    pub carried_rate: Rate,
    /// Unique per `(source_chain, dest_chain)`; assigned by the source coordinator.
    pub nonce: u64,
}

#[derive(Serialize, Deserialize)]
struct Frame {
    version: u8,
    message: BridgeMessage,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .with_limit(MAX_FRAME_BYTES)
}

impl BridgeMessage {
    /// Encode as a versioned frame.
    pub fn encode(&self) -> Result<Vec<u8>, BridgeError> {
        let frame = Frame {
            version: WIRE_VERSION,
            message: self.clone(),
        };
        wire_options()
            .serialize(&frame)
            .map_err(|e| BridgeError::MalformedMessage(format!("encode failed: {e}")))
    }

    /// Decode a frame. Any structural problem is a `MalformedMessage`.
    pub fn decode(bytes: &[u8]) -> Result<Self, BridgeError> {
        if bytes.len() as u64 > MAX_FRAME_BYTES {
            return Err(BridgeError::MalformedMessage(format!(
                "frame of {} bytes exceeds limit",
                bytes.len()
            )));
        }
        let frame: Frame = wire_options()
            .deserialize(bytes)
            .map_err(|e| BridgeError::MalformedMessage(format!("undecodable frame: {e}")))?;
        if frame.version != WIRE_VERSION {
            return Err(BridgeError::MalformedMessage(format!(
                "unsupported wire version {}",
                frame.version
            )));
        }
        Ok(frame.message)
    }

    /// Content digest; equals the id the channel reports for this message's frame.
    pub fn id(&self) -> Result<MessageId, BridgeError> {
        Ok(MessageId::digest(&self.encode()?))
    }

    /// Structural checks a receiving chain applies before anything else.
    pub fn validate(&self, local_chain: ChainId, peers: &HashSet<ChainId>) -> Result<(), BridgeError> {
        if self.dest_chain != local_chain {
            return Err(BridgeError::MalformedMessage(format!(
                "addressed to {}, received on {}",
                self.dest_chain, local_chain
            )));
        }
        if self.source_chain == local_chain || !peers.contains(&self.source_chain) {
            return Err(BridgeError::MalformedMessage(format!(
                "unknown source {}",
                self.source_chain
            )));
        }
        if self.amount == 0 {
            return Err(BridgeError::MalformedMessage("zero amount".into()));
        }
        if !self.beneficiary.is_valid() {
            return Err(BridgeError::MalformedMessage(format!(
                "invalid beneficiary {:?}",
                self.beneficiary.as_str()
            )));
        }
        Ok(())
    }
}
