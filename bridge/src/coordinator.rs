//! Per-chain bridge coordinator: nonce assignment, debit-before-send, and
//! replay-protected credit.

use crate::consumed::ConsumedNonces;
use crate::error::BridgeError;
use crate::message::BridgeMessage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tidal_accrual::{AccrualLedger, LedgerEvent};
use tidal_store::LedgerStore;
use tidal_types::{ChainId, HolderId, MessageChannel, MessageId, Timestamp, TRANSFER_ALL};
use tracing::{info, warn};

const STATE_KEY: &[u8] = b"bridge_state";

/// Result of a successful outbound bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundReceipt {
    pub message: BridgeMessage,
    pub message_id: MessageId,
}

/// Result of a successful inbound credit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundReceipt {
    pub message: BridgeMessage,
    pub message_id: MessageId,
    /// Whether the beneficiary took on the carried rate (its balance was zero).
    pub rate_adopted: bool,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    next_nonce: Vec<(ChainId, u64)>,
    consumed: Vec<(ChainId, ConsumedNonces)>,
}

/// Bridge endpoint for one chain.
///
/// Debits and credits go through the ledger's privileged mint/burn path under
/// the coordinator's `operator` identity, which must hold `MintBurn`.
pub struct BridgeCoordinator {
    chain: ChainId,
    operator: HolderId,
    peers: HashSet<ChainId>,
    next_nonce: HashMap<ChainId, u64>,
    consumed: BTreeMap<ChainId, ConsumedNonces>,
}

impl BridgeCoordinator {
    pub fn new(chain: ChainId, operator: HolderId, peers: impl IntoIterator<Item = ChainId>) -> Self {
        Self {
            chain,
            operator,
            peers: peers.into_iter().filter(|p| *p != chain).collect(),
            next_nonce: HashMap::new(),
            consumed: BTreeMap::new(),
        }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn operator(&self) -> &HolderId {
        &self.operator
    }

    pub fn peers(&self) -> &HashSet<ChainId> {
        &self.peers
    }

    pub fn add_peer(&mut self, peer: ChainId) {
        if peer != self.chain {
            self.peers.insert(peer);
        }
    }

    /// Nonce the next outbound message to `dest` will carry.
    pub fn next_nonce_for(&self, dest: ChainId) -> u64 {
        self.next_nonce.get(&dest).copied().unwrap_or(0)
    }

    pub fn is_consumed(&self, source: ChainId, nonce: u64) -> bool {
        self.consumed
            .get(&source)
            .is_some_and(|nonces| nonces.contains(nonce))
    }

    /// Consumed nonces from `source`, if any message from it was credited.
    pub fn consumed_from(&self, source: ChainId) -> Option<&ConsumedNonces> {
        self.consumed.get(&source)
    }

    pub fn consumed_count(&self) -> u64 {
        self.consumed.values().map(ConsumedNonces::len).sum()
    }

    fn check_ledger(&self, ledger: &AccrualLedger) -> Result<(), BridgeError> {
        if ledger.chain() != self.chain {
            return Err(BridgeError::LedgerMismatch {
                expected: self.chain,
                actual: ledger.chain(),
            });
        }
        Ok(())
    }

    /// Debit `sender` on this chain and hand a message for `dest` to the channel.
    ///
    /// The sender is touched before the debit, so the message carries the
    /// accrued value. [`TRANSFER_ALL`] bridges the whole balance. If the channel
    /// refuses the frame the debit is undone and the nonce is not consumed.
    #[allow(clippy::too_many_arguments)]
    pub fn outbound(
        &mut self,
        ledger: &mut AccrualLedger,
        channel: &mut dyn MessageChannel,
        sender: &HolderId,
        beneficiary: &HolderId,
        amount: u128,
        dest: ChainId,
        now: Timestamp,
    ) -> Result<OutboundReceipt, BridgeError> {
        self.check_ledger(ledger)?;
        if dest == self.chain || !self.peers.contains(&dest) {
            return Err(BridgeError::UnsupportedChain(dest));
        }
        if !beneficiary.is_valid() {
            return Err(BridgeError::MalformedMessage(format!(
                "invalid beneficiary {:?}",
                beneficiary.as_str()
            )));
        }

        let amount = if amount == TRANSFER_ALL {
            ledger.balance_of(sender, now)?
        } else {
            amount
        };
        if amount == 0 {
            return Err(BridgeError::ZeroAmount);
        }

        let nonce = self.next_nonce_for(dest);
        let following = nonce.checked_add(1).ok_or(BridgeError::Overflow)?;
        let message = BridgeMessage {
            source_chain: self.chain,
            dest_chain: dest,
            sender: sender.clone(),
            beneficiary: beneficiary.clone(),
            amount,
            // Touching never changes the locked rate, so this is the post-touch rate.
            carried_rate: ledger.locked_rate_of(sender),
            nonce,
        };
        let frame = message.encode()?;

        let snapshot = ledger.account(sender).cloned();
        ledger.burn(&self.operator, sender, amount, now)?;

        let message_id = match channel.send(dest, frame) {
            Ok(id) => id,
            Err(e) => {
                warn!(chain = %self.chain, dest = %dest, sender = %sender, error = %e, "bridge send failed, rolling back debit");
                ledger.restore_account(&self.operator, sender, snapshot)?;
                return Err(BridgeError::Channel(e));
            }
        };
        self.next_nonce.insert(dest, following);

        ledger.emit(LedgerEvent::BridgeSent {
            dest_chain: dest,
            nonce,
            sender: sender.clone(),
            beneficiary: beneficiary.clone(),
            amount,
            carried_rate: message.carried_rate,
        });
        info!(
            chain = %self.chain,
            dest = %dest,
            nonce,
            amount,
            rate = %message.carried_rate,
            id = %message_id,
            "bridge message sent"
        );
        Ok(OutboundReceipt { message, message_id })
    }

    /// Decode a frame delivered by the channel and credit it.
    pub fn on_deliver(
        &mut self,
        ledger: &mut AccrualLedger,
        frame: &[u8],
        now: Timestamp,
    ) -> Result<InboundReceipt, BridgeError> {
        let message = match BridgeMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(chain = %self.chain, len = frame.len(), error = %e, "dropping undecodable frame");
                return Err(e);
            }
        };
        self.inbound(ledger, message, now)
    }

    /// Credit a bridged amount to its beneficiary, at most once per
    /// `(source_chain, nonce)`.
    pub fn inbound(
        &mut self,
        ledger: &mut AccrualLedger,
        message: BridgeMessage,
        now: Timestamp,
    ) -> Result<InboundReceipt, BridgeError> {
        self.check_ledger(ledger)?;
        if let Err(e) = message.validate(self.chain, &self.peers) {
            warn!(chain = %self.chain, source = %message.source_chain, nonce = message.nonce, error = %e, "rejecting bridge message");
            return Err(e);
        }
        if self.is_consumed(message.source_chain, message.nonce) {
            warn!(chain = %self.chain, source = %message.source_chain, nonce = message.nonce, "replayed bridge message ignored");
            return Err(BridgeError::ReplayedMessage {
                source_chain: message.source_chain,
                nonce: message.nonce,
            });
        }

        let message_id = message.id()?;
        let rate_adopted = ledger.balance_of(&message.beneficiary, now)? == 0;
        if let Err(e) = ledger.mint(
            &self.operator,
            &message.beneficiary,
            message.amount,
            message.carried_rate,
            now,
        ) {
            warn!(chain = %self.chain, source = %message.source_chain, nonce = message.nonce, error = %e, "bridge credit failed, nonce left open");
            return Err(e.into());
        }
        self.consumed.entry(message.source_chain).or_default().insert(message.nonce);

        ledger.emit(LedgerEvent::BridgeReceived {
            source_chain: message.source_chain,
            nonce: message.nonce,
            beneficiary: message.beneficiary.clone(),
            amount: message.amount,
            carried_rate: message.carried_rate,
        });
        info!(
            chain = %self.chain,
            source = %message.source_chain,
            nonce = message.nonce,
            amount = message.amount,
            rate_adopted,
            id = %message_id,
            "bridge message credited"
        );
        Ok(InboundReceipt {
            message,
            message_id,
            rate_adopted,
        })
    }

    /// Persist nonce counters and, per source, the consumed watermark plus
    /// any nonces credited ahead of a gap.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), BridgeError> {
        let mut next_nonce: Vec<_> = self.next_nonce.iter().map(|(c, n)| (*c, *n)).collect();
        next_nonce.sort();
        let consumed: Vec<_> = self
            .consumed
            .iter()
            .map(|(c, nonces)| (*c, nonces.clone()))
            .collect();
        let bytes = bincode::serialize(&PersistedState { next_nonce, consumed })
            .map_err(|e| BridgeError::Storage(e.to_string()))?;
        store
            .put_meta(STATE_KEY, &bytes)
            .map_err(|e| BridgeError::Storage(e.to_string()))
    }

    /// Rebuild a coordinator, restoring persisted nonces and consumed
    /// messages if the store has any.
    pub fn load_from_store(
        store: &dyn LedgerStore,
        chain: ChainId,
        operator: HolderId,
        peers: impl IntoIterator<Item = ChainId>,
    ) -> Result<Self, BridgeError> {
        let mut coordinator = Self::new(chain, operator, peers);
        let bytes = store
            .get_meta(STATE_KEY)
            .map_err(|e| BridgeError::Storage(e.to_string()))?;
        if let Some(bytes) = bytes {
            let state: PersistedState =
                bincode::deserialize(&bytes).map_err(|e| BridgeError::Storage(e.to_string()))?;
            coordinator.next_nonce = state.next_nonce.into_iter().collect();
            coordinator.consumed = state.consumed.into_iter().collect();
        }
        Ok(coordinator)
    }
}
