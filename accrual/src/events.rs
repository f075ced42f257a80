//! Events emitted by ledger mutations for subscribers.

use crate::access::Role;
use tidal_types::{ChainId, HolderId, Rate, Timestamp};

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Accrued interest was materialized into a holder's principal.
    InterestMinted { holder: HolderId, amount: u128 },
    /// Principal was credited by a privileged mint.
    Minted { holder: HolderId, amount: u128 },
    /// Principal was debited by a privileged burn.
    Burned { holder: HolderId, amount: u128 },
    /// Value moved between two holders on this ledger.
    Transferred {
        from: HolderId,
        to: HolderId,
        amount: u128,
    },
    /// A holder's locked rate was (re)assigned on a zero-to-non-zero transition.
    RateLocked { holder: HolderId, rate: Rate },
    /// The global rate was lowered or re-affirmed.
    RateChanged {
        previous: Rate,
        rate: Rate,
        at: Timestamp,
    },
    RoleGranted { holder: HolderId, role: Role },
    RoleRevoked { holder: HolderId, role: Role },
    /// A holder's state was rolled back by an operator after a failed hand-off.
    AccountRestored { holder: HolderId },
    /// Value left this ledger for another chain.
    BridgeSent {
        dest_chain: ChainId,
        nonce: u64,
        sender: HolderId,
        beneficiary: HolderId,
        amount: u128,
        carried_rate: Rate,
    },
    /// Value arrived from another chain.
    BridgeReceived {
        source_chain: ChainId,
        nonce: u64,
        beneficiary: HolderId,
        amount: u128,
        carried_rate: Rate,
    },
}

/// Synchronous fan-out event bus for ledger events.
///
/// Listeners are invoked inline on the emitting thread; keep handlers fast to
/// avoid stalling ledger operations.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
