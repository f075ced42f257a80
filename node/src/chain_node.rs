//! One chain: ledger, bridge endpoint, vault, reserve and clock.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use tidal_accrual::{AccrualLedger, Role};
use tidal_bridge::{BridgeCoordinator, BridgeError, InboundReceipt, OutboundReceipt};
use tidal_rate::RateChange;
use tidal_store::LedgerStore;
use tidal_types::{ChainId, Clock, HolderId, MessageChannel, Rate, Timestamp};
use tidal_utils::StatsCounter;
use tidal_vault::{LocalReserve, NativeReserve, Vault};

use crate::config::ChainConfig;
use crate::NodeError;

pub const STAT_BRIDGE_SENT: &str = "bridge_sent";
pub const STAT_BRIDGE_RECEIVED: &str = "bridge_received";
pub const STAT_BRIDGE_REPLAYED: &str = "bridge_replayed";
pub const STAT_BRIDGE_MALFORMED: &str = "bridge_malformed";
pub const STAT_BRIDGE_DEFERRED: &str = "bridge_deferred";

pub const STAT_NAMES: &[&str] = &[
    STAT_BRIDGE_SENT,
    STAT_BRIDGE_RECEIVED,
    STAT_BRIDGE_REPLAYED,
    STAT_BRIDGE_MALFORMED,
    STAT_BRIDGE_DEFERRED,
];

const PENDING_KEY: &[u8] = b"pending_frames";

/// Point-in-time report of a chain, as printed by the daemon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    pub chain_id: u64,
    pub name: String,
    pub at: u64,
    pub current_rate: Rate,
    pub total_supply: u128,
    pub reserves: u128,
    pub balances: BTreeMap<HolderId, u128>,
    pub native_wallets: BTreeMap<HolderId, u128>,
    /// Delivered frames whose credit failed and awaits a retry.
    pub pending_frames: usize,
    pub stats: BTreeMap<&'static str, u64>,
}

pub struct ChainNode {
    config: ChainConfig,
    ledger: AccrualLedger,
    coordinator: BridgeCoordinator,
    vault: Vault,
    reserve: LocalReserve,
    clock: Arc<dyn Clock>,
    stats: StatsCounter,
    /// Holders seen through the vault, for reporting native wallets.
    native_holders: Vec<HolderId>,
    /// Frames whose credit failed for a retryable reason, oldest first.
    pending: VecDeque<Vec<u8>>,
}

impl ChainNode {
    /// Start a fresh chain: genesis ledger, role grants, funded reward pool.
    pub fn new(config: ChainConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        config.validate()?;
        let now = clock.now();
        let mut ledger =
            AccrualLedger::new(config.chain(), config.admin.clone(), config.initial_rate(), now);
        ledger.grant_role(&config.admin, &config.admin, Role::RateSetter)?;
        ledger.grant_role(&config.admin, &config.bridge_operator, Role::MintBurn)?;
        ledger.grant_role(&config.admin, &config.vault_operator, Role::MintBurn)?;

        let coordinator = BridgeCoordinator::new(
            config.chain(),
            config.bridge_operator.clone(),
            config.peer_chains(),
        );
        Self::assemble(config, ledger, coordinator, clock)
    }

    /// Resume a chain from a store written by [`ChainNode::save_to_store`].
    ///
    /// The native reserve is not persisted; it starts from the configured
    /// reward pool. Frames still pending at save time are pending again.
    pub fn load_from_store(
        config: ChainConfig,
        clock: Arc<dyn Clock>,
        store: &dyn LedgerStore,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let ledger = AccrualLedger::load_from_store(store)?;
        if ledger.chain() != config.chain() {
            return Err(NodeError::Config(format!(
                "store holds {}, config is for {}",
                ledger.chain(),
                config.chain()
            )));
        }
        let coordinator = BridgeCoordinator::load_from_store(
            store,
            config.chain(),
            config.bridge_operator.clone(),
            config.peer_chains(),
        )?;
        let mut node = Self::assemble(config, ledger, coordinator, clock)?;
        if let Some(bytes) = store.get_meta(PENDING_KEY)? {
            let frames: Vec<Vec<u8>> = bincode::deserialize(&bytes)
                .map_err(|e| NodeError::Serialization(e.to_string()))?;
            node.pending = frames.into();
        }
        Ok(node)
    }

    fn assemble(
        config: ChainConfig,
        ledger: AccrualLedger,
        coordinator: BridgeCoordinator,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let mut reserve = LocalReserve::new();
        reserve.fund_rewards(u128::from(config.rewards_pool))?;
        let vault = Vault::new(config.vault_operator.clone());
        info!(
            chain = %config.chain(),
            name = %config.name,
            rate = %ledger.current_rate(),
            peers = ?config.peers,
            "chain node ready"
        );
        Ok(Self {
            config,
            ledger,
            coordinator,
            vault,
            reserve,
            clock,
            stats: StatsCounter::new(STAT_NAMES),
            native_holders: Vec::new(),
            pending: VecDeque::new(),
        })
    }

    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), NodeError> {
        self.ledger.save_to_store(store)?;
        self.coordinator.save_to_store(store)?;
        let pending: Vec<&Vec<u8>> = self.pending.iter().collect();
        let bytes =
            bincode::serialize(&pending).map_err(|e| NodeError::Serialization(e.to_string()))?;
        store.put_meta(PENDING_KEY, &bytes)?;
        Ok(())
    }

    pub fn chain(&self) -> ChainId {
        self.config.chain()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn ledger(&self) -> &AccrualLedger {
        &self.ledger
    }

    /// Mutable ledger access, for subscribing to its event bus.
    pub fn ledger_mut(&mut self) -> &mut AccrualLedger {
        &mut self.ledger
    }

    pub fn coordinator(&self) -> &BridgeCoordinator {
        &self.coordinator
    }

    pub fn reserve(&self) -> &LocalReserve {
        &self.reserve
    }

    pub fn stats(&self) -> &StatsCounter {
        &self.stats
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Native side ──────────────────────────────────────────────────────

    /// Give `holder` native value outside the vault (genesis allocation).
    pub fn credit_native(&mut self, holder: &HolderId, amount: u128) -> Result<(), NodeError> {
        self.reserve.credit_wallet(holder, amount)?;
        self.note_native_holder(holder);
        Ok(())
    }

    pub fn fund_rewards(&mut self, amount: u128) -> Result<(), NodeError> {
        self.reserve.fund_rewards(amount)?;
        Ok(())
    }

    pub fn deposit(&mut self, holder: &HolderId, amount: u128) -> Result<(), NodeError> {
        let now = self.now();
        self.vault
            .deposit(&mut self.ledger, &mut self.reserve, holder, amount, now)?;
        self.note_native_holder(holder);
        Ok(())
    }

    pub fn withdraw(&mut self, holder: &HolderId, amount: u128) -> Result<u128, NodeError> {
        let now = self.now();
        let released = self
            .vault
            .withdraw(&mut self.ledger, &mut self.reserve, holder, amount, now)?;
        self.note_native_holder(holder);
        Ok(released)
    }

    fn note_native_holder(&mut self, holder: &HolderId) {
        if !self.native_holders.contains(holder) {
            self.native_holders.push(holder.clone());
        }
    }

    // ── Ledger ───────────────────────────────────────────────────────────

    pub fn transfer(
        &mut self,
        sender: &HolderId,
        recipient: &HolderId,
        amount: u128,
    ) -> Result<u128, NodeError> {
        let now = self.now();
        Ok(self.ledger.transfer(sender, recipient, amount, now)?)
    }

    pub fn set_rate(&mut self, caller: &HolderId, rate: Rate) -> Result<RateChange, NodeError> {
        let now = self.now();
        Ok(self.ledger.set_rate(caller, rate, now)?)
    }

    pub fn grant_role(&mut self, caller: &HolderId, holder: &HolderId, role: Role) -> Result<(), NodeError> {
        Ok(self.ledger.grant_role(caller, holder, role)?)
    }

    pub fn revoke_role(&mut self, caller: &HolderId, holder: &HolderId, role: Role) -> Result<(), NodeError> {
        Ok(self.ledger.revoke_role(caller, holder, role)?)
    }

    pub fn balance_of(&self, holder: &HolderId) -> Result<u128, NodeError> {
        Ok(self.ledger.balance_of(holder, self.now())?)
    }

    pub fn total_supply(&self) -> Result<u128, NodeError> {
        Ok(self.ledger.total_supply(self.now())?)
    }

    // ── Bridge ───────────────────────────────────────────────────────────

    pub fn bridge_out(
        &mut self,
        channel: &mut dyn MessageChannel,
        sender: &HolderId,
        beneficiary: &HolderId,
        amount: u128,
        dest: ChainId,
    ) -> Result<OutboundReceipt, NodeError> {
        let now = self.now();
        let receipt = self.coordinator.outbound(
            &mut self.ledger,
            channel,
            sender,
            beneficiary,
            amount,
            dest,
            now,
        )?;
        self.stats.increment(STAT_BRIDGE_SENT);
        Ok(receipt)
    }

    /// Apply one frame delivered by the transport.
    ///
    /// A frame whose credit fails for a retryable reason (see
    /// [`BridgeError::is_retryable`]) is kept and retried by
    /// [`ChainNode::retry_pending`]; its source debit is already final.
    pub fn deliver(&mut self, frame: &[u8]) -> Result<InboundReceipt, NodeError> {
        let result = self.apply_frame(frame);
        if let Err(NodeError::Bridge(e)) = &result {
            if e.is_retryable() {
                self.stats.increment(STAT_BRIDGE_DEFERRED);
                self.pending.push_back(frame.to_vec());
                warn!(chain = %self.chain(), pending = self.pending.len(), error = %e, "frame deferred for retry");
            }
        }
        result
    }

    fn apply_frame(&mut self, frame: &[u8]) -> Result<InboundReceipt, NodeError> {
        let now = self.now();
        match self.coordinator.on_deliver(&mut self.ledger, frame, now) {
            Ok(receipt) => {
                self.stats.increment(STAT_BRIDGE_RECEIVED);
                Ok(receipt)
            }
            Err(e) => {
                match &e {
                    BridgeError::ReplayedMessage { .. } => self.stats.increment(STAT_BRIDGE_REPLAYED),
                    BridgeError::MalformedMessage(_) => self.stats.increment(STAT_BRIDGE_MALFORMED),
                    _ => {}
                }
                Err(e.into())
            }
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Reapply every pending frame once. Frames that fail again for a
    /// retryable reason stay pending; replays of an already credited frame
    /// are discarded. Returns how many were credited.
    pub fn retry_pending(&mut self) -> usize {
        let mut credited = 0;
        for frame in std::mem::take(&mut self.pending) {
            match self.apply_frame(&frame) {
                Ok(_) => credited += 1,
                Err(NodeError::Bridge(e)) if e.is_retryable() => self.pending.push_back(frame),
                Err(e) => debug!(chain = %self.chain(), error = %e, "pending frame discarded"),
            }
        }
        if credited > 0 {
            info!(chain = %self.chain(), credited, still_pending = self.pending.len(), "pending frames credited");
        }
        credited
    }

    // ── Reporting ────────────────────────────────────────────────────────

    pub fn summary(&self) -> Result<ChainSummary, NodeError> {
        let now = self.now();
        let mut balances = BTreeMap::new();
        for holder in self.ledger.holders() {
            balances.insert(holder.clone(), self.ledger.balance_of(holder, now)?);
        }
        let native_wallets = self
            .native_holders
            .iter()
            .map(|h| (h.clone(), self.reserve.wallet_of(h)))
            .collect();
        let stats: HashMap<_, _> = self.stats.snapshot();
        Ok(ChainSummary {
            chain_id: self.config.chain_id,
            name: self.config.name.clone(),
            at: now.as_secs(),
            current_rate: self.ledger.current_rate(),
            total_supply: self.ledger.total_supply(now)?,
            reserves: self.reserve.reserves(),
            balances,
            native_wallets,
            pending_frames: self.pending.len(),
            stats: stats.into_iter().collect(),
        })
    }
}
