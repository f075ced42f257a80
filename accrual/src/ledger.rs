//! The accrual ledger: touches, mints, burns and transfers.

use crate::access::{AccessControl, Role};
use crate::error::LedgerError;
use crate::events::{EventBus, LedgerEvent};
use crate::state::AccountState;
use std::collections::HashMap;
use tidal_rate::{RateChange, RateRegistry};
use tidal_store::LedgerStore;
use tidal_types::{ChainId, HolderId, Rate, Timestamp, TRANSFER_ALL};

/// One chain's accrual ledger.
///
/// Owns the holder map, the chain's rate registry and the access-control list.
/// Every mutating operation computes its result on copies and commits only on
/// success, so a failed call leaves every account exactly as it was.
pub struct AccrualLedger {
    chain: ChainId,
    accounts: HashMap<HolderId, AccountState>,
    registry: RateRegistry,
    access: AccessControl,
    events: EventBus,
}

impl AccrualLedger {
    pub fn new(chain: ChainId, admin: HolderId, initial_rate: Rate, genesis: Timestamp) -> Self {
        Self {
            chain,
            accounts: HashMap::new(),
            registry: RateRegistry::new(initial_rate, genesis),
            access: AccessControl::new(admin),
            events: EventBus::new(),
        }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn registry(&self) -> &RateRegistry {
        &self.registry
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// The event bus, for subscribing observers.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Publish an event to all observers of this ledger.
    pub fn emit(&self, event: LedgerEvent) {
        self.events.emit(&event);
    }

    /// The global rate applied to fresh local deposits.
    pub fn current_rate(&self) -> Rate {
        self.registry.current_rate()
    }

    pub fn account(&self, holder: &HolderId) -> Option<&AccountState> {
        self.accounts.get(holder)
    }

    pub fn holders(&self) -> impl Iterator<Item = &HolderId> {
        self.accounts.keys()
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Accrual-adjusted balance at `now`. Pure; never mutates.
    pub fn balance_of(&self, holder: &HolderId, now: Timestamp) -> Result<u128, LedgerError> {
        match self.accounts.get(holder) {
            Some(state) => state.balance_checked(now).ok_or(LedgerError::Overflow),
            None => Ok(0),
        }
    }

    /// Materialized principal, excluding interest since the last touch.
    pub fn principal_of(&self, holder: &HolderId) -> u128 {
        self.accounts.get(holder).map(|s| s.principal).unwrap_or(0)
    }

    pub fn locked_rate_of(&self, holder: &HolderId) -> Rate {
        self.accounts
            .get(holder)
            .map(|s| s.locked_rate)
            .unwrap_or(Rate::ZERO)
    }

    /// Sum of all accrual-adjusted balances at `now`.
    pub fn total_supply(&self, now: Timestamp) -> Result<u128, LedgerError> {
        self.accounts.values().try_fold(0u128, |acc, state| {
            let balance = state.balance_checked(now).ok_or(LedgerError::Overflow)?;
            acc.checked_add(balance).ok_or(LedgerError::Overflow)
        })
    }

    /// Sum of all materialized principals.
    pub fn total_principal(&self) -> Result<u128, LedgerError> {
        self.accounts.values().try_fold(0u128, |acc, state| {
            acc.checked_add(state.principal).ok_or(LedgerError::Overflow)
        })
    }

    // ── Touch ────────────────────────────────────────────────────────────

    /// The holder's state as it would be after a touch at `now`, without committing.
    fn touched(&self, holder: &HolderId, now: Timestamp) -> Result<(AccountState, u128), LedgerError> {
        let current = self.accounts.get(holder).cloned().unwrap_or_default();
        current.touched(now).ok_or(LedgerError::Overflow)
    }

    fn commit(&mut self, holder: &HolderId, state: AccountState, increase: u128) {
        self.accounts.insert(holder.clone(), state);
        if increase > 0 {
            tracing::debug!(holder = %holder, increase, "interest materialized");
            self.events.emit(&LedgerEvent::InterestMinted {
                holder: holder.clone(),
                amount: increase,
            });
        }
    }

    /// Materialize interest accrued since the last touch. Returns the amount materialized.
    ///
    /// A second touch at the same instant materializes nothing. Touching a
    /// holder with no account is a no-op and does not create one.
    pub fn touch(&mut self, holder: &HolderId, now: Timestamp) -> Result<u128, LedgerError> {
        if !self.accounts.contains_key(holder) {
            return Ok(0);
        }
        let (state, increase) = self.touched(holder, now)?;
        self.commit(holder, state, increase);
        Ok(increase)
    }

    // ── Privileged mutations ─────────────────────────────────────────────

    /// Credit `amount` to `holder`.
    ///
    /// Pending interest is materialized first under the old rate. If this mint
    /// takes the holder from zero to non-zero, `rate_to_apply` becomes its
    /// locked rate; a funded holder keeps its rate.
    pub fn mint(
        &mut self,
        caller: &HolderId,
        holder: &HolderId,
        amount: u128,
        rate_to_apply: Rate,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.access.require(caller, Role::MintBurn)?;
        let (mut state, increase) = self.touched(holder, now)?;
        let adopts = state.is_empty() && amount > 0;
        if adopts {
            state.locked_rate = rate_to_apply;
        }
        state.principal = state
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let locked_rate = state.locked_rate;
        self.commit(holder, state, increase);

        if adopts {
            self.events.emit(&LedgerEvent::RateLocked {
                holder: holder.clone(),
                rate: locked_rate,
            });
        }
        self.events.emit(&LedgerEvent::Minted {
            holder: holder.clone(),
            amount,
        });
        tracing::info!(chain = %self.chain, holder = %holder, amount, rate = %locked_rate, "minted");
        Ok(())
    }

    /// Mint at the registry's current global rate (local deposits).
    pub fn mint_at_current_rate(
        &mut self,
        caller: &HolderId,
        holder: &HolderId,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let rate = self.current_rate();
        self.mint(caller, holder, amount, rate, now)
    }

    /// Debit `amount` from `holder` after materializing its interest.
    ///
    /// [`TRANSFER_ALL`] burns the entire touched balance. Returns the amount burned.
    pub fn burn(
        &mut self,
        caller: &HolderId,
        holder: &HolderId,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        self.access.require(caller, Role::MintBurn)?;
        let (mut state, increase) = self.touched(holder, now)?;
        let amount = if amount == TRANSFER_ALL {
            state.principal
        } else {
            amount
        };
        if amount > state.principal {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: state.principal,
            });
        }
        state.principal -= amount;
        self.commit(holder, state, increase);

        self.events.emit(&LedgerEvent::Burned {
            holder: holder.clone(),
            amount,
        });
        tracing::info!(chain = %self.chain, holder = %holder, amount, "burned");
        Ok(amount)
    }

    /// Put a holder's state back to a snapshot taken earlier in the same operation.
    ///
    /// Used by operators to undo a debit whose hand-off (native release, bridge
    /// send) failed. `None` removes the account.
    pub fn restore_account(
        &mut self,
        caller: &HolderId,
        holder: &HolderId,
        snapshot: Option<AccountState>,
    ) -> Result<(), LedgerError> {
        self.access.require(caller, Role::MintBurn)?;
        match snapshot {
            Some(state) => {
                self.accounts.insert(holder.clone(), state);
            }
            None => {
                self.accounts.remove(holder);
            }
        }
        tracing::warn!(chain = %self.chain, holder = %holder, "account restored after failed hand-off");
        self.events.emit(&LedgerEvent::AccountRestored {
            holder: holder.clone(),
        });
        Ok(())
    }

    // ── Holder operations ────────────────────────────────────────────────

    /// Move `amount` from `sender` to `recipient`, touching both first.
    ///
    /// [`TRANSFER_ALL`] moves the sender's whole touched balance. A recipient
    /// whose touched balance is zero adopts the sender's locked rate; a funded
    /// recipient keeps its own. Returns the amount moved.
    pub fn transfer(
        &mut self,
        sender: &HolderId,
        recipient: &HolderId,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        let (mut from, from_increase) = self.touched(sender, now)?;
        let amount = if amount == TRANSFER_ALL {
            from.principal
        } else {
            amount
        };
        if amount > from.principal {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available: from.principal,
            });
        }

        if sender == recipient {
            if self.accounts.contains_key(sender) {
                self.commit(sender, from, from_increase);
            }
            return Ok(amount);
        }

        let (mut to, to_increase) = self.touched(recipient, now)?;
        let adopts = to.is_empty() && amount > 0;
        if adopts {
            to.locked_rate = from.locked_rate;
        }
        from.principal -= amount;
        to.principal = to
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let adopted_rate = to.locked_rate;

        self.commit(sender, from, from_increase);
        self.commit(recipient, to, to_increase);

        if adopts {
            self.events.emit(&LedgerEvent::RateLocked {
                holder: recipient.clone(),
                rate: adopted_rate,
            });
        }
        self.events.emit(&LedgerEvent::Transferred {
            from: sender.clone(),
            to: recipient.clone(),
            amount,
        });
        tracing::info!(chain = %self.chain, from = %sender, to = %recipient, amount, "transferred");
        Ok(amount)
    }

    // ── Administration ───────────────────────────────────────────────────

    /// Lower (or re-affirm) the global rate. Requires [`Role::RateSetter`].
    pub fn set_rate(&mut self, caller: &HolderId, new_rate: Rate, now: Timestamp) -> Result<RateChange, LedgerError> {
        self.access.require(caller, Role::RateSetter)?;
        let change = self.registry.set_rate(new_rate, now)?;
        self.events.emit(&LedgerEvent::RateChanged {
            previous: change.previous,
            rate: change.rate,
            at: change.at,
        });
        Ok(change)
    }

    pub fn grant_role(&mut self, caller: &HolderId, holder: &HolderId, role: Role) -> Result<(), LedgerError> {
        if self.access.grant(caller, holder, role)? {
            tracing::info!(chain = %self.chain, holder = %holder, role = %role, "role granted");
            self.events.emit(&LedgerEvent::RoleGranted {
                holder: holder.clone(),
                role,
            });
        }
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: &HolderId, holder: &HolderId, role: Role) -> Result<(), LedgerError> {
        if self.access.revoke(caller, holder, role)? {
            tracing::info!(chain = %self.chain, holder = %holder, role = %role, "role revoked");
            self.events.emit(&LedgerEvent::RoleRevoked {
                holder: holder.clone(),
                role,
            });
        }
        Ok(())
    }
}

impl AccrualLedger {
    /// Persist all ledger state to a store.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), LedgerError> {
        store
            .put_meta(b"chain", &self.chain.to_be_bytes())
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let registry_bytes =
            bincode::serialize(&self.registry).map_err(|e| LedgerError::Storage(e.to_string()))?;
        store
            .put_meta(b"rate_registry", &registry_bytes)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        let access_bytes =
            bincode::serialize(&self.access).map_err(|e| LedgerError::Storage(e.to_string()))?;
        store
            .put_meta(b"access_control", &access_bytes)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        for (holder, state) in &self.accounts {
            let bytes = bincode::serialize(state).map_err(|e| LedgerError::Storage(e.to_string()))?;
            store
                .put_account_state(holder, &bytes)
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
        }

        // Live states are written first; a failure below only leaves stale extras.
        let stale = store
            .iter_account_states()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        for (holder, _) in stale {
            if !self.accounts.contains_key(&holder) {
                store
                    .delete_account_state(&holder)
                    .map_err(|e| LedgerError::Storage(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Restore ledger state from a store. Event listeners are not persisted.
    pub fn load_from_store(store: &dyn LedgerStore) -> Result<Self, LedgerError> {
        let chain = match store.get_meta(b"chain") {
            Ok(Some(bytes)) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Storage("corrupt chain id".into()))?;
                ChainId::new(u64::from_be_bytes(raw))
            }
            Ok(None) => return Err(LedgerError::Storage("missing chain id".into())),
            Err(e) => return Err(LedgerError::Storage(e.to_string())),
        };

        let registry = match store.get_meta(b"rate_registry") {
            Ok(Some(bytes)) => {
                bincode::deserialize(&bytes).map_err(|e| LedgerError::Storage(e.to_string()))?
            }
            Ok(None) => return Err(LedgerError::Storage("missing rate registry".into())),
            Err(e) => return Err(LedgerError::Storage(e.to_string())),
        };

        let access = match store.get_meta(b"access_control") {
            Ok(Some(bytes)) => {
                bincode::deserialize(&bytes).map_err(|e| LedgerError::Storage(e.to_string()))?
            }
            Ok(None) => return Err(LedgerError::Storage("missing access control".into())),
            Err(e) => return Err(LedgerError::Storage(e.to_string())),
        };

        let entries = store
            .iter_account_states()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        let mut accounts = HashMap::new();
        for (holder, bytes) in entries {
            let state: AccountState =
                bincode::deserialize(&bytes).map_err(|e| LedgerError::Storage(e.to_string()))?;
            accounts.insert(holder, state);
        }

        Ok(Self {
            chain,
            accounts,
            registry,
            access,
            events: EventBus::new(),
        })
    }
}
