//! Explicit access-control list for privileged ledger operations.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tidal_types::HolderId;

/// A capability checked at the start of a privileged operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Grants and revokes the other roles. Held only by the ledger's admin.
    Admin,
    /// Mint, burn and restore accounts (vault and bridge operators).
    MintBurn,
    /// Lower the global rate.
    RateSetter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::MintBurn => "mint/burn",
            Self::RateSetter => "rate-setter",
        };
        f.write_str(name)
    }
}

/// Who may do what on one ledger.
///
/// The admin is not implicitly a minter or rate-setter; those roles must be
/// granted explicitly, including to the admin itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessControl {
    admin: HolderId,
    grants: HashMap<HolderId, HashSet<Role>>,
}

impl AccessControl {
    pub fn new(admin: HolderId) -> Self {
        Self {
            admin,
            grants: HashMap::new(),
        }
    }

    pub fn admin(&self) -> &HolderId {
        &self.admin
    }

    pub fn has_role(&self, holder: &HolderId, role: Role) -> bool {
        match role {
            Role::Admin => *holder == self.admin,
            _ => self
                .grants
                .get(holder)
                .is_some_and(|roles| roles.contains(&role)),
        }
    }

    /// Fail with `InsufficientPrivilege` unless `caller` holds `role`.
    pub fn require(&self, caller: &HolderId, role: Role) -> Result<(), LedgerError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(LedgerError::InsufficientPrivilege {
                caller: caller.clone(),
                role,
            })
        }
    }

    /// Grant `role` to `holder`. Returns whether the grant is new.
    pub fn grant(&mut self, caller: &HolderId, holder: &HolderId, role: Role) -> Result<bool, LedgerError> {
        self.require(caller, Role::Admin)?;
        if role == Role::Admin {
            return Err(LedgerError::InvalidGrant(role));
        }
        Ok(self.grants.entry(holder.clone()).or_default().insert(role))
    }

    /// Revoke `role` from `holder`. Returns whether it was held.
    pub fn revoke(&mut self, caller: &HolderId, holder: &HolderId, role: Role) -> Result<bool, LedgerError> {
        self.require(caller, Role::Admin)?;
        if role == Role::Admin {
            return Err(LedgerError::InvalidGrant(role));
        }
        let removed = match self.grants.get_mut(holder) {
            Some(roles) => roles.remove(&role),
            None => false,
        };
        if self.grants.get(holder).is_some_and(|roles| roles.is_empty()) {
            self.grants.remove(holder);
        }
        Ok(removed)
    }
}
