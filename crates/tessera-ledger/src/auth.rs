//! Recorder allow-list.
//!
//! Only the owner and allow-listed recorders may record sales, unless the
//! policy is open. Only the owner may change the allow-list.

use std::collections::BTreeSet;

use tessera_types::AccountId;

use crate::{LedgerError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPolicy {
    owner: AccountId,
    recorders: BTreeSet<AccountId>,
    open_recording: bool,
}

impl AccessPolicy {
    /// A closed policy: only `owner` may record until recorders are added.
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            recorders: BTreeSet::new(),
            open_recording: false,
        }
    }

    /// A policy under which anyone may record sales.
    pub fn open(owner: AccountId) -> Self {
        Self {
            open_recording: true,
            ..Self::new(owner)
        }
    }

    pub fn with_recorders(mut self, recorders: impl IntoIterator<Item = AccountId>) -> Self {
        self.recorders.extend(recorders);
        self
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn is_open(&self) -> bool {
        self.open_recording
    }

    pub fn recorders(&self) -> impl Iterator<Item = &AccountId> {
        self.recorders.iter()
    }

    pub fn can_record(&self, caller: &AccountId) -> bool {
        self.open_recording || *caller == self.owner || self.recorders.contains(caller)
    }

    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` may not record sales
    pub fn check_record(&self, caller: &AccountId) -> Result<()> {
        if self.can_record(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "{} may not record sales",
                hex::encode(caller)
            )))
        }
    }

    fn check_owner(&self, caller: &AccountId) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "{} is not the ledger owner",
                hex::encode(caller)
            )))
        }
    }

    /// Add `account` to the allow-list. Returns false if it was already present.
    pub fn authorize(&mut self, caller: &AccountId, account: AccountId) -> Result<bool> {
        self.check_owner(caller)?;
        Ok(self.recorders.insert(account))
    }

    /// Remove `account` from the allow-list. Returns false if it was absent.
    pub fn revoke(&mut self, caller: &AccountId, account: &AccountId) -> Result<bool> {
        self.check_owner(caller)?;
        Ok(self.recorders.remove(account))
    }
}
