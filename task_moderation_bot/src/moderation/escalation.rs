//! Per-user penalty ledger.
//!
//! Two independent ladders share one [`BanRecord`]:
//!
//! * Content violations suspend for a while and bump `ban_counter`. Once
//!   the counter has reached the maximum, the next one is permanent.
//! * Phone numbers bump `warning` without suspending. Reaching the maximum
//!   number of warnings is permanent.
//!
//! A permanent ban is final; nothing changes the record after it.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError},
};

use chrono::{DateTime, TimeDelta, Utc};
use teloxide::types::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::ModerationConfig,
    error::ModerationError,
    stores::BanLedgerStore,
    types::{permanent_ban_end, BanRecord, BanStatus, Consequence},
};

/// Which ladder a violation climbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Stop words, profanity, invalid characters.
    Content,
    PhoneNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub suspension: TimeDelta,
    pub max_ban_counter: u32,
    pub max_warnings: u8,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        EscalationPolicy::from(&ModerationConfig::default())
    }
}

impl From<&ModerationConfig> for EscalationPolicy {
    fn from(config: &ModerationConfig) -> Self {
        EscalationPolicy {
            suspension: config.suspension(),
            max_ban_counter: config.max_ban_counter,
            max_warnings: config.max_warnings,
        }
    }
}

impl EscalationPolicy {
    /// Apply one violation to the record.
    pub fn apply(
        &self,
        record: &mut BanRecord,
        violation: Violation,
        now: DateTime<Utc>,
    ) -> Consequence {
        if record.forever {
            return Consequence::AlreadyPermanent;
        }

        match violation {
            Violation::Content if record.ban_counter >= self.max_ban_counter => {
                make_permanent(record);
                Consequence::PermanentlyBanned
            }
            Violation::Content => {
                let until = now + self.suspension;
                record.ban_counter += 1;
                record.ban_now = true;
                record.ban_end = Some(until);
                Consequence::Suspended {
                    until,
                    ban_counter: record.ban_counter,
                }
            }
            Violation::PhoneNumber => {
                record.warning = record.warning.saturating_add(1).min(self.max_warnings);
                if record.warning >= self.max_warnings {
                    make_permanent(record);
                    Consequence::PermanentlyBanned
                } else {
                    Consequence::Warned {
                        warning: record.warning,
                    }
                }
            }
        }
    }
}

fn make_permanent(record: &mut BanRecord) {
    record.forever = true;
    record.ban_now = true;
    record.ban_end = Some(permanent_ban_end());
}

/// One async lock per user, created on demand.
#[derive(Default)]
pub struct UserLocks {
    locks: std::sync::Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    /// Past this many entries, locks nobody holds get dropped.
    const PRUNE_AT: usize = 1024;

    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= Self::PRUNE_AT {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(user).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Owns every read-modify-write of [`BanRecord`]s.
pub struct EscalationMachine {
    ledger: Arc<dyn BanLedgerStore>,
    policy: EscalationPolicy,
    locks: UserLocks,
}

impl EscalationMachine {
    pub fn new(ledger: Arc<dyn BanLedgerStore>, policy: EscalationPolicy) -> Self {
        EscalationMachine {
            ledger,
            policy,
            locks: UserLocks::default(),
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Record a violation for `user`. Violations of the same user are
    /// processed one at a time, so none of them get lost.
    pub async fn escalate(
        &self,
        user: UserId,
        violation: Violation,
        now: DateTime<Utc>,
    ) -> Result<(Consequence, BanRecord), ModerationError> {
        let _guard = self.locks.lock(user).await;

        let mut record = self
            .ledger
            .get(user)
            .await?
            .unwrap_or_else(|| BanRecord::new(user));

        let consequence = self.policy.apply(&mut record, violation, now);

        if consequence.is_transition() {
            self.ledger.upsert(&record).await?;
            log::info!("{violation:?} by {user}: {consequence:?}");
        } else {
            log::debug!("{violation:?} by {user}, who is already permanently banned");
        }

        Ok((consequence, record))
    }

    /// Effective state of the user's ledger at `now`. Waits for any
    /// escalation of the same user in progress.
    pub async fn status(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<BanStatus, ModerationError> {
        let _guard = self.locks.lock(user).await;
        Ok(self
            .ledger
            .get(user)
            .await?
            .map_or(BanStatus::Clean, |record| record.status(now)))
    }
}
