// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Inventory service: a ledger bound to a storage backend
//!
//! Mutations run against a copy of the ledger. The copy only replaces the
//! live ledger once the backend has accepted it.

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::ledger::{DepositRequest, Ledger, LedgerSettings, WithdrawRequest};
use crate::model::{Movement, Reagent};
use crate::report;
use crate::seed;
use crate::store::Repository;
use crate::Result;

pub struct Inventory {
    store: Box<dyn Repository>,
    ledger: Ledger,
}

impl Inventory {
    /// Load both tables, seeding sample reagents into an empty inventory
    pub async fn open(
        store: Box<dyn Repository>,
        settings: LedgerSettings,
        seed_when_empty: bool,
    ) -> Result<Self> {
        let (mut reagents, movements) = store.load().await?;
        info!(
            "Loaded {} reagents and {} movements from {} ({})",
            reagents.len(),
            movements.len(),
            store.name(),
            store.location()
        );

        if reagents.is_empty() && seed_when_empty {
            reagents = seed::sample_reagents();
            store.save(&reagents, &movements).await?;
            info!("Initial inventory created with {} sample reagents", reagents.len());
        }

        Ok(Self {
            store,
            ledger: Ledger::new(reagents, movements, settings),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Re-read both tables from the backend
    pub async fn reload(&mut self) -> Result<()> {
        let (reagents, movements) = self.store.load().await?;
        debug!("Reloaded {} reagents from {}", reagents.len(), self.store.name());
        self.ledger = Ledger::new(reagents, movements, self.ledger.settings().clone());
        Ok(())
    }

    /// Overwrite the backend with imported tables
    pub async fn replace(&mut self, reagents: Vec<Reagent>, movements: Vec<Movement>) -> Result<()> {
        self.store.save(&reagents, &movements).await?;
        info!(
            "Replaced {} contents with {} reagents and {} movements",
            self.store.name(),
            reagents.len(),
            movements.len()
        );
        self.ledger = Ledger::new(reagents, movements, self.ledger.settings().clone());
        Ok(())
    }

    pub async fn deposit(&mut self, request: &DepositRequest) -> Result<String> {
        self.deposit_at(request, Local::now().naive_local()).await
    }

    pub async fn deposit_at(&mut self, request: &DepositRequest, now: NaiveDateTime) -> Result<String> {
        let mut next = self.ledger.clone();
        let message = next.deposit(request, now)?;
        self.commit(next).await?;
        info!("{}", message);
        Ok(message)
    }

    pub async fn withdraw(&mut self, request: &WithdrawRequest) -> Result<String> {
        self.withdraw_at(request, Local::now().naive_local()).await
    }

    pub async fn withdraw_at(&mut self, request: &WithdrawRequest, now: NaiveDateTime) -> Result<String> {
        let mut next = self.ledger.clone();
        let message = next.withdraw(request, now)?;
        self.commit(next).await?;
        info!("{}", message);
        Ok(message)
    }

    /// Persist `next`; on success it becomes the live ledger
    async fn commit(&mut self, next: Ledger) -> Result<()> {
        if let Err(e) = self.store.save(next.reagents(), next.movements()).await {
            warn!("Save to {} failed, change discarded: {}", self.store.name(), e);
            return Err(e);
        }
        self.ledger = next;
        Ok(())
    }

    /// Short warnings for the expiry and stock check run at startup
    pub fn startup_alerts(&self) -> Vec<String> {
        report::startup_alerts(&self.ledger, Local::now().naive_local())
    }

    /// Log the startup check once
    pub fn log_startup_alerts(&self) {
        for alert in self.startup_alerts() {
            warn!("{}", alert);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReagentStatus;
    use crate::store::MemoryStore;
    use crate::InventoryError;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    fn withdraw(name: &str, quantity: f64) -> WithdrawRequest {
        WithdrawRequest {
            name: name.into(),
            quantity,
            user: "alice".into(),
            project: "course1".into(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_open_seeds_empty_store() {
        let store = MemoryStore::new();
        let inventory = Inventory::open(Box::new(store.clone()), LedgerSettings::default(), true)
            .await
            .unwrap();

        assert_eq!(inventory.ledger().reagents().len(), 8);
        assert_eq!(store.save_count(), 1);
        let (persisted, _) = store.load().await.unwrap();
        assert_eq!(persisted.len(), 8);
    }

    #[tokio::test]
    async fn test_open_without_seeding() {
        let store = MemoryStore::new();
        let inventory = Inventory::open(Box::new(store.clone()), LedgerSettings::default(), false)
            .await
            .unwrap();
        assert!(inventory.ledger().reagents().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_withdraw_persists_both_tables() {
        let store = MemoryStore::new();
        let mut inventory = Inventory::open(Box::new(store.clone()), LedgerSettings::default(), true)
            .await
            .unwrap();

        inventory.withdraw_at(&withdraw("etanol 96%", 4.0), now()).await.unwrap();

        let (reagents, movements) = store.load().await.unwrap();
        let etanol = reagents.iter().find(|r| r.name == "Etanol 96%").unwrap();
        assert_eq!(etanol.quantity, 6.0);
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].name, "Etanol 96%");
    }

    #[tokio::test]
    async fn test_failed_save_leaves_ledger_untouched() {
        let store = MemoryStore::new();
        let mut inventory = Inventory::open(Box::new(store.clone()), LedgerSettings::default(), true)
            .await
            .unwrap();
        store.set_fail_saves(true);

        let err = inventory
            .deposit_at(
                &DepositRequest {
                    name: "Glucosa".into(),
                    quantity: 5.0,
                    user: "bob".into(),
                    project: "BIO-2".into(),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::BackendUnavailable(_)));
        assert_eq!(inventory.ledger().find("Glucosa").unwrap().quantity, 20.0);
        assert!(inventory.ledger().movements().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_withdrawal_does_not_save() {
        let store = MemoryStore::new();
        let mut inventory = Inventory::open(Box::new(store.clone()), LedgerSettings::default(), true)
            .await
            .unwrap();

        let err = inventory.withdraw_at(&withdraw("Acetona", 100.0), now()).await.unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_and_replace() {
        let store = MemoryStore::new();
        let mut inventory = Inventory::open(Box::new(store.clone()), LedgerSettings::default(), false)
            .await
            .unwrap();

        let imported = vec![Reagent {
            name: "Acetona".into(),
            quantity: 2.0,
            unit: "L".into(),
            status: ReagentStatus::Available,
            expiration_date: None,
            received_date: None,
            notes: String::new(),
        }];
        inventory.replace(imported, Vec::new()).await.unwrap();
        assert_eq!(inventory.ledger().reagents().len(), 1);

        store.save(&[], &[]).await.unwrap();
        inventory.reload().await.unwrap();
        assert!(inventory.ledger().reagents().is_empty());
    }
}
