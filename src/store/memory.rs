// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Volatile backend for demos and tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::Repository;
use crate::model::{Movement, Reagent};
use crate::{InventoryError, Result};

#[derive(Default)]
struct Tables {
    reagents: Vec<Reagent>,
    movements: Vec<Movement>,
}

/// In-memory repository; clones share the same tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(reagents: Vec<Reagent>, movements: Vec<Movement>) -> Self {
        let store = Self::default();
        if let Ok(mut tables) = store.tables.lock() {
            tables.reagents = reagents;
            tables.movements = movements;
        }
        store
    }

    /// Make every subsequent save fail, simulating an unreachable backend
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| InventoryError::BackendUnavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Repository for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn location(&self) -> String {
        "in-memory".to_string()
    }

    async fn load(&self) -> Result<(Vec<Reagent>, Vec<Movement>)> {
        let tables = self.lock()?;
        Ok((tables.reagents.clone(), tables.movements.clone()))
    }

    async fn save(&self, reagents: &[Reagent], movements: &[Movement]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(InventoryError::BackendUnavailable("simulated save failure".to_string()));
        }
        let mut tables = self.lock()?;
        tables.reagents = reagents.to_vec();
        tables.movements = movements.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
