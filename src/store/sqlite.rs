// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SQLite backend; both tables are rewritten inside one transaction

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::rows::{parse_cell_date, parse_cell_time};
use super::Repository;
use crate::model::{Movement, Reagent, DATE_FORMAT, TIME_FORMAT};
use crate::{InventoryError, Result};

/// SQLite repository (thread-safe wrapper)
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.as_ref().to_path_buf()),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| InventoryError::BackendUnavailable("Database lock poisoned".to_string()))
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS inventory (
                name TEXT PRIMARY KEY COLLATE NOCASE,
                quantity REAL NOT NULL CHECK (quantity >= 0),
                unit TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'available',
                expiration_date TEXT,
                received_date TEXT,
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS movements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                quantity REAL NOT NULL,
                unit TEXT NOT NULL DEFAULT '',
                user TEXT NOT NULL DEFAULT '',
                project TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_movements_name ON movements(name);
        "#)?;
        Ok(())
    }

    fn load_reagents(conn: &Connection) -> Result<Vec<Reagent>> {
        let mut stmt = conn.prepare(
            r#"SELECT name, quantity, unit, status, expiration_date, received_date, notes
               FROM inventory ORDER BY rowid"#,
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(name, quantity, unit, status, expiry, received, notes)| {
                Ok(Reagent {
                    name,
                    quantity,
                    unit,
                    status: status.parse()?,
                    expiration_date: expiry.as_deref().and_then(parse_cell_date),
                    received_date: received.as_deref().and_then(parse_cell_date),
                    notes,
                })
            })
            .collect()
    }

    fn load_movements(conn: &Connection) -> Result<Vec<Movement>> {
        let mut stmt = conn.prepare(
            r#"SELECT date, time, kind, name, quantity, unit, user, project, notes
               FROM movements ORDER BY id"#,
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(date, time, kind, name, quantity, unit, user, project, notes)| {
                Ok(Movement {
                    date: parse_stored_date(&date)?,
                    time: parse_stored_time(&time)?,
                    kind: kind.parse()?,
                    name,
                    quantity,
                    unit,
                    user,
                    project,
                    notes,
                })
            })
            .collect()
    }
}

fn parse_stored_date(raw: &str) -> Result<NaiveDate> {
    parse_cell_date(raw).ok_or_else(|| InventoryError::InvalidRecord(format!("bad stored date '{}'", raw)))
}

fn parse_stored_time(raw: &str) -> Result<NaiveTime> {
    parse_cell_time(raw).ok_or_else(|| InventoryError::InvalidRecord(format!("bad stored time '{}'", raw)))
}

#[async_trait]
impl Repository for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn location(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    async fn load(&self) -> Result<(Vec<Reagent>, Vec<Movement>)> {
        let conn = self.lock_conn()?;
        let reagents = Self::load_reagents(&conn)?;
        let movements = Self::load_movements(&conn)?;
        Ok((reagents, movements))
    }

    async fn save(&self, reagents: &[Reagent], movements: &[Movement]) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM inventory", [])?;
        tx.execute("DELETE FROM movements", [])?;
        {
            let mut insert_reagent = tx.prepare(
                r#"INSERT INTO inventory (name, quantity, unit, status, expiration_date, received_date, notes)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )?;
            for r in reagents {
                insert_reagent.execute(params![
                    r.name,
                    r.quantity,
                    r.unit,
                    r.status.as_str(),
                    r.expiration_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    r.received_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    r.notes,
                ])?;
            }

            let mut insert_movement = tx.prepare(
                r#"INSERT INTO movements (date, time, kind, name, quantity, unit, user, project, notes)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            )?;
            for m in movements {
                insert_movement.execute(params![
                    m.date.format(DATE_FORMAT).to_string(),
                    m.time.format(TIME_FORMAT).to_string(),
                    m.kind.as_str(),
                    m.name,
                    m.quantity,
                    m.unit,
                    m.user,
                    m.project,
                    m.notes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MovementKind, ReagentStatus};

    fn reagent(name: &str, quantity: f64) -> Reagent {
        Reagent {
            name: name.into(),
            quantity,
            unit: "L".into(),
            status: ReagentStatus::InUse,
            expiration_date: NaiveDate::from_ymd_opt(2026, 8, 15),
            received_date: None,
            notes: "Corrosivo - Usar en campana".into(),
        }
    }

    fn movement(name: &str) -> Movement {
        Movement {
            date: NaiveDate::from_ymd_opt(2025, 5, 8).unwrap(),
            time: NaiveTime::from_hms_opt(16, 45, 3).unwrap(),
            kind: MovementKind::Withdrawal,
            name: name.into(),
            quantity: 0.5,
            unit: "L".into(),
            user: "carlos".into(),
            project: "Analítica II".into(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_preserve_order() {
        let store = SqliteStore::in_memory().unwrap();
        let reagents = vec![reagent("Ácido Clorhídrico 37%", 3.0), reagent("Acetona", 8.0)];
        let movements = vec![movement("Acetona"), movement("Ácido Clorhídrico 37%")];

        store.save(&reagents, &movements).await.unwrap();
        let (loaded_reagents, loaded_movements) = store.load().await.unwrap();

        assert_eq!(loaded_reagents, reagents);
        assert_eq!(loaded_movements, movements);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_both_tables() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(&[reagent("Acetona", 8.0)], &[movement("Acetona")]).await.unwrap();

        // Duplicate names violate the primary key, aborting the transaction
        let duplicate = vec![reagent("Etanol", 1.0), reagent("ETANOL", 2.0)];
        assert!(store.save(&duplicate, &[]).await.is_err());

        let (reagents, movements) = store.load().await.unwrap();
        assert_eq!(reagents.len(), 1);
        assert_eq!(reagents[0].name, "Acetona");
        assert_eq!(movements.len(), 1);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(&[reagent("Glucosa", 20.0)], &[]).await.unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        let (reagents, _) = reopened.load().await.unwrap();
        assert_eq!(reagents[0].name, "Glucosa");
        assert!(reopened.location().ends_with("lab.db"));
    }
}
