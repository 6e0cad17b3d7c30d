use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use haven_core::{Donor, HavenError, Message, NewShelter, Result, Shelter, ShelterMetrics};

fn db_err(e: rusqlite::Error) -> HavenError {
    HavenError::Store(e.to_string())
}

/// SQLite-backed store for shelters, donors, announcement flags and
/// conversation threads.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening shelter store");

        let conn = Connection::open(path).map_err(db_err)?;

        // WAL for concurrent readers alongside the single writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS shelters (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                location TEXT NOT NULL,
                operational_costs TEXT NOT NULL,
                metrics_json TEXT NOT NULL,
                animals_json TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS donors (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                recurring INTEGER NOT NULL,
                duration_months INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS announcements (
                shelter_id TEXT PRIMARY KEY,
                announced_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS threads (
                thread_id TEXT PRIMARY KEY,
                messages_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )
        .map_err(db_err)?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    // ── Shelters ───────────────────────────────────────────────

    /// Insert a shelter, assigning ids to it and to any animal that lacks one.
    pub fn insert_shelter(&self, new: NewShelter) -> Result<Shelter> {
        let mut animals = new.animals;
        for animal in animals.iter_mut().filter(|a| a.id.is_empty()) {
            animal.id = Uuid::new_v4().to_string();
        }
        let shelter = Shelter {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            location: new.location,
            operational_costs: new.operational_costs,
            metrics: new.metrics,
            animals,
        };

        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .lock()
            .execute(
                "INSERT INTO shelters (id, name, location, operational_costs, metrics_json, animals_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    shelter.id,
                    shelter.name,
                    shelter.location,
                    shelter.operational_costs,
                    serde_json::to_string(&shelter.metrics)?,
                    serde_json::to_string(&shelter.animals)?,
                    now
                ],
            )
            .map_err(db_err)?;

        debug!(shelter_id = %shelter.id, name = %shelter.name, "shelter inserted");
        Ok(shelter)
    }

    /// All shelters, oldest first.
    pub fn list_shelters(&self) -> Result<Vec<Shelter>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT id, name, location, operational_costs, metrics_json, animals_json
                 FROM shelters ORDER BY seq",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], ShelterRow::from_row)
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        rows.into_iter().map(ShelterRow::into_shelter).collect()
    }

    pub fn get_shelter(&self, id: &str) -> Result<Option<Shelter>> {
        let row = self
            .db
            .lock()
            .query_row(
                "SELECT id, name, location, operational_costs, metrics_json, animals_json
                 FROM shelters WHERE id = ?1",
                params![id],
                ShelterRow::from_row,
            )
            .optional()
            .map_err(db_err)?;
        row.map(ShelterRow::into_shelter).transpose()
    }

    /// Replace a shelter's data (re-ingest). Returns `false` if the id is unknown.
    pub fn update_shelter(&self, shelter: &Shelter) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = self
            .db
            .lock()
            .execute(
                "UPDATE shelters SET name = ?2, location = ?3, operational_costs = ?4,
                     metrics_json = ?5, animals_json = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    shelter.id,
                    shelter.name,
                    shelter.location,
                    shelter.operational_costs,
                    serde_json::to_string(&shelter.metrics)?,
                    serde_json::to_string(&shelter.animals)?,
                    now
                ],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Administrative delete. Also clears the shelter's announcement flag and thread.
    pub fn delete_shelter(&self, id: &str) -> Result<bool> {
        let mut db = self.db.lock();
        let tx = db.transaction().map_err(db_err)?;
        let deleted = tx
            .execute("DELETE FROM shelters WHERE id = ?1", params![id])
            .map_err(db_err)?;
        tx.execute("DELETE FROM announcements WHERE shelter_id = ?1", params![id])
            .map_err(db_err)?;
        tx.execute(
            "DELETE FROM threads WHERE thread_id = ?1",
            params![format!("shelter-{id}")],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        if deleted > 0 {
            info!(shelter_id = id, "shelter deleted");
        }
        Ok(deleted > 0)
    }

    /// Shelters whose name or location overlaps the given ones, case-insensitively.
    pub fn find_similar(&self, name: &str, location: &str) -> Result<Vec<Shelter>> {
        Ok(self
            .list_shelters()?
            .into_iter()
            .filter(|s| s.resembles(name, location))
            .collect())
    }

    pub fn shelter_count(&self) -> Result<usize> {
        let n: i64 = self
            .db
            .lock()
            .query_row("SELECT COUNT(*) FROM shelters", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(n as usize)
    }

    // ── Donors ─────────────────────────────────────────────────

    pub fn insert_donor(
        &self,
        name: &str,
        amount: f64,
        recurring: bool,
        duration_months: u32,
    ) -> Result<Donor> {
        let donor = Donor {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            amount,
            recurring,
            duration_months,
        };
        self.db
            .lock()
            .execute(
                "INSERT INTO donors (id, name, amount, recurring, duration_months, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    donor.id,
                    donor.name,
                    donor.amount,
                    donor.recurring,
                    donor.duration_months,
                    chrono::Utc::now().to_rfc3339()
                ],
            )
            .map_err(db_err)?;
        Ok(donor)
    }

    pub fn list_donors(&self) -> Result<Vec<Donor>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(
                "SELECT id, name, amount, recurring, duration_months FROM donors ORDER BY created_at",
            )
            .map_err(db_err)?;
        stmt.query_map([], |row| {
            Ok(Donor {
                id: row.get(0)?,
                name: row.get(1)?,
                amount: row.get(2)?,
                recurring: row.get(3)?,
                duration_months: row.get(4)?,
            })
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)
    }

    // ── Announcements ──────────────────────────────────────────

    /// Atomically claim the one-time announcement for a shelter.
    ///
    /// Returns `true` for exactly one caller per shelter, however many race.
    pub fn try_mark_announced(&self, shelter_id: &str) -> Result<bool> {
        let inserted = self
            .db
            .lock()
            .execute(
                "INSERT INTO announcements (shelter_id, announced_at) VALUES (?1, ?2)
                 ON CONFLICT(shelter_id) DO NOTHING",
                params![shelter_id, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(inserted == 1)
    }

    /// Release a claim whose announcement could not be posted.
    pub fn clear_announced(&self, shelter_id: &str) -> Result<()> {
        self.db
            .lock()
            .execute("DELETE FROM announcements WHERE shelter_id = ?1", params![shelter_id])
            .map_err(db_err)?;
        Ok(())
    }

    pub fn is_announced(&self, shelter_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .db
            .lock()
            .query_row(
                "SELECT 1 FROM announcements WHERE shelter_id = ?1",
                params![shelter_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    // ── Conversation threads ───────────────────────────────────

    /// Persist a thread's messages as a JSON blob.
    pub fn save_thread(&self, thread_id: &str, messages: &[Message]) -> Result<()> {
        let json = serde_json::to_string(messages)?;
        self.db
            .lock()
            .execute(
                "INSERT INTO threads (thread_id, messages_json, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(thread_id) DO UPDATE SET
                    messages_json = excluded.messages_json,
                    updated_at = excluded.updated_at",
                params![thread_id, json, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Load a thread's messages; empty when the thread is new.
    pub fn load_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let json: Option<String> = self
            .db
            .lock()
            .query_row(
                "SELECT messages_json FROM threads WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match json {
            Some(j) => Ok(serde_json::from_str(&j)?),
            None => Ok(Vec::new()),
        }
    }
}

struct ShelterRow {
    id: String,
    name: String,
    location: String,
    operational_costs: String,
    metrics_json: String,
    animals_json: String,
}

impl ShelterRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            location: row.get(2)?,
            operational_costs: row.get(3)?,
            metrics_json: row.get(4)?,
            animals_json: row.get(5)?,
        })
    }

    fn into_shelter(self) -> Result<Shelter> {
        let metrics: ShelterMetrics = serde_json::from_str(&self.metrics_json)?;
        Ok(Shelter {
            id: self.id,
            name: self.name,
            location: self.location,
            operational_costs: self.operational_costs,
            metrics,
            animals: serde_json::from_str(&self.animals_json)?,
        })
    }
}
