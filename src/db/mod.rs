mod live;
mod schema;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::models::*;

pub(crate) use live::Subscription;
use live::Watchers;

/// Document store: one collection per user identity, one JSON document per
/// entry plus fixed-key documents for category lists and the profile.
pub(crate) struct Database {
    conn: Connection,
    watchers: Watchers,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to set database pragmas")?;
        let mut db = Self {
            conn,
            watchers: Watchers::default(),
        };
        db.migrate().context("Database migration failed")?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self {
            conn,
            watchers: Watchers::default(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Every statement in the schema is `IF NOT EXISTS`, so applying it is
    /// safe on any database this build understands.
    fn migrate(&mut self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA_V1)?;
        let stored: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match stored {
            None => {
                self.conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![schema::CURRENT_VERSION],
                )?;
            }
            Some(version) if version > schema::CURRENT_VERSION => anyhow::bail!(
                "Database schema v{version} is newer than this build supports (v{})",
                schema::CURRENT_VERSION
            ),
            Some(version) if version < schema::CURRENT_VERSION => {
                self.conn.execute(
                    "UPDATE schema_version SET version = ?1",
                    params![schema::CURRENT_VERSION],
                )?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    // ── Documents ─────────────────────────────────────────────

    fn put_document<T: Serialize>(&self, collection: &str, doc_id: &str, body: &T) -> Result<()> {
        let json = serde_json::to_string(body).context("Failed to encode document")?;
        // Upsert keeps the rowid, so snapshot tie order survives edits.
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, doc_id) DO UPDATE SET body = ?3, updated_at = ?4",
            params![collection, doc_id, json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_document<T: DeserializeOwned>(&self, collection: &str, doc_id: &str) -> Result<Option<T>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| {
            serde_json::from_str(&b)
                .with_context(|| format!("Malformed document {collection}/{doc_id}"))
        })
        .transpose()
    }

    /// Overlay the fields of `patch` onto the stored object, creating it if absent.
    fn merge_document(&self, collection: &str, doc_id: &str, patch: serde_json::Value) -> Result<()> {
        let mut merged = self
            .get_document::<serde_json::Value>(collection, doc_id)?
            .filter(|v| v.is_object())
            .unwrap_or_else(|| serde_json::json!({}));
        if let (Some(target), serde_json::Value::Object(fields)) = (merged.as_object_mut(), patch) {
            for (key, value) in fields {
                target.insert(key, value);
            }
        }
        self.put_document(collection, doc_id, &merged)
    }

    fn has_document(&self, collection: &str, doc_id: &str) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = ?1 AND doc_id = ?2)",
            params![collection, doc_id],
            |row| row.get(0),
        )?)
    }

    fn delete_document(&self, collection: &str, doc_id: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
            params![collection, doc_id],
        )?;
        Ok(removed > 0)
    }

    /// A user exists once their collection holds any document.
    pub(crate) fn user_exists(&self, user: &str) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = ?1)",
            params![user],
            |row| row.get(0),
        )?)
    }

    // ── Entries ───────────────────────────────────────────────

    pub(crate) fn insert_entry(&mut self, user: &str, doc: &EntryDocument) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.put_document(user, &id, doc)
            .with_context(|| format!("Failed to save entry for {user}"))?;
        tracing::info!(user, id = %id, kind = %doc.kind, amount = %doc.amount, "entry added");
        self.notify(user)?;
        Ok(id)
    }

    /// Full replace of an existing entry.
    pub(crate) fn replace_entry(&mut self, user: &str, id: &str, doc: &EntryDocument) -> Result<()> {
        if RESERVED_DOCUMENT_IDS.contains(&id) || !self.has_document(user, id)? {
            anyhow::bail!("Entry not found: {id}");
        }
        self.put_document(user, id, doc)
            .with_context(|| format!("Failed to update entry {id}"))?;
        tracing::info!(user, id, "entry replaced");
        self.notify(user)
    }

    /// Returns false when no such entry existed.
    pub(crate) fn delete_entry(&mut self, user: &str, id: &str) -> Result<bool> {
        if RESERVED_DOCUMENT_IDS.contains(&id) {
            anyhow::bail!("Entry not found: {id}");
        }
        let removed = self
            .delete_document(user, id)
            .with_context(|| format!("Failed to delete entry {id}"))?;
        if removed {
            tracing::info!(user, id, "entry deleted");
            self.notify(user)?;
        }
        Ok(removed)
    }

    pub(crate) fn get_entry(&self, user: &str, id: &str) -> Result<Option<Entry>> {
        if RESERVED_DOCUMENT_IDS.contains(&id) {
            return Ok(None);
        }
        let doc: Option<EntryDocument> = self.get_document(user, id)?;
        Ok(doc
            .filter(EntryDocument::amount_in_range)
            .map(|d| d.into_entry(id.to_string())))
    }

    /// Snapshot of a user's entries, oldest date first. Documents that do not
    /// decode (bad date, missing fields) or carry an out-of-range amount are
    /// skipped with a warning.
    pub(crate) fn get_entries(&self, user: &str) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT doc_id, body FROM documents
             WHERE collection = ?1 AND doc_id NOT IN (?2, ?3, ?4)
             ORDER BY CASE WHEN json_valid(body) THEN json_extract(body, '$.date') END ASC,
                      rowid ASC",
        )?;
        let rows = stmt.query_map(
            params![
                user,
                RESERVED_DOCUMENT_IDS[0],
                RESERVED_DOCUMENT_IDS[1],
                RESERVED_DOCUMENT_IDS[2]
            ],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, body) = row?;
            match serde_json::from_str::<EntryDocument>(&body) {
                Ok(doc) if doc.amount_in_range() => entries.push(doc.into_entry(id)),
                Ok(doc) => {
                    tracing::warn!(user, id = %id, amount = %doc.amount, "skipping entry with out-of-range amount")
                }
                Err(err) => tracing::warn!(user, id = %id, "skipping unreadable entry: {err}"),
            }
        }
        Ok(entries)
    }

    /// Subscribe to the live snapshot of a user's entries. The current
    /// snapshot is delivered immediately, then again after every change.
    pub(crate) fn subscribe_entries(&mut self, user: &str) -> Result<Subscription> {
        let snapshot = self.get_entries(user)?;
        Ok(self.watchers.register(user, snapshot))
    }

    fn notify(&mut self, user: &str) -> Result<()> {
        if !self.watchers.is_watched(user) {
            return Ok(());
        }
        let snapshot = self.get_entries(user)?;
        self.watchers.publish(user, &snapshot);
        Ok(())
    }

    // ── Categories ────────────────────────────────────────────

    /// Stored list, or the seed defaults when none has been saved.
    pub(crate) fn get_category_list(&self, user: &str, kind: EntryType) -> Result<CategoryList> {
        let doc: Option<CategoryListDocument> =
            self.get_document(user, CategoryList::document_id(kind))?;
        Ok(match doc {
            Some(d) => CategoryList {
                kind,
                categories: d.categories,
            },
            None => CategoryList::defaults(kind),
        })
    }

    pub(crate) fn replace_category_list(&self, user: &str, list: &CategoryList) -> Result<()> {
        self.put_document(user, CategoryList::document_id(list.kind), &list.to_document())
            .with_context(|| format!("Failed to save {} categories", list.kind))
    }

    pub(crate) fn add_category(&self, user: &str, kind: EntryType, name: &str) -> Result<String> {
        let mut list = self.get_category_list(user, kind)?;
        let added = list.add(name)?;
        self.replace_category_list(user, &list)?;
        tracing::info!(user, %kind, category = %added, "category added");
        Ok(added)
    }

    /// Entries that still reference a removed category keep the old name.
    pub(crate) fn remove_category(&self, user: &str, kind: EntryType, name: &str) -> Result<bool> {
        let mut list = self.get_category_list(user, kind)?;
        if !list.remove(name) {
            return Ok(false);
        }
        self.replace_category_list(user, &list)?;
        tracing::info!(user, %kind, category = name, "category removed");
        Ok(true)
    }

    /// Persist the seed lists for any type that has none yet.
    pub(crate) fn ensure_category_lists(&self, user: &str) -> Result<()> {
        for kind in EntryType::all() {
            let stored: Option<CategoryListDocument> =
                self.get_document(user, CategoryList::document_id(*kind))?;
            if stored.is_none() {
                self.replace_category_list(user, &CategoryList::defaults(*kind))?;
            }
        }
        Ok(())
    }

    // ── Profile ───────────────────────────────────────────────

    pub(crate) fn get_profile(&self, user: &str) -> Result<Option<Profile>> {
        self.get_document(user, PROFILE_DOCUMENT_ID)
    }

    /// Record a verified login. The creation date is kept from the first one.
    pub(crate) fn record_login(&self, user: &str, now_millis: i64) -> Result<Profile> {
        let profile = match self.get_profile(user)? {
            Some(mut existing) => {
                existing.mail = user.to_string();
                existing.updated_at = now_millis;
                existing
            }
            None => Profile::new(user, now_millis),
        };
        self.merge_document(user, PROFILE_DOCUMENT_ID, serde_json::to_value(&profile)?)
            .with_context(|| format!("Failed to save profile for {user}"))?;
        Ok(profile)
    }

    pub(crate) fn update_profile_name(&self, user: &str, name: &str, now_millis: i64) -> Result<()> {
        self.merge_document(
            user,
            PROFILE_DOCUMENT_ID,
            serde_json::json!({ "mail": user, "name": name.trim(), "updatedAt": now_millis }),
        )
        .with_context(|| format!("Failed to save profile for {user}"))
    }
}

#[cfg(test)]
mod tests;
