//! Remote relational table backend.
//!
//! # Responsibility
//! - Map each logical collection onto a table of the remote store.
//! - Persist record lists with per-record INSERT/UPDATE/DELETE statements
//!   instead of rewriting whole collections.
//!
//! # Invariants
//! - Writes of one `save` call are applied in a single transaction.
//! - The synced snapshot only advances after a successful commit.
//! - Record lists are returned in persisted `position` order.

use super::{BackendKind, Collection, PersistenceAdapter, SaveOutcome, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Persisted row state keyed by record id: `(position, json)`.
type RowSnapshot = BTreeMap<String, (i64, String)>;

/// Table-store adapter holding one connection to the remote database.
pub struct RemoteTableAdapter {
    conn: Connection,
    synced: HashMap<Collection, RowSnapshot>,
}

impl RemoteTableAdapter {
    /// Connects to the table store at `path` and applies schema migrations.
    ///
    /// # Errors
    /// - `BackendUnavailable` when the store cannot be reached or migrated.
    pub fn connect(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        open_db(path).map(Self::from_connection).map_err(|err| {
            warn!("event=remote_connect module=storage status=error error={err}");
            StorageError::BackendUnavailable(format!(
                "cannot reach table store `{}`: {err}",
                path.display()
            ))
        })
    }

    /// Connects to a private in-memory table store.
    pub fn in_memory() -> StorageResult<Self> {
        open_db_in_memory()
            .map(Self::from_connection)
            .map_err(|err| StorageError::BackendUnavailable(err.to_string()))
    }

    /// Capability probe: the store location's directory must exist.
    pub fn is_reachable(path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => !path.as_os_str().is_empty(),
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            synced: HashMap::new(),
        }
    }

    /// Raw connection, exposed for inspection by callers and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn fetch_rows(&self, collection: Collection) -> StorageResult<RowSnapshot> {
        let mut rows = RowSnapshot::new();
        match record_table(collection) {
            Some(table) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT id, position, data FROM {table};"))?;
                let mut cursor = stmt.query([])?;
                while let Some(row) = cursor.next()? {
                    rows.insert(row.get(0)?, (row.get(1)?, row.get(2)?));
                }
            }
            None => {
                let data: Option<String> = self
                    .conn
                    .query_row(
                        "SELECT data FROM settings WHERE key = ?1;",
                        [collection.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(data) = data {
                    rows.insert(collection.as_str().to_string(), (0, data));
                }
            }
        }
        Ok(rows)
    }

    fn snapshot(&self, collection: Collection) -> StorageResult<RowSnapshot> {
        match self.synced.get(&collection) {
            Some(snapshot) => Ok(snapshot.clone()),
            None => self.fetch_rows(collection),
        }
    }
}

impl PersistenceAdapter for RemoteTableAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn load(&self, collection: Collection) -> StorageResult<Option<Value>> {
        let decode = |message: String| StorageError::Decode {
            collection,
            message,
        };

        if record_table(collection).is_none() {
            let Some((_, data)) = self.fetch_rows(collection)?.into_values().next() else {
                return Ok(None);
            };
            return serde_json::from_str(&data)
                .map(Some)
                .map_err(|err| decode(err.to_string()));
        }

        let mut rows: Vec<(i64, String, String)> = self
            .fetch_rows(collection)?
            .into_iter()
            .map(|(id, (position, data))| (position, id, data))
            .collect();
        if rows.is_empty() {
            return Ok(None);
        }
        rows.sort();

        let records = rows
            .into_iter()
            .map(|(_, id, data)| {
                serde_json::from_str::<Value>(&data)
                    .map_err(|err| decode(format!("record `{id}`: {err}")))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Some(Value::Array(records)))
    }

    fn save(&mut self, collection: Collection, value: &Value) -> StorageResult<SaveOutcome> {
        let desired = desired_rows(collection, value)?;
        let previous = self.snapshot(collection)?;

        let mut written = 0;
        let tx = self.conn.transaction()?;
        match record_table(collection) {
            Some(table) => {
                for (id, (position, data)) in &desired {
                    match previous.get(id) {
                        None => {
                            tx.execute(
                                &format!(
                                    "INSERT INTO {table} (id, position, data) VALUES (?1, ?2, ?3);"
                                ),
                                params![id, position, data],
                            )?;
                            written += 1;
                        }
                        Some(row) if row != &(*position, data.clone()) => {
                            tx.execute(
                                &format!(
                                    "UPDATE {table}
                                     SET position = ?1,
                                         data = ?2,
                                         updated_at = (strftime('%s', 'now') * 1000)
                                     WHERE id = ?3;"
                                ),
                                params![position, data, id],
                            )?;
                            written += 1;
                        }
                        Some(_) => {}
                    }
                }
                for id in previous.keys().filter(|id| !desired.contains_key(*id)) {
                    tx.execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
                    written += 1;
                }
            }
            None => {
                if let Some((_, data)) = desired.values().next() {
                    if previous.values().next().map(|(_, prev)| prev) != Some(data) {
                        tx.execute(
                            "INSERT INTO settings (key, data) VALUES (?1, ?2)
                             ON CONFLICT(key) DO UPDATE SET
                                data = excluded.data,
                                updated_at = (strftime('%s', 'now') * 1000);",
                            params![collection.as_str(), data],
                        )?;
                        written += 1;
                    }
                }
            }
        }
        tx.commit()?;

        debug!(
            "event=remote_save module=storage status=ok collection={} records={}",
            collection, written
        );
        self.synced.insert(collection, desired);

        if written == 0 {
            Ok(SaveOutcome::Unchanged)
        } else {
            Ok(SaveOutcome::Written { records: written })
        }
    }
}

fn record_table(collection: Collection) -> Option<&'static str> {
    match collection {
        Collection::People => Some("people"),
        Collection::CustomFields => Some("custom_fields"),
        Collection::FieldRequirements | Collection::DefaultAlbums => None,
    }
}

fn desired_rows(collection: Collection, value: &Value) -> StorageResult<RowSnapshot> {
    let encode = |value: &Value| serde_json::to_string(value).map_err(StorageError::Encode);
    let mut rows = RowSnapshot::new();

    if !collection.is_record_list() {
        rows.insert(collection.as_str().to_string(), (0, encode(value)?));
        return Ok(rows);
    }

    let Some(records) = value.as_array() else {
        return Err(StorageError::Decode {
            collection,
            message: "record collection must be a JSON array".to_string(),
        });
    };
    for (position, record) in records.iter().enumerate() {
        let Some(id) = record.get("id").and_then(Value::as_str) else {
            return Err(StorageError::Decode {
                collection,
                message: format!("record at position {position} has no string id"),
            });
        };
        let position = i64::try_from(position).unwrap_or(i64::MAX);
        rows.insert(id.to_string(), (position, encode(record)?));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::RemoteTableAdapter;
    use crate::storage::{Collection, PersistenceAdapter, SaveOutcome};
    use serde_json::json;
    use std::path::Path;

    fn row_count(adapter: &RemoteTableAdapter, table: &str) -> i64 {
        adapter
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn saves_only_changed_records() {
        let mut adapter = RemoteTableAdapter::in_memory().unwrap();
        let first = json!([
            { "id": "a", "firstName": "Ann" },
            { "id": "b", "firstName": "Bob" }
        ]);
        assert_eq!(
            adapter.save(Collection::People, &first).unwrap(),
            SaveOutcome::Written { records: 2 }
        );

        let second = json!([
            { "id": "a", "firstName": "Ann" },
            { "id": "b", "firstName": "Robert" },
            { "id": "c", "firstName": "Cat" }
        ]);
        assert_eq!(
            adapter.save(Collection::People, &second).unwrap(),
            SaveOutcome::Written { records: 2 }
        );
        assert_eq!(
            adapter.save(Collection::People, &second).unwrap(),
            SaveOutcome::Unchanged
        );

        let third = json!([{ "id": "c", "firstName": "Cat" }]);
        assert_eq!(
            adapter.save(Collection::People, &third).unwrap(),
            SaveOutcome::Written { records: 3 }
        );
        assert_eq!(row_count(&adapter, "people"), 1);
        assert_eq!(adapter.load(Collection::People).unwrap(), Some(third));
    }

    #[test]
    fn load_preserves_record_order() {
        let mut adapter = RemoteTableAdapter::in_memory().unwrap();
        let value = json!([{ "id": "z" }, { "id": "a" }, { "id": "m" }]);
        adapter.save(Collection::CustomFields, &value).unwrap();
        assert_eq!(adapter.load(Collection::CustomFields).unwrap(), Some(value));
    }

    #[test]
    fn settings_collections_use_single_rows() {
        let mut adapter = RemoteTableAdapter::in_memory().unwrap();
        assert_eq!(adapter.load(Collection::FieldRequirements).unwrap(), None);

        let value = json!({ "email": true, "phone": false });
        adapter.save(Collection::FieldRequirements, &value).unwrap();
        assert_eq!(
            adapter.save(Collection::FieldRequirements, &value).unwrap(),
            SaveOutcome::Unchanged
        );
        assert_eq!(
            adapter.load(Collection::FieldRequirements).unwrap(),
            Some(value)
        );
        assert_eq!(row_count(&adapter, "settings"), 1);
    }

    #[test]
    fn records_without_id_are_rejected() {
        let mut adapter = RemoteTableAdapter::in_memory().unwrap();
        assert!(adapter
            .save(Collection::People, &json!([{ "firstName": "NoId" }]))
            .is_err());
        assert_eq!(row_count(&adapter, "people"), 0);
    }

    #[test]
    fn reachability_requires_existing_directory() {
        assert!(!RemoteTableAdapter::is_reachable(Path::new(
            "/definitely/missing/dir/store.db"
        )));
        let dir = tempfile::tempdir().unwrap();
        assert!(RemoteTableAdapter::is_reachable(&dir.path().join("store.db")));
    }
}
