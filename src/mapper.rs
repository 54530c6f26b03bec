// 🗄️ Data Mapper - entity ⇄ row, one mapper per entity kind
//
// Every read goes through the identity map first, so within one unit of work
// a row is decoded at most once and always comes back as the same instance.
//
// Flow:
// find      → map hit? return it : SELECT by id → decode → register
// find_all  → SELECT * → per row: map hit? reuse : decode → register
// save      → id? UPDATE fillable ∩ attributes : INSERT all fillable → assign id
// delete    → DELETE by id → evict

use std::sync::{MutexGuard, PoisonError};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::collection::EntityCollection;
use crate::config::{MapperConfig, IDENTITY_COLUMN};
use crate::entity::{Entity, EntityId, EntityRef};
use crate::error::MapperError;
use crate::identity_map::{IdentityMap, SharedIdentityMap};
use crate::store::Store;
use crate::value::{Attributes, Value};

/// Builds an entity from a decoded row.
pub type Constructor<E> = fn(Attributes) -> Result<E, MapperError>;

/// What `save` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// New row; the entity now carries this id
    Inserted(EntityId),
    Updated,
    /// Nothing fillable to write, store untouched
    Unchanged,
}

// ============================================================================
// STATEMENT TEMPLATES
// ============================================================================

/// SQL built once per mapper from a validated config.
#[derive(Debug, Clone)]
struct Statements {
    select: String,
    select_all: String,
    insert: String,
    delete: String,
}

impl Statements {
    fn for_config(config: &MapperConfig) -> Self {
        let table = quote(&config.table);
        let columns: Vec<String> = config.fillable.iter().map(|c| quote(c)).collect();
        let placeholders: Vec<String> = config.fillable.iter().map(|c| placeholder(c)).collect();
        let by_id = format!("{} = {}", quote(IDENTITY_COLUMN), placeholder(IDENTITY_COLUMN));

        Statements {
            select: format!("SELECT * FROM {} WHERE {}", table, by_id),
            select_all: format!("SELECT * FROM {}", table),
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            ),
            delete: format!("DELETE FROM {} WHERE {}", table, by_id),
        }
    }

    /// UPDATE for exactly `columns`; built per call since the set varies.
    fn update(table: &str, columns: &[&str]) -> String {
        let assignments: Vec<String> = columns
            .iter()
            .map(|c| format!("{} = {}", quote(c), placeholder(c)))
            .collect();

        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            quote(table),
            assignments.join(", "),
            quote(IDENTITY_COLUMN),
            placeholder(IDENTITY_COLUMN)
        )
    }
}

// Names are validated identifiers; quoting only guards against keywords.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

fn placeholder(column: &str) -> String {
    format!(":{}", column)
}

fn id_param(id: EntityId) -> (String, Value) {
    (placeholder(IDENTITY_COLUMN), Value::Integer(id))
}

// ============================================================================
// DATA MAPPER
// ============================================================================

/// Generic mapper for one entity kind, configured by composition.
pub struct DataMapper<'s, E: Entity, S: Store + ?Sized = Connection> {
    store: &'s S,
    identity_map: SharedIdentityMap,
    config: MapperConfig,
    constructor: Constructor<E>,
    statements: Statements,
}

impl<'s, E: Entity, S: Store + ?Sized> DataMapper<'s, E, S> {
    /// Fails fast on a malformed config, before any statement runs.
    pub fn new(
        store: &'s S,
        identity_map: SharedIdentityMap,
        config: MapperConfig,
    ) -> Result<Self, MapperError> {
        config.validate()?;
        let statements = Statements::for_config(&config);

        debug!(kind = E::KIND, table = %config.table, "mapper configured");

        Ok(DataMapper {
            store,
            identity_map,
            config,
            constructor: E::from_attributes,
            statements,
        })
    }

    /// Replace the default `E::from_attributes` constructor.
    pub fn with_constructor(mut self, constructor: Constructor<E>) -> Self {
        self.constructor = constructor;
        self
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    pub fn fillable(&self) -> &[String] {
        &self.config.fillable
    }

    pub fn identity_map(&self) -> &SharedIdentityMap {
        &self.identity_map
    }

    // Held for the whole of each operation so a concurrent caller can't
    // register a competing instance between our miss and our insert.
    fn lock_map(&self) -> MutexGuard<'_, IdentityMap> {
        self.identity_map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn construct(&self, row: Attributes) -> Result<EntityRef<E>, MapperError> {
        Ok(EntityRef::new((self.constructor)(row)?))
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Entity with this id, or `None` if no row has it.
    ///
    /// After the first hit, repeated calls never touch the store.
    pub fn find(&self, id: EntityId) -> Result<Option<EntityRef<E>>, MapperError> {
        if id <= 0 {
            return Ok(None);
        }

        let mut map = self.lock_map();
        if let Some(entity) = map.get::<E>(id) {
            debug!(kind = E::KIND, id, "identity map hit");
            return Ok(Some(entity));
        }

        debug!(kind = E::KIND, id, "identity map miss");
        let Some(row) = self
            .store
            .fetch_optional(&self.statements.select, &[id_param(id)])?
        else {
            return Ok(None);
        };

        let entity = self.construct(row)?;
        map.set(id, entity.clone());
        Ok(Some(entity))
    }

    /// Every row of the table, in store order.
    ///
    /// Rows already in the identity map come back as the cached instance,
    /// not a fresh decode.
    pub fn find_all(&self) -> Result<EntityCollection<E>, MapperError> {
        let mut map = self.lock_map();
        let rows = self.store.fetch_all(&self.statements.select_all, &[])?;

        let mut collection = EntityCollection::default();
        for row in rows {
            let id = match row.get(IDENTITY_COLUMN).and_then(Value::as_i64) {
                Some(id) if id > 0 => id,
                _ => {
                    warn!(kind = E::KIND, table = %self.config.table, "skipping row without usable id");
                    continue;
                }
            };

            let entity = match map.get::<E>(id) {
                Some(cached) => cached,
                None => {
                    let entity = self.construct(row)?;
                    map.set(id, entity.clone());
                    entity
                }
            };
            collection.add(entity);
        }

        debug!(kind = E::KIND, count = collection.len(), "find_all");
        Ok(collection)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Insert when the entity has no id yet, otherwise update it.
    pub fn save(&self, entity: &EntityRef<E>) -> Result<SaveOutcome, MapperError> {
        // Map first, then the entity: the insert-or-update decision has to be
        // made inside the same critical section as the write.
        let mut map = self.lock_map();
        let (id, attributes) = {
            let current = entity.read();
            (current.id(), current.to_attributes())
        };

        match id {
            Some(id) => self.update(&mut map, id, entity, attributes),
            None => self.insert(&mut map, entity, attributes),
        }
    }

    fn update(
        &self,
        map: &mut IdentityMap,
        id: EntityId,
        entity: &EntityRef<E>,
        mut attributes: Attributes,
    ) -> Result<SaveOutcome, MapperError> {
        attributes.remove(IDENTITY_COLUMN);

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for column in &self.config.fillable {
            if let Some(value) = attributes.remove(column.as_str()) {
                params.push((placeholder(column), value));
                columns.push(column.as_str());
            }
        }

        if columns.is_empty() {
            debug!(kind = E::KIND, id, "nothing fillable to update");
            return Ok(SaveOutcome::Unchanged);
        }

        params.push(id_param(id));
        let sql = Statements::update(&self.config.table, &columns);
        let affected = self.store.execute(&sql, &params)?;
        if affected == 0 {
            return Err(MapperError::NoRowsAffected { kind: E::KIND, id });
        }

        // Converge the map onto the instance that was just written
        map.set(id, entity.clone());
        debug!(kind = E::KIND, id, columns = ?columns, "updated");
        Ok(SaveOutcome::Updated)
    }

    fn insert(
        &self,
        map: &mut IdentityMap,
        entity: &EntityRef<E>,
        mut attributes: Attributes,
    ) -> Result<SaveOutcome, MapperError> {
        // Every fillable column is bound; missing ones as explicit NULL
        let params: Vec<(String, Value)> = self
            .config
            .fillable
            .iter()
            .map(|column| {
                let value = attributes.remove(column.as_str()).unwrap_or(Value::Null);
                (placeholder(column), value)
            })
            .collect();

        // The generated id is only meaningful if this statement wrote a row
        let affected = self.store.execute(&self.statements.insert, &params)?;
        if affected != 1 {
            return Err(MapperError::NothingInserted { kind: E::KIND });
        }

        let id = self.store.last_insert_id();
        if id <= 0 {
            return Err(MapperError::MissingGeneratedId { kind: E::KIND });
        }

        entity.write().set_id(id);
        map.set(id, entity.clone());
        info!(kind = E::KIND, id, "inserted");
        Ok(SaveOutcome::Inserted(id))
    }

    /// Delete the entity's row and evict it from the identity map.
    ///
    /// An id-less entity was never stored: `MissingIdentity`. On a store
    /// failure the map is left as it was.
    pub fn delete(&self, entity: &EntityRef<E>) -> Result<(), MapperError> {
        let mut map = self.lock_map();
        let id = entity
            .id()
            .ok_or(MapperError::MissingIdentity { kind: E::KIND })?;

        let affected = self.store.execute(&self.statements.delete, &[id_param(id)])?;
        map.remove::<E>(id);

        info!(kind = E::KIND, id, affected, "deleted");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
