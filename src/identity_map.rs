// 🗺️ Identity Map - one in-memory instance per (kind, id)
//
// Scoped to a unit of work: build one, pass it to every mapper of that unit
// of work, drop it at the end. Entries only disappear through remove/clear.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::entity::{Entity, EntityId, EntityRef, ErasedEntity};

/// How mappers share one map. Mappers hold the guard for the whole
/// check-miss-load-register sequence of an operation.
pub type SharedIdentityMap = Arc<Mutex<IdentityMap>>;

/// kind → id → instance. No internal locking.
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<&'static str, HashMap<EntityId, ErasedEntity>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        IdentityMap::default()
    }

    /// Fresh map wrapped for sharing between the mappers of one unit of work.
    pub fn shared() -> SharedIdentityMap {
        Arc::new(Mutex::new(IdentityMap::new()))
    }

    /// Insert or overwrite; last write wins.
    pub fn set<E: Entity>(&mut self, id: EntityId, entity: EntityRef<E>) {
        self.entries
            .entry(E::KIND)
            .or_default()
            .insert(id, entity.erase());
    }

    pub fn get<E: Entity>(&self, id: EntityId) -> Option<EntityRef<E>> {
        let erased = self.entries.get(E::KIND)?.get(&id)?;

        let entity = EntityRef::from_erased(Arc::clone(erased));
        if entity.is_none() {
            // Two entity types registered under the same KIND
            warn!(kind = E::KIND, id, "identity map entry has a different concrete type");
        }
        entity
    }

    pub fn has<E: Entity>(&self, id: EntityId) -> bool {
        self.has_kind(E::KIND, id)
    }

    pub fn has_kind(&self, kind: &str, id: EntityId) -> bool {
        self.entries
            .get(kind)
            .is_some_and(|slots| slots.contains_key(&id))
    }

    /// No-op if the slot is already empty.
    pub fn remove<E: Entity>(&mut self, id: EntityId) {
        if let Some(slots) = self.entries.get_mut(E::KIND) {
            slots.remove(&id);
        }
    }

    /// `Some(kind)` drops that kind only, `None` drops everything.
    pub fn clear(&mut self, kind: Option<&str>) {
        match kind {
            Some(kind) => {
                self.entries.remove(kind);
            }
            None => self.entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_of(&self, kind: &str) -> usize {
        self.entries.get(kind).map_or(0, HashMap::len)
    }

    /// Cached instances of one kind, ordered by id.
    pub fn snapshot(&self, kind: &str) -> Vec<ErasedEntity> {
        let Some(slots) = self.entries.get(kind) else {
            return Vec::new();
        };

        let mut ids: Vec<&EntityId> = slots.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| Arc::clone(&slots[id])).collect()
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, slots) in &self.entries {
            let mut ids: Vec<&EntityId> = slots.keys().collect();
            ids.sort();
            map.entry(kind, &ids);
        }
        map.finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
