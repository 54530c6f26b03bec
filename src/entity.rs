// 🪪 Entity contract + shared instance handle
//
// "One row, one object": every entity the mappers hand out is an `EntityRef`,
// and two refs to the same (kind, id) inside a unit of work are the same
// allocation.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::MapperError;
use crate::value::Attributes;

/// Store-generated identity. Always positive once assigned.
pub type EntityId = i64;

/// Type-erased instance as held by the identity map.
pub type ErasedEntity = Arc<dyn Any + Send + Sync>;

// ============================================================================
// ENTITY CAPABILITY
// ============================================================================

/// A typed record that can cross the store boundary.
///
/// Conversions to and from `Attributes` are only used by the mapper; domain
/// code goes through the entity's own typed getters and setters.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Type tag used as the first half of the identity-map key.
    const KIND: &'static str;

    /// Build an entity from a decoded row (or caller-supplied fields).
    fn from_attributes(attributes: Attributes) -> Result<Self, MapperError>;

    /// Current attributes, including `id` when set.
    fn to_attributes(&self) -> Attributes;

    fn id(&self) -> Option<EntityId>;

    /// Called by the mapper exactly once, after a successful insert.
    fn set_id(&mut self, id: EntityId);
}

// ============================================================================
// ENTITY REF
// ============================================================================

/// Shared handle to one in-memory entity instance.
///
/// Clones are aliases. Equality of identity is `same_instance`, never a
/// field comparison.
pub struct EntityRef<E>(Arc<RwLock<E>>);

impl<E: Entity> EntityRef<E> {
    pub fn new(entity: E) -> Self {
        EntityRef(Arc::new(RwLock::new(entity)))
    }

    // Setters touch one field each, so a poisoned lock still guards a
    // whole entity.
    pub fn read(&self) -> RwLockReadGuard<'_, E> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, E> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Option<EntityId> {
        self.read().id()
    }

    pub fn same_instance(&self, other: &EntityRef<E>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn erase(&self) -> ErasedEntity {
        self.0.clone()
    }

    /// Recover a typed handle; `None` if the value is not an `E`.
    pub(crate) fn from_erased(erased: ErasedEntity) -> Option<Self> {
        erased.downcast::<RwLock<E>>().ok().map(EntityRef)
    }
}

impl<E> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        EntityRef(Arc::clone(&self.0))
    }
}

impl<E: fmt::Debug> fmt::Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(entity) => f.debug_tuple("EntityRef").field(&*entity).finish(),
            Err(_) => f.write_str("EntityRef(<locked>)"),
        }
    }
}
