// 📚 Entity Collection - ordered, index-addressable, entities only

use crate::entity::{Entity, EntityId, EntityRef, ErasedEntity};
use crate::error::MapperError;

/// Ordered sequence of entity handles.
///
/// Removal re-indexes densely: after `remove(i)` the element that was at
/// `i + 1` is at `i`. `get` and `to_vec` always agree with that.
pub struct EntityCollection<E: Entity> {
    items: Vec<EntityRef<E>>,
}

impl<E: Entity> EntityCollection<E> {
    pub fn new(initial: Vec<EntityRef<E>>) -> Self {
        EntityCollection { items: initial }
    }

    /// Build from type-erased values (e.g. an identity map snapshot).
    ///
    /// All or nothing: the first value that is not an `E` fails the whole
    /// construction with `TypeViolation`.
    pub fn try_from_erased(values: Vec<ErasedEntity>) -> Result<Self, MapperError> {
        let items = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                EntityRef::from_erased(value).ok_or_else(|| {
                    MapperError::TypeViolation(format!(
                        "element {} is not a {} entity",
                        index,
                        E::KIND
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EntityCollection { items })
    }

    pub fn add(&mut self, entity: EntityRef<E>) {
        self.items.push(entity);
    }

    /// Returns whether the index existed.
    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.items.remove(index);
            true
        } else {
            false
        }
    }

    pub fn get(&self, index: usize) -> Option<&EntityRef<E>> {
        self.items.get(index)
    }

    pub fn to_vec(&self) -> Vec<EntityRef<E>> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef<E>> {
        self.items.iter()
    }

    pub fn position_of_id(&self, id: EntityId) -> Option<usize> {
        self.items.iter().position(|entity| entity.id() == Some(id))
    }
}

impl<E: Entity> Default for EntityCollection<E> {
    fn default() -> Self {
        EntityCollection { items: Vec::new() }
    }
}

impl<E: Entity> FromIterator<EntityRef<E>> for EntityCollection<E> {
    fn from_iter<I: IntoIterator<Item = EntityRef<E>>>(iter: I) -> Self {
        EntityCollection { items: iter.into_iter().collect() }
    }
}

impl<E: Entity> IntoIterator for EntityCollection<E> {
    type Item = EntityRef<E>;
    type IntoIter = std::vec::IntoIter<EntityRef<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, E: Entity> IntoIterator for &'a EntityCollection<E> {
    type Item = &'a EntityRef<E>;
    type IntoIter = std::slice::Iter<'a, EntityRef<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<E: Entity + std::fmt::Debug> std::fmt::Debug for EntityCollection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::User;
    use std::sync::{Arc, RwLock};

    fn user(id: EntityId) -> EntityRef<User> {
        let mut user = User::new("First", "Last", "first@example.com", "pw");
        user.set_id(id);
        EntityRef::new(user)
    }

    #[test]
    fn test_add_get_and_order() {
        let mut collection = EntityCollection::new(vec![user(1), user(2)]);
        collection.add(user(3));

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.get(2).unwrap().id(), Some(3));
        assert!(collection.get(3).is_none());

        let ids: Vec<_> = collection.to_vec().iter().map(|u| u.id().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_reindexes_densely() {
        let mut collection = EntityCollection::new(vec![user(1), user(2), user(3)]);

        assert!(collection.remove(0));
        assert!(!collection.remove(5));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(0).unwrap().id(), Some(2));
        assert_eq!(collection.get(1).unwrap().id(), Some(3));
        assert!(collection.get(2).is_none());
        assert_eq!(collection.position_of_id(3), Some(1));
        assert_eq!(collection.position_of_id(1), None);
    }

    #[test]
    fn test_erased_construction_keeps_instances() {
        let a = user(1);
        let b = user(2);

        let collection =
            EntityCollection::<User>::try_from_erased(vec![a.erase(), b.erase()]).unwrap();

        assert!(collection.get(0).unwrap().same_instance(&a));
        assert!(collection.get(1).unwrap().same_instance(&b));
    }

    #[test]
    fn test_foreign_value_rejects_whole_collection() {
        let foreign: ErasedEntity = Arc::new(RwLock::new(42_u32));
        let values = vec![user(1).erase(), foreign, user(3).erase()];

        let result = EntityCollection::<User>::try_from_erased(values);

        match result {
            Err(MapperError::TypeViolation(message)) => {
                assert!(message.contains("element 1"));
            }
            other => panic!("expected TypeViolation, got {:?}", other.map(|c| c.len())),
        }
    }
}
