// Mapper error taxonomy
//
// "Not found" is never an error: lookups return Option. Everything in here is
// a real failure the caller has to decide about.

use thiserror::Error;

use crate::entity::EntityId;

#[derive(Debug, Error)]
pub enum MapperError {
    /// A collection was built from a value that is not an entity of the expected kind.
    #[error("type violation: {0}")]
    TypeViolation(String),

    /// The store rejected or could not execute a statement.
    #[error("store failure: {0}")]
    Store(#[from] rusqlite::Error),

    /// Malformed table/column configuration, reported at mapper construction.
    #[error("invalid mapper configuration: {0}")]
    Configuration(String),

    /// A row could not be turned into an entity.
    #[error("cannot decode {kind} from row: {reason}")]
    Decode { kind: &'static str, reason: String },

    #[error("{kind} has no identity; nothing to delete")]
    MissingIdentity { kind: &'static str },

    /// An update keyed by id touched zero rows (row deleted underneath us).
    #[error("update of {kind} #{id} affected no rows")]
    NoRowsAffected { kind: &'static str, id: EntityId },

    /// The store accepted an INSERT but wrote no row (e.g. an ignoring trigger).
    #[error("insert of new {kind} wrote no row")]
    NothingInserted { kind: &'static str },

    #[error("store did not report a generated identity for new {kind}")]
    MissingGeneratedId { kind: &'static str },
}

impl MapperError {
    /// True when the failure came from the store side of a statement.
    ///
    /// Retrying is a caller policy; the mapper never does it.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            MapperError::Store(_)
                | MapperError::NoRowsAffected { .. }
                | MapperError::NothingInserted { .. }
                | MapperError::MissingGeneratedId { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_classification() {
        let store = MapperError::Store(rusqlite::Error::InvalidQuery);
        assert!(store.is_store_failure());

        let stale = MapperError::NoRowsAffected { kind: "user", id: 7 };
        assert!(stale.is_store_failure());
        assert_eq!(stale.to_string(), "update of user #7 affected no rows");

        let ignored = MapperError::NothingInserted { kind: "user" };
        assert!(ignored.is_store_failure());

        let config = MapperError::Configuration("empty table name".to_string());
        assert!(!config.is_store_failure());

        let violation = MapperError::TypeViolation("element 1".to_string());
        assert!(!violation.is_store_failure());
    }
}
