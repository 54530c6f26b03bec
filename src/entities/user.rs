// 👤 User Entity - typed record, attributes only at the store boundary
//
// Fields are optional: a User built from a partial row (or partial CSV
// line) only carries what it was given, and an update persists exactly the
// fields it carries.

use serde::{Deserialize, Serialize};

use crate::config::MapperConfig;
use crate::entity::{Entity, EntityId};
use crate::error::MapperError;
use crate::identity_map::SharedIdentityMap;
use crate::mapper::DataMapper;
use crate::store::Store;
use crate::value::{Attributes, Value};

pub const USERS_TABLE: &str = "users";
pub const USER_FILLABLE: [&str; 4] = ["first_name", "last_name", "email", "password"];

/// Mapper for `users`, over any store (a plain `rusqlite::Connection` by default).
pub type UserMapper<'s, S = rusqlite::Connection> = DataMapper<'s, User, S>;

// ============================================================================
// USER ENTITY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Assigned by the store on first insert, never by callers
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,

    #[serde(default)]
    first_name: Option<String>,

    #[serde(default)]
    last_name: Option<String>,

    #[serde(default)]
    email: Option<String>,

    #[serde(default, skip_serializing)]
    password: Option<String>,
}

impl User {
    /// New, not yet persisted user.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        User {
            id: None,
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    pub fn mapper_config() -> MapperConfig {
        MapperConfig {
            table: USERS_TABLE.to_string(),
            fillable: USER_FILLABLE.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// `UserMapper` bound to `store` and the unit of work's identity map.
    pub fn mapper<S: Store>(
        store: &S,
        identity_map: SharedIdentityMap,
    ) -> Result<UserMapper<'_, S>, MapperError> {
        DataMapper::new(store, identity_map, User::mapper_config())
    }

    // ========================================================================
    // GETTERS
    // ========================================================================

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// "First Last", skipping whichever half is missing
    pub fn display_name(&self) -> String {
        [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ========================================================================
    // SETTERS
    // ========================================================================

    pub fn set_first_name(&mut self, first_name: impl Into<String>) {
        self.first_name = Some(first_name.into());
    }

    pub fn set_last_name(&mut self, last_name: impl Into<String>) {
        self.last_name = Some(last_name.into());
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = Some(email.into());
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = Some(password.into());
    }
}

// ============================================================================
// STORE BOUNDARY
// ============================================================================

fn take_text(attributes: &mut Attributes, key: &str) -> Result<Option<String>, MapperError> {
    match attributes.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(text)) => Ok(Some(text)),
        Some(other) => Err(MapperError::Decode {
            kind: User::KIND,
            reason: format!("`{}` must be text, got {}", key, other.type_name()),
        }),
    }
}

fn take_id(attributes: &mut Attributes) -> Result<Option<EntityId>, MapperError> {
    match attributes.remove("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Integer(id)) if id > 0 => Ok(Some(id)),
        Some(other) => Err(MapperError::Decode {
            kind: User::KIND,
            reason: format!("`id` must be a positive integer, got {}", other),
        }),
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    // Unknown columns (created_at, ...) are ignored
    fn from_attributes(mut attributes: Attributes) -> Result<Self, MapperError> {
        Ok(User {
            id: take_id(&mut attributes)?,
            first_name: take_text(&mut attributes, "first_name")?,
            last_name: take_text(&mut attributes, "last_name")?,
            email: take_text(&mut attributes, "email")?,
            password: take_text(&mut attributes, "password")?,
        })
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(id) = self.id {
            attributes.insert("id".to_string(), Value::Integer(id));
        }

        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("password", &self.password),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                attributes.insert(name.to_string(), Value::from(value.as_str()));
            }
        }
        attributes
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        debug_assert!(self.id.is_none(), "user identity assigned twice");
        self.id = Some(id);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_new_user_has_no_identity() {
        let user = User::new("John", "Doe", "john@x.com", "p");

        assert_eq!(user.id(), None);
        assert_eq!(user.first_name(), Some("John"));
        assert_eq!(user.display_name(), "John Doe");
    }

    #[test]
    fn test_from_row() {
        let user = User::from_attributes(row(&[
            ("id", Value::Integer(5)),
            ("first_name", Value::from("Jane")),
            ("last_name", Value::from("Smith")),
            ("email", Value::from("jane@x.com")),
            ("password", Value::from("secret")),
            ("created_at", Value::from("2024-01-01")),
        ]))
        .unwrap();

        assert_eq!(user.id(), Some(5));
        assert_eq!(user.email(), Some("jane@x.com"));
        assert_eq!(user.password(), Some("secret"));
    }

    #[test]
    fn test_ill_typed_row_is_rejected() {
        let wrong_name = User::from_attributes(row(&[("first_name", Value::Integer(3))]));
        assert!(matches!(wrong_name, Err(MapperError::Decode { kind: "user", .. })));

        let wrong_id = User::from_attributes(row(&[("id", Value::Integer(0))]));
        assert!(matches!(wrong_id, Err(MapperError::Decode { .. })));
    }

    #[test]
    fn test_to_attributes_only_carries_set_fields() {
        let mut user = User::from_attributes(row(&[("id", Value::Integer(9))])).unwrap();
        assert_eq!(user.to_attributes(), row(&[("id", Value::Integer(9))]));

        user.set_email("new@x.com");
        assert_eq!(
            user.to_attributes(),
            row(&[("email", Value::from("new@x.com")), ("id", Value::Integer(9))])
        );
    }

    #[test]
    fn test_password_is_never_serialized() {
        let user = User::new("John", "Doe", "john@x.com", "hunter2");

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_deserialized_user_has_no_identity() {
        let json = r#"{"id":0,"first_name":"John","email":"john@x.com"}"#;
        let user: User = serde_json::from_str(json).unwrap();

        assert_eq!(user.id(), None);
        assert_eq!(user.first_name(), Some("John"));

        let with_positive: User = serde_json::from_str(r#"{"id":42}"#).unwrap();
        assert_eq!(with_positive.id(), None);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = User::mapper_config();

        config.validate().unwrap();
        assert_eq!(config.table, "users");
        assert_eq!(config.fillable.len(), 4);
    }
}
