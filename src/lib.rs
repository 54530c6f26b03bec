// Entity Mapper - Core Library
// Data mapper + identity map over SQLite, used by the CLI and tests

pub mod value;
pub mod error;
pub mod config;
pub mod entity;
pub mod identity_map;
pub mod collection;
pub mod store;
pub mod mapper;
pub mod db;
pub mod entities;

// Re-export commonly used types
pub use value::{Attributes, Value};
pub use error::MapperError;
pub use config::{MapperConfig, IDENTITY_COLUMN};
pub use entity::{Entity, EntityId, EntityRef, ErasedEntity};
pub use identity_map::{IdentityMap, SharedIdentityMap};
pub use collection::EntityCollection;
pub use store::{NamedParams, Store};
pub use mapper::{Constructor, DataMapper, SaveOutcome};
pub use db::{count_rows, load_users_csv, open_database, setup_database};
pub use entities::{User, UserMapper};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
