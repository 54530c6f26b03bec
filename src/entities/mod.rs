// Entity Models
// One typed record per table; the generic mapper does the rest.
//
// Each entity has:
// - Optional store-generated identity, assigned once on insert
// - Typed getters/setters for domain code
// - Attribute conversion used only at the store boundary

pub mod user;

pub use user::{User, UserMapper, USERS_TABLE, USER_FILLABLE};
