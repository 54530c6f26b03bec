// ⚙️ Mapper configuration - validated once, at construction
//
// Table and column names are interpolated into SQL, so they are checked
// here against a strict identifier syntax and never taken from row data.

use serde::{Deserialize, Serialize};

use crate::error::MapperError;

/// Column every mapped table keys on. Never fillable.
pub const IDENTITY_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Table the entity kind is stored in
    pub table: String,

    /// Ordered columns the mapper may write on insert/update
    pub fillable: Vec<String>,
}

impl MapperConfig {
    pub fn new<T, I, C>(table: T, fillable: I) -> Result<Self, MapperError>
    where
        T: Into<String>,
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let config = MapperConfig {
            table: table.into(),
            fillable: fillable.into_iter().map(Into::into).collect(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate, e.g. `{"table": "users", "fillable": ["email"]}`.
    pub fn from_json(json: &str) -> Result<Self, MapperError> {
        let config: MapperConfig = serde_json::from_str(json)
            .map_err(|e| MapperError::Configuration(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MapperError> {
        if !is_identifier(&self.table) {
            return Err(MapperError::Configuration(format!(
                "table name {:?} is not a plain SQL identifier",
                self.table
            )));
        }

        if self.fillable.is_empty() {
            return Err(MapperError::Configuration(format!(
                "table {} has no fillable columns",
                self.table
            )));
        }

        for (index, column) in self.fillable.iter().enumerate() {
            if !is_identifier(column) {
                return Err(MapperError::Configuration(format!(
                    "fillable column {:?} is not a plain SQL identifier",
                    column
                )));
            }
            if column.eq_ignore_ascii_case(IDENTITY_COLUMN) {
                return Err(MapperError::Configuration(format!(
                    "identity column `{}` cannot be fillable",
                    IDENTITY_COLUMN
                )));
            }
            if self.fillable[..index].contains(column) {
                return Err(MapperError::Configuration(format!(
                    "fillable column {} is listed twice",
                    column
                )));
            }
        }

        Ok(())
    }

    pub fn is_fillable(&self, column: &str) -> bool {
        self.fillable.iter().any(|c| c == column)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
