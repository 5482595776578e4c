/// Session configuration.
///
/// # Examples
///
/// ```
/// use objectstore::Config;
///
/// let config = Config::from_json(r#"{"name": "inventory", "read_only": true}"#).unwrap();
/// assert_eq!(config.name, "inventory");
/// assert!(config.read_only);
/// assert_eq!(config.schema_version, 0);
/// ```

use crate::error::{ObjectStoreError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name used in log output
    pub name: String,
    /// Refuse write transactions
    pub read_only: bool,
    pub schema_version: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: "default".to_string(),
            read_only: false,
            schema_version: 0,
        }
    }
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Config {
            name: name.into(),
            ..Config::default()
        }
    }

    /// A configuration whose sessions can only read.
    pub fn read_only(name: impl Into<String>) -> Self {
        Config {
            name: name.into(),
            read_only: true,
            ..Config::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        if config.name.is_empty() {
            return Err(ObjectStoreError::Config("name must not be empty".to_string()));
        }
        Ok(config)
    }
}
