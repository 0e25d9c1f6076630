use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CheckError;
use crate::value::{
    Value, ANY_BOOL, ANY_FLOAT, ANY_INT, ANY_LIST, ANY_OBJECT, ANY_PATH, ANY_STR, ANY_URL,
};

pub const DEFAULT_FUEL_CHECK_INTERVAL: u32 = 1000;

/// Description of an ambient value for shell chunks and JSON configured globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueDescription {
    Any,
    Nil,
    Bool,
    Int,
    Float,
    String,
    Path,
    Url,
    Object,
    List,
}

impl ValueDescription {
    pub fn value(self) -> Value {
        match self {
            ValueDescription::Any => Value::Any,
            ValueDescription::Nil => Value::Nil,
            ValueDescription::Bool => ANY_BOOL,
            ValueDescription::Int => ANY_INT,
            ValueDescription::Float => ANY_FLOAT,
            ValueDescription::String => ANY_STR,
            ValueDescription::Path => ANY_PATH,
            ValueDescription::Url => ANY_URL,
            ValueDescription::Object => ANY_OBJECT.clone(),
            ValueDescription::List => ANY_LIST.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    /// Seed the global scope with the base globals instead of only the caller's globals.
    pub use_base_globals: bool,
    pub shell_chunk: bool,
    pub shell_local_vars: BTreeMap<String, ValueDescription>,
    /// Node visits between two polls of the cancellation signal.
    pub fuel_check_interval: u32,
    pub max_steps: Option<u64>,
    pub record_node_values: bool,
    /// Diagnostic locations are displayed relative to this directory.
    pub location_root: Option<PathBuf>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            use_base_globals: false,
            shell_chunk: false,
            shell_local_vars: BTreeMap::new(),
            fuel_check_interval: DEFAULT_FUEL_CHECK_INTERVAL,
            max_steps: None,
            record_node_values: true,
            location_root: None,
        }
    }
}

impl CheckOptions {
    pub fn from_json_str(json: &str) -> Result<Self, CheckError> {
        let options: CheckOptions = serde_json::from_str(json)?;
        Ok(options.normalized())
    }

    fn normalized(mut self) -> Self {
        if self.fuel_check_interval == 0 {
            self.fuel_check_interval = DEFAULT_FUEL_CHECK_INTERVAL;
        }
        self
    }

    /// Text identifying a chunk in diagnostic locations.
    pub(crate) fn display_path(&self, path: &Path) -> String {
        let relative = self
            .location_root
            .as_deref()
            .and_then(|root| pathdiff::diff_paths(path, root));
        match relative {
            Some(relative) if !relative.starts_with("..") => relative.display().to_string(),
            _ => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_default_values() {
        let options = CheckOptions::from_json_str(r#"{"shell_chunk": true}"#).expect("valid");
        assert_eq!(
            options,
            CheckOptions {
                shell_chunk: true,
                ..CheckOptions::default()
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = CheckOptions::from_json_str(r#"{"fuel": 3}"#).expect_err("unknown field");
        assert!(matches!(error, CheckError::InvalidOptions(_)));
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let options =
            CheckOptions::from_json_str(r#"{"fuel_check_interval": 0}"#).expect("valid");
        assert_eq!(options.fuel_check_interval, DEFAULT_FUEL_CHECK_INTERVAL);
    }

    #[test]
    fn locations_are_relative_to_root() {
        let options = CheckOptions {
            location_root: Some(PathBuf::from("/project")),
            ..CheckOptions::default()
        };
        assert_eq!(options.display_path(Path::new("/project/src/main.ix")), "src/main.ix");
        assert_eq!(options.display_path(Path::new("/other/lib.ix")), "/other/lib.ix");
    }
}
