//! Collaborators the checker calls into: concrete value bridge, permissions, module loading
//! and cancellation.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Chunk;
use crate::error::CheckError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    CreateRoutine,
    Read(String),
    Write(String),
    Provide(String),
    Use(String),
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::CreateRoutine => f.write_str("create routine"),
            Permission::Read(entity) => write!(f, "read {entity}"),
            Permission::Write(entity) => write!(f, "write {entity}"),
            Permission::Provide(entity) => write!(f, "provide {entity}"),
            Permission::Use(entity) => write!(f, "use {entity}"),
        }
    }
}

/// Concrete form of a value that can be handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcreteValue {
    Path(String),
    Url(String),
    Host(String),
    Scheme(String),
}

impl ConcreteValue {
    pub fn as_str(&self) -> &str {
        match self {
            ConcreteValue::Path(value)
            | ConcreteValue::Url(value)
            | ConcreteValue::Host(value)
            | ConcreteValue::Scheme(value) => value,
        }
    }
}

/// Bridge between symbolic values and the host's concrete values.
pub trait ConcreteBridge: Send + Sync {
    /// Value of a quantity literal, `None` when the unit is unknown.
    fn quantity(&self, value: f64, unit: &str) -> Option<Value>;

    /// Value of a rate literal, `None` when the unit is unknown.
    fn rate(&self, value: f64, unit: &str) -> Option<Value>;

    /// Permissions required by the meta value of a spawn expression.
    fn estimate_permissions(&self, meta: &Value) -> Vec<Permission>;

    /// Value stored at `url`, `None` when nothing is known about it.
    fn value_at_url(&self, url: &str) -> Option<Value>;

    fn concretize(&self, value: &Value) -> Option<ConcreteValue>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBridge;

const DURATION_UNITS: [&str; 5] = ["ms", "s", "min", "h", "d"];
const BYTE_COUNT_UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];

impl ConcreteBridge for DefaultBridge {
    fn quantity(&self, _value: f64, unit: &str) -> Option<Value> {
        let kind = if DURATION_UNITS.contains(&unit) {
            "duration"
        } else if BYTE_COUNT_UNITS.contains(&unit) {
            "byte-count"
        } else if unit == "x" {
            "frequency"
        } else if unit == "%" {
            "percentage"
        } else {
            return None;
        };
        Some(Value::Quantity(Some(Arc::from(kind))))
    }

    fn rate(&self, value: f64, unit: &str) -> Option<Value> {
        let (numerator, denominator) = unit.split_once('/')?;
        if denominator != "s" {
            return None;
        }
        let kind = match self.quantity(value, numerator)? {
            Value::Quantity(Some(kind)) if &*kind == "byte-count" => "byte-rate",
            Value::Quantity(Some(kind)) if &*kind == "frequency" => "simple-rate",
            _ => return None,
        };
        Some(Value::Rate(Some(Arc::from(kind))))
    }

    fn estimate_permissions(&self, _meta: &Value) -> Vec<Permission> {
        Vec::new()
    }

    fn value_at_url(&self, _url: &str) -> Option<Value> {
        None
    }

    fn concretize(&self, value: &Value) -> Option<ConcreteValue> {
        match value {
            Value::Path(Some(path)) => Some(ConcreteValue::Path(path.to_string())),
            Value::Url(Some(url)) => Some(ConcreteValue::Url(url.to_string())),
            Value::Host(Some(host)) => Some(ConcreteValue::Host(host.to_string())),
            Value::Scheme(Some(scheme)) => Some(ConcreteValue::Scheme(scheme.to_string())),
            _ => None,
        }
    }
}

pub trait PermissionOracle: Send + Sync {
    fn is_granted(&self, permission: &Permission) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionOracle for AllowAll {
    fn is_granted(&self, _permission: &Permission) -> bool {
        true
    }
}

/// Supplies parsed chunks for inclusion imports and imports.
pub trait ModuleLoader: Send + Sync {
    fn load_chunk(&self, source: &str) -> Result<Arc<Chunk>, CheckError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl ModuleLoader for NoLoader {
    fn load_chunk(&self, source: &str) -> Result<Arc<Chunk>, CheckError> {
        Err(CheckError::ModuleLoad {
            path: source.to_string(),
            message: "no module loader is configured".to_string(),
        })
    }
}

/// Loads JSON-encoded chunks from files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, source: &str) -> PathBuf {
        let relative = source.trim_start_matches('/');
        self.root.join(relative).clean()
    }

    fn read(&self, path: &Path) -> anyhow::Result<Chunk> {
        if !path.starts_with(self.root.clean()) {
            anyhow::bail!("{} is outside of {}", path.display(), self.root.display());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let chunk = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid chunk", path.display()))?;
        Ok(chunk)
    }
}

impl ModuleLoader for DirectoryLoader {
    fn load_chunk(&self, source: &str) -> Result<Arc<Chunk>, CheckError> {
        let path = self.resolve(source);
        debug!(path = %path.display(), "loading chunk");
        self.read(&path)
            .map(Arc::new)
            .map_err(|error| CheckError::ModuleLoad {
                path: source.to_string(),
                message: format!("{error:#}"),
            })
    }
}

/// Flag set by the host to stop a running check.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bridge_knows_common_units() {
        let bridge = DefaultBridge;
        assert_eq!(
            bridge.quantity(1.0, "s"),
            Some(Value::Quantity(Some(Arc::from("duration"))))
        );
        assert_eq!(
            bridge.rate(2.0, "kB/s"),
            Some(Value::Rate(Some(Arc::from("byte-rate"))))
        );
        assert_eq!(bridge.quantity(1.0, "parsec"), None);
        assert_eq!(bridge.rate(1.0, "s/min"), None);
    }

    #[test]
    fn cancel_signal_is_shared_between_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        clone.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn directory_loader_rejects_paths_outside_root() {
        let directory = tempfile::tempdir().expect("temporary directory");
        let loader = DirectoryLoader::new(directory.path());
        let error = loader
            .load_chunk("../../etc/passwd")
            .expect_err("path escapes the root");
        assert!(matches!(error, CheckError::ModuleLoad { .. }));
    }
}
