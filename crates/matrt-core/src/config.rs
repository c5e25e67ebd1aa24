//! Runtime configuration.
//!
//! Settings come from defaults, an optional JSON file and then environment
//! overrides, in that order:
//!
//! ```json
//! { "fatal_policy": "abort", "alloc_retries": 1, "max_elements": 1048576, "log_filter": "matrt=info" }
//! ```
//!
//! `MATRT_MAX_ELEMENTS` (an element count, or `none`) and `MATRT_FATAL`
//! (`abort`, `panic`, `exit:<code>`) override the file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alloc::{BudgetAllocator, DataAllocator, HeapAllocator, DEFAULT_ALLOC_RETRIES};
use crate::dtype::Element;
use crate::error::MatrtError;
use crate::fatal::{self, FatalPolicy};
use crate::Result;

pub const ENV_MAX_ELEMENTS: &str = "MATRT_MAX_ELEMENTS";
pub const ENV_FATAL: &str = "MATRT_FATAL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Applied by `or_abort` once [`install`](Self::install) has run.
    pub fatal_policy: FatalPolicy,
    /// Extra attempts after a failed data allocation.
    pub alloc_retries: usize,
    /// Largest single buffer, in elements. `None` means unlimited.
    pub max_elements: Option<usize>,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fatal_policy: FatalPolicy::default(),
            alloc_retries: DEFAULT_ALLOC_RETRIES,
            max_elements: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MatrtError::Config(format!("invalid runtime config: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MatrtError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Apply `MATRT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `MATRT_*` overrides read through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_MAX_ELEMENTS) {
            let raw = raw.trim();
            self.max_elements = if raw.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(raw.parse().map_err(|_| {
                    MatrtError::Config(format!("{ENV_MAX_ELEMENTS} must be an element count, got '{raw}'"))
                })?)
            };
        }
        if let Some(raw) = lookup(ENV_FATAL) {
            self.fatal_policy = raw.parse()?;
        }
        Ok(())
    }

    /// The data allocator these settings imply.
    pub fn allocator<T: Element>(&self) -> Box<dyn DataAllocator<T>> {
        match self.max_elements {
            Some(max) => Box::new(BudgetAllocator::new(max)),
            None => Box::new(HeapAllocator),
        }
    }

    /// Make the fatal policy process-wide.
    pub fn install(&self) {
        fatal::install_policy(self.fatal_policy);
        tracing::debug!(policy = %self.fatal_policy, "installed fatal policy");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.fatal_policy, FatalPolicy::Abort);
        assert_eq!(cfg.alloc_retries, 1);
        assert_eq!(cfg.max_elements, None);
        assert_eq!(RuntimeConfig::from_json_str("{}").unwrap(), cfg);
    }

    #[test]
    fn test_parse_json() {
        let cfg = RuntimeConfig::from_json_str(
            r#"{ "fatal_policy": {"exit": 3}, "alloc_retries": 4, "max_elements": 100, "log_filter": "matrt=debug" }"#,
        )
        .unwrap();
        assert_eq!(cfg.fatal_policy, FatalPolicy::Exit(3));
        assert_eq!(cfg.alloc_retries, 4);
        assert_eq!(cfg.max_elements, Some(100));
        assert_eq!(cfg.log_filter, "matrt=debug");
    }

    #[test]
    fn test_rejects_unknown_policy_and_fields() {
        assert!(RuntimeConfig::from_json_str(r#"{ "fatal_policy": "ignore" }"#).is_err());
        assert!(RuntimeConfig::from_json_str(r#"{ "retries": 2 }"#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_MAX_ELEMENTS, "64"), (ENV_FATAL, "exit:2")].into_iter().collect();
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.max_elements, Some(64));
        assert_eq!(cfg.fatal_policy, FatalPolicy::Exit(2));

        cfg.apply_env_from(|k| (k == ENV_MAX_ELEMENTS).then(|| "none".to_string())).unwrap();
        assert_eq!(cfg.max_elements, None);

        assert!(cfg.apply_env_from(|k| (k == ENV_FATAL).then(|| "later".to_string())).is_err());
        assert!(cfg.apply_env_from(|k| (k == ENV_MAX_ELEMENTS).then(|| "lots".to_string())).is_err());
    }

    #[test]
    fn test_allocator_respects_budget() {
        let cfg = RuntimeConfig {
            max_elements: Some(8),
            ..RuntimeConfig::default()
        };
        let alloc = cfg.allocator::<f64>();
        assert!(alloc.allocate(8).is_some());
        assert!(alloc.allocate(9).is_none());

        let mut t = crate::Tensor::<f64>::new();
        assert!(t.allocate_or_reuse_with(&[3, 3], alloc.as_ref(), cfg.alloc_retries).is_err());
        assert!(t.allocate_or_reuse_with(&[2, 4], alloc.as_ref(), cfg.alloc_retries).is_ok());
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("matrt-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "alloc_retries": 0 }"#).unwrap();
        let cfg = RuntimeConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.alloc_retries, 0);
        assert!(RuntimeConfig::from_path(&path).is_err());
    }
}
