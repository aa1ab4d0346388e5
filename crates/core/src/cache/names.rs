//! Versioned partition names.
//!
//! Names have the shape `{prefix}-{kind}-{version}`. The version is held once
//! so the three names can never disagree about it.

use serde::{Deserialize, Serialize};

/// The traffic class a partition serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Static,
    Images,
    Dynamic,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Static, PartitionKind::Dynamic, PartitionKind::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Images => "images",
            PartitionKind::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of partition names active for one controller version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    prefix: String,
    version: String,
}

impl CacheNames {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full partition name for a kind at the current version.
    pub fn partition(&self, kind: PartitionKind) -> String {
        format!("{}-{}-{}", self.prefix, kind.as_str(), self.version)
    }

    pub fn static_assets(&self) -> String {
        self.partition(PartitionKind::Static)
    }

    pub fn images(&self) -> String {
        self.partition(PartitionKind::Images)
    }

    pub fn dynamic(&self) -> String {
        self.partition(PartitionKind::Dynamic)
    }

    /// All current names, in `static`, `dynamic`, `images` order.
    pub fn current(&self) -> Vec<String> {
        PartitionKind::ALL.iter().map(|kind| self.partition(*kind)).collect()
    }

    /// Whether `name` is one of the current partition names.
    pub fn is_current(&self, name: &str) -> bool {
        PartitionKind::ALL.iter().any(|kind| self.partition(*kind) == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names() {
        let names = CacheNames::new("portfolio", "v1.1.0");
        assert_eq!(names.static_assets(), "portfolio-static-v1.1.0");
        assert_eq!(names.images(), "portfolio-images-v1.1.0");
        assert_eq!(names.dynamic(), "portfolio-dynamic-v1.1.0");
        assert_eq!(names.current().len(), 3);
    }

    #[test]
    fn test_is_current() {
        let names = CacheNames::new("portfolio", "v1.1.0");
        assert!(names.is_current("portfolio-dynamic-v1.1.0"));
        assert!(!names.is_current("portfolio-v1.0.0-dynamic"));
        assert!(!names.is_current("portfolio-dynamic-v1.0.0"));
    }

    #[test]
    fn test_version_bump_changes_every_name() {
        let old = CacheNames::new("portfolio", "v1.0.0");
        let new = CacheNames::new("portfolio", "v1.1.0");
        for name in old.current() {
            assert!(!new.is_current(&name));
        }
    }
}
