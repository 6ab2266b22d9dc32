//! Generator configuration.
use serde::{Deserialize, Serialize};

/// What happens when one type name is reached with two different schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Structural mismatch aborts generation with `NameCollision`.
    #[default]
    Strict,
    /// Keep the first registration and log a warning.
    FirstWins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Field name marking a uniqueness seed in activity variants.
    pub seed_field_name: String,
    /// Maximum schema nesting depth before traversal gives up.
    pub max_depth: usize,
    pub collision_policy: CollisionPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed_field_name: "seed".to_string(),
            max_depth: 256,
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &std::path::Path) -> Result<Self, crate::error::LoadError> {
        crate::path_de::from_file_with_path(path)
    }
}
