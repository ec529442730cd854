use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Tuning for mesh collision, loadable from TOML
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct MeshCollisionConfig {
    #[serde(default)]
    pub reduction: ReductionConfig,
    #[serde(default)]
    pub narrow_phase: NarrowPhaseConfig,
}

/// Boundary smoothing and final contact reduction
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ReductionConfig {
    /// Plane slop relative to the longer of a triangle's first two edges
    #[serde(default = "default_distance_threshold_scale")]
    pub distance_threshold_scale: f32,
    /// Minimum dot between a contact normal and an edge fence to count as infringing
    #[serde(default = "default_infringement_epsilon")]
    pub infringement_epsilon: f32,
    /// Contacts kept per pair after reduction
    #[serde(default = "default_max_contacts")]
    pub max_contacts: usize,
}

fn default_distance_threshold_scale() -> f32 {
    1e-4
}

fn default_infringement_epsilon() -> f32 {
    5e-5
}

fn default_max_contacts() -> usize {
    4
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            distance_threshold_scale: default_distance_threshold_scale(),
            infringement_epsilon: default_infringement_epsilon(),
            max_contacts: default_max_contacts(),
        }
    }
}

/// Per-triangle tester settings
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct NarrowPhaseConfig {
    /// Distance beyond contact at which speculative contacts are still generated
    #[serde(default = "default_speculative_margin")]
    pub speculative_margin: f32,
    /// Dot between contact normal and face normal above which a hit counts as a face hit
    #[serde(default = "default_minimum_dot_for_face_collision")]
    pub minimum_dot_for_face_collision: f32,
}

fn default_speculative_margin() -> f32 {
    0.1
}

fn default_minimum_dot_for_face_collision() -> f32 {
    crate::contact::MINIMUM_DOT_FOR_FACE_COLLISION
}

impl Default for NarrowPhaseConfig {
    fn default() -> Self {
        Self {
            speculative_margin: default_speculative_margin(),
            minimum_dot_for_face_collision: default_minimum_dot_for_face_collision(),
        }
    }
}

impl MeshCollisionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MeshCollisionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reduction.max_contacts == 0 {
            return Err(ConfigError::Invalid {
                field: "reduction.max_contacts",
                msg: "must keep at least one contact".to_string(),
            });
        }
        let scale = self.reduction.distance_threshold_scale;
        if scale.is_nan() || scale < 0.0 {
            return Err(ConfigError::Invalid {
                field: "reduction.distance_threshold_scale",
                msg: format!("{scale} is not a non-negative number"),
            });
        }
        let epsilon = self.reduction.infringement_epsilon;
        if epsilon.is_nan() || epsilon < 0.0 {
            return Err(ConfigError::Invalid {
                field: "reduction.infringement_epsilon",
                msg: format!("{epsilon} is not a non-negative number"),
            });
        }
        let margin = self.narrow_phase.speculative_margin;
        if margin.is_nan() || margin < 0.0 {
            return Err(ConfigError::Invalid {
                field: "narrow_phase.speculative_margin",
                msg: format!("{margin} is not a non-negative number"),
            });
        }
        let minimum_dot = self.narrow_phase.minimum_dot_for_face_collision;
        if minimum_dot.is_nan() || minimum_dot > 1.0 {
            return Err(ConfigError::Invalid {
                field: "narrow_phase.minimum_dot_for_face_collision",
                msg: format!("{minimum_dot} is not a number at most 1"),
            });
        }
        Ok(())
    }
}
