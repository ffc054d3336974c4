use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Canvas-center convention: sprites spawn here and `goto` targets are
/// biased by this amount on both axes.
pub const CANVAS_CENTER: f32 = 150.0;

/// Engine tunables. Defaults match the stock sandbox; a host application
/// can override them via a JSON file named by `SPRITELAB_CONFIG`.
#[derive(Resource, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Bounding-box footprint used by the collision monitor, anchored
    /// top-left at the sprite's pose.
    pub sprite_width: f32,
    pub sprite_height: f32,
    /// Collision sampling cadence, independent of the playback cadence.
    pub collision_sample_ms: u64,
    /// Pause between consecutive queue positions during playback.
    pub inter_command_ms: u64,
    /// How long the hero flash stays raised after a collision.
    pub hero_effect_ms: u64,
    /// How long the collision-active flag stays raised; its expiry
    /// re-arms the collision edge trigger.
    pub collision_active_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            sprite_width: 95.0,
            sprite_height: 100.0,
            collision_sample_ms: 100,
            inter_command_ms: 500,
            hero_effect_ms: 3000,
            collision_active_ms: 5000,
        }
    }
}

/// Loads the config file named by `SPRITELAB_CONFIG`, falling back to
/// defaults when the variable is unset or the file is unreadable.
pub fn load_config() -> SandboxConfig {
    let Some(path) = std::env::var("SPRITELAB_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
    else {
        return SandboxConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<SandboxConfig>(&contents) {
            Ok(config) => {
                info!("loaded sandbox config from {path}");
                config
            }
            Err(e) => {
                warn!("failed to parse {path}: {e}; using defaults");
                SandboxConfig::default()
            }
        },
        Err(e) => {
            warn!("failed to read {path}: {e}; using defaults");
            SandboxConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_sandbox() {
        let config = SandboxConfig::default();
        assert_eq!(config.sprite_width, 95.0);
        assert_eq!(config.sprite_height, 100.0);
        assert_eq!(config.collision_sample_ms, 100);
        assert_eq!(config.inter_command_ms, 500);
        assert_eq!(config.hero_effect_ms, 3000);
        assert_eq!(config.collision_active_ms, 5000);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: SandboxConfig =
            serde_json::from_str(r#"{ "inter_command_ms": 250 }"#).expect("parse");
        assert_eq!(config.inter_command_ms, 250);
        assert_eq!(config.sprite_width, 95.0);
    }
}
