use bevy::{
    asset::{AssetLoader, AsyncReadExt, LoadContext},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Stance catalogue and level list, loaded from a RON file
#[derive(Asset, Resource, TypePath, Clone, Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seconds a stance (or a drill without its own limit) stays live
    pub stance_timeout: f32,
    /// Every trigger box in the arena
    pub volumes: Vec<VolumeConfig>,
    /// Named stances and their drills
    pub stances: Vec<StanceConfig>,
    /// Levels in play order
    #[serde(default)]
    pub levels: Vec<LevelConfig>,
}

/// One trigger box, placed relative to the player's chest
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    /// Set for stance boxes; checkpoints of drills leave it empty
    #[serde(default)]
    pub stance: Option<String>,
    pub center: [f32; 3],
    #[serde(default = "VolumeConfig::default_size")]
    pub size: [f32; 3],
}

impl VolumeConfig {
    fn default_size() -> [f32; 3] {
        [0.2, 0.2, 0.2]
    }

    pub fn stance_box(name: &str, stance: &str, center: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            stance: Some(stance.to_string()),
            center,
            size: Self::default_size(),
        }
    }

    pub fn checkpoint(name: &str, center: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            stance: None,
            center,
            size: Self::default_size(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StanceConfig {
    pub name: String,
    #[serde(default)]
    pub sequences: Vec<SequenceConfig>,
}

/// Drill definition by volume name: (left, right) pairs and the strike list
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub name: String,
    pub start: (String, String),
    pub body: Vec<String>,
    pub end: (String, String),
    #[serde(default)]
    pub time_limit: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub kind: LevelKind,
    /// Enter stances directly and retry drills until they are clean
    #[serde(default)]
    pub practice: bool,
    pub objectives: Vec<ObjectiveConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LevelKind {
    Standard,
    Tutorial,
    Spar {
        rounds: u32,
        #[serde(default)]
        seed: Option<u64>,
    },
}

/// "Enter this stance, then perform this drill"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveConfig {
    pub stance: String,
    pub sequence: String,
    #[serde(default)]
    pub hint: Option<String>,
}

impl TrainingConfig {
    /// Path to the training configuration file
    pub const PATH: &'static str = "config/training.ron";
}

impl Default for TrainingConfig {
    /// Two stances with one drill each, enough to play without the RON file.
    fn default() -> Self {
        let strikes = |prefix: &str, count: usize| -> Vec<String> {
            (1..=count).map(|i| format!("{prefix}_{i}")).collect()
        };

        let mut volumes = vec![
            VolumeConfig::stance_box("ready_left", "Ready", [-0.25, -0.1, -0.35]),
            VolumeConfig::stance_box("ready_right", "Ready", [0.25, -0.1, -0.35]),
            VolumeConfig::stance_box("guard_left", "Guard", [-0.2, 0.35, -0.3]),
            VolumeConfig::stance_box("guard_right", "Guard", [0.2, 0.35, -0.3]),
            VolumeConfig::checkpoint("abaniko_start_left", [-0.35, 0.2, -0.4]),
            VolumeConfig::checkpoint("abaniko_start_right", [0.35, 0.2, -0.4]),
            VolumeConfig::checkpoint("abaniko_end_left", [-0.3, -0.3, -0.4]),
            VolumeConfig::checkpoint("abaniko_end_right", [0.3, -0.3, -0.4]),
            VolumeConfig::checkpoint("redonda_start_left", [-0.4, 0.45, -0.3]),
            VolumeConfig::checkpoint("redonda_start_right", [0.4, 0.45, -0.3]),
            VolumeConfig::checkpoint("redonda_end_left", [-0.4, 0.0, -0.3]),
            VolumeConfig::checkpoint("redonda_end_right", [0.4, 0.0, -0.3]),
        ];
        for (i, name) in strikes("strike", 5).into_iter().enumerate() {
            let x = -0.4 + 0.2 * i as f32;
            volumes.push(VolumeConfig::checkpoint(&name, [x, 0.25, -0.6]));
        }

        Self {
            stance_timeout: 10.0,
            volumes,
            stances: vec![
                StanceConfig {
                    name: "Ready".into(),
                    sequences: vec![SequenceConfig {
                        name: "Abaniko".into(),
                        start: ("abaniko_start_left".into(), "abaniko_start_right".into()),
                        body: strikes("strike", 5),
                        end: ("abaniko_end_left".into(), "abaniko_end_right".into()),
                        time_limit: Some(8.0),
                    }],
                },
                StanceConfig {
                    name: "Guard".into(),
                    sequences: vec![SequenceConfig {
                        name: "Redonda".into(),
                        start: ("redonda_start_left".into(), "redonda_start_right".into()),
                        body: vec!["strike_1".into(), "strike_3".into(), "strike_5".into()],
                        end: ("redonda_end_left".into(), "redonda_end_right".into()),
                        time_limit: None,
                    }],
                },
            ],
            levels: vec![
                LevelConfig {
                    name: "Basics".into(),
                    kind: LevelKind::Tutorial,
                    practice: false,
                    objectives: vec![ObjectiveConfig {
                        stance: "Ready".into(),
                        sequence: "Abaniko".into(),
                        hint: Some("Hold both batons low in front of you".into()),
                    }],
                },
                LevelConfig {
                    name: "Drills".into(),
                    kind: LevelKind::Standard,
                    practice: false,
                    objectives: vec![
                        ObjectiveConfig {
                            stance: "Ready".into(),
                            sequence: "Abaniko".into(),
                            hint: None,
                        },
                        ObjectiveConfig {
                            stance: "Guard".into(),
                            sequence: "Redonda".into(),
                            hint: None,
                        },
                    ],
                },
            ],
        }
    }
}

/// Asset loader for TrainingConfig RON files
#[derive(Default)]
pub struct TrainingConfigLoader;

impl AssetLoader for TrainingConfigLoader {
    type Asset = TrainingConfig;
    type Settings = ();
    type Error = anyhow::Error;

    async fn load(
        &self,
        reader: &mut dyn bevy::asset::io::Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let config: TrainingConfig = ron::de::from_bytes(&bytes)?;
        Ok(config)
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}

/// Keeps the config file alive until it has been turned into a `TrainingConfig` resource
#[derive(Resource, Asset, Reflect, Clone)]
pub struct TrainingConfigHandle {
    #[dependency]
    pub config: Handle<TrainingConfig>,
}

impl FromWorld for TrainingConfigHandle {
    fn from_world(world: &mut World) -> Self {
        let assets = world.resource::<AssetServer>();
        Self {
            config: assets.load(TrainingConfig::PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_ron() {
        let source = r#"(
            stance_timeout: 4.0,
            volumes: [
                (name: "a", stance: Some("Ready"), center: (0.0, 0.0, 0.0)),
                (name: "b", center: (0.1, 0.0, 0.0), size: (0.3, 0.3, 0.3)),
            ],
            stances: [
                (name: "Ready", sequences: [
                    (name: "Cut", start: ("b", "b"), body: [], end: ("b", "b")),
                ]),
            ],
            levels: [
                (name: "Spar", kind: Spar(rounds: 3), objectives: [
                    (stance: "Ready", sequence: "Cut"),
                ]),
            ],
        )"#;

        let config: TrainingConfig = ron::de::from_str(source).unwrap();
        assert_eq!(config.stance_timeout, 4.0);
        assert_eq!(config.volumes[0].size, [0.2, 0.2, 0.2]);
        assert_eq!(config.volumes[1].stance, None);
        assert_eq!(config.stances[0].sequences[0].time_limit, None);
        assert_eq!(config.levels[0].kind, LevelKind::Spar { rounds: 3, seed: None });
        assert!(!config.levels[0].practice);
    }

    #[test]
    fn test_bundled_config_is_clean() {
        let source = include_str!("../../../assets/config/training.ron");
        let config: TrainingConfig = ron::de::from_str(source).unwrap();
        let catalog = crate::game::stance::StanceCatalog::from_config(&config).unwrap();
        assert!(catalog.issues.is_empty(), "{:?}", catalog.issues);
        assert_eq!(config.levels.len(), 4);
    }

    #[test]
    fn test_default_levels_reference_known_stances() {
        let config = TrainingConfig::default();
        for level in &config.levels {
            for objective in &level.objectives {
                assert!(config.stances.iter().any(|s| s.name == objective.stance));
            }
        }
    }
}
