//! Resolves the name-based training config into ids the state machine can use.

use std::collections::HashMap;

use anyhow::bail;
use bevy::prelude::*;

use super::{
    detector::{VolumeId, VolumeRegistry, VolumeRole},
    sequence::{AttackSequence, VolumePair},
};
use crate::game::configs::{LevelConfig, ObjectiveConfig, SequenceConfig, TrainingConfig};

/// A named stance and the drills reachable from it.
#[derive(Debug, Clone)]
pub struct StanceDefinition {
    pub name: String,
    pub sequences: Vec<AttackSequence>,
}

/// Immutable catalogue for one session.
#[derive(Debug, Clone)]
pub struct StanceCatalog {
    pub registry: VolumeRegistry,
    pub stances: Vec<StanceDefinition>,
    pub stance_timeout: f32,
    /// Problems found while resolving. None of them stop the session.
    pub issues: Vec<String>,
    index: HashMap<String, usize>,
}

impl StanceCatalog {
    /// Builds the catalogue. Dangling volume names drop the sequence that uses
    /// them; a config without any stance is rejected.
    pub fn from_config(config: &TrainingConfig) -> anyhow::Result<Self> {
        if config.stances.is_empty() {
            bail!("training config defines no stances");
        }
        if config.stance_timeout <= 0.0 {
            bail!("stance timeout must be positive, got {}", config.stance_timeout);
        }

        let mut issues = Vec::new();
        let mut registry = VolumeRegistry::new();
        for volume in &config.volumes {
            let role = match &volume.stance {
                Some(stance) => VolumeRole::Stance(stance.clone()),
                None => VolumeRole::Sequence,
            };
            registry.register(volume.name.clone(), role);
        }

        let mut stances = Vec::new();
        let mut index = HashMap::new();
        for stance in &config.stances {
            if index.contains_key(&stance.name) {
                issues.push(format!("stance '{}' is defined twice, keeping the first", stance.name));
                continue;
            }
            if registry.stance_volumes(&stance.name).is_empty() {
                issues.push(format!(
                    "stance '{}' has no boxes and can only be entered directly",
                    stance.name
                ));
            }

            let mut sequences = Vec::new();
            for sequence in &stance.sequences {
                match resolve_sequence(&registry, sequence) {
                    Ok(resolved) => sequences.push(resolved),
                    Err(error) => issues.push(format!(
                        "stance '{}': dropping sequence '{}': {error}",
                        stance.name, sequence.name
                    )),
                }
            }
            if sequences.is_empty() {
                issues.push(format!(
                    "stance '{}' has no usable sequences and will never auto-advance",
                    stance.name
                ));
            }

            index.insert(stance.name.clone(), stances.len());
            stances.push(StanceDefinition {
                name: stance.name.clone(),
                sequences,
            });
        }

        for volume in &config.volumes {
            if let Some(stance) = &volume.stance {
                if !index.contains_key(stance) {
                    issues.push(format!(
                        "volume '{}' belongs to unknown stance '{stance}'",
                        volume.name
                    ));
                }
            }
        }

        let mut catalog = Self {
            registry,
            stances,
            stance_timeout: config.stance_timeout,
            issues,
            index,
        };
        for level in &config.levels {
            for objective in &level.objectives {
                if let Err(error) = catalog.check_objective(objective) {
                    catalog.issues.push(format!(
                        "level '{}': dropping objective {} / {}: {error}",
                        level.name, objective.stance, objective.sequence
                    ));
                }
            }
        }

        for issue in &catalog.issues {
            warn!("Training config: {issue}");
        }
        Ok(catalog)
    }

    /// An objective is playable when its stance exists and offers the drill.
    pub fn check_objective(&self, objective: &ObjectiveConfig) -> anyhow::Result<()> {
        let Some(stance) = self.stance(&objective.stance) else {
            bail!("unknown stance '{}'", objective.stance);
        };
        if !stance.sequences.iter().any(|s| s.name == objective.sequence) {
            bail!(
                "stance '{}' has no sequence '{}'",
                objective.stance,
                objective.sequence
            );
        }
        Ok(())
    }

    /// Levels with every unplayable objective removed.
    pub fn playable_levels(&self, levels: &[LevelConfig]) -> Vec<LevelConfig> {
        levels
            .iter()
            .cloned()
            .map(|mut level| {
                level
                    .objectives
                    .retain(|objective| self.check_objective(objective).is_ok());
                level
            })
            .collect()
    }

    pub fn stance(&self, name: &str) -> Option<&StanceDefinition> {
        self.index.get(name).map(|i| &self.stances[*i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

fn resolve_sequence(
    registry: &VolumeRegistry,
    config: &SequenceConfig,
) -> anyhow::Result<AttackSequence> {
    let lookup = |name: &str| -> anyhow::Result<VolumeId> {
        match registry.id(name) {
            Some(id) => Ok(id),
            None => bail!("unknown volume '{name}'"),
        }
    };

    let start_pair = VolumePair::new(lookup(&config.start.0)?, lookup(&config.start.1)?);
    let end_pair = VolumePair::new(lookup(&config.end.0)?, lookup(&config.end.1)?);
    let body = config
        .body
        .iter()
        .map(|name| lookup(name))
        .collect::<anyhow::Result<Vec<_>>>()?;
    for (i, id) in body.iter().enumerate() {
        if body[..i].contains(id) {
            bail!("volume '{}' appears twice in the body", config.body[i]);
        }
    }

    let time_limit = config.time_limit.filter(|limit| *limit > 0.0);

    Ok(AttackSequence {
        name: config.name.clone(),
        start_pair,
        body,
        end_pair,
        time_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::configs::{StanceConfig, VolumeConfig};

    #[test]
    fn test_default_config_resolves_cleanly() {
        let catalog = StanceCatalog::from_config(&TrainingConfig::default()).unwrap();
        assert!(catalog.issues.is_empty(), "{:?}", catalog.issues);
        assert!(catalog.contains("Ready"));
        assert!(!catalog.stance("Ready").unwrap().sequences.is_empty());
    }

    #[test]
    fn test_dangling_volume_drops_sequence() {
        let mut config = TrainingConfig::default();
        config.stances[0].sequences[0].body.push("nowhere".into());
        let dropped = config.stances[0].sequences[0].name.clone();

        let catalog = StanceCatalog::from_config(&config).unwrap();
        let stance = catalog.stance(&config.stances[0].name).unwrap();
        assert!(stance.sequences.iter().all(|s| s.name != dropped));
        assert!(catalog.issues.iter().any(|issue| issue.contains("nowhere")));
    }

    #[test]
    fn test_stance_without_sequences_is_a_warning() {
        let config = TrainingConfig {
            stance_timeout: 5.0,
            volumes: vec![VolumeConfig::stance_box("a", "Solo", [0.0; 3])],
            stances: vec![StanceConfig {
                name: "Solo".into(),
                sequences: vec![],
            }],
            levels: vec![],
        };

        let catalog = StanceCatalog::from_config(&config).unwrap();
        assert!(catalog.stance("Solo").unwrap().sequences.is_empty());
        assert_eq!(catalog.issues.len(), 1);
    }

    #[test]
    fn test_unknown_objectives_are_reported_and_dropped() {
        let mut config = TrainingConfig::default();
        let level = &mut config.levels[1];
        level.objectives.push(ObjectiveConfig {
            stance: "Ghost".into(),
            sequence: "Abaniko".into(),
            hint: None,
        });
        level.objectives.push(ObjectiveConfig {
            stance: "Ready".into(),
            sequence: "Redonda".into(),
            hint: None,
        });
        let kept = level.objectives.len() - 2;

        let catalog = StanceCatalog::from_config(&config).unwrap();
        assert_eq!(catalog.issues.len(), 2, "{:?}", catalog.issues);
        assert!(catalog.issues[0].contains("Ghost"));

        let levels = catalog.playable_levels(&config.levels);
        assert_eq!(levels[1].objectives.len(), kept);
        assert_eq!(levels[0].objectives, config.levels[0].objectives);
    }

    #[test]
    fn test_repeated_body_volume_drops_sequence() {
        let mut config = TrainingConfig::default();
        config.stances[0].sequences[0].body.push("strike_1".into());

        let catalog = StanceCatalog::from_config(&config).unwrap();
        assert!(catalog.stance("Ready").unwrap().sequences.is_empty());
        assert!(catalog.issues.iter().any(|issue| issue.contains("appears twice")));
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let config = TrainingConfig {
            stance_timeout: 5.0,
            volumes: vec![],
            stances: vec![],
            levels: vec![],
        };
        assert!(StanceCatalog::from_config(&config).is_err());
    }
}
