pub mod assets;

use bevy::prelude::*;

use crate::asset_tracking::LoadResource;

pub use assets::{
    LevelConfig, LevelKind, ObjectiveConfig, SequenceConfig, StanceConfig, TrainingConfig,
    TrainingConfigHandle, TrainingConfigLoader, VolumeConfig,
};

pub(super) fn plugin(app: &mut App) {
    // Register the asset loader for RON config files
    app.init_asset::<TrainingConfig>();
    app.init_asset_loader::<TrainingConfigLoader>();

    // Load the stance catalogue and level list
    app.load_resource::<TrainingConfigHandle>();
    app.add_systems(
        Update,
        insert_training_config.run_if(resource_added::<TrainingConfigHandle>),
    );
}

/// Copies the loaded config out of `Assets` so gameplay can read it as a resource.
/// Falls back to the built-in catalogue if the file failed to load.
fn insert_training_config(
    mut commands: Commands,
    handle: Res<TrainingConfigHandle>,
    configs: Res<Assets<TrainingConfig>>,
) {
    match configs.get(&handle.config) {
        Some(config) => {
            info!(
                "Loaded training config: {} volumes, {} stances, {} levels",
                config.volumes.len(),
                config.stances.len(),
                config.levels.len()
            );
            commands.insert_resource(config.clone());
        }
        None => {
            warn!(
                "{} could not be loaded, using the built-in catalogue",
                TrainingConfig::PATH
            );
            commands.insert_resource(TrainingConfig::default());
        }
    }
}
