//! Escrima stance training: trigger volumes, the stance machine and the
//! levels built on top of it.

pub mod accuracy;
pub mod arena;
pub mod configs;
pub mod hands;
pub mod hud;
pub mod level;
pub mod stance;

use bevy::prelude::*;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        configs::plugin,
        stance::plugin,
        hands::plugin,
        arena::plugin,
        level::plugin,
        accuracy::plugin,
        hud::plugin,
    ));
}
