//! Bevy integration: a shared [`PathTypeCache`] kept in sync with block edits.
use bevy::{log, prelude::*};

use crate::cache::PathTypeCache;

/// Registers the shared [`PathTypeCache`] resource and keeps it coherent with
/// [`BlockChanged`] events.
#[derive(Default)]
pub struct MobNavPlugin;

impl Plugin for MobNavPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PathTypeCache>()
            .add_event::<BlockChanged>()
            .add_systems(Update, invalidate_changed_blocks.in_set(MobNavSet));
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MobNavSet;

/// Send whenever the block at `pos` is replaced.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockChanged {
    pub pos: IVec3,
}

fn invalidate_changed_blocks(
    mut events: EventReader<BlockChanged>,
    mut cache: ResMut<PathTypeCache>,
) {
    for event in events.read() {
        log::trace!("Invalidating path type at {}", event.pos);
        cache.invalidate(event.pos);
    }
}
