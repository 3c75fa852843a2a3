use bevy_ecs::prelude::{Changed, Commands, Entity, Query, ResMut};
use tracing::debug;

use crate::ecs::{Client, Status};
use crate::registry::RegistryIndex;
use crate::render::RenderResource;

/// Removes clients that reached `Finished`: drops the marker, the index entry
/// and the entity.
pub fn finished_client_sweep_system(
    mut commands: Commands,
    mut index: ResMut<RegistryIndex>,
    mut render: ResMut<RenderResource>,
    clients: Query<(Entity, &Client, &Status), Changed<Status>>,
) {
    for (entity, client, status) in clients.iter() {
        if *status != Status::Finished {
            continue;
        }
        render.0.remove_client_marker(client.id);
        index.forget_client(client.id);
        commands.entity(entity).despawn();
        debug!(client = %client.id, "finished client removed");
    }
}
