use crate::entity::{Entity, EntityId, EntityIdAllocator};
use crate::geometry::Rect;

/// Owns every live entity of a scene. Spawns and despawns requested during a
/// frame are queued and only applied by [`EntityWorld::apply_pending`], so
/// systems can request structural changes while iterating.
#[derive(Debug, Default)]
pub struct EntityWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl EntityWorld {
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        entity.id = id;
        self.pending_spawns.push(entity);
        id
    }

    /// Marks `id` for removal at the next frame boundary.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if let Some(entity) = self.entities.iter_mut().find(|entity| entity.id == id) {
            entity.mark_for_deletion();
        } else if let Some(entity) = self.pending_spawns.iter_mut().find(|entity| entity.id == id)
        {
            entity.mark_for_deletion();
        } else {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    /// Applies queued despawns, then queued spawns. Returns the removed ids.
    pub fn apply_pending(&mut self) -> Vec<EntityId> {
        let mut removed = Vec::new();
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_unstable();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.pending_spawns
                .retain(|entity| pending.binary_search(&entity.id).is_err());
            self.entities.retain(|entity| {
                let doomed = pending.binary_search(&entity.id).is_ok();
                if doomed {
                    removed.push(entity.id);
                }
                !doomed
            });
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
        removed
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|entity| entity.id).collect()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Live entity lookup. Entities already marked for deletion are treated as
    /// gone.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.id == id && !entity.is_marked_for_deletion())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|entity| entity.id == id && !entity.is_marked_for_deletion())
    }

    /// Mutable access to two distinct live entities at once.
    pub fn get_pair_mut(
        &mut self,
        first: EntityId,
        second: EntityId,
    ) -> Option<(&mut Entity, &mut Entity)> {
        if first == second {
            return None;
        }
        let first_index = self.index_of_live(first)?;
        let second_index = self.index_of_live(second)?;
        if first_index < second_index {
            let (head, tail) = self.entities.split_at_mut(second_index);
            Some((&mut head[first_index], &mut tail[0]))
        } else {
            let (head, tail) = self.entities.split_at_mut(first_index);
            Some((&mut tail[0], &mut head[second_index]))
        }
    }

    /// Lookup that still sees entities marked for deletion this frame.
    pub(crate) fn get_including_marked_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    fn index_of_live(&self, id: EntityId) -> Option<usize> {
        self.entities
            .iter()
            .position(|entity| entity.id == id && !entity.is_marked_for_deletion())
    }

    /// Collision rects of live static-collision entities, excluding `except`.
    pub fn static_obstacles(&self, except: EntityId) -> Vec<Rect> {
        self.entities
            .iter()
            .filter(|entity| {
                entity.id != except
                    && entity.flags.static_collision
                    && !entity.is_marked_for_deletion()
            })
            .map(Entity::rect)
            .collect()
    }
}
