use std::{
    collections::{HashMap, HashSet},
    f32::consts::FRAC_PI_2,
};

use rand::Rng;
use uuid::Uuid;

use crate::{error::EntityError, lerp::LerpComp, world::Vec3f};

pub type EntityId = Uuid;

pub fn new_entity_id() -> EntityId {
    Uuid::from_u128(rand::thread_rng().gen())
}

/// Bounding box of a standing player.
pub const PLAYER_AABB: Vec3f = Vec3f::new(0.6, 1.8, 0.6);

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsComp {
    aabb: Vec3f,
    pub velocity: Vec3f,
    pub no_gravity: bool,
    on_ground: bool,
}

impl PhysicsComp {
    pub fn new(aabb: Vec3f) -> Result<PhysicsComp, EntityError> {
        if !(aabb.x > 0.0 && aabb.y > 0.0 && aabb.z > 0.0) {
            return Err(EntityError::InvalidBoundingBox([aabb.x, aabb.y, aabb.z]));
        }
        Ok(PhysicsComp {
            aabb,
            velocity: Vec3f::ZERO,
            no_gravity: false,
            on_ground: false,
        })
    }

    pub fn aabb(&self) -> Vec3f {
        self.aabb
    }

    /// Recomputed by every physics frame.
    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub(crate) fn set_on_ground(&mut self, on_ground: bool) {
        self.on_ground = on_ground;
    }
}

// Keeps elevation off the poles.
const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LookComp {
    pub yaw: f32,
    pub azimuth: f32,
    elevation: f32,
}

impl LookComp {
    pub fn new(yaw: f32, azimuth: f32, elevation: f32) -> LookComp {
        let mut look = LookComp {
            yaw,
            azimuth,
            elevation: 0.0,
        };
        look.set_elevation(elevation);
        look
    }

    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn set_elevation(&mut self, elevation: f32) {
        self.elevation = elevation.clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.azimuth.is_finite() && self.elevation.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Position,
    Physics,
    Look,
    Lerp,
}

/// Describes a new entity. Any combination of components is allowed.
#[derive(Debug, Clone, Default)]
pub struct EntityBuilder {
    id: Option<EntityId>,
    kind: String,
    position: Option<Vec3f>,
    physics: Option<PhysicsComp>,
    look: Option<LookComp>,
    lerp: bool,
}

impl EntityBuilder {
    pub fn new(kind: &str) -> EntityBuilder {
        EntityBuilder {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn position(mut self, position: Vec3f) -> Self {
        self.position = Some(position);
        self
    }

    pub fn physics(mut self, physics: PhysicsComp) -> Self {
        self.physics = Some(physics);
        self
    }

    pub fn look(mut self, look: LookComp) -> Self {
        self.look = Some(look);
        self
    }

    /// Remote entities get their position from periodic updates.
    pub fn lerp(mut self) -> Self {
        self.lerp = true;
        self
    }
}

/// Component storage. Each component lives in its own map so systems can
/// borrow different components mutably at the same time.
#[derive(Debug, Default)]
pub struct Entities {
    kinds: HashMap<EntityId, String>,
    pub positions: HashMap<EntityId, Vec3f>,
    pub physics: HashMap<EntityId, PhysicsComp>,
    pub looks: HashMap<EntityId, LookComp>,
    pub lerps: HashMap<EntityId, LerpComp>,
}

impl Entities {
    pub fn new() -> Entities {
        Default::default()
    }

    pub fn spawn(&mut self, builder: EntityBuilder) -> EntityId {
        let id = builder.id.unwrap_or_else(new_entity_id);
        self.kinds.insert(id, builder.kind);
        if let Some(position) = builder.position {
            self.positions.insert(id, position);
            if builder.lerp {
                self.lerps.insert(id, LerpComp::new(position));
            }
        }
        if let Some(physics) = builder.physics {
            self.physics.insert(id, physics);
        }
        if let Some(look) = builder.look {
            self.looks.insert(id, look);
        }
        id
    }

    /// Drops the entity from every component map, including lerp state.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        self.positions.remove(id);
        self.physics.remove(id);
        self.looks.remove(id);
        self.lerps.remove(id);
        self.kinds.remove(id).is_some()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.kinds.contains_key(id)
    }

    pub fn kind(&self, id: &EntityId) -> Option<&str> {
        self.kinds.get(id).map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn has(&self, id: &EntityId, component: Component) -> bool {
        match component {
            Component::Position => self.positions.contains_key(id),
            Component::Physics => self.physics.contains_key(id),
            Component::Look => self.looks.contains_key(id),
            Component::Lerp => self.lerps.contains_key(id),
        }
    }

    /// All entities owning every component in `required`, in a stable order.
    pub fn query(&self, required: &[Component]) -> Vec<EntityId> {
        let required: HashSet<Component> = required.iter().copied().collect();
        let mut ids: Vec<EntityId> = self
            .kinds
            .keys()
            .filter(|id| required.iter().all(|c| self.has(id, *c)))
            .copied()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_aabb() {
        assert!(PhysicsComp::new(Vec3f::new(0.6, 0.0, 0.6)).is_err());
        assert!(PhysicsComp::new(Vec3f::new(-1.0, 1.0, 1.0)).is_err());
        assert!(PhysicsComp::new(Vec3f::new(f32::NAN, 1.0, 1.0)).is_err());
        assert!(PhysicsComp::new(PLAYER_AABB).is_ok());
    }

    #[test]
    fn elevation_is_clamped() {
        let mut look = LookComp::new(0.0, 1.0, 10.0);
        assert!(look.elevation() < FRAC_PI_2);
        look.set_elevation(-10.0);
        assert!(look.elevation() > -FRAC_PI_2);
        look.set_elevation(0.5);
        assert_eq!(look.elevation(), 0.5);
    }

    #[test]
    fn query_by_components() {
        let mut entities = Entities::new();
        let player = entities.spawn(
            EntityBuilder::new("mc:local_player")
                .position(Vec3f::new(0.0, 70.0, 0.0))
                .physics(PhysicsComp::new(PLAYER_AABB).unwrap())
                .look(LookComp::default()),
        );
        let remote = entities.spawn(
            EntityBuilder::new("mc:remote_player")
                .position(Vec3f::new(5.0, 70.0, 5.0))
                .look(LookComp::default())
                .lerp(),
        );
        let furnace = entities.spawn(
            EntityBuilder::new("mc:furnace").position(Vec3f::new(1.0, 64.0, 1.0)),
        );

        assert_eq!(
            entities.query(&[Component::Position, Component::Physics]),
            vec![player]
        );
        assert_eq!(
            entities.query(&[Component::Position, Component::Lerp]),
            vec![remote]
        );
        let mut positioned = vec![player, remote, furnace];
        positioned.sort();
        assert_eq!(entities.query(&[Component::Position]), positioned);
        assert_eq!(entities.kind(&furnace), Some("mc:furnace"));
    }

    #[test]
    fn remove_drops_lerp_state() {
        let mut entities = Entities::new();
        let id = entities.spawn(
            EntityBuilder::new("mc:remote_player")
                .position(Vec3f::ZERO)
                .lerp(),
        );
        assert!(entities.has(&id, Component::Lerp));

        assert!(entities.remove(&id));
        assert!(!entities.contains(&id));
        assert!(entities.lerps.is_empty());
        assert!(entities.query(&[Component::Lerp]).is_empty());
        assert!(!entities.remove(&id));
    }
}
