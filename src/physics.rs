use crate::{
    entity::{Component, Entities, PhysicsComp},
    world::{ceil_f32, is_solid, ChunkMap, Dimension, IntVec3, Vec3f},
};

/// Downward acceleration in m/s² (0.08 blocks per tick²).
pub const GRAVITY: f32 = 32.0;
pub const TICKS_PER_SECOND: f32 = 20.0;
/// Vertical velocity multiplier applied every tick.
pub const DRAG: f32 = 0.98;
pub const MAX_COLLISIONS_PER_FRAME: u32 = 16;
/// On the first check of a frame, a Y penetration newer than this (seconds)
/// is resolved before any other axis.
const FIRST_CHECK_Y_WINDOW: f32 = -0.03;

const AXIS_X: usize = 0;
const AXIS_Y: usize = 1;
const AXIS_Z: usize = 2;

/// Fixed 20 Hz step: gravity and vertical drag.
pub fn tick_system(entities: &mut Entities) {
    for id in entities.query(&[Component::Position, Component::Physics]) {
        if let Some(body) = entities.physics.get_mut(&id) {
            apply_gravity(body);
        }
    }
}

pub fn apply_gravity(body: &mut PhysicsComp) {
    if !body.no_gravity {
        body.velocity.y -= GRAVITY / TICKS_PER_SECOND;
        body.velocity.y *= DRAG;
    }
}

/// Per-frame step: integrate velocity and resolve collisions for every
/// entity with a position and a physical body.
pub fn frame_system(dim: &mut Dimension, delta: f32) {
    let Dimension { chunks, entities } = dim;
    for id in entities.query(&[Component::Position, Component::Physics]) {
        if let (Some(pos), Some(body)) = (entities.positions.get_mut(&id), entities.physics.get_mut(&id)) {
            step_body(chunks, pos, body, delta);
        }
    }
}

/// Moves one body by `velocity * delta` and pushes it out of solid voxels,
/// one axis at a time.
pub fn step_body(chunks: &ChunkMap, pos: &mut Vec3f, body: &mut PhysicsComp, delta: f32) {
    *pos = *pos + body.velocity * delta;

    let aabb = body.aabb();
    let mut landed = false;
    let mut first_check = true;

    for _ in 0..MAX_COLLISIONS_PER_FRAME {
        let block = match first_intersecting(chunks, *pos, aabb) {
            Some(block) => block,
            None => break,
        };
        let block = block.to_float();

        let penetrations = [
            penetration(block.x, pos.x, aabb.x, body.velocity.x),
            penetration(block.y, pos.y, aabb.y, body.velocity.y),
            penetration(block.z, pos.z, aabb.z, body.velocity.z),
        ];

        let axis = if first_check && matches!(penetrations[AXIS_Y], Some(p) if p.time > FIRST_CHECK_Y_WINDOW) {
            Some(AXIS_Y)
        } else {
            latest_axis(&penetrations)
        };
        first_check = false;

        let axis = match axis {
            Some(axis) => axis,
            // Already embedded with no motion to undo
            None => break,
        };

        if let Some(p) = penetrations[axis] {
            if axis == AXIS_Y {
                landed = true;
            }
            *pos.axis_mut(axis) = p.resolved;
            *body.velocity.axis_mut(axis) = 0.0;
        }
    }

    if landed {
        body.set_on_ground(true);
    } else if body.velocity.y != 0.0 {
        body.set_on_ground(false);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Penetration {
    /// How long ago the body started penetrating along this axis. Always negative.
    time: f32,
    /// Axis position placing the body flush against the penetrated face.
    resolved: f32,
}

fn penetration(block: f32, pos: f32, size: f32, velocity: f32) -> Option<Penetration> {
    if velocity == 0.0 {
        return None;
    }

    let d0 = block + 1.0 - pos;
    let d1 = pos + size - block;
    if d0 <= 0.0 || d1 <= 0.0 {
        return None;
    }

    let p = if d0 < d1 {
        Penetration {
            time: d0 / velocity,
            resolved: block + 1.0,
        }
    } else {
        Penetration {
            time: -d1 / velocity,
            resolved: block - size,
        }
    };

    if p.time >= 0.0 {
        None
    } else {
        Some(p)
    }
}

/// Axis with the most recent penetration. Ties go to Y, then X, then Z.
fn latest_axis(penetrations: &[Option<Penetration>; 3]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for axis in [AXIS_Y, AXIS_X, AXIS_Z] {
        if let Some(p) = penetrations[axis] {
            match best {
                Some((_, time)) if time >= p.time => {}
                _ => best = Some((axis, p.time)),
            }
        }
    }
    best.map(|(axis, _)| axis)
}

/// First solid voxel overlapping the box at `pos` with extent `aabb`,
/// scanning x, then y, then z.
pub fn first_intersecting(chunks: &ChunkMap, pos: Vec3f, aabb: Vec3f) -> Option<IntVec3> {
    let min = IntVec3::from_float(pos);
    let max = IntVec3::new(
        ceil_f32(pos.x + aabb.x),
        ceil_f32(pos.y + aabb.y),
        ceil_f32(pos.z + aabb.z),
    );

    let mut guess = chunks.get_chunk_containing(min);
    for x in min.x..max.x {
        for y in min.y..max.y {
            for z in min.z..max.z {
                let block = IntVec3::new(x, y, z);
                if guess.map_or(true, |c| !c.contains(block)) {
                    guess = chunks.get_chunk_containing(block);
                }
                if is_solid(chunks.get_block_at_optimized(block, guess)) {
                    return Some(block);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::{EntityBuilder, PLAYER_AABB},
        world::Chunk,
    };

    fn floor_dimension() -> Dimension {
        let mut dim = Dimension::new();
        let mut chunk = Chunk::new(IntVec3::ZERO);
        for x in 0..16 {
            for z in 0..16 {
                chunk.set_block(IntVec3::new(x, 0, z), "mc:stone");
            }
        }
        dim.insert_chunk(chunk);
        dim
    }

    fn spawn_body(dim: &mut Dimension, pos: Vec3f, velocity: Vec3f) -> crate::entity::EntityId {
        let mut body = PhysicsComp::new(PLAYER_AABB).unwrap();
        body.velocity = velocity;
        dim.entities
            .spawn(EntityBuilder::new("mc:test").position(pos).physics(body))
    }

    #[test]
    fn gravity_tick_applies_drag() {
        let mut body = PhysicsComp::new(PLAYER_AABB).unwrap();
        apply_gravity(&mut body);
        assert!((body.velocity.y - (-1.6 * 0.98)).abs() < 1e-5);

        let mut floating = PhysicsComp::new(PLAYER_AABB).unwrap();
        floating.no_gravity = true;
        apply_gravity(&mut floating);
        assert_eq!(floating.velocity.y, 0.0);
    }

    #[test]
    fn terminal_velocity_is_reached() {
        let mut body = PhysicsComp::new(PLAYER_AABB).unwrap();
        for _ in 0..2000 {
            apply_gravity(&mut body);
        }
        let terminal = body.velocity.y;
        apply_gravity(&mut body);
        assert!((body.velocity.y - terminal).abs() < 1e-3);
        assert!(terminal < -70.0 && terminal > -80.0);
    }

    #[test]
    fn falling_body_lands_on_layer() {
        let mut dim = floor_dimension();
        let id = spawn_body(&mut dim, Vec3f::new(4.2, 1.1, 4.2), Vec3f::new(0.0, -4.0, 0.0));

        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        let body = &dim.entities.physics[&id];
        assert!((pos.y - 1.0).abs() < 1e-5, "y = {}", pos.y);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.on_ground());
    }

    #[test]
    fn resting_body_stays_grounded_across_ticks() {
        let mut dim = floor_dimension();
        let id = spawn_body(&mut dim, Vec3f::new(4.2, 3.0, 4.2), Vec3f::ZERO);

        for _ in 0..100 {
            tick_system(&mut dim.entities);
            for _ in 0..3 {
                frame_system(&mut dim, 1.0 / 60.0);
            }
        }

        let pos = dim.entities.positions[&id];
        assert!((pos.y - 1.0).abs() < 1e-5, "y = {}", pos.y);
        assert!(dim.entities.physics[&id].on_ground());
    }

    #[test]
    fn jumping_body_leaves_ground() {
        let mut dim = floor_dimension();
        let id = spawn_body(&mut dim, Vec3f::new(4.2, 1.0, 4.2), Vec3f::new(0.0, -1.0, 0.0));
        frame_system(&mut dim, 0.01);
        assert!(dim.entities.physics[&id].on_ground());

        dim.entities.physics.get_mut(&id).unwrap().velocity.y = 8.4;
        frame_system(&mut dim, 0.01);
        assert!(!dim.entities.physics[&id].on_ground());
        assert!(dim.entities.positions[&id].y > 1.0);
    }

    #[test]
    fn walking_into_wall_stops_horizontal_motion() {
        let mut dim = floor_dimension();
        dim.set_block_at(IntVec3::new(6, 1, 4), "mc:stone");
        dim.set_block_at(IntVec3::new(6, 2, 4), "mc:stone");

        let id = spawn_body(&mut dim, Vec3f::new(5.3, 1.0, 4.2), Vec3f::new(4.0, 0.0, 0.0));
        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        let body = &dim.entities.physics[&id];
        assert!((pos.x - 5.4).abs() < 1e-5, "x = {}", pos.x);
        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(pos.y, 1.0);
    }

    #[test]
    fn stuck_body_is_left_in_place() {
        let mut dim = floor_dimension();
        dim.set_block_at(IntVec3::new(4, 1, 4), "mc:stone");
        dim.set_block_at(IntVec3::new(4, 2, 4), "mc:stone");

        let id = spawn_body(&mut dim, Vec3f::new(4.2, 1.0, 4.2), Vec3f::ZERO);
        dim.entities.physics.get_mut(&id).unwrap().no_gravity = true;
        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        assert_eq!(pos, Vec3f::new(4.2, 1.0, 4.2));
        assert!(pos.y.is_finite());
    }

    #[test]
    fn fast_fall_never_loops_forever() {
        let mut dim = floor_dimension();
        let id = spawn_body(&mut dim, Vec3f::new(4.2, 2.5, 4.2), Vec3f::new(3.0, -40.0, 3.0));
        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        assert!(pos.x.is_finite() && pos.y.is_finite() && pos.z.is_finite());
        assert!((pos.y - 1.0).abs() < 1e-5, "y = {}", pos.y);
    }

    #[test]
    fn unloaded_terrain_is_empty_space() {
        let mut dim = Dimension::new();
        let id = spawn_body(&mut dim, Vec3f::new(0.0, 10.0, 0.0), Vec3f::new(0.0, -5.0, 0.0));
        frame_system(&mut dim, 0.1);
        assert!((dim.entities.positions[&id].y - 9.5).abs() < 1e-5);
        assert!(!dim.entities.physics[&id].on_ground());
    }

    #[test]
    fn ceiling_bump_counts_as_vertical_contact() {
        let mut dim = floor_dimension();
        for x in 0..16 {
            for z in 0..16 {
                dim.set_block_at(IntVec3::new(x, 5, z), "mc:stone");
            }
        }
        let id = spawn_body(&mut dim, Vec3f::new(4.2, 3.1, 4.2), Vec3f::new(0.0, 8.0, 0.0));
        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        let body = &dim.entities.physics[&id];
        assert!((pos.y - 3.2).abs() < 1e-5, "y = {}", pos.y);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.on_ground());
    }

    #[test]
    fn recent_vertical_contact_wins_first_check() {
        // X penetrated at -0.01 s, Y at -0.02 s: Y is inside the first-check window
        let mut dim = Dimension::new();
        dim.insert_chunk(Chunk::new(IntVec3::ZERO));
        dim.set_block_at(IntVec3::new(5, 0, 4), "mc:stone");
        let id = spawn_body(&mut dim, Vec3f::new(4.0, 1.3, 4.2), Vec3f::new(10.0, -10.0, 0.0));
        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        let body = &dim.entities.physics[&id];
        assert!((pos.y - 1.0).abs() < 1e-5, "y = {}", pos.y);
        assert!((pos.x - 4.5).abs() < 1e-5, "x = {}", pos.x);
        assert_eq!(body.velocity.x, 10.0);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.on_ground());
    }

    #[test]
    fn older_vertical_contact_yields_to_latest_axis() {
        // same corner, but Y penetrated at -0.04 s so X resolves first
        let mut dim = Dimension::new();
        dim.insert_chunk(Chunk::new(IntVec3::ZERO));
        dim.set_block_at(IntVec3::new(5, 0, 4), "mc:stone");
        let id = spawn_body(&mut dim, Vec3f::new(4.0, 1.05, 4.2), Vec3f::new(10.0, -5.0, 0.0));
        frame_system(&mut dim, 0.05);

        let pos = dim.entities.positions[&id];
        let body = &dim.entities.physics[&id];
        assert!((pos.x - 4.4).abs() < 1e-5, "x = {}", pos.x);
        assert!((pos.y - 0.8).abs() < 1e-5, "y = {}", pos.y);
        assert_eq!(body.velocity.x, 0.0);
        assert!(!body.on_ground());
    }

    #[test]
    fn tie_prefers_vertical_axis() {
        let p = Some(Penetration {
            time: -0.1,
            resolved: 0.0,
        });
        assert_eq!(latest_axis(&[p, p, p]), Some(AXIS_Y));
        assert_eq!(latest_axis(&[p, None, p]), Some(AXIS_X));
        assert_eq!(latest_axis(&[None, None, None]), None);
    }
}
