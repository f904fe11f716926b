use std::ops::{Add, Mul, Sub};

pub const CHUNK_SIZE: i32 = 16;
/// Largest absolute block coordinate accepted from the network on any axis.
pub const WORLD_LIMIT: i32 = 30_000_000;

/// Floored division. Unlike `/`, rounds toward negative infinity so that
/// `floor_div(-1, 16) == -1`.
pub fn floor_div(x: i32, y: i32) -> i32 {
    let q = x / y;
    let r = x % y;
    if (r > 0 && y < 0) || (r < 0 && y > 0) {
        q - 1
    } else {
        q
    }
}

/// Floored remainder, always in `0..y` for positive `y`.
pub fn floor_rem(x: i32, y: i32) -> i32 {
    let r = x % y;
    if (r > 0 && y < 0) || (r < 0 && y > 0) {
        r + y
    } else {
        r
    }
}

pub fn floor_f32(f: f32) -> i32 {
    f.floor() as i32
}

pub fn ceil_f32(f: f32) -> i32 {
    f.ceil() as i32
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default, PartialOrd, Ord)]
pub struct IntVec3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl IntVec3 {
    pub const ZERO: IntVec3 = IntVec3 { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> IntVec3 {
        IntVec3 { x, y, z }
    }

    pub fn from_float(v: Vec3f) -> IntVec3 {
        IntVec3::new(floor_f32(v.x), floor_f32(v.y), floor_f32(v.z))
    }

    pub fn to_float(self) -> Vec3f {
        Vec3f::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub fn scale(self, c: i32) -> IntVec3 {
        IntVec3::new(self.x * c, self.y * c, self.z * c)
    }

    pub fn floor_div(self, c: i32) -> IntVec3 {
        IntVec3::new(floor_div(self.x, c), floor_div(self.y, c), floor_div(self.z, c))
    }

    pub fn floor_rem(self, c: i32) -> IntVec3 {
        IntVec3::new(floor_rem(self.x, c), floor_rem(self.y, c), floor_rem(self.z, c))
    }

    /// Origin of the chunk containing this world position.
    pub fn chunk_origin(self) -> IntVec3 {
        self.floor_div(CHUNK_SIZE).scale(CHUNK_SIZE)
    }

    /// Position relative to the containing chunk's origin.
    pub fn chunk_local(self) -> IntVec3 {
        self.floor_rem(CHUNK_SIZE)
    }

    pub fn offset(self, face: BlockFace) -> IntVec3 {
        self + face.direction()
    }

    pub fn is_in_world(self) -> bool {
        let bounds = -WORLD_LIMIT..=WORLD_LIMIT;
        bounds.contains(&self.x) && bounds.contains(&self.y) && bounds.contains(&self.z)
    }
}

impl Add for IntVec3 {
    type Output = IntVec3;

    fn add(self, rhs: IntVec3) -> IntVec3 {
        IntVec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for IntVec3 {
    type Output = IntVec3;

    fn sub(self, rhs: IntVec3) -> IntVec3 {
        IntVec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Chunk column address on the XZ plane, in chunk units.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> ChunkPos {
        ChunkPos { x, z }
    }

    pub fn from_block_pos(x: i32, z: i32) -> ChunkPos {
        ChunkPos::new(floor_div(x, CHUNK_SIZE), floor_div(z, CHUNK_SIZE))
    }

    pub fn from_position(pos: Vec3f) -> ChunkPos {
        ChunkPos::from_block_pos(floor_f32(pos.x), floor_f32(pos.z))
    }

    /// Origin of the chunk at vertical section `section` of this column.
    pub fn chunk_origin(&self, section: i32) -> IntVec3 {
        IntVec3::new(self.x, section, self.z).scale(CHUNK_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3f {
    pub const ZERO: Vec3f = Vec3f {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Vec3f {
        Vec3f { x, y, z }
    }

    pub fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => panic!("Invalid axis {}", axis),
        }
    }

    pub fn axis_mut(&mut self, axis: usize) -> &mut f32 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Invalid axis {}", axis),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Finite and inside the world limit on every axis.
    pub fn is_in_world(&self) -> bool {
        let limit = WORLD_LIMIT as f32;
        self.is_finite() && self.x.abs() <= limit && self.y.abs() <= limit && self.z.abs() <= limit
    }
}

impl Add for Vec3f {
    type Output = Vec3f;

    fn add(self, rhs: Vec3f) -> Vec3f {
        Vec3f::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3f {
    type Output = Vec3f;

    fn sub(self, rhs: Vec3f) -> Vec3f {
        Vec3f::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3f {
    type Output = Vec3f;

    fn mul(self, rhs: f32) -> Vec3f {
        Vec3f::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFace {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::Top,
        BlockFace::Bottom,
        BlockFace::Left,
        BlockFace::Right,
        BlockFace::Front,
        BlockFace::Back,
    ];

    pub fn direction(&self) -> IntVec3 {
        match self {
            BlockFace::Top => IntVec3::new(0, 1, 0),
            BlockFace::Bottom => IntVec3::new(0, -1, 0),
            BlockFace::Left => IntVec3::new(-1, 0, 0),
            BlockFace::Right => IntVec3::new(1, 0, 0),
            BlockFace::Front => IntVec3::new(0, 0, 1),
            BlockFace::Back => IntVec3::new(0, 0, -1),
        }
    }

    /// Face of a unit voxel hit at `hit`, given in voxel-local coordinates
    /// (each component in `0..=1`). The face nearest to the hit point wins.
    pub fn from_subvoxel(hit: Vec3f) -> BlockFace {
        let candidates = [
            (1.0 - hit.y, BlockFace::Top),
            (hit.y, BlockFace::Bottom),
            (hit.x, BlockFace::Left),
            (1.0 - hit.x, BlockFace::Right),
            (1.0 - hit.z, BlockFace::Front),
            (hit.z, BlockFace::Back),
        ];

        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.0 < best.0 {
                best = *candidate;
            }
        }
        best.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floored_division_of_negatives() {
        assert_eq!(floor_div(-1, 16), -1);
        assert_eq!(floor_rem(-1, 16), 15);
        assert_eq!(floor_div(-16, 16), -1);
        assert_eq!(floor_rem(-16, 16), 0);
        assert_eq!(floor_div(-17, 16), -2);
        assert_eq!(floor_div(15, 16), 0);
    }

    #[test]
    fn floored_division_identity() {
        for y in [1, 3, 16, 17] {
            for x in -100..100 {
                let q = floor_div(x, y);
                let r = floor_rem(x, y);
                assert_eq!(q * y + r, x, "x = {}, y = {}", x, y);
                assert!((0..y).contains(&r), "x = {}, y = {}, r = {}", x, y, r);
            }
        }
    }

    #[test]
    fn chunk_origin_and_local() {
        let pos = IntVec3::new(-1, 17, 32);
        assert_eq!(pos.chunk_origin(), IntVec3::new(-16, 16, 32));
        assert_eq!(pos.chunk_local(), IntVec3::new(15, 1, 0));
        assert_eq!(pos.chunk_origin() + pos.chunk_local(), pos);
    }

    #[test]
    fn chunk_pos_from_negative_position() {
        assert_eq!(
            ChunkPos::from_position(Vec3f::new(-0.5, 70.0, 15.9)),
            ChunkPos::new(-1, 0)
        );
        assert_eq!(ChunkPos::new(-1, 2).chunk_origin(3), IntVec3::new(-16, 48, 32));
    }

    #[test]
    fn world_limit_bounds_network_coordinates() {
        assert!(IntVec3::new(-WORLD_LIMIT, 0, WORLD_LIMIT).is_in_world());
        assert!(!IntVec3::new(i32::MAX, 10, 0).is_in_world());
        assert!(!IntVec3::new(0, i32::MIN, 0).is_in_world());

        assert!(Vec3f::new(8.5, 120.0, -8.5).is_in_world());
        assert!(!Vec3f::new(1e30, 64.0, 0.0).is_in_world());
        assert!(!Vec3f::new(f32::NAN, 64.0, 0.0).is_in_world());
        assert!(!Vec3f::new(0.0, f32::NEG_INFINITY, 0.0).is_in_world());

        // the largest accepted position still addresses chunks without overflow
        let edge = ChunkPos::from_position(Vec3f::new(WORLD_LIMIT as f32, 0.0, -(WORLD_LIMIT as f32)));
        let origin = ChunkPos::new(edge.x + 8, edge.z - 8).chunk_origin(15);
        assert!(origin.x > WORLD_LIMIT && origin.z < -WORLD_LIMIT);
    }

    #[test]
    fn face_from_subvoxel_hit() {
        assert_eq!(BlockFace::from_subvoxel(Vec3f::new(0.5, 1.0, 0.5)), BlockFace::Top);
        assert_eq!(BlockFace::from_subvoxel(Vec3f::new(0.5, 0.0, 0.5)), BlockFace::Bottom);
        assert_eq!(BlockFace::from_subvoxel(Vec3f::new(0.0, 0.4, 0.5)), BlockFace::Left);
        assert_eq!(BlockFace::from_subvoxel(Vec3f::new(0.6, 0.4, 1.0)), BlockFace::Front);
        assert_eq!(
            IntVec3::new(3, 4, 5).offset(BlockFace::Back),
            IntVec3::new(3, 4, 4)
        );
    }
}
