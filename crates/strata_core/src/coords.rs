//! # World Coordinates
//!
//! Block positions, chunk coordinates, facings and bounding boxes.
//!
//! ## Conventions
//!
//! - `y` is vertical; `x` and `z` are horizontal and unbounded.
//! - A chunk covers `CHUNK_SIZE` blocks along `x` and `z` and the whole
//!   configured height range along `y`.
//! - Chunk coordinates use floor division, so block `-1` lives in chunk `-1`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StrataError, StrataResult};

/// Chunk width/depth in blocks.
pub const CHUNK_SIZE: usize = 16;

/// Chunk width/depth as a signed integer (for coordinate math).
pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

/// Largest representable chunk coordinate magnitude.
///
/// Keeps every block coordinate of every chunk inside `i32`.
pub const MAX_CHUNK_COORD: i32 = 1 << 26;

/// Chunk coordinate (identifies a chunk in the world grid).
///
/// Ordering is `(x, z)` lexicographic; "lowest-id chunk" means the
/// minimum under this ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts world block coordinates to chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_SIZE_I32),
            z: block_z.div_euclid(CHUNK_SIZE_I32),
        }
    }

    /// Returns the world X coordinate of the chunk's origin (corner).
    #[inline]
    #[must_use]
    pub const fn world_x(self) -> i32 {
        self.x * CHUNK_SIZE_I32
    }

    /// Returns the world Z coordinate of the chunk's origin.
    #[inline]
    #[must_use]
    pub const fn world_z(self) -> i32 {
        self.z * CHUNK_SIZE_I32
    }

    /// Checks the coordinate is inside the representable range.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::CoordinateOutOfRange`] when either axis
    /// exceeds [`MAX_CHUNK_COORD`].
    pub fn validate(self) -> StrataResult<Self> {
        if self.x.abs() > MAX_CHUNK_COORD || self.z.abs() > MAX_CHUNK_COORD {
            return Err(StrataError::CoordinateOutOfRange { cx: self.x, cz: self.z });
        }
        Ok(self)
    }

    /// Returns the chunk offset by `(dx, dz)`.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }

    /// Returns the 3x3 neighbourhood centred on this chunk (including itself),
    /// in ascending order.
    #[must_use]
    pub fn neighbourhood(self) -> [Self; 9] {
        let mut out = [self; 9];
        let mut i = 0;
        for dx in -1..=1 {
            for dz in -1..=1 {
                out[i] = self.offset(dx, dz);
                i += 1;
            }
        }
        out
    }

    /// Returns true if the world block column `(x, z)` lies in this chunk.
    #[inline]
    #[must_use]
    pub const fn contains_column(self, x: i32, z: i32) -> bool {
        x.div_euclid(CHUNK_SIZE_I32) == self.x && z.div_euclid(CHUNK_SIZE_I32) == self.z
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// A block position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y (vertical).
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the neighbouring position one step towards `facing`.
    #[inline]
    #[must_use]
    pub const fn offset(self, facing: Facing) -> Self {
        let (dx, dy, dz) = facing.delta();
        Self { x: self.x + dx, y: self.y + dy, z: self.z + dz }
    }

    /// Returns the position shifted by an arbitrary delta.
    #[inline]
    #[must_use]
    pub const fn add(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, z: self.z + dz }
    }

    /// Returns the six face neighbours in [`Facing::ALL`] order.
    #[must_use]
    pub fn neighbours(self) -> [Self; 6] {
        Facing::ALL.map(|f| self.offset(f))
    }

    /// Returns the chunk containing this position.
    #[inline]
    #[must_use]
    pub const fn chunk(self) -> ChunkCoord {
        ChunkCoord::from_block_pos(self.x, self.z)
    }

    /// Returns the local `(x, z)` inside the containing chunk.
    #[inline]
    #[must_use]
    pub const fn local_xz(self) -> (usize, usize) {
        (
            self.x.rem_euclid(CHUNK_SIZE_I32) as usize,
            self.z.rem_euclid(CHUNK_SIZE_I32) as usize,
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Facing {
    /// +X (east).
    PosX = 0,
    /// -X (west).
    NegX = 1,
    /// +Y (up).
    PosY = 2,
    /// -Y (down).
    NegY = 3,
    /// +Z (south).
    PosZ = 4,
    /// -Z (north).
    NegZ = 5,
}

impl Facing {
    /// All six facings.
    pub const ALL: [Self; 6] = [Self::PosX, Self::NegX, Self::PosY, Self::NegY, Self::PosZ, Self::NegZ];

    /// The four horizontal facings.
    pub const HORIZONTAL: [Self; 4] = [Self::PosX, Self::NegX, Self::PosZ, Self::NegZ];

    /// Unit delta for this facing.
    #[inline]
    #[must_use]
    pub const fn delta(self) -> (i32, i32, i32) {
        match self {
            Self::PosX => (1, 0, 0),
            Self::NegX => (-1, 0, 0),
            Self::PosY => (0, 1, 0),
            Self::NegY => (0, -1, 0),
            Self::PosZ => (0, 0, 1),
            Self::NegZ => (0, 0, -1),
        }
    }

    /// The opposite facing.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::PosX => Self::NegX,
            Self::NegX => Self::PosX,
            Self::PosY => Self::NegY,
            Self::NegY => Self::PosY,
            Self::PosZ => Self::NegZ,
            Self::NegZ => Self::PosZ,
        }
    }

    /// Returns true for the four horizontal facings.
    #[inline]
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Self::PosY | Self::NegY)
    }

    /// The two facings perpendicular to this one in the horizontal plane.
    ///
    /// Vertical facings have no horizontal sides and return `PosX`/`NegX`.
    #[must_use]
    pub const fn sides(self) -> [Self; 2] {
        match self {
            Self::PosX | Self::NegX | Self::PosY | Self::NegY => [Self::PosZ, Self::NegZ],
            Self::PosZ | Self::NegZ => [Self::PosX, Self::NegX],
        }
    }

    /// Decodes a facing from its 3-bit index (values above 5 wrap to `PosX`).
    #[inline]
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index {
            1 => Self::NegX,
            2 => Self::PosY,
            3 => Self::NegY,
            4 => Self::PosZ,
            5 => Self::NegZ,
            _ => Self::PosX,
        }
    }

    /// Encodes the facing as its 3-bit index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }
}

/// Inclusive axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Aabb {
    /// Minimum corner (inclusive).
    pub min: BlockPos,
    /// Maximum corner (inclusive).
    pub max: BlockPos,
}

impl Aabb {
    /// A box covering exactly one block.
    #[inline]
    #[must_use]
    pub const fn point(pos: BlockPos) -> Self {
        Self { min: pos, max: pos }
    }

    /// Creates a box from two corners in any order.
    #[must_use]
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Grows the box to include `pos`.
    pub fn include(&mut self, pos: BlockPos) {
        self.min = BlockPos::new(self.min.x.min(pos.x), self.min.y.min(pos.y), self.min.z.min(pos.z));
        self.max = BlockPos::new(self.max.x.max(pos.x), self.max.y.max(pos.y), self.max.z.max(pos.z));
    }

    /// Returns true if `pos` lies inside the box.
    #[inline]
    #[must_use]
    pub const fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Number of blocks covered.
    #[must_use]
    pub const fn volume(&self) -> u64 {
        let dx = (self.max.x - self.min.x + 1) as u64;
        let dy = (self.max.y - self.min.y + 1) as u64;
        let dz = (self.max.z - self.min.z + 1) as u64;
        dx * dy * dz
    }

    /// Iterates every position in the box, `y` outermost then `z` then `x`.
    pub fn iter(self) -> impl Iterator<Item = BlockPos> {
        (self.min.y..=self.max.y).flat_map(move |y| {
            (self.min.z..=self.max.z)
                .flat_map(move |z| (self.min.x..=self.max.x).map(move |x| BlockPos::new(x, y, z)))
        })
    }
}
