//! # Voxel Registry
//!
//! Flat registry of voxel ids. Id 0 is air.
//!
//! Each id carries an opacity (0 transparent, 1 solid), a light emission
//! level, an extra light decrement for semi-transparent voxels, how pistons
//! treat it, and a classification that says whether it is a redstone
//! component and of which kind.
//!
//! ## Metadata layout
//!
//! ```text
//! bits 0..=2   facing index (see `Facing::from_index`)
//! bits 3..=4   repeater delay - 1
//! bit  5       comparator subtract mode
//! bit  6       lit / on flag (lever, lamp, torch)
//! bit  7       sticky flag (piston head)
//! bits 8..=11  stored power level (wire, source)
//! ```

use std::sync::Arc;

use crate::coords::Facing;

/// A single block in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    /// Block type ID.
    pub id: u16,
    /// Block metadata (orientation, delay, mode, power).
    pub meta: u16,
}

const FACING_MASK: u16 = 0b111;
const DELAY_SHIFT: u16 = 3;
const DELAY_MASK: u16 = 0b11 << DELAY_SHIFT;
const SUBTRACT_BIT: u16 = 1 << 5;
const LIT_BIT: u16 = 1 << 6;
const STICKY_BIT: u16 = 1 << 7;
const POWER_SHIFT: u16 = 8;
const POWER_MASK: u16 = 0b1111 << POWER_SHIFT;

impl Block {
    /// Air block (empty).
    pub const AIR: Self = Self::new(ids::AIR);
    /// Grass block.
    pub const GRASS: Self = Self::new(ids::GRASS);
    /// Stone block.
    pub const STONE: Self = Self::new(ids::STONE);
    /// Dirt block.
    pub const DIRT: Self = Self::new(ids::DIRT);
    /// Bedrock block.
    pub const BEDROCK: Self = Self::new(ids::BEDROCK);
    /// Water block.
    pub const WATER: Self = Self::new(ids::WATER);
    /// Sand block.
    pub const SAND: Self = Self::new(ids::SAND);

    /// Creates a new block with given ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self { id, meta: 0 }
    }

    /// Creates a block with ID and metadata.
    #[inline]
    #[must_use]
    pub const fn with_meta(id: u16, meta: u16) -> Self {
        Self { id, meta }
    }

    /// Returns true if this is an air block.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.id == ids::AIR
    }

    /// Orientation stored in the metadata.
    #[inline]
    #[must_use]
    pub const fn facing(self) -> Facing {
        Facing::from_index((self.meta & FACING_MASK) as u8)
    }

    /// Returns a copy with the orientation replaced.
    #[inline]
    #[must_use]
    pub const fn with_facing(self, facing: Facing) -> Self {
        Self { id: self.id, meta: (self.meta & !FACING_MASK) | facing.index() as u16 }
    }

    /// Repeater delay in redstone ticks (1..=4).
    #[inline]
    #[must_use]
    pub const fn repeater_delay(self) -> u8 {
        ((self.meta & DELAY_MASK) >> DELAY_SHIFT) as u8 + 1
    }

    /// Returns a copy with the repeater delay replaced (clamped to 1..=4).
    #[must_use]
    pub fn with_repeater_delay(self, delay: u8) -> Self {
        let d = u16::from(delay.clamp(1, 4) - 1);
        Self { id: self.id, meta: (self.meta & !DELAY_MASK) | (d << DELAY_SHIFT) }
    }

    /// Comparator subtract-mode flag.
    #[inline]
    #[must_use]
    pub const fn is_subtract_mode(self) -> bool {
        self.meta & SUBTRACT_BIT != 0
    }

    /// Returns a copy with the comparator mode replaced.
    #[inline]
    #[must_use]
    pub const fn with_subtract_mode(self, subtract: bool) -> Self {
        let meta = if subtract { self.meta | SUBTRACT_BIT } else { self.meta & !SUBTRACT_BIT };
        Self { id: self.id, meta }
    }

    /// Lit / on flag (levers, lamps, torches).
    #[inline]
    #[must_use]
    pub const fn is_lit(self) -> bool {
        self.meta & LIT_BIT != 0
    }

    /// Returns a copy with the lit flag replaced.
    #[inline]
    #[must_use]
    pub const fn with_lit(self, lit: bool) -> Self {
        let meta = if lit { self.meta | LIT_BIT } else { self.meta & !LIT_BIT };
        Self { id: self.id, meta }
    }

    /// Sticky flag (piston heads).
    #[inline]
    #[must_use]
    pub const fn is_sticky(self) -> bool {
        self.meta & STICKY_BIT != 0
    }

    /// Returns a copy with the sticky flag replaced.
    #[inline]
    #[must_use]
    pub const fn with_sticky(self, sticky: bool) -> Self {
        let meta = if sticky { self.meta | STICKY_BIT } else { self.meta & !STICKY_BIT };
        Self { id: self.id, meta }
    }

    /// Stored power level (0..=15).
    #[inline]
    #[must_use]
    pub const fn stored_power(self) -> u8 {
        ((self.meta & POWER_MASK) >> POWER_SHIFT) as u8
    }

    /// Returns a copy with the stored power replaced (clamped to 15).
    #[must_use]
    pub fn with_stored_power(self, power: u8) -> Self {
        let p = u16::from(power.min(15));
        Self { id: self.id, meta: (self.meta & !POWER_MASK) | (p << POWER_SHIFT) }
    }
}

/// Voxel ids.
pub mod ids {
    /// Air.
    pub const AIR: u16 = 0;
    /// Grass (also the base-terrain surface marker).
    pub const GRASS: u16 = 1;
    /// Stone.
    pub const STONE: u16 = 2;
    /// Dirt.
    pub const DIRT: u16 = 3;
    /// Oak log.
    pub const OAK_LOG: u16 = 4;
    /// Oak leaves.
    pub const OAK_LEAVES: u16 = 5;
    /// Spruce log.
    pub const SPRUCE_LOG: u16 = 6;
    /// Bedrock.
    pub const BEDROCK: u16 = 7;
    /// Spruce leaves.
    pub const SPRUCE_LEAVES: u16 = 8;
    /// Jungle log.
    pub const JUNGLE_LOG: u16 = 9;
    /// Water.
    pub const WATER: u16 = 10;
    /// Sand.
    pub const SAND: u16 = 11;
    /// Gravel.
    pub const GRAVEL: u16 = 12;
    /// Sandstone.
    pub const SANDSTONE: u16 = 13;
    /// Snow block.
    pub const SNOW: u16 = 14;
    /// Ice.
    pub const ICE: u16 = 15;
    /// Clay.
    pub const CLAY: u16 = 16;
    /// Lava.
    pub const LAVA: u16 = 17;
    /// Cobblestone.
    pub const COBBLESTONE: u16 = 18;
    /// Mossy cobblestone.
    pub const MOSSY_COBBLESTONE: u16 = 19;
    /// Planks.
    pub const PLANKS: u16 = 20;
    /// Obsidian.
    pub const OBSIDIAN: u16 = 21;
    /// Netherrack.
    pub const NETHERRACK: u16 = 22;
    /// End stone.
    pub const END_STONE: u16 = 23;
    /// Glass.
    pub const GLASS: u16 = 24;
    /// Cactus.
    pub const CACTUS: u16 = 25;
    /// Red flower.
    pub const FLOWER_RED: u16 = 26;
    /// Yellow flower.
    pub const FLOWER_YELLOW: u16 = 27;
    /// Tall grass.
    pub const TALL_GRASS: u16 = 28;
    /// Coal ore.
    pub const COAL_ORE: u16 = 29;
    /// Iron ore.
    pub const IRON_ORE: u16 = 30;
    /// Gold ore.
    pub const GOLD_ORE: u16 = 31;
    /// Diamond ore.
    pub const DIAMOND_ORE: u16 = 32;
    /// Redstone ore.
    pub const REDSTONE_ORE: u16 = 33;
    /// Jungle leaves.
    pub const JUNGLE_LEAVES: u16 = 34;
    /// Stone bricks.
    pub const STONE_BRICKS: u16 = 35;
    /// Glowstone.
    pub const GLOWSTONE: u16 = 36;
    /// Wall torch (light only, not redstone).
    pub const TORCH: u16 = 37;

    /// Redstone wire.
    pub const WIRE: u16 = 100;
    /// Redstone torch.
    pub const REDSTONE_TORCH: u16 = 101;
    /// Repeater.
    pub const REPEATER: u16 = 102;
    /// Comparator.
    pub const COMPARATOR: u16 = 103;
    /// Piston.
    pub const PISTON: u16 = 104;
    /// Sticky piston.
    pub const STICKY_PISTON: u16 = 105;
    /// Piston head (only exists while extended).
    pub const PISTON_HEAD: u16 = 106;
    /// Lever.
    pub const LEVER: u16 = 107;
    /// Button.
    pub const BUTTON: u16 = 108;
    /// Pressure plate.
    pub const PRESSURE_PLATE: u16 = 109;
    /// Observer.
    pub const OBSERVER: u16 = 110;
    /// Redstone lamp.
    pub const LAMP: u16 = 111;
    /// Constant power source (redstone block).
    pub const SOURCE: u16 = 112;
    /// Power meter that reads its input level.
    pub const SINK: u16 = 113;
}

/// Redstone component kinds a voxel id can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RedstoneKind {
    /// Redstone wire (dust).
    Wire,
    /// Redstone torch.
    Torch,
    /// Repeater.
    Repeater,
    /// Comparator.
    Comparator,
    /// Piston.
    Piston,
    /// Sticky piston.
    StickyPiston,
    /// Lever.
    Lever,
    /// Button.
    Button,
    /// Pressure plate.
    PressurePlate,
    /// Observer.
    Observer,
    /// Lamp.
    Lamp,
    /// Constant source.
    Source,
    /// Power meter that reads its input level.
    Sink,
}

/// Coarse classification of a voxel id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockClass {
    /// Nothing.
    Air,
    /// Full solid block.
    Solid,
    /// Non-full block that is neither fluid nor plant (glass, leaves, piston head).
    Transparent,
    /// Water or lava.
    Fluid,
    /// Flowers, grass and other replaceable plants.
    Plant,
    /// A redstone component.
    Redstone(RedstoneKind),
}

/// How a piston treats a voxel in its push line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PistonBehavior {
    /// Moves with the push.
    Push,
    /// Refuses the push.
    Block,
    /// Breaks and vanishes when pushed.
    Destroy,
}

/// Static properties of a voxel id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockProperties {
    /// Display name.
    pub name: &'static str,
    /// Classification.
    pub class: BlockClass,
    /// 0 transparent, 1 solid.
    pub opacity: u8,
    /// Light emission level (0..=15).
    pub emission: u8,
    /// Extra light decrement when light passes through (semi-transparent voxels).
    pub light_filter: u8,
    /// Piston interaction.
    pub piston: PistonBehavior,
    /// Conducts redstone power (full opaque blocks).
    pub conductive: bool,
    /// World features may overwrite it.
    pub replaceable: bool,
}

impl BlockProperties {
    const fn new(name: &'static str, class: BlockClass) -> Self {
        let solid = matches!(class, BlockClass::Solid);
        Self {
            name,
            class,
            opacity: if solid { 1 } else { 0 },
            emission: 0,
            light_filter: 0,
            piston: match class {
                BlockClass::Air | BlockClass::Solid | BlockClass::Transparent => PistonBehavior::Push,
                BlockClass::Fluid | BlockClass::Plant => PistonBehavior::Destroy,
                BlockClass::Redstone(_) => PistonBehavior::Block,
            },
            conductive: solid,
            replaceable: matches!(class, BlockClass::Air | BlockClass::Plant),
        }
    }

    const fn emits(mut self, level: u8) -> Self {
        self.emission = level;
        self
    }

    const fn filter(mut self, decrement: u8) -> Self {
        self.light_filter = decrement;
        self
    }

    const fn piston(mut self, behavior: PistonBehavior) -> Self {
        self.piston = behavior;
        self
    }

    const fn non_conductive(mut self) -> Self {
        self.conductive = false;
        self
    }

    /// The redstone kind, if any.
    #[inline]
    #[must_use]
    pub const fn redstone_kind(&self) -> Option<RedstoneKind> {
        match self.class {
            BlockClass::Redstone(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns true for fully opaque voxels.
    #[inline]
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.opacity != 0
    }
}

/// Properties returned for ids that were never registered.
const UNKNOWN: BlockProperties = BlockProperties::new("unknown", BlockClass::Solid);

/// The voxel registry.
///
/// Cheap to clone; the table is shared.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    table: Arc<Vec<BlockProperties>>,
}

impl BlockRegistry {
    /// Builds the standard registry.
    #[must_use]
    pub fn standard() -> Self {
        use BlockClass::{Air, Fluid, Plant, Redstone, Solid, Transparent};
        use PistonBehavior::{Block as Immovable, Destroy};
        use RedstoneKind as R;

        let entries: &[(u16, BlockProperties)] = &[
            (ids::AIR, BlockProperties::new("air", Air)),
            (ids::GRASS, BlockProperties::new("grass", Solid)),
            (ids::STONE, BlockProperties::new("stone", Solid)),
            (ids::DIRT, BlockProperties::new("dirt", Solid)),
            (ids::OAK_LOG, BlockProperties::new("oak_log", Solid)),
            (ids::OAK_LEAVES, BlockProperties::new("oak_leaves", Transparent).filter(1)),
            (ids::SPRUCE_LOG, BlockProperties::new("spruce_log", Solid)),
            (ids::BEDROCK, BlockProperties::new("bedrock", Solid).piston(Immovable)),
            (ids::SPRUCE_LEAVES, BlockProperties::new("spruce_leaves", Transparent).filter(1)),
            (ids::JUNGLE_LOG, BlockProperties::new("jungle_log", Solid)),
            (ids::WATER, BlockProperties::new("water", Fluid).filter(2)),
            (ids::SAND, BlockProperties::new("sand", Solid)),
            (ids::GRAVEL, BlockProperties::new("gravel", Solid)),
            (ids::SANDSTONE, BlockProperties::new("sandstone", Solid)),
            (ids::SNOW, BlockProperties::new("snow", Solid)),
            (ids::ICE, BlockProperties::new("ice", Transparent).filter(2)),
            (ids::CLAY, BlockProperties::new("clay", Solid)),
            (ids::LAVA, BlockProperties::new("lava", Fluid).emits(15)),
            (ids::COBBLESTONE, BlockProperties::new("cobblestone", Solid)),
            (ids::MOSSY_COBBLESTONE, BlockProperties::new("mossy_cobblestone", Solid)),
            (ids::PLANKS, BlockProperties::new("planks", Solid)),
            (ids::OBSIDIAN, BlockProperties::new("obsidian", Solid).piston(Immovable)),
            (ids::NETHERRACK, BlockProperties::new("netherrack", Solid)),
            (ids::END_STONE, BlockProperties::new("end_stone", Solid)),
            (ids::GLASS, BlockProperties::new("glass", Transparent)),
            (ids::CACTUS, BlockProperties::new("cactus", Transparent).piston(Destroy)),
            (ids::FLOWER_RED, BlockProperties::new("flower_red", Plant)),
            (ids::FLOWER_YELLOW, BlockProperties::new("flower_yellow", Plant)),
            (ids::TALL_GRASS, BlockProperties::new("tall_grass", Plant)),
            (ids::COAL_ORE, BlockProperties::new("coal_ore", Solid)),
            (ids::IRON_ORE, BlockProperties::new("iron_ore", Solid)),
            (ids::GOLD_ORE, BlockProperties::new("gold_ore", Solid)),
            (ids::DIAMOND_ORE, BlockProperties::new("diamond_ore", Solid)),
            (ids::REDSTONE_ORE, BlockProperties::new("redstone_ore", Solid)),
            (ids::JUNGLE_LEAVES, BlockProperties::new("jungle_leaves", Transparent).filter(1)),
            (ids::STONE_BRICKS, BlockProperties::new("stone_bricks", Solid)),
            (ids::GLOWSTONE, BlockProperties::new("glowstone", Transparent).emits(15)),
            (ids::TORCH, BlockProperties::new("torch", Plant).emits(14)),
            (ids::WIRE, BlockProperties::new("redstone_wire", Redstone(R::Wire)).piston(Destroy)),
            (ids::REDSTONE_TORCH, BlockProperties::new("redstone_torch", Redstone(R::Torch)).piston(Destroy).emits(7)),
            (ids::REPEATER, BlockProperties::new("repeater", Redstone(R::Repeater)).piston(Destroy)),
            (ids::COMPARATOR, BlockProperties::new("comparator", Redstone(R::Comparator)).piston(Destroy)),
            (ids::PISTON, BlockProperties::new("piston", Redstone(R::Piston))),
            (ids::STICKY_PISTON, BlockProperties::new("sticky_piston", Redstone(R::StickyPiston))),
            (ids::PISTON_HEAD, BlockProperties::new("piston_head", Transparent).piston(Immovable)),
            (ids::LEVER, BlockProperties::new("lever", Redstone(R::Lever)).piston(Destroy)),
            (ids::BUTTON, BlockProperties::new("button", Redstone(R::Button)).piston(Destroy)),
            (ids::PRESSURE_PLATE, BlockProperties::new("pressure_plate", Redstone(R::PressurePlate)).piston(Destroy)),
            (ids::OBSERVER, BlockProperties::new("observer", Redstone(R::Observer))),
            (ids::LAMP, BlockProperties::new("redstone_lamp", Redstone(R::Lamp)).emits(15)),
            (ids::SOURCE, BlockProperties::new("redstone_block", Redstone(R::Source)).non_conductive()),
            (ids::SINK, BlockProperties::new("power_meter", Redstone(R::Sink))),
        ];

        let len = entries.iter().map(|(id, _)| usize::from(*id) + 1).max().unwrap_or(1);
        let mut table = vec![UNKNOWN; len];
        for (id, props) in entries {
            table[usize::from(*id)] = *props;
        }
        Self { table: Arc::new(table) }
    }

    /// Properties for an id; unknown ids behave like an anonymous solid block.
    #[inline]
    #[must_use]
    pub fn get(&self, id: u16) -> &BlockProperties {
        self.table.get(usize::from(id)).unwrap_or(&UNKNOWN)
    }

    /// Properties for a block.
    #[inline]
    #[must_use]
    pub fn props(&self, block: Block) -> &BlockProperties {
        self.get(block.id)
    }

    /// The redstone kind of a block, if it is a component.
    #[inline]
    #[must_use]
    pub fn redstone_kind(&self, block: Block) -> Option<RedstoneKind> {
        self.props(block).redstone_kind()
    }

    /// Light emitted by a concrete block.
    ///
    /// Redstone torches and lamps only emit while lit.
    #[must_use]
    pub fn emission(&self, block: Block) -> u8 {
        let props = self.props(block);
        match props.redstone_kind() {
            Some(RedstoneKind::Torch | RedstoneKind::Lamp) if !block.is_lit() => 0,
            _ => props.emission,
        }
    }

    /// Number of registered ids (including gaps).
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the registry has no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_is_zero() {
        let reg = BlockRegistry::standard();
        assert!(Block::AIR.is_air());
        assert_eq!(reg.get(0).class, BlockClass::Air);
        assert_eq!(reg.get(0).opacity, 0);
    }

    #[test]
    fn test_meta_fields_independent() {
        let b = Block::new(ids::REPEATER)
            .with_facing(Facing::NegZ)
            .with_repeater_delay(3)
            .with_lit(true)
            .with_stored_power(11);
        assert_eq!(b.facing(), Facing::NegZ);
        assert_eq!(b.repeater_delay(), 3);
        assert!(b.is_lit());
        assert!(!b.is_subtract_mode());
        assert_eq!(b.stored_power(), 11);

        let b = b.with_repeater_delay(9).with_subtract_mode(true);
        assert_eq!(b.repeater_delay(), 4);
        assert!(b.is_subtract_mode());
        assert_eq!(b.facing(), Facing::NegZ);
    }

    #[test]
    fn test_redstone_classification() {
        let reg = BlockRegistry::standard();
        assert_eq!(reg.redstone_kind(Block::new(ids::WIRE)), Some(RedstoneKind::Wire));
        assert_eq!(reg.redstone_kind(Block::new(ids::STICKY_PISTON)), Some(RedstoneKind::StickyPiston));
        assert_eq!(reg.redstone_kind(Block::STONE), None);
        assert_eq!(reg.redstone_kind(Block::new(ids::PISTON_HEAD)), None);
    }

    #[test]
    fn test_piston_behaviour() {
        let reg = BlockRegistry::standard();
        assert_eq!(reg.get(ids::STONE).piston, PistonBehavior::Push);
        assert_eq!(reg.get(ids::BEDROCK).piston, PistonBehavior::Block);
        assert_eq!(reg.get(ids::OBSIDIAN).piston, PistonBehavior::Block);
        assert_eq!(reg.get(ids::TALL_GRASS).piston, PistonBehavior::Destroy);
    }

    #[test]
    fn test_emission_depends_on_lit() {
        let reg = BlockRegistry::standard();
        let lamp = Block::new(ids::LAMP);
        assert_eq!(reg.emission(lamp), 0);
        assert_eq!(reg.emission(lamp.with_lit(true)), 15);
        assert_eq!(reg.emission(Block::new(ids::LAVA)), 15);
    }

    #[test]
    fn test_unknown_id_is_solid() {
        let reg = BlockRegistry::standard();
        assert_eq!(reg.get(9999).class, BlockClass::Solid);
        assert!(reg.get(9999).is_opaque());
    }
}
