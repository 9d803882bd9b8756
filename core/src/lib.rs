#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridblast engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! actually happened. Systems consume event streams and immutable snapshots,
//! and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical title displayed when the experience boots.
pub const GAME_TITLE: &str = "Gridblast";

/// Cardinal directions used for movement, facing, and explosion rays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All four directions in the order explosion rays are spawned.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Reports whether moving this way changes a player's sprite facing.
    ///
    /// Only horizontal movement flips the sprite; North/South moves keep
    /// whatever facing the player already had.
    #[must_use]
    pub const fn flips_facing(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }
}

/// Location of a single arena tile expressed as zero-based x/y coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    x: u32,
    y: u32,
}

impl GridPos {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Returns the adjacent tile in the provided direction, if one exists.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<GridPos> {
        self.offset(direction, 1)
    }

    /// Returns the tile `distance` steps away in the provided direction.
    ///
    /// Yields `None` when the offset would leave the coordinate space; the
    /// caller still has to bounds-check against the arena dimensions.
    #[must_use]
    pub fn offset(self, direction: Direction, distance: u32) -> Option<GridPos> {
        let (x, y) = match direction {
            Direction::North => (Some(self.x), self.y.checked_sub(distance)),
            Direction::East => (self.x.checked_add(distance), Some(self.y)),
            Direction::South => (Some(self.x), self.y.checked_add(distance)),
            Direction::West => (self.x.checked_sub(distance), Some(self.y)),
        };
        Some(GridPos::new(x?, y?))
    }
}

/// Terrain classification of a single arena tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// Walkable floor with nothing on it.
    Empty,
    /// Indestructible wall; blocks movement and explosions alike.
    SolidWall,
    /// Breakable terrain; blocks until an explosion destroys it.
    Destructible,
    /// Collectible upgrade left behind by a destroyed destructible.
    PowerUp,
}

impl CellType {
    /// Reports whether the tile blocks both player movement and explosions.
    ///
    /// The same predicate drives movement collision and ray propagation, so
    /// walking onto a power-up is always legal and blasts sweep across it.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, CellType::SolidWall | CellType::Destructible)
    }
}

/// Upgrade kinds drawn uniformly at random when a power-up is collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Increases movement speed by one tile per second.
    Speed,
    /// Grants one additional simultaneous bomb slot.
    BombCapacity,
    /// Extends every future explosion ray by one tile.
    BlastRadius,
}

/// Unique identifier assigned to a player slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Per-player movement state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// Standing still and accepting move requests.
    Idle,
    /// Interpolating toward the target tile; further requests are ignored.
    Walking,
    /// Killed by an explosion; the player stays in the roster but no longer
    /// moves.
    Dead,
}

/// Reasons a bomb plant request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlantError {
    /// Every bomb slot the player owns already holds a live bomb.
    NoFreeSlot,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Regenerates the arena and respawns players using the provided layout.
    ConfigureArena {
        /// Number of tile columns in the arena.
        width: u32,
        /// Number of tile rows in the arena.
        height: u32,
        /// Number of players to seat at the corner spawns (at most four).
        players: u32,
        /// Seed for the deterministic terrain and power-up generator.
        rng_seed: u64,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a player start walking toward an adjacent tile.
    MovePlayer {
        /// Identifier of the player attempting to move.
        player: PlayerId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Requests that a player arm a bomb on their current tile.
    PlantBomb {
        /// Identifier of the player planting the bomb.
        player: PlayerId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a player was seated at their spawn tile.
    PlayerSpawned {
        /// Identifier assigned to the player.
        player: PlayerId,
        /// Spawn tile the player occupies.
        cell: GridPos,
    },
    /// Confirms that a player finished a transition between two tiles.
    PlayerMoved {
        /// Identifier of the player that moved.
        player: PlayerId,
        /// Tile occupied before the move committed.
        from: GridPos,
        /// Tile occupied after the move committed.
        to: GridPos,
    },
    /// Confirms that a bomb was armed on a tile.
    BombPlanted {
        /// Player that owns the bomb.
        player: PlayerId,
        /// Tile the bomb occupies until it detonates.
        cell: GridPos,
    },
    /// Reports that a bomb plant request was rejected.
    BombPlantRejected {
        /// Player whose request was refused.
        player: PlayerId,
        /// Specific reason the plant failed.
        reason: PlantError,
    },
    /// Announces that a bomb's fuse elapsed and its rays started sweeping.
    BombDetonated {
        /// Player that owns the bomb.
        player: PlayerId,
        /// Origin tile of the four explosion rays.
        cell: GridPos,
    },
    /// Reports that a tile changed terrain classification.
    CellChanged {
        /// Tile whose classification changed.
        cell: GridPos,
        /// Classification now stored at the tile.
        kind: CellType,
    },
    /// Confirms that a player collected a power-up.
    PowerUpCollected {
        /// Player whose stat was upgraded.
        player: PlayerId,
        /// Upgrade that was drawn.
        kind: PowerUpKind,
        /// Tile the power-up was collected from.
        cell: GridPos,
    },
    /// Announces that an explosion ray reached a player's tile.
    PlayerKilled {
        /// Player that died.
        player: PlayerId,
        /// Tile the lethal ray resolved.
        cell: GridPos,
    },
}

/// Immutable representation of a single player's state used for queries.
///
/// Adapters interpolate drawing between `position` and `target` using
/// `progress`; the committed `position` is the only tile the simulation
/// considers occupied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Unique identifier assigned to the player.
    pub id: PlayerId,
    /// Tile the player authoritatively occupies.
    pub position: GridPos,
    /// Tile the player is entering while walking.
    pub target: GridPos,
    /// Fraction of the current transition completed, in `[0, 1)`.
    pub progress: f32,
    /// Sprite facing; only East/West moves change it.
    pub facing: Direction,
    /// Movement state machine position.
    pub state: PlayerState,
    /// Cleared once any explosion ray resolves the player's tile.
    pub alive: bool,
    /// Movement speed in tiles per second.
    pub speed: f32,
    /// Maximum tile distance the player's explosion rays travel.
    pub blast_radius: u32,
    /// Number of bombs the player may keep armed simultaneously.
    pub bomb_capacity: u32,
}

/// Read-only snapshot describing all players in the arena.
#[derive(Clone, Debug, Default)]
pub struct PlayerView {
    snapshots: Vec<PlayerSnapshot>,
}

impl PlayerView {
    /// Creates a new player view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PlayerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured player snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PlayerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of one live explosion ray used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExplosionSnapshot {
    /// Tile the owning bomb occupied when it detonated.
    pub origin: GridPos,
    /// Direction the ray sweeps away from the origin.
    pub direction: Direction,
    /// Maximum tile distance the ray travels before self-terminating.
    pub radius: u32,
    /// Fraction of the sweep completed, in `[0, 1)`.
    pub progress: f32,
}

/// Immutable representation of a single armed bomb used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct BombSnapshot {
    /// Player whose slot owns the bomb.
    pub owner: PlayerId,
    /// Tile the bomb occupies; bombs never move.
    pub cell: GridPos,
    /// Remaining fuse time, or `None` once the bomb has detonated.
    pub fuse_remaining: Option<Duration>,
    /// Rays currently sweeping outward from the bomb.
    pub rays: Vec<ExplosionSnapshot>,
}

/// Read-only snapshot describing all live bombs in the arena.
#[derive(Clone, Debug, Default)]
pub struct BombView {
    snapshots: Vec<BombSnapshot>,
}

impl BombView {
    /// Creates a new bomb view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BombSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| (snapshot.owner, snapshot.cell));
        Self { snapshots }
    }

    /// Iterator over the captured bomb snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &BombSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BombSnapshot> {
        self.snapshots
    }
}

/// Read-only view into the dense arena terrain grid.
#[derive(Clone, Copy, Debug)]
pub struct ArenaView<'a> {
    cells: &'a [CellType],
    width: u32,
    height: u32,
}

impl<'a> ArenaView<'a> {
    /// Captures a new arena view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [CellType], width: u32, height: u32) -> Self {
        Self {
            cells,
            width,
            height,
        }
    }

    /// Returns the terrain stored at the provided tile, if it is in bounds.
    #[must_use]
    pub fn cell(&self, pos: GridPos) -> Option<CellType> {
        self.index(pos)
            .and_then(|index| self.cells.get(index))
            .copied()
    }

    /// Reports whether the tile blocks movement and explosions.
    ///
    /// Out-of-bounds coordinates count as blocking.
    #[must_use]
    pub fn is_blocking(&self, pos: GridPos) -> bool {
        self.cell(pos).map_or(true, CellType::is_blocking)
    }

    /// Returns an iterator over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = CellType> + 'a {
        self.cells.iter().copied()
    }

    /// Provides the dimensions of the underlying arena grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if pos.x() < self.width && pos.y() < self.height {
            let row = usize::try_from(pos.y()).ok()?;
            let column = usize::try_from(pos.x()).ok()?;
            let width = usize::try_from(self.width).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
