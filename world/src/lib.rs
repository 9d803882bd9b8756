#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Gridblast.
//!
//! The world owns the arena terrain, the player roster, and every live bomb
//! and explosion ray. All mutation flows through [`apply`]; adapters and
//! systems observe the results through the emitted [`Event`] stream and the
//! read-only accessors in [`query`].

use std::time::Duration;

use gridblast_core::{
    CellType, Command, Direction, Event, GridPos, PlantError, PlayerId, PlayerState, PowerUpKind,
    GAME_TITLE,
};
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DEFAULT_ARENA_WIDTH: u32 = 15;
const DEFAULT_ARENA_HEIGHT: u32 = 15;
const DEFAULT_PLAYER_COUNT: u32 = 4;
const DEFAULT_GENERATION_SEED: u64 = 0xa02c_7d19_44e5_663b;

/// The arena has exactly four corner spawns; larger rosters are clamped.
const MAX_SPAWN_POINTS: u32 = 4;

const BOMB_FUSE: Duration = Duration::from_secs(3);
const EXPLOSION_SPEED: f32 = 6.0;
const INITIAL_SPEED: f32 = 5.0;
const INITIAL_BLAST_RADIUS: u32 = 3;
const INITIAL_BOMB_CAPACITY: usize = 1;

/// Terrain grid covering the fixed arena rectangle.
#[derive(Clone, Debug)]
struct Arena {
    width: u32,
    height: u32,
    cells: Vec<CellType>,
}

impl Arena {
    /// Builds a fresh arena: border and pillar walls, spawn-protected floor,
    /// and destructibles sprinkled across the remaining tiles with p = 0.8.
    fn generate(width: u32, height: u32, rng: &mut ChaCha8Rng) -> Self {
        let capacity_u64 = u64::from(width) * u64::from(height);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        let mut arena = Self {
            width,
            height,
            cells: vec![CellType::Empty; capacity],
        };

        for x in 0..width {
            for y in 0..height {
                let pos = GridPos::new(x, y);
                if arena.is_solid_wall(pos) {
                    arena.set_cell(pos, CellType::SolidWall);
                } else if arena.is_spawn_protected(pos) {
                    arena.set_cell(pos, CellType::Empty);
                } else if rng.gen_range(0..10_u32) <= 7 {
                    arena.set_cell(pos, CellType::Destructible);
                }
            }
        }

        arena
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

    fn cell(&self, pos: GridPos) -> Option<CellType> {
        self.index(pos).and_then(|index| self.cells.get(index)).copied()
    }

    /// Single mutation entry point for terrain transitions. Passing an
    /// out-of-bounds coordinate is a programming error, not a recoverable one.
    fn set_cell(&mut self, pos: GridPos, kind: CellType) {
        let index = self
            .index(pos)
            .expect("cell coordinate lies within the arena");
        self.cells[index] = kind;
    }

    /// Border tiles and both-even checkerboard pillars are indestructible.
    fn is_solid_wall(&self, pos: GridPos) -> bool {
        pos.x() == 0
            || pos.x() + 1 == self.width
            || pos.y() == 0
            || pos.y() + 1 == self.height
            || (pos.x() % 2 == 0 && pos.y() % 2 == 0)
    }

    /// Cross-shaped clearings along the border rows and columns keep each
    /// corner spawn reachable on a freshly generated arena.
    fn is_spawn_protected(&self, pos: GridPos) -> bool {
        let on_spawn_column = pos.x() == 1 || pos.x() + 2 == self.width;
        let on_spawn_row = pos.y() == 1 || pos.y() + 2 == self.height;
        let near_vertical_edge = pos.y() <= 3 || pos.y() + 4 >= self.height;
        let near_horizontal_edge = pos.x() <= 3 || pos.x() + 4 >= self.width;
        (on_spawn_column && near_vertical_edge) || (on_spawn_row && near_horizontal_edge)
    }

    fn is_blocking(&self, pos: GridPos) -> bool {
        self.cell(pos).map_or(true, CellType::is_blocking)
    }

    /// A tile can be entered iff it is in bounds and not blocking; walking
    /// onto a power-up is always legal.
    fn is_enterable(&self, pos: GridPos) -> bool {
        !self.is_blocking(pos)
    }

    fn spawn_point(&self, slot: u32) -> GridPos {
        let far_x = self.width.saturating_sub(2);
        let far_y = self.height.saturating_sub(2);
        match slot {
            0 => GridPos::new(1, 1),
            1 => GridPos::new(far_x, far_y),
            2 => GridPos::new(far_x, 1),
            _ => GridPos::new(1, far_y),
        }
    }
}

/// Positional record shared by players and explosion rays: a committed tile,
/// the tile being entered, and the fraction of the transition completed.
#[derive(Clone, Copy, Debug)]
struct Motion {
    position: GridPos,
    target: GridPos,
    progress: f32,
    facing: Direction,
}

impl Motion {
    fn at(position: GridPos, facing: Direction) -> Self {
        Self {
            position,
            target: position,
            progress: 0.0,
            facing,
        }
    }
}

/// One directional blast sweeping outward from a detonated bomb.
///
/// The radius is captured at detonation time so upgrades collected while the
/// blast is live do not retroactively lengthen it.
#[derive(Clone, Copy, Debug)]
struct ExplosionRay {
    direction: Direction,
    radius: u32,
    progress: f32,
}

#[derive(Clone, Debug)]
struct Bomb {
    cell: GridPos,
    /// Fuse deadline against the accumulated clock; `None` once detonated.
    fuse_deadline: Option<Duration>,
    exploded: bool,
    rays: [Option<ExplosionRay>; 4],
}

#[derive(Clone, Debug)]
struct Player {
    id: PlayerId,
    motion: Motion,
    state: PlayerState,
    alive: bool,
    speed: f32,
    blast_radius: u32,
    /// One slot per bomb of capacity; a slot is empty or owns one live bomb.
    bombs: Vec<Option<Bomb>>,
}

impl Player {
    fn at_spawn(id: PlayerId, cell: GridPos, slot: u32) -> Self {
        let facing = if slot == 0 || slot == 3 {
            Direction::East
        } else {
            Direction::West
        };
        Self {
            id,
            motion: Motion::at(cell, facing),
            state: PlayerState::Idle,
            alive: true,
            speed: INITIAL_SPEED,
            blast_radius: INITIAL_BLAST_RADIUS,
            bombs: vec![None; INITIAL_BOMB_CAPACITY],
        }
    }

    fn free_slot(&self) -> Option<usize> {
        self.bombs.iter().position(Option::is_none)
    }
}

/// Represents the authoritative Gridblast world state.
#[derive(Debug)]
pub struct World {
    title: &'static str,
    arena: Arena,
    players: Vec<Player>,
    rng: ChaCha8Rng,
    elapsed: Duration,
}

impl World {
    /// Creates a new Gridblast world with the default arena layout.
    #[must_use]
    pub fn new() -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(DEFAULT_GENERATION_SEED);
        let arena = Arena::generate(DEFAULT_ARENA_WIDTH, DEFAULT_ARENA_HEIGHT, &mut rng);
        let players = seat_players(&arena, DEFAULT_PLAYER_COUNT);
        Self {
            title: GAME_TITLE,
            arena,
            players,
            rng,
            elapsed: Duration::ZERO,
        }
    }

    fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == id)
    }

    fn request_move(&mut self, id: PlayerId, direction: Direction) {
        let Some(index) = self.player_index(id) else {
            return;
        };
        if self.players[index].state != PlayerState::Idle {
            return;
        }

        let accepted_target = self.players[index]
            .motion
            .target
            .step(direction)
            .filter(|cell| self.arena.is_enterable(*cell));

        let player = &mut self.players[index];
        if let Some(next) = accepted_target {
            player.motion.target = next;
            if direction.flips_facing() {
                player.motion.facing = direction;
            }
        }
        // A rejected move still enters Walking: the player bumps in place
        // until the transition wraps back to Idle.
        player.state = PlayerState::Walking;
    }

    fn advance_movement(&mut self, index: usize, dt: Duration, out_events: &mut Vec<Event>) {
        let player = &mut self.players[index];
        if player.state != PlayerState::Walking {
            return;
        }

        player.motion.progress += dt.as_secs_f32() * player.speed;
        if player.motion.progress >= 1.0 {
            let from = player.motion.position;
            player.motion.progress = 0.0;
            player.motion.position = player.motion.target;
            player.state = PlayerState::Idle;
            if from != player.motion.position {
                out_events.push(Event::PlayerMoved {
                    player: player.id,
                    from,
                    to: player.motion.position,
                });
            }
        }
    }

    fn plant_bomb(&mut self, id: PlayerId, out_events: &mut Vec<Event>) {
        let Some(index) = self.player_index(id) else {
            return;
        };
        let deadline = self.elapsed.saturating_add(BOMB_FUSE);

        let player = &mut self.players[index];
        let Some(slot) = player.free_slot() else {
            out_events.push(Event::BombPlantRejected {
                player: id,
                reason: PlantError::NoFreeSlot,
            });
            return;
        };

        let cell = player.motion.position;
        player.bombs[slot] = Some(Bomb {
            cell,
            fuse_deadline: Some(deadline),
            exploded: false,
            rays: [None; 4],
        });
        info!("player {} planted a bomb at ({}, {})", id.get(), cell.x(), cell.y());
        out_events.push(Event::BombPlanted { player: id, cell });
    }

    fn tick_bomb_timers(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let now = self.elapsed;
        let player = &mut self.players[index];
        let id = player.id;
        let radius = player.blast_radius;

        for slot in &mut player.bombs {
            let Some(bomb) = slot.as_mut() else {
                continue;
            };
            let Some(deadline) = bomb.fuse_deadline else {
                continue;
            };
            if deadline <= now {
                bomb.fuse_deadline = None;
                bomb.rays = Direction::ALL.map(|direction| {
                    Some(ExplosionRay {
                        direction,
                        radius,
                        progress: 0.0,
                    })
                });
                debug!("bomb at ({}, {}) detonated", bomb.cell.x(), bomb.cell.y());
                out_events.push(Event::BombDetonated {
                    player: id,
                    cell: bomb.cell,
                });
            }
        }
    }

    fn advance_explosions(&mut self, index: usize, dt: Duration, out_events: &mut Vec<Event>) {
        // The bombs are taken out of the slot list so ray resolution can
        // mutate terrain and other players while walking them.
        let mut bombs = std::mem::take(&mut self.players[index].bombs);

        for slot in &mut bombs {
            let Some(bomb) = slot.as_mut() else {
                continue;
            };
            if bomb.fuse_deadline.is_some() {
                continue;
            }

            let mut clear_rays = 0_usize;
            for ray_slot in &mut bomb.rays {
                let Some(ray) = ray_slot.as_mut() else {
                    clear_rays += 1;
                    continue;
                };

                if self.resolve_ray_tiles(bomb.cell, *ray, out_events) {
                    *ray_slot = None;
                } else {
                    ray.progress += dt.as_secs_f32() * EXPLOSION_SPEED;
                    if ray.progress >= 1.0 {
                        *ray_slot = None;
                    }
                }
            }

            // Only rays that were already clear before this pass count; a ray
            // cleared during the pass is observed on the next tick.
            if clear_rays == bomb.rays.len() {
                bomb.exploded = true;
            }
        }

        self.players[index].bombs = bombs;
    }

    /// Resolves every tile the ray's sweep fraction has revealed this tick
    /// and reports whether the ray terminated.
    ///
    /// The continuous `rel_pos` measure decouples the visual sweep from the
    /// discrete tile index: tiles resolve at deterministic instants while the
    /// renderer interpolates the same progress scalar. A killed player ends
    /// the ray's lifetime but not this tick's tile resolution, so every
    /// player along an unobstructed stretch dies in the same tick.
    fn resolve_ray_tiles(
        &mut self,
        origin: GridPos,
        ray: ExplosionRay,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let rel_pos = ray.progress * (ray.radius as f32 + 1.0);
        let mut terminated = false;

        for k in 0..=ray.radius {
            if rel_pos < k as f32 {
                break;
            }
            let Some(cell_pos) = origin.offset(ray.direction, k) else {
                terminated = true;
                break;
            };
            match self.arena.cell(cell_pos) {
                None | Some(CellType::SolidWall) => {
                    terminated = true;
                    break;
                }
                Some(CellType::Destructible) => {
                    self.break_destructible(cell_pos, out_events);
                    terminated = true;
                    break;
                }
                Some(CellType::Empty) | Some(CellType::PowerUp) => {
                    if self.kill_player_at(cell_pos, out_events) {
                        terminated = true;
                    }
                }
            }
        }

        terminated
    }

    /// The first body standing on the tile absorbs the ray, dead or alive.
    fn kill_player_at(&mut self, cell: GridPos, out_events: &mut Vec<Event>) -> bool {
        let Some(victim) = self
            .players
            .iter_mut()
            .find(|player| player.motion.position == cell)
        else {
            return false;
        };

        if victim.alive {
            victim.alive = false;
            info!(
                "player {} was caught in a blast at ({}, {})",
                victim.id.get(),
                cell.x(),
                cell.y()
            );
            out_events.push(Event::PlayerKilled {
                player: victim.id,
                cell,
            });
        }
        true
    }

    fn break_destructible(&mut self, cell: GridPos, out_events: &mut Vec<Event>) {
        // one in five destroyed tiles leaves a power-up behind
        let kind = if self.rng.gen_range(0..10_u32) <= 1 {
            CellType::PowerUp
        } else {
            CellType::Empty
        };
        self.arena.set_cell(cell, kind);
        out_events.push(Event::CellChanged { cell, kind });
    }

    fn reap_exploded_bombs(&mut self, index: usize) {
        for slot in &mut self.players[index].bombs {
            if matches!(slot, Some(bomb) if bomb.exploded) {
                *slot = None;
            }
        }
    }

    fn check_power_up_pickup(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let cell = self.players[index].motion.position;
        if self.arena.cell(cell) != Some(CellType::PowerUp) {
            return;
        }

        let kind = match self.rng.gen_range(0..3_u32) {
            0 => PowerUpKind::Speed,
            1 => PowerUpKind::BombCapacity,
            _ => PowerUpKind::BlastRadius,
        };
        let player = &mut self.players[index];
        match kind {
            PowerUpKind::Speed => player.speed += 1.0,
            PowerUpKind::BombCapacity => player.bombs.push(None),
            PowerUpKind::BlastRadius => player.blast_radius += 1,
        }
        let id = player.id;
        info!("player {} collected {:?}", id.get(), kind);

        self.arena.set_cell(cell, CellType::Empty);
        out_events.push(Event::PowerUpCollected {
            player: id,
            kind,
            cell,
        });
        out_events.push(Event::CellChanged {
            cell,
            kind: CellType::Empty,
        });
    }

    fn check_alive(&mut self, index: usize) {
        let player = &mut self.players[index];
        if !player.alive {
            player.state = PlayerState::Dead;
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn seat_players(arena: &Arena, requested: u32) -> Vec<Player> {
    let count = requested.min(MAX_SPAWN_POINTS);
    (0..count)
        .map(|slot| Player::at_spawn(PlayerId::new(slot), arena.spawn_point(slot), slot))
        .collect()
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureArena {
            width,
            height,
            players,
            rng_seed,
        } => {
            world.rng = ChaCha8Rng::seed_from_u64(rng_seed);
            world.arena = Arena::generate(width, height, &mut world.rng);
            world.players = seat_players(&world.arena, players);
            world.elapsed = Duration::ZERO;
            for player in &world.players {
                out_events.push(Event::PlayerSpawned {
                    player: player.id,
                    cell: player.motion.position,
                });
            }
        }
        Command::Tick { dt } => {
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });

            // Fixed per-player sub-phase order; explosion-vs-reap-vs-pickup
            // ordering decides which tick an effect becomes visible in.
            for index in 0..world.players.len() {
                world.advance_movement(index, dt, out_events);
                world.tick_bomb_timers(index, out_events);
                world.advance_explosions(index, dt, out_events);
                world.reap_exploded_bombs(index);
                world.check_power_up_pickup(index, out_events);
                world.check_alive(index);
            }
        }
        Command::MovePlayer { player, direction } => {
            world.request_move(player, direction);
        }
        Command::PlantBomb { player } => {
            world.plant_bomb(player, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use gridblast_core::{
        ArenaView, BombSnapshot, BombView, ExplosionSnapshot, PlayerSnapshot, PlayerView,
    };

    use super::World;

    /// Retrieves the title adapters may display to players.
    #[must_use]
    pub fn game_title(world: &World) -> &'static str {
        world.title
    }

    /// Total simulated time accumulated across all ticks.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Exposes a read-only view of the arena terrain grid.
    #[must_use]
    pub fn arena_view(world: &World) -> ArenaView<'_> {
        ArenaView::new(&world.arena.cells, world.arena.width, world.arena.height)
    }

    /// Captures a read-only view of every player in the roster.
    #[must_use]
    pub fn player_view(world: &World) -> PlayerView {
        let snapshots: Vec<PlayerSnapshot> = world
            .players
            .iter()
            .map(|player| PlayerSnapshot {
                id: player.id,
                position: player.motion.position,
                target: player.motion.target,
                progress: player.motion.progress,
                facing: player.motion.facing,
                state: player.state,
                alive: player.alive,
                speed: player.speed,
                blast_radius: player.blast_radius,
                bomb_capacity: player.bombs.len() as u32,
            })
            .collect();
        PlayerView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every live bomb and its rays.
    #[must_use]
    pub fn bomb_view(world: &World) -> BombView {
        let mut snapshots = Vec::new();
        for player in &world.players {
            for bomb in player.bombs.iter().flatten() {
                snapshots.push(BombSnapshot {
                    owner: player.id,
                    cell: bomb.cell,
                    fuse_remaining: bomb
                        .fuse_deadline
                        .map(|deadline| deadline.saturating_sub(world.elapsed)),
                    rays: bomb
                        .rays
                        .iter()
                        .flatten()
                        .map(|ray| ExplosionSnapshot {
                            origin: bomb.cell,
                            direction: ray.direction,
                            radius: ray.radius,
                            progress: ray.progress,
                        })
                        .collect(),
                });
            }
        }
        BombView::from_snapshots(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridblast_core::PlayerSnapshot;

    const SEED: u64 = 0x5eed_0001;

    fn configured_world(width: u32, height: u32, players: u32) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConfigureArena {
                width,
                height,
                players,
                rng_seed: SEED,
            },
            &mut events,
        );
        world
    }

    /// Drops every destructible and power-up so tests control terrain exactly.
    fn clear_floor(world: &mut World) {
        for y in 0..world.arena.height {
            for x in 0..world.arena.width {
                let pos = GridPos::new(x, y);
                if !world.arena.is_solid_wall(pos) {
                    world.arena.set_cell(pos, CellType::Empty);
                }
            }
        }
    }

    fn place_player(world: &mut World, index: usize, cell: GridPos) {
        let player = &mut world.players[index];
        player.motion.position = cell;
        player.motion.target = cell;
        player.motion.progress = 0.0;
        player.state = PlayerState::Idle;
    }

    fn tick(world: &mut World, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, Command::Tick { dt }, &mut events);
        events
    }

    fn snapshot(world: &World, index: usize) -> PlayerSnapshot {
        query::player_view(world).into_vec()[index]
    }

    fn live_bomb_count(world: &World, index: usize) -> usize {
        world.players[index].bombs.iter().flatten().count()
    }

    #[test]
    fn generation_walls_cover_border_and_pillars() {
        let world = configured_world(15, 15, 4);
        let view = query::arena_view(&world);
        for y in 0..15 {
            for x in 0..15 {
                let on_border = x == 0 || x == 14 || y == 0 || y == 14;
                let on_pillar = x % 2 == 0 && y % 2 == 0;
                if on_border || on_pillar {
                    assert_eq!(
                        view.cell(GridPos::new(x, y)),
                        Some(CellType::SolidWall),
                        "expected wall at ({x}, {y})"
                    );
                } else {
                    assert_ne!(view.cell(GridPos::new(x, y)), Some(CellType::SolidWall));
                }
            }
        }
    }

    #[test]
    fn generation_keeps_spawn_zones_clear() {
        let world = configured_world(15, 15, 4);
        let view = query::arena_view(&world);
        for y in 0..15 {
            for x in 0..15 {
                let pos = GridPos::new(x, y);
                if world.arena.is_spawn_protected(pos) && !world.arena.is_solid_wall(pos) {
                    assert_eq!(
                        view.cell(pos),
                        Some(CellType::Empty),
                        "expected clear floor at ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn generation_is_deterministic_for_equal_seeds() {
        let first = configured_world(15, 15, 4);
        let second = configured_world(15, 15, 4);
        let first_cells: Vec<CellType> = query::arena_view(&first).iter().collect();
        let second_cells: Vec<CellType> = query::arena_view(&second).iter().collect();
        assert_eq!(first_cells, second_cells);
    }

    #[test]
    fn generation_spreads_destructibles_over_open_ground() {
        let world = configured_world(15, 15, 4);
        let destructibles = query::arena_view(&world)
            .iter()
            .filter(|cell| *cell == CellType::Destructible)
            .count();
        let open = query::arena_view(&world)
            .iter()
            .filter(|cell| *cell != CellType::SolidWall)
            .count();
        assert!(destructibles > 0);
        assert!(destructibles < open);
    }

    #[test]
    fn players_spawn_at_arena_corners() {
        let world = configured_world(15, 15, 4);
        let players = query::player_view(&world).into_vec();
        let cells: Vec<GridPos> = players.iter().map(|player| player.position).collect();
        assert_eq!(
            cells,
            vec![
                GridPos::new(1, 1),
                GridPos::new(13, 13),
                GridPos::new(13, 1),
                GridPos::new(1, 13),
            ]
        );
        assert_eq!(players[0].facing, Direction::East);
        assert_eq!(players[1].facing, Direction::West);
        assert_eq!(players[2].facing, Direction::West);
        assert_eq!(players[3].facing, Direction::East);
    }

    #[test]
    fn roster_size_is_clamped_to_corner_spawns() {
        let world = configured_world(15, 15, 9);
        assert_eq!(query::player_view(&world).into_vec().len(), 4);
    }

    #[test]
    fn move_request_never_targets_blocking_cell() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        world.arena.set_cell(GridPos::new(2, 1), CellType::Destructible);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );

        let player = snapshot(&world, 0);
        assert_eq!(player.target, player.position);
        assert_eq!(player.state, PlayerState::Walking);
    }

    #[test]
    fn blocked_move_still_runs_a_bump_cycle() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        // (1, 0) is a border wall, so the move north is rejected
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::North,
            },
            &mut events,
        );
        assert_eq!(snapshot(&world, 0).state, PlayerState::Walking);

        let events = tick(&mut world, Duration::from_millis(250));
        let player = snapshot(&world, 0);
        assert_eq!(player.position, GridPos::new(1, 1));
        assert_eq!(player.progress, 0.0);
        assert_eq!(player.state, PlayerState::Idle);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::PlayerMoved { .. })));
    }

    #[test]
    fn accepted_move_commits_target_and_facing() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        place_player(&mut world, 0, GridPos::new(3, 1));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::West,
            },
            &mut events,
        );
        let player = snapshot(&world, 0);
        assert_eq!(player.target, GridPos::new(2, 1));
        assert_eq!(player.facing, Direction::West);
        assert_eq!(player.state, PlayerState::Walking);

        // speed 5 tiles/s, so a 250 ms tick wraps the transition
        let events = tick(&mut world, Duration::from_millis(250));
        let player = snapshot(&world, 0);
        assert_eq!(player.position, GridPos::new(2, 1));
        assert_eq!(player.progress, 0.0);
        assert_eq!(player.state, PlayerState::Idle);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::PlayerMoved { from, to, .. }
                if *from == GridPos::new(3, 1) && *to == GridPos::new(2, 1)
        )));
    }

    #[test]
    fn vertical_moves_keep_the_current_facing() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::South,
            },
            &mut events,
        );
        assert_eq!(snapshot(&world, 0).facing, Direction::East);
    }

    #[test]
    fn movement_is_idempotent_once_the_transition_wrapped() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );
        let _ = tick(&mut world, Duration::from_millis(250));
        let committed = snapshot(&world, 0);

        for _ in 0..5 {
            let _ = tick(&mut world, Duration::from_millis(250));
        }
        let settled = snapshot(&world, 0);
        assert_eq!(settled.position, committed.position);
        assert_eq!(settled.progress, 0.0);
        assert_eq!(settled.state, PlayerState::Idle);
    }

    #[test]
    fn move_requests_are_ignored_while_walking() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::South,
            },
            &mut events,
        );
        assert_eq!(snapshot(&world, 0).target, GridPos::new(2, 1));
    }

    #[test]
    fn planting_respects_bomb_capacity() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BombPlanted { .. })));
        assert_eq!(live_bomb_count(&world, 0), 1);

        events.clear();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::BombPlantRejected {
                player: PlayerId::new(0),
                reason: PlantError::NoFreeSlot,
            }]
        );
        assert_eq!(live_bomb_count(&world, 0), 1);
    }

    #[test]
    fn extra_capacity_allows_an_extra_live_bomb() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        world.players[0].bombs.push(None);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        assert_eq!(live_bomb_count(&world, 0), 2);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::BombPlantRejected { .. })));
    }

    #[test]
    fn bomb_waits_out_its_full_fuse() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );

        let events = tick(&mut world, Duration::from_millis(2900));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::BombDetonated { .. })));

        let events = tick(&mut world, Duration::from_millis(200));
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BombDetonated { .. })));
    }

    #[test]
    fn fuse_remaining_shrinks_across_ticks() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        let before = query::bomb_view(&world).into_vec()[0]
            .fuse_remaining
            .expect("armed bomb has a fuse");

        let _ = tick(&mut world, Duration::from_millis(500));
        let after = query::bomb_view(&world).into_vec()[0]
            .fuse_remaining
            .expect("armed bomb has a fuse");
        assert!(after < before);
    }

    #[test]
    fn owner_standing_on_the_bomb_absorbs_the_blast() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );

        let mut killed = false;
        for _ in 0..160 {
            let events = tick(&mut world, Duration::from_millis(20));
            if events.iter().any(|event| {
                matches!(event, Event::PlayerKilled { player, .. } if *player == PlayerId::new(0))
            }) {
                killed = true;
            }
        }
        assert!(killed);

        let player = snapshot(&world, 0);
        assert!(!player.alive);
        assert_eq!(player.state, PlayerState::Dead);
        // all four rays die on the body, so the bomb is reaped shortly after
        assert_eq!(live_bomb_count(&world, 0), 0);
        assert!(query::bomb_view(&world).into_vec().is_empty());
    }

    #[test]
    fn ray_terminates_at_the_first_destructible() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        place_player(&mut world, 0, GridPos::new(3, 3));
        world.arena.set_cell(GridPos::new(3, 2), CellType::Destructible);
        world.arena.set_cell(GridPos::new(3, 1), CellType::Destructible);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        // the owner steps aside so the rays outlive the first tick
        place_player(&mut world, 0, GridPos::new(7, 7));

        for _ in 0..170 {
            let _ = tick(&mut world, Duration::from_millis(20));
        }

        let view = query::arena_view(&world);
        // the nearer tile broke into rubble or a power-up
        assert!(!view.is_blocking(GridPos::new(3, 2)));
        // the farther tile was shielded and the border wall was never reached
        assert_eq!(view.cell(GridPos::new(3, 1)), Some(CellType::Destructible));
        assert_eq!(view.cell(GridPos::new(3, 0)), Some(CellType::SolidWall));
    }

    #[test]
    fn north_ray_stops_at_the_border_wall() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        place_player(&mut world, 0, GridPos::new(3, 3));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        place_player(&mut world, 0, GridPos::new(7, 7));

        for _ in 0..170 {
            let _ = tick(&mut world, Duration::from_millis(20));
        }

        let view = query::arena_view(&world);
        assert_eq!(view.cell(GridPos::new(3, 0)), Some(CellType::SolidWall));
        assert_eq!(view.cell(GridPos::new(3, 1)), Some(CellType::Empty));
        assert_eq!(view.cell(GridPos::new(3, 2)), Some(CellType::Empty));
        assert!(query::bomb_view(&world).into_vec().is_empty());
    }

    #[test]
    fn ray_kills_every_player_along_a_clear_stretch_in_one_tick() {
        let mut world = configured_world(15, 15, 4);
        clear_floor(&mut world);
        place_player(&mut world, 0, GridPos::new(5, 3));
        place_player(&mut world, 1, GridPos::new(5, 5));
        place_player(&mut world, 2, GridPos::new(5, 6));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        place_player(&mut world, 0, GridPos::new(9, 9));

        // 70 ms ticks make the sweep fraction jump from below tile 2 to past
        // tile 3 in a single tick, covering both victims at once
        let mut joint_kill_tick = false;
        for _ in 0..60 {
            let events = tick(&mut world, Duration::from_millis(70));
            let killed: Vec<PlayerId> = events
                .iter()
                .filter_map(|event| match event {
                    Event::PlayerKilled { player, .. } => Some(*player),
                    _ => None,
                })
                .collect();
            if killed.contains(&PlayerId::new(1)) && killed.contains(&PlayerId::new(2)) {
                joint_kill_tick = true;
            }
        }

        assert!(joint_kill_tick, "both victims must die in the same tick");
        assert!(!snapshot(&world, 1).alive);
        assert!(!snapshot(&world, 2).alive);
        assert!(snapshot(&world, 0).alive);
    }

    #[test]
    fn friendly_fire_applies_to_everyone_on_the_ray() {
        let mut world = configured_world(15, 15, 2);
        clear_floor(&mut world);
        place_player(&mut world, 0, GridPos::new(3, 3));
        place_player(&mut world, 1, GridPos::new(5, 3));

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        place_player(&mut world, 0, GridPos::new(9, 9));

        for _ in 0..170 {
            let _ = tick(&mut world, Duration::from_millis(20));
        }

        assert!(!snapshot(&world, 1).alive, "east ray reaches the bystander");
        assert!(snapshot(&world, 0).alive);
    }

    #[test]
    fn dead_players_keep_their_roster_slot() {
        let mut world = configured_world(15, 15, 2);
        clear_floor(&mut world);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlantBomb {
                player: PlayerId::new(0),
            },
            &mut events,
        );
        for _ in 0..160 {
            let _ = tick(&mut world, Duration::from_millis(20));
        }

        let players = query::player_view(&world).into_vec();
        assert_eq!(players.len(), 2);
        assert!(!players[0].alive);
        assert!(players[1].alive);
    }

    #[test]
    fn pickup_increments_exactly_one_stat_and_clears_the_tile() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        world.arena.set_cell(GridPos::new(2, 1), CellType::PowerUp);
        let before = snapshot(&world, 0);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );
        let events = tick(&mut world, Duration::from_millis(250));

        let after = snapshot(&world, 0);
        let speed_delta = (after.speed - before.speed) as u32;
        let capacity_delta = after.bomb_capacity - before.bomb_capacity;
        let radius_delta = after.blast_radius - before.blast_radius;
        assert_eq!(speed_delta + capacity_delta + radius_delta, 1);
        assert_eq!(
            query::arena_view(&world).cell(GridPos::new(2, 1)),
            Some(CellType::Empty)
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::PowerUpCollected { .. })));
    }

    #[test]
    fn pickup_waits_for_the_move_to_commit() {
        let mut world = configured_world(15, 15, 1);
        clear_floor(&mut world);
        world.arena.set_cell(GridPos::new(2, 1), CellType::PowerUp);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );
        // progress 0.5 after 100 ms: still mid-transition, nothing collected
        let events = tick(&mut world, Duration::from_millis(100));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::PowerUpCollected { .. })));
        assert_eq!(
            query::arena_view(&world).cell(GridPos::new(2, 1)),
            Some(CellType::PowerUp)
        );
    }

    #[test]
    fn views_are_ordered_by_identifier() {
        let world = configured_world(15, 15, 4);
        let ids: Vec<u32> = query::player_view(&world)
            .iter()
            .map(|player| player.id.get())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
