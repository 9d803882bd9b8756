#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots a headless Gridblast round.
//!
//! The adapter configures the arena, walks the session state machine through
//! the menu and countdown, then drives a short scripted round at a fixed
//! frame clock while printing the events the world broadcasts.

use std::time::Duration;

use anyhow::ensure;
use clap::Parser;
use gridblast_core::{CellType, Command, Direction, Event, GridPos, PlayerId};
use gridblast_system_session::{
    FrameInput, PlayerAction, PlayerIntent, Session, SessionState,
};
use gridblast_world::{apply, query, World};

/// Frame clock used to step the session, roughly sixty frames per second.
const FRAME_DT: Duration = Duration::from_micros(16_667);

/// Command-line options for the headless Gridblast demo.
#[derive(Debug, Parser)]
#[command(name = "gridblast", about = "Headless Gridblast arena demo")]
struct Args {
    /// Arena width in tiles, including the border walls.
    #[arg(long, default_value_t = 15)]
    width: u32,
    /// Arena height in tiles, including the border walls.
    #[arg(long, default_value_t = 15)]
    height: u32,
    /// Number of players seated at the corner spawns, at most four.
    #[arg(long, default_value_t = 4)]
    players: u32,
    /// Seed for the deterministic terrain and power-up generator.
    #[arg(long, default_value_t = 0x6772_6964)]
    seed: u64,
    /// Number of frames to simulate once the countdown hands off.
    #[arg(long, default_value_t = 600)]
    frames: u32,
}

/// Entry point for the Gridblast command-line interface.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    ensure!(
        args.width >= 5 && args.height >= 5,
        "arena must be at least 5x5 tiles to fit walls and spawns"
    );

    let mut world = World::new();
    let mut events = Vec::new();
    apply(
        &mut world,
        Command::ConfigureArena {
            width: args.width,
            height: args.height,
            players: args.players,
            rng_seed: args.seed,
        },
        &mut events,
    );
    log::info!(
        "configured {}x{} arena for {} players (seed {:#x})",
        args.width,
        args.height,
        args.players,
        args.seed
    );

    println!("{}", query::game_title(&world));
    for event in &events {
        println!("{event:?}");
    }
    println!("{}", render_board(&world));

    let mut session = Session::new();
    let select = FrameInput {
        menu_select: true,
        ..FrameInput::default()
    };
    let _ = drive(&mut session, &mut world, &select);
    while session.state() == SessionState::Countdown {
        let _ = drive(&mut session, &mut world, &FrameInput::default());
    }

    for frame in 0..args.frames {
        if session.is_exited() {
            break;
        }
        let input = scripted_input(frame);
        let events = drive(&mut session, &mut world, &input);
        for event in &events {
            if !matches!(event, Event::TimeAdvanced { .. }) {
                println!("[frame {frame:4}] {event:?}");
            }
        }
    }

    println!("{}", render_board(&world));
    for player in query::player_view(&world).iter() {
        println!(
            "player {}: {} at ({}, {}), speed {:.1}, radius {}, capacity {}",
            player.id.get(),
            if player.alive { "alive" } else { "dead" },
            player.position.x(),
            player.position.y(),
            player.speed,
            player.blast_radius,
            player.bomb_capacity,
        );
    }
    Ok(())
}

/// Feeds one frame of input to the session and applies the resulting
/// commands, returning the events the world broadcast.
fn drive(session: &mut Session, world: &mut World, input: &FrameInput) -> Vec<Event> {
    let mut commands = Vec::new();
    session.handle(input, FRAME_DT, &mut commands);
    let mut events = Vec::new();
    for command in commands {
        apply(world, command, &mut events);
    }
    events
}

/// Scripted intents for the demo round: the first player plants a bomb on
/// their spawn, flees east and then south, and waits out the blast.
fn scripted_input(frame: u32) -> FrameInput {
    let action = match frame {
        0 => Some(PlayerAction::PlantBomb),
        1..=90 => Some(PlayerAction::Move(Direction::East)),
        91..=180 => Some(PlayerAction::Move(Direction::South)),
        _ => None,
    };
    FrameInput {
        intents: action
            .map(|action| PlayerIntent {
                player: PlayerId::new(0),
                action,
            })
            .into_iter()
            .collect(),
        ..FrameInput::default()
    }
}

/// Renders the arena as one character per tile, row by row.
///
/// Terrain uses `#` for solid walls, `+` for destructible blocks, `*` for
/// exposed power-ups and `.` for open floor; bombs draw as `o` and players
/// as their identifier digit, or `x` once dead.
fn render_board(world: &World) -> String {
    let arena = query::arena_view(world);
    let players = query::player_view(world);
    let bombs = query::bomb_view(world);
    let (width, height) = arena.dimensions();
    let mut board = String::new();
    for y in 0..height {
        for x in 0..width {
            let pos = GridPos::new(x, y);
            let mut glyph = match arena.cell(pos) {
                Some(CellType::SolidWall) => '#',
                Some(CellType::Destructible) => '+',
                Some(CellType::PowerUp) => '*',
                _ => '.',
            };
            if bombs.iter().any(|bomb| bomb.cell == pos) {
                glyph = 'o';
            }
            for player in players.iter() {
                if player.position == pos {
                    glyph = if player.alive {
                        char::from_digit(player.id.get() % 10, 10).unwrap_or('?')
                    } else {
                        'x'
                    };
                }
            }
            board.push(glyph);
        }
        board.push('\n');
    }
    board
}
