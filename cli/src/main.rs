use clap::{Parser, Subcommand};
use rand::Rng;

use tsugihagi::{
    AppEvent, AppHooks, AppState, ContainerQuery, ImageHost, PaintSurface, PuzzleApp,
    PuzzleConfig, StoreError, StringStore, SHUFFLE_SETTLE_MS,
};
use tsugihagi_core::shape::COEFF_DECENTR_DEFAULT;
use tsugihagi_core::{best_grid_for_count, codec, BlitRect, Point, SeedStream, ShapeGrid, ShapeKind};

#[derive(Parser)]
#[command(name = "tsugihagi", version, about = "Headless driver for the tsugihagi jigsaw engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a shape grid and print its statistics.
    Shape {
        #[arg(long, default_value_t = 24)]
        pieces: u32,
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long, default_value_t = 1600)]
        width: u32,
        #[arg(long, default_value_t = 900)]
        height: u32,
        #[arg(long, default_value_t = 0)]
        kind: u32,
    },
    /// Scramble a puzzle and auto-play it to the win state.
    Solve {
        #[arg(long, default_value_t = 12)]
        pieces: u32,
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long, default_value_t = 1600)]
        width: u32,
        #[arg(long, default_value_t = 900)]
        height: u32,
        #[arg(long)]
        rotation: bool,
    },
    /// Save a scrambled puzzle, reload it, and verify the round trip.
    Roundtrip {
        #[arg(long, default_value_t = 12)]
        pieces: u32,
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long, default_value_t = 1600)]
        width: u32,
        #[arg(long, default_value_t = 900)]
        height: u32,
        #[arg(long)]
        rotation: bool,
    },
}

struct NullSurface;

impl PaintSurface for NullSurface {
    fn set_view(&mut self, _zoom: f32, _pan: (f32, f32)) {}
    fn clear(&mut self) {}
    fn begin_layer(&mut self, _layer: usize, _x: f32, _y: f32, _rot: u8) {}
    fn move_to(&mut self, _p: Point) {}
    fn line_to(&mut self, _p: Point) {}
    fn cubic_to(&mut self, _c1: Point, _c2: Point, _p: Point) {}
    fn close_path(&mut self) {}
    fn fill(&mut self) {}
    fn stroke(&mut self) {}
    fn clip(&mut self) {}
    fn blit(&mut self, _rect: BlitRect) {}
    fn release_layer(&mut self, _layer: usize) {}
}

struct NullHost;

impl ImageHost for NullHost {
    fn request(&mut self, _src: &str) {}
}

struct FixedContainer {
    width: f32,
    height: f32,
}

impl ContainerQuery for FixedContainer {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

struct MemStore {
    slot: Option<(String, String)>,
}

impl StringStore for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slot
            .as_ref()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.slot = Some((key.to_string(), value.to_string()));
        Ok(())
    }
}

type CliApp = PuzzleApp<NullSurface, NullHost, FixedContainer, MemStore>;

struct Clock {
    now: f64,
}

impl Clock {
    fn new() -> Self {
        Self { now: 0.0 }
    }

    fn tick(&mut self, app: &mut CliApp) {
        self.now += 16.7;
        app.tick(self.now);
    }

    fn advance(&mut self, app: &mut CliApp, ms: f64) {
        self.now += ms;
        app.tick(self.now);
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Shape {
            pieces,
            seed,
            width,
            height,
            kind,
        } => shape_report(pieces, seed, width, height, kind),
        Commands::Solve {
            pieces,
            seed,
            width,
            height,
            rotation,
        } => solve(pieces, seed, width, height, rotation),
        Commands::Roundtrip {
            pieces,
            seed,
            width,
            height,
            rotation,
        } => roundtrip(pieces, seed, width, height, rotation),
    }
}

fn pick_seed(seed: Option<u32>) -> u32 {
    seed.unwrap_or_else(|| rand::thread_rng().gen())
}

fn shape_report(pieces: u32, seed: Option<u32>, width: u32, height: u32, kind: u32) {
    let Some(kind) = ShapeKind::from_index(kind) else {
        eprintln!("unknown shape kind (use 0..=3)");
        std::process::exit(2);
    };
    let seed = pick_seed(seed);
    let aspect = width as f32 / height.max(1) as f32;
    let choice = best_grid_for_count(pieces, aspect);
    let mut rng = SeedStream::new(seed);
    let shape = ShapeGrid::build(
        choice.nx as usize,
        choice.ny as usize,
        COEFF_DECENTR_DEFAULT,
        kind,
        &mut rng,
    );
    let interior_h: usize = (1..shape.ny).map(|_| shape.nx).sum();
    let interior_v: usize = (1..shape.nx).map(|_| shape.ny).sum();
    let sample = shape.piece_side(0, 0, 1);
    println!("seed {seed}");
    println!(
        "grid {}x{} = {} pieces (target {})",
        choice.nx, choice.ny, choice.actual, choice.target
    );
    println!("interior edges: {interior_h} horizontal, {interior_v} vertical");
    println!(
        "piece (0,0) right side: {:?}, {} points",
        sample.kind,
        sample.points.len()
    );
}

fn make_app(pieces: u32, seed: u32, width: u32, height: u32, rotation: bool) -> CliApp {
    let config = PuzzleConfig {
        image: "memory://image".to_string(),
        num_pieces: pieces,
        shape_kind: ShapeKind::Tab,
        allow_rotation: rotation,
        seed: Some(seed),
    };
    let container = FixedContainer {
        width: width as f32,
        height: height as f32,
    };
    match PuzzleApp::new(
        NullSurface,
        NullHost,
        container,
        MemStore { slot: None },
        config,
        AppHooks::empty(),
    ) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("failed to initialize: {err}");
            std::process::exit(2);
        }
    }
}

fn boot_to_playing(app: &mut CliApp, clock: &mut Clock, width: u32, height: u32) {
    app.push_event(AppEvent::SrcImageLoaded {
        src: "memory://image".to_string(),
        width,
        height,
    });
    clock.tick(app);
    app.start();
    clock.tick(app);
    clock.advance(app, SHUFFLE_SETTLE_MS + 100.0);
    if app.state() != AppState::Playing {
        eprintln!("engine did not reach the playing state");
        std::process::exit(2);
    }
}

fn solve(pieces: u32, seed: Option<u32>, width: u32, height: u32, rotation: bool) {
    let seed = pick_seed(seed);
    let mut app = make_app(pieces, seed, width, height, rotation);
    let mut clock = Clock::new();
    boot_to_playing(&mut app, &mut clock, width, height);

    let total = app.board().map(|b| b.total_pieces()).unwrap_or(0);
    println!("seed {seed}: scrambled {total} pieces, solving");

    let mut actions = 0;
    while app.state() == AppState::Playing {
        let Some(step) = next_action(&app) else {
            eprintln!("no playable group found");
            std::process::exit(2);
        };
        match step {
            Action::Rotate { x, y } => {
                app.push_event(AppEvent::Touch { x, y });
                clock.tick(&mut app);
                app.push_event(AppEvent::Leave);
                clock.tick(&mut app);
            }
            Action::Drag { x, y, tx, ty } => {
                app.push_event(AppEvent::Touch { x, y });
                clock.tick(&mut app);
                app.push_event(AppEvent::Move { x: tx, y: ty });
                clock.tick(&mut app);
                // Hold long enough that the release is a drop, not a tap.
                clock.advance(&mut app, 400.0);
                app.push_event(AppEvent::Leave);
                clock.tick(&mut app);
            }
        }
        actions += 1;
        if actions % 8 == 0 {
            println!("  progress {:.0}%", app.progress() * 100.0);
        }
        if actions > total * 16 {
            eprintln!("giving up after {actions} actions");
            std::process::exit(2);
        }
    }
    println!("solved in {actions} actions");
}

enum Action {
    Rotate { x: f32, y: f32 },
    Drag { x: f32, y: f32, tx: f32, ty: f32 },
}

/// Pick the next bot move: unrotate any rotated group, otherwise drag an
/// unsolved group onto its solved position. The grab point is chosen so the
/// target group is the topmost hit there, the same test the app runs. When
/// every unsolved group is buried under another, act on the covering group
/// instead so the pile unblocks itself.
fn next_action(app: &CliApp) -> Option<Action> {
    let board = app.board()?;
    let mut covered: Option<(usize, usize)> = None;
    for group in &board.groups {
        if group.rot == 0 && !needs_move(board, group) {
            continue;
        }
        match grab_point(app, board, group.id) {
            Some((x, y)) => {
                if group.rot != 0 {
                    return Some(Action::Rotate { x, y });
                }
                let solved = board.solved_position(group);
                return Some(Action::Drag {
                    x,
                    y,
                    tx: x - (group.x - solved.0),
                    ty: y - (group.y - solved.1),
                });
            }
            None => {
                if covered.is_none() {
                    let center = group_center(board, group);
                    if let Some(cover) = topmost_hit(app, center.0, center.1) {
                        covered = Some((group.id, cover));
                    }
                }
            }
        }
    }
    let (buried_id, cover_id) = covered?;
    let cover_index = board.group_index(cover_id)?;
    let cover = &board.groups[cover_index];
    let (x, y) = grab_point(app, board, cover_id)?;
    if cover.rot != 0 {
        return Some(Action::Rotate { x, y });
    }
    let buried_index = board.group_index(buried_id)?;
    let buried = &board.groups[buried_index];
    if needs_move(board, cover) {
        let solved = board.solved_position(cover);
        return Some(Action::Drag {
            x,
            y,
            tx: x - (cover.x - solved.0),
            ty: y - (cover.y - solved.1),
        });
    }
    if buried.rot == 0 {
        // Bring the assembled pile to the buried group and let them snap.
        let target = board.screen_of_board_point(buried, 0.0, 0.0);
        let own = board.screen_of_board_point(cover, 0.0, 0.0);
        return Some(Action::Drag {
            x,
            y,
            tx: x + (target.0 - own.0),
            ty: y + (target.1 - own.1),
        });
    }
    // The buried group needs a tap first; haul the pile out of its way.
    let center = group_center(board, buried);
    let park_x = if center.0 > board.nx as f32 * board.piece_w * 0.5 {
        0.0
    } else {
        board.nx as f32 * board.piece_w
    };
    Some(Action::Drag {
        x,
        y,
        tx: x + (park_x - cover.x),
        ty: y,
    })
}

fn needs_move(board: &tsugihagi_core::Board, group: &tsugihagi_core::PolyPiece) -> bool {
    let solved = board.solved_position(group);
    (group.x - solved.0).abs() > 0.5 || (group.y - solved.1).abs() > 0.5
}

fn group_center(
    board: &tsugihagi_core::Board,
    group: &tsugihagi_core::PolyPiece,
) -> (f32, f32) {
    let (w, h) = board.rotated_size(group);
    (group.x + w * 0.5, group.y + h * 0.5)
}

fn grab_point(app: &CliApp, board: &tsugihagi_core::Board, id: usize) -> Option<(f32, f32)> {
    let index = board.group_index(id)?;
    let group = &board.groups[index];
    group
        .pieces
        .iter()
        .map(|&pid| {
            let piece = board.pieces[pid];
            board.screen_of_board_point(
                group,
                (piece.kx as f32 + 0.5) * board.piece_w,
                (piece.ky as f32 + 0.5) * board.piece_h,
            )
        })
        .find(|&(x, y)| topmost_hit(app, x, y) == Some(id))
}

fn topmost_hit(app: &CliApp, x: f32, y: f32) -> Option<usize> {
    let board = app.board()?;
    app.z_order()
        .iter()
        .rev()
        .filter_map(|&id| board.group_index(id))
        .find(|&index| board.group_contains(&board.groups[index], x, y))
        .map(|index| board.groups[index].id)
}

fn roundtrip(pieces: u32, seed: Option<u32>, width: u32, height: u32, rotation: bool) {
    let seed = pick_seed(seed);
    let mut app = make_app(pieces, seed, width, height, rotation);
    let mut clock = Clock::new();
    boot_to_playing(&mut app, &mut clock, width, height);

    let Some(payload) = app.save_payload() else {
        eprintln!("nothing to save");
        std::process::exit(2);
    };
    let payload_len = payload.len();
    let record = match codec::decode(&payload) {
        Ok(record) => record,
        Err(err) => {
            eprintln!("self-produced payload rejected: {err}");
            std::process::exit(1);
        }
    };

    let mut restored = make_app(pieces, seed, width, height, rotation);
    let mut clock2 = Clock::new();
    restored.push_event(AppEvent::SrcImageLoaded {
        src: "memory://image".to_string(),
        width,
        height,
    });
    clock2.tick(&mut restored);
    restored.load(Some(payload));
    clock2.tick(&mut restored);
    if restored.state() != AppState::Playing {
        eprintln!("restore did not reach the playing state");
        std::process::exit(1);
    }

    let original = app.board().map(partition).unwrap_or_default();
    let recovered = restored.board().map(partition).unwrap_or_default();
    if original != recovered {
        eprintln!("round trip changed the group partition");
        std::process::exit(1);
    }
    println!(
        "seed {seed}: {} pieces in {} groups, {payload_len} byte payload, round trip OK",
        record.nx * record.ny,
        record.groups.len(),
    );
}

fn partition(board: &tsugihagi_core::Board) -> Vec<Vec<(u32, u32)>> {
    let mut groups: Vec<Vec<(u32, u32)>> = board
        .groups
        .iter()
        .map(|group| {
            let mut cells = board.cells_of(group);
            cells.sort_unstable();
            cells
        })
        .collect();
    groups.sort();
    groups
}
