use std::collections::VecDeque;

use log::{debug, warn};
use rand::Rng;
use thiserror::Error;

use tsugihagi_core::shape::COEFF_DECENTR_DEFAULT;
use tsugihagi_core::{
    best_grid_for_count, codec, group_blits, group_paths, Board, BoardRect, SaveRecord,
    SavedGroup, SeedStream, ShapeGrid, ShapeKind,
};

use crate::input::{ClickGesture, PinchTracker};
use crate::runtime::{
    play_path, AppHooks, ContainerQuery, ImageHost, PaintSurface, StringStore,
};

pub const SHUFFLE_SETTLE_MS: f64 = 1200.0;
pub const WIN_SETTLE_MS: f64 = 2000.0;
pub const ZOOM_MIN: f32 = 0.5;
pub const ZOOM_MAX: f32 = 2.0;
pub const WHEEL_ZOOM_STEP: f32 = 1.1;
pub const SHUFFLE_MARGIN_RATIO: f32 = 0.03;
pub const DEFAULT_TARGET_COUNT: u32 = 50;

#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    Touch { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Leave,
    Touches { ax: f32, ay: f32, bx: f32, by: f32 },
    Moves { ax: f32, ay: f32, bx: f32, by: f32 },
    Wheel { x: f32, y: f32, delta: f32 },
    Resize { width: f32, height: f32 },
    Save,
    Restore { payload: Option<String> },
    Reset,
    StartRequest { num_pieces: u32 },
    SrcImageLoaded { src: String, width: u32, height: u32 },
    WrongImage { src: String },
    Finished,
    Stop,
}

impl AppEvent {
    fn coalesces_with(&self, tail: &AppEvent) -> bool {
        matches!(
            (self, tail),
            (AppEvent::Move { .. }, AppEvent::Move { .. })
                | (AppEvent::Moves { .. }, AppEvent::Moves { .. })
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Preview,
    Building,
    Shuffling,
    Playing,
    Won,
    Restoring,
    RestoringWaitImage,
}

#[derive(Clone, Debug)]
pub struct PuzzleConfig {
    pub image: String,
    pub num_pieces: u32,
    pub shape_kind: ShapeKind,
    pub allow_rotation: bool,
    pub seed: Option<u32>,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            num_pieces: DEFAULT_TARGET_COUNT,
            shape_kind: ShapeKind::Tab,
            allow_rotation: false,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigPatch {
    pub num_pieces: Option<u32>,
    pub shape_kind: Option<ShapeKind>,
    pub allow_rotation: Option<bool>,
    pub seed: Option<u32>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("container has no usable size")]
    MissingContainer,
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    group_id: usize,
    grab_dx: f32,
    grab_dy: f32,
}

#[derive(Clone, Copy, Debug)]
struct PanDrag {
    start: (f32, f32),
    origin: (f32, f32),
}

/// Single-threaded, frame-driven controller. All input is serialized into
/// the event queue; `tick` consumes at most one event per call. Pending
/// moves coalesce at the queue tail, long transitions are one-shot timer
/// events, and every failure path lands back in a stable state.
pub struct PuzzleApp<P, H, C, S>
where
    P: PaintSurface,
    H: ImageHost,
    C: ContainerQuery,
    S: StringStore,
{
    surface: P,
    images: H,
    container: C,
    store: S,
    hooks: AppHooks,
    config: PuzzleConfig,
    state: AppState,
    queue: VecDeque<AppEvent>,
    timer: Option<(f64, AppEvent)>,
    board: Option<Board>,
    pending_start: Option<u32>,
    seed: u32,
    scramble_nonce: u32,
    requested_src: String,
    natural: Option<(u32, u32)>,
    pending_restore: Option<SaveRecord>,
    drag: Option<DragState>,
    pan_drag: Option<PanDrag>,
    gesture: ClickGesture,
    pinch: PinchTracker,
    zoom: f32,
    pan: (f32, f32),
    z_order: Vec<usize>,
    container_size: (f32, f32),
    destroyed: bool,
    dirty: bool,
}

impl<P, H, C, S> PuzzleApp<P, H, C, S>
where
    P: PaintSurface,
    H: ImageHost,
    C: ContainerQuery,
    S: StringStore,
{
    pub fn new(
        surface: P,
        mut images: H,
        container: C,
        store: S,
        config: PuzzleConfig,
        hooks: AppHooks,
    ) -> Result<Self, AppError> {
        let size = container.size();
        if size.0 <= 0.0 || size.1 <= 0.0 {
            return Err(AppError::MissingContainer);
        }
        let requested_src = config.image.clone();
        if !requested_src.is_empty() {
            images.request(&requested_src);
        }
        Ok(Self {
            surface,
            images,
            container,
            store,
            hooks,
            config,
            state: AppState::Preview,
            queue: VecDeque::new(),
            timer: None,
            board: None,
            pending_start: None,
            seed: 0,
            scramble_nonce: 0,
            requested_src,
            natural: None,
            pending_restore: None,
            drag: None,
            pan_drag: None,
            gesture: ClickGesture::new(),
            pinch: PinchTracker::new(),
            zoom: 1.0,
            pan: (0.0, 0.0),
            z_order: Vec::new(),
            container_size: size,
            destroyed: false,
            dirty: false,
        })
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn z_order(&self) -> &[usize] {
        &self.z_order
    }

    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    pub fn progress(&self) -> f32 {
        self.board.as_ref().map(|b| b.progress()).unwrap_or(0.0)
    }

    pub fn push_event(&mut self, event: AppEvent) {
        if self.destroyed {
            return;
        }
        if let Some(tail) = self.queue.back_mut() {
            if event.coalesces_with(tail) {
                *tail = event;
                return;
            }
        }
        self.queue.push_back(event);
    }

    pub fn start(&mut self) {
        let num_pieces = self.config.num_pieces;
        self.push_event(AppEvent::StartRequest { num_pieces });
    }

    pub fn stop(&mut self) {
        self.push_event(AppEvent::Stop);
    }

    pub fn reset(&mut self) {
        self.push_event(AppEvent::Reset);
    }

    pub fn save(&mut self) {
        self.push_event(AppEvent::Save);
    }

    pub fn load(&mut self, payload: Option<String>) {
        self.push_event(AppEvent::Restore { payload });
    }

    /// Explicit-sink save: returns the payload directly, bypassing the store.
    pub fn save_payload(&self) -> Option<String> {
        self.build_save_record().map(|record| codec::encode(&record))
    }

    pub fn set_image(&mut self, src: &str) {
        self.drop_board();
        self.config.image = src.to_string();
        self.requested_src = src.to_string();
        self.natural = None;
        self.pending_restore = None;
        self.state = AppState::Preview;
        self.images.request(src);
    }

    pub fn set_options(&mut self, patch: ConfigPatch) {
        if let Some(num_pieces) = patch.num_pieces {
            self.config.num_pieces = num_pieces.max(1);
        }
        if let Some(shape_kind) = patch.shape_kind {
            self.config.shape_kind = shape_kind;
        }
        if let Some(allow_rotation) = patch.allow_rotation {
            self.config.allow_rotation = allow_rotation;
        }
        if patch.seed.is_some() {
            self.config.seed = patch.seed;
        }
    }

    pub fn destroy(&mut self) {
        self.timer = None;
        self.queue.clear();
        self.drop_board();
        self.destroyed = true;
    }

    /// One state-machine step: the due timer event if any, otherwise at most
    /// one queued event.
    pub fn tick(&mut self, now_ms: f64) {
        if self.destroyed {
            return;
        }
        let timer_due = self
            .timer
            .as_ref()
            .map_or(false, |(fire_at, _)| now_ms >= *fire_at);
        let event = if timer_due {
            self.timer.take().map(|(_, event)| event)
        } else {
            self.queue.pop_front()
        };
        if let Some(event) = event {
            self.step(event, now_ms);
        }
        // A build waiting on its image resumes as soon as the precondition
        // holds; until then the machine just waits for the next tick.
        if self.state == AppState::Building && self.natural.is_some() {
            if let Some(num_pieces) = self.pending_start.take() {
                self.begin_build(num_pieces, now_ms);
            }
        }
        if self.dirty {
            self.render();
            self.dirty = false;
        }
    }

    fn step(&mut self, event: AppEvent, now: f64) {
        match event {
            AppEvent::SrcImageLoaded { src, width, height } => {
                self.on_image_loaded(src, width, height)
            }
            AppEvent::WrongImage { src } => self.on_image_failed(src),
            AppEvent::StartRequest { num_pieces } => self.on_start_request(num_pieces, now),
            AppEvent::Finished => self.on_finished(),
            AppEvent::Touch { x, y } => self.on_touch(x, y, now),
            AppEvent::Move { x, y } => self.on_move(x, y),
            AppEvent::Leave => self.on_leave(now),
            AppEvent::Touches { ax, ay, bx, by } => self.on_touches(ax, ay, bx, by),
            AppEvent::Moves { ax, ay, bx, by } => self.on_moves(ax, ay, bx, by),
            AppEvent::Wheel { x, y, delta } => self.on_wheel(x, y, delta),
            AppEvent::Resize { width, height } => self.on_resize(width, height),
            AppEvent::Save => self.on_save(),
            AppEvent::Restore { payload } => self.on_restore(payload),
            AppEvent::Reset => {
                self.drop_board();
                self.state = AppState::Preview;
                self.dirty = true;
            }
            AppEvent::Stop => {
                self.drop_board();
                self.state = AppState::Preview;
                self.dirty = true;
                (self.hooks.on_stop)();
            }
        }
    }

    fn on_image_loaded(&mut self, src: String, width: u32, height: u32) {
        if src != self.requested_src {
            debug!("ignoring load of replaced image {src}");
            return;
        }
        self.natural = Some((width, height));
        match self.state {
            AppState::Preview => {
                (self.hooks.on_ready)(width, height);
                self.dirty = true;
            }
            AppState::RestoringWaitImage => self.finish_restore(),
            _ => {}
        }
    }

    fn on_image_failed(&mut self, src: String) {
        if src != self.requested_src {
            return;
        }
        self.natural = None;
        match self.state {
            AppState::RestoringWaitImage => {
                debug!("restore abandoned: image failed to load");
                self.pending_restore = None;
                self.drop_board();
                self.state = AppState::Preview;
            }
            AppState::Building => {
                warn!("image {src} failed to load, build abandoned");
                self.pending_start = None;
                self.state = AppState::Preview;
            }
            _ => warn!("image {src} failed to load"),
        }
        self.dirty = true;
    }

    fn on_start_request(&mut self, num_pieces: u32, now: f64) {
        if !matches!(self.state, AppState::Preview | AppState::Won) {
            return;
        }
        if self.requested_src.is_empty() {
            warn!("start requested with no image set");
            return;
        }
        if self.natural.is_none() {
            // Image still on its way; Building waits for it tick by tick.
            self.state = AppState::Building;
            self.pending_start = Some(num_pieces);
            return;
        }
        self.state = AppState::Building;
        self.begin_build(num_pieces, now);
    }

    fn begin_build(&mut self, num_pieces: u32, now: f64) {
        let Some((natural_w, natural_h)) = self.natural else {
            return;
        };
        let aspect = natural_w as f32 / natural_h.max(1) as f32;
        let choice = best_grid_for_count(num_pieces, aspect);
        self.seed = self
            .config
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen::<u32>());
        let (board_w, _) = self.fit_board(natural_w, natural_h);
        self.build_board(choice.nx, choice.ny, board_w, self.seed, self.config.shape_kind);
        (self.hooks.on_start)(choice.actual);
        self.scatter(now);
        self.state = AppState::Shuffling;
        self.timer = Some((now + SHUFFLE_SETTLE_MS, AppEvent::Finished));
        self.dirty = true;
    }

    fn on_finished(&mut self) {
        match self.state {
            AppState::Shuffling => {
                self.state = AppState::Playing;
                self.dirty = true;
            }
            AppState::Won => {
                self.drop_board();
                self.state = AppState::Preview;
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn on_touch(&mut self, x: f32, y: f32, now: f64) {
        match self.state {
            AppState::Won => {
                // Win acknowledged by hand.
                self.timer = None;
                self.drop_board();
                self.state = AppState::Preview;
                self.dirty = true;
            }
            AppState::Playing => {
                let (bx, by) = self.to_board(x, y);
                let Some(board) = self.board.as_ref() else {
                    return;
                };
                let hit = self
                    .z_order
                    .iter()
                    .rev()
                    .filter_map(|&id| board.group_index(id))
                    .find(|&index| board.group_contains(&board.groups[index], bx, by));
                match hit {
                    Some(index) => {
                        let group = &board.groups[index];
                        self.drag = Some(DragState {
                            group_id: group.id,
                            grab_dx: bx - group.x,
                            grab_dy: by - group.y,
                        });
                        self.gesture.arm(x, y, now);
                        let id = group.id;
                        self.raise(id);
                    }
                    None => {
                        self.pan_drag = Some(PanDrag {
                            start: (x, y),
                            origin: self.pan,
                        });
                    }
                }
                self.dirty = true;
            }
            _ => {}
        }
    }

    fn on_move(&mut self, x: f32, y: f32) {
        if self.state != AppState::Playing {
            return;
        }
        if let Some(drag) = self.drag {
            let (bx, by) = self.to_board(x, y);
            if let Some(board) = self.board.as_mut() {
                if let Some(index) = board.group_index(drag.group_id) {
                    board.groups[index].x = bx - drag.grab_dx;
                    board.groups[index].y = by - drag.grab_dy;
                }
            }
            self.gesture.update(x, y);
            self.dirty = true;
        } else if let Some(pan_drag) = self.pan_drag {
            self.pan = (
                pan_drag.origin.0 + (x - pan_drag.start.0),
                pan_drag.origin.1 + (y - pan_drag.start.1),
            );
            self.dirty = true;
        }
    }

    fn on_leave(&mut self, now: f64) {
        self.pan_drag = None;
        self.pinch.clear();
        let Some(drag) = self.drag.take() else {
            self.gesture.clear();
            return;
        };
        if self.state != AppState::Playing {
            self.gesture.clear();
            return;
        }
        let quick_tap = self.gesture.is_click(now);
        self.gesture.clear();
        let bounds = self.board_bounds();
        let connect = self.board.as_ref().map(|b| b.connect_distance());
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(index) = board.group_index(drag.group_id) else {
            return;
        };
        if quick_tap && self.config.allow_rotation {
            board.rotate_cw(index);
            board.clamp_into(index, bounds);
        }
        let (_, released) = board.merge_scan(index, connect.unwrap_or(0.0));
        for id in &released {
            self.surface.release_layer(*id);
            self.z_order.retain(|z| z != id);
        }
        let won = board.is_won();
        self.rebuild_z_order(None);
        self.dirty = true;
        if won {
            self.state = AppState::Won;
            self.timer = Some((now + WIN_SETTLE_MS, AppEvent::Finished));
            (self.hooks.on_win)();
        }
    }

    fn on_touches(&mut self, ax: f32, ay: f32, bx: f32, by: f32) {
        if self.state != AppState::Playing {
            return;
        }
        self.drag = None;
        self.gesture.clear();
        self.pinch.start(ax, ay, bx, by);
    }

    fn on_moves(&mut self, ax: f32, ay: f32, bx: f32, by: f32) {
        if self.state != AppState::Playing || !self.pinch.is_active() {
            return;
        }
        if let Some((ratio, mid)) = self.pinch.update(ax, ay, bx, by) {
            self.zoom_about(mid, ratio);
            self.dirty = true;
        }
    }

    fn on_wheel(&mut self, x: f32, y: f32, delta: f32) {
        if self.state != AppState::Playing {
            return;
        }
        let factor = if delta < 0.0 {
            WHEEL_ZOOM_STEP
        } else {
            1.0 / WHEEL_ZOOM_STEP
        };
        self.zoom_about((x, y), factor);
        self.dirty = true;
    }

    fn on_resize(&mut self, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let old = self.container_size;
        self.container_size = (width, height);
        if self.state == AppState::Playing || self.state == AppState::Shuffling {
            let sx = width / old.0.max(1.0);
            let sy = height / old.1.max(1.0);
            let bounds = self.board_bounds();
            if let Some(board) = self.board.as_mut() {
                for index in 0..board.groups.len() {
                    board.groups[index].x *= sx;
                    board.groups[index].y *= sy;
                    board.clamp_into(index, bounds);
                }
            }
        }
        self.dirty = true;
    }

    fn on_save(&mut self) {
        let Some(record) = self.build_save_record() else {
            debug!("nothing to save");
            return;
        };
        let payload = codec::encode(&record);
        if let Err(err) = self.store.set(codec::SAVE_SIGNATURE, &payload) {
            // Best-effort convenience; the puzzle keeps running.
            warn!("save to default store failed: {err}");
        }
    }

    fn on_restore(&mut self, payload: Option<String>) {
        if matches!(
            self.state,
            AppState::Restoring | AppState::RestoringWaitImage
        ) {
            return;
        }
        let payload = payload.or_else(|| self.store.get(codec::SAVE_SIGNATURE));
        let Some(payload) = payload else {
            debug!("no saved game to restore");
            return;
        };
        let prior = self.state;
        self.state = AppState::Restoring;
        let record = match codec::decode(&payload) {
            Ok(record) => record,
            Err(err) => {
                // Silently abandoned; the game goes on as if nothing happened.
                debug!("restore rejected: {err}");
                self.state = prior;
                return;
            }
        };
        let dims_match = self.natural == Some((record.natural_width, record.natural_height));
        let same_src = record.image_src == self.requested_src;
        let src = record.image_src.clone();
        self.pending_restore = Some(record);
        if same_src && dims_match {
            self.finish_restore();
        } else {
            self.requested_src = src.clone();
            self.natural = None;
            self.state = AppState::RestoringWaitImage;
            self.images.request(&src);
        }
    }

    fn finish_restore(&mut self) {
        let Some(record) = self.pending_restore.take() else {
            self.state = AppState::Preview;
            return;
        };
        let Some((natural_w, natural_h)) = self.natural else {
            self.state = AppState::Preview;
            return;
        };
        if (natural_w, natural_h) != (record.natural_width, record.natural_height) {
            warn!(
                "restore abandoned: image is {natural_w}x{natural_h}, save expects {}x{}",
                record.natural_width, record.natural_height
            );
            self.drop_board();
            self.state = AppState::Preview;
            self.dirty = true;
            return;
        }
        self.drop_board();
        let saved: Vec<(f32, f32, u8, Vec<(u32, u32)>)> = record
            .groups
            .iter()
            .map(|g| (g.x as f32, g.y as f32, g.rot, g.cells.clone()))
            .collect();
        let mut rng = SeedStream::new(record.seed);
        let shape = ShapeGrid::build(
            record.nx as usize,
            record.ny as usize,
            COEFF_DECENTR_DEFAULT,
            record.shape_kind,
            &mut rng,
        );
        let board_w = record.board_width as f32;
        let board_h = board_w * record.natural_height as f32 / record.natural_width.max(1) as f32;
        let piece_w = board_w / record.nx as f32;
        let piece_h = board_h / record.ny as f32;
        match Board::from_groups(&shape, piece_w, piece_h, &saved) {
            Ok(board) => {
                // The saved group order is the z-order, bottom to top.
                self.z_order = board.groups.iter().map(|g| g.id).collect();
                self.board = Some(board);
                self.seed = record.seed;
                self.config.allow_rotation = record.rotation_allowed;
                self.config.shape_kind = record.shape_kind;
                self.config.num_pieces = record.nx * record.ny;
                self.config.image = record.image_src.clone();
                self.state = AppState::Playing;
            }
            Err(err) => {
                debug!("restore rejected: {err}");
                self.state = AppState::Preview;
            }
        }
        self.dirty = true;
    }

    fn build_board(&mut self, nx: u32, ny: u32, board_w: f32, seed: u32, kind: ShapeKind) {
        let mut rng = SeedStream::new(seed);
        let shape = ShapeGrid::build(nx as usize, ny as usize, COEFF_DECENTR_DEFAULT, kind, &mut rng);
        let Some((natural_w, natural_h)) = self.natural else {
            return;
        };
        let board_h = board_w * natural_h as f32 / natural_w.max(1) as f32;
        let piece_w = board_w / nx as f32;
        let piece_h = board_h / ny as f32;
        let board = Board::build(&shape, piece_w, piece_h);
        self.z_order = board.groups.iter().map(|g| g.id).collect();
        self.board = Some(board);
        self.zoom = 1.0;
        self.pan = (0.0, 0.0);
    }

    fn fit_board(&self, natural_w: u32, natural_h: u32) -> (f32, f32) {
        let (cw, ch) = self.container_size;
        let scale = (cw / natural_w.max(1) as f32)
            .min(ch / natural_h.max(1) as f32)
            .min(1.0);
        (
            (natural_w as f32 * scale).round(),
            (natural_h as f32 * scale).round(),
        )
    }

    fn scatter(&mut self, _now: f64) {
        self.scramble_nonce = self.scramble_nonce.wrapping_add(1);
        let bounds = self.board_bounds();
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let mut rng = SeedStream::new(scramble_seed(
            self.seed,
            self.scramble_nonce,
            board.nx,
            board.ny,
        ));
        let margin = (bounds.w.min(bounds.h) * SHUFFLE_MARGIN_RATIO).max(1.0);
        let allow_rotation = self.config.allow_rotation;
        for index in 0..board.groups.len() {
            if allow_rotation {
                board.groups[index].rot = rng.int_below(4) as u8;
            }
            let (w, h) = board.rotated_size(&board.groups[index]);
            let min_x = bounds.x + margin;
            let max_x = (bounds.x + bounds.w - w - margin).max(min_x);
            let min_y = bounds.y + margin;
            let max_y = (bounds.y + bounds.h - h - margin).max(min_y);
            board.groups[index].x = rng.range(min_x, max_x);
            board.groups[index].y = rng.range(min_y, max_y);
        }
    }

    fn build_save_record(&self) -> Option<SaveRecord> {
        let board = self.board.as_ref()?;
        let (natural_w, natural_h) = self.natural?;
        let groups = self
            .z_order
            .iter()
            .filter_map(|&id| board.group_index(id))
            .map(|index| {
                let group = &board.groups[index];
                SavedGroup {
                    x: group.x.round() as i32,
                    y: group.y.round() as i32,
                    rot: group.rot,
                    cells: board.cells_of(group),
                }
            })
            .collect();
        Some(SaveRecord {
            image_src: self.requested_src.clone(),
            origin_tag: None,
            nx: board.nx as u32,
            ny: board.ny as u32,
            board_width: (board.nx as f32 * board.piece_w).round() as u32,
            seed: self.seed,
            rotation_allowed: self.config.allow_rotation,
            shape_kind: self.config.shape_kind,
            natural_width: natural_w,
            natural_height: natural_h,
            groups,
        })
    }

    fn drop_board(&mut self) {
        if self.board.take().is_some() {
            for id in self.z_order.drain(..) {
                self.surface.release_layer(id);
            }
        }
        self.timer = None;
        self.pending_start = None;
        self.drag = None;
        self.pan_drag = None;
        self.gesture.clear();
        self.pinch.clear();
    }

    fn to_board(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pan.0) / self.zoom, (y - self.pan.1) / self.zoom)
    }

    fn board_bounds(&self) -> BoardRect {
        BoardRect {
            x: -self.pan.0 / self.zoom,
            y: -self.pan.1 / self.zoom,
            w: self.container_size.0 / self.zoom,
            h: self.container_size.1 / self.zoom,
        }
    }

    fn zoom_about(&mut self, mid: (f32, f32), factor: f32) {
        let new_zoom = (self.zoom * factor).clamp(ZOOM_MIN, ZOOM_MAX);
        let bx = (mid.0 - self.pan.0) / self.zoom;
        let by = (mid.1 - self.pan.1) / self.zoom;
        self.pan = (mid.0 - bx * new_zoom, mid.1 - by * new_zoom);
        self.zoom = new_zoom;
    }

    fn raise(&mut self, id: usize) {
        self.z_order.retain(|z| *z != id);
        self.z_order.push(id);
    }

    /// Larger groups draw above smaller ones; the captured group, if any,
    /// stays on top of everything.
    fn rebuild_z_order(&mut self, captured: Option<usize>) {
        let Some(board) = self.board.as_ref() else {
            return;
        };
        let mut order: Vec<(usize, usize)> = board
            .groups
            .iter()
            .map(|g| (g.pieces.len(), g.id))
            .collect();
        order.sort_by_key(|&(size, id)| (size, id));
        self.z_order = order.into_iter().map(|(_, id)| id).collect();
        if let Some(id) = captured {
            self.raise(id);
        }
    }

    fn render(&mut self) {
        self.surface.set_view(self.zoom, self.pan);
        self.surface.clear();
        let Some(board) = self.board.as_ref() else {
            return;
        };
        for &id in &self.z_order {
            let Some(index) = board.group_index(id) else {
                continue;
            };
            let group = &board.groups[index];
            self.surface.begin_layer(group.id, group.x, group.y, group.rot);
            for cmds in group_paths(board, group) {
                play_path(&mut self.surface, &cmds);
            }
            self.surface.clip();
            for rect in group_blits(board, group) {
                self.surface.blit(rect);
            }
            self.surface.stroke();
        }
    }
}

/// Derived seed for a reshuffle, so scatters replay per (seed, nonce, grid).
fn scramble_seed(base: u32, nonce: u32, nx: usize, ny: usize) -> u32 {
    let grid = ((nx as u32) << 16) ^ (ny as u32);
    base ^ nonce.wrapping_mul(0x9E37_79B9) ^ grid ^ 0x5CA7_7EED
}
