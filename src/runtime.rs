use std::rc::Rc;

use thiserror::Error;

use tsugihagi_core::{BlitRect, PathCmd, Point};

/// Drawing surface contract. The core never draws; it hands command lists to
/// whatever implements this (a canvas context, a recorder in tests, nothing
/// at all in the headless driver). Layers correspond to groups: one layer per
/// live group, released when the group is absorbed by a merge.
pub trait PaintSurface {
    fn set_view(&mut self, zoom: f32, pan: (f32, f32));
    fn clear(&mut self);
    fn begin_layer(&mut self, layer: usize, x: f32, y: f32, rot: u8);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);
    fn clip(&mut self);
    fn blit(&mut self, rect: BlitRect);
    fn release_layer(&mut self, layer: usize);
}

pub fn play_path(surface: &mut dyn PaintSurface, cmds: &[PathCmd]) {
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(p) => surface.move_to(p),
            PathCmd::LineTo(p) => surface.line_to(p),
            PathCmd::CubicTo(c1, c2, p) => surface.cubic_to(c1, c2, p),
            PathCmd::Close => surface.close_path(),
        }
    }
}

/// Image loading facility. `request` starts a load by URL; the embedder
/// reports the outcome by pushing `SrcImageLoaded` / `WrongImage` events
/// carrying the natural pixel dimensions.
pub trait ImageHost {
    fn request(&mut self, src: &str);
}

/// Container the puzzle lives in; only its size is ever queried.
pub trait ContainerQuery {
    fn size(&self) -> (f32, f32);
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded")]
    Quota,
    #[error("storage unavailable")]
    Unavailable,
}

/// Persisted string store, the default save/restore transport when the
/// caller supplies no explicit payload or sink.
pub trait StringStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct AppHooks {
    pub on_ready: Rc<dyn Fn(u32, u32)>,
    pub on_start: Rc<dyn Fn(u32)>,
    pub on_win: Rc<dyn Fn()>,
    pub on_stop: Rc<dyn Fn()>,
}

impl AppHooks {
    pub fn empty() -> Self {
        Self {
            on_ready: Rc::new(|_, _| {}),
            on_start: Rc::new(|_| {}),
            on_win: Rc::new(|| {}),
            on_stop: Rc::new(|| {}),
        }
    }
}
