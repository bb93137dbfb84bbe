pub mod codec;
pub mod geom;
pub mod grid;
pub mod model;
pub mod outline;
pub mod path;
pub mod rng;
pub mod shape;

pub use codec::{decode, encode, CodecError, SaveRecord, SavedGroup, SAVE_SIGNATURE};
pub use geom::{quarter_rotate, Point, Segment};
pub use grid::{best_grid_for_count, GridChoice};
pub use model::{Board, BoardError, BoardRect, GroupId, PieceId, PolyPiece};
pub use outline::{list_loops, BoundaryEdge};
pub use path::{group_blits, group_paths, BlitRect, PathCmd};
pub use rng::SeedStream;
pub use shape::{ShapeGrid, ShapeKind, Side, SideKind};
