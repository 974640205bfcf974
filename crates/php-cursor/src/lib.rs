pub mod cursor;

pub use cursor::{Checkpoint, Cursor, Furthest, Mode, MAX_DEPTH};
