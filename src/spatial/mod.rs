//! Cell coordinates, sizes and per-layer tile storage.

mod index;

pub use index::*;
