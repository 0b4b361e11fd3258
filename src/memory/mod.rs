//! Storage for native state owned by the host boundary.

pub mod arena;

pub use arena::{Handle, HandleArena};
