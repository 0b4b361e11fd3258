//! The host boundary: dynamic call values and the native bindings exposed
//! through them.

pub mod hello;
pub mod output;
pub mod point;
pub mod value;

pub use hello::HelloBindings;
pub use output::{Capture, Output};
pub use point::{Point, PointHandle, Points};
pub use value::{Function, Value};
