//! Native 2d point exposed to the host through opaque handles.

use super::value::Value;
use crate::error::{Error, Result};
use crate::memory::{Handle, HandleArena};

pub type PointHandle = Handle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction. The zero vector has no direction
    /// and yields NaN components.
    pub fn normalized(&self) -> Point {
        let norm = self.length();
        Point::new(self.x / norm, self.y / norm)
    }
}

/// Every point the host currently holds. The host removes entries with
/// [`Points::release`] when its own object goes away.
#[derive(Debug, Default)]
pub struct Points {
    arena: HandleArena<Point>,
}

impl Points {
    pub fn new() -> Self {
        Self::default()
    }

    /// `new Point(x, y)`
    pub fn construct(&mut self, args: &[Value]) -> Result<PointHandle> {
        if args.len() != 2 {
            return Err(Error::invalid_argument("x and y arguments required"));
        }
        let (Value::Number(x), Value::Number(y)) = (&args[0], &args[1]) else {
            return Err(Error::invalid_argument("x and y arguments must be numbers"));
        };
        Ok(self.insert(Point::new(*x, *y)))
    }

    pub fn insert(&mut self, point: Point) -> PointHandle {
        self.arena.insert(point)
    }

    pub fn get(&self, handle: PointHandle) -> Result<&Point> {
        self.arena.get(handle).ok_or_else(invalid_handle)
    }

    fn get_mut(&mut self, handle: PointHandle) -> Result<&mut Point> {
        self.arena.get_mut(handle).ok_or_else(invalid_handle)
    }

    pub fn x(&self, handle: PointHandle) -> Result<f64> {
        Ok(self.get(handle)?.x)
    }

    pub fn y(&self, handle: PointHandle) -> Result<f64> {
        Ok(self.get(handle)?.y)
    }

    pub fn set_x(&mut self, handle: PointHandle, value: &Value) -> Result<()> {
        self.get_mut(handle)?.x = value.to_number();
        Ok(())
    }

    pub fn set_y(&mut self, handle: PointHandle, value: &Value) -> Result<()> {
        self.get_mut(handle)?.y = value.to_number();
        Ok(())
    }

    /// `point.normalized()`, a new point.
    pub fn normalized(&mut self, handle: PointHandle) -> Result<PointHandle> {
        let unit = self.get(handle)?.normalized();
        Ok(self.insert(unit))
    }

    pub fn length(&self, handle: PointHandle) -> Result<f64> {
        Ok(self.get(handle)?.length())
    }

    pub fn release(&mut self, handle: PointHandle) -> Result<Point> {
        self.arena.remove(handle).ok_or_else(invalid_handle)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

fn invalid_handle() -> Error {
    Error::invalid_argument("invalid point handle")
}
