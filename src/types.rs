//! Fixed-size value records shared with the native side.
//!
//! Layouts match `cv::Point2f` and `cv::Point` field for field, so bulk copies
//! write them directly without per-element conversion.

use serde::{Deserialize, Serialize};

/// 2D point with `f32` coordinates (`cv::Point2f`).
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D point with `i32` coordinates (`cv::Point`).
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Point2f {
    fn from(p: Point) -> Self {
        Self::new(p.x as f32, p.y as f32)
    }
}

const _: () = assert!(size_of::<Point2f>() == 8 && align_of::<Point2f>() == 4);
const _: () = assert!(size_of::<Point>() == 8 && align_of::<Point>() == 4);
