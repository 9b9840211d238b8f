use serde::{Deserialize, Serialize};

use crate::location::Location;

pub const DEFAULT_MAP_WIDTH_PX: u32 = 1000;
pub const DEFAULT_MAP_HEIGHT_PX: u32 = 500;

/// Position on the world-map image, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// Equirectangular projection of `loc` onto a `width_px` x `height_px` map.
pub fn project(loc: &Location, width_px: u32, height_px: u32) -> PixelPoint {
    PixelPoint {
        x: (loc.longitude() + 180.0) / 360.0 * width_px as f64,
        y: (90.0 - loc.latitude()) / 180.0 * height_px as f64,
    }
}
