use glam::Vec2;

/// Half the height of the visible slice of the gradient plane, in UV units.
pub const UV_HALF_HEIGHT: f32 = 0.19176;

/// Maps screen pixels onto the part of the UV plane that is on screen.
///
/// The window is centred on `(0.5, 0.5)`. Its height is fixed and its width
/// follows the aspect ratio, so resizing reveals more of the field instead of
/// stretching it. UV `y` grows upward; pixel `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvWindow {
    pub center: Vec2,
    pub half_extent: Vec2,
}

impl UvWindow {
    pub fn for_size(width: u32, height: u32) -> Self {
        let aspect = if height == 0 {
            1.0
        } else {
            width.max(1) as f32 / height as f32
        };
        Self {
            center: Vec2::splat(0.5),
            half_extent: Vec2::new(UV_HALF_HEIGHT * aspect, UV_HALF_HEIGHT),
        }
    }

    /// UV at the centre of pixel `(x, y)` in a `width × height` target.
    pub fn pixel_to_uv(&self, x: u32, y: u32, width: u32, height: u32) -> Vec2 {
        let ndc = Vec2::new(
            (x as f32 + 0.5) / width.max(1) as f32 * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5) / height.max(1) as f32 * 2.0,
        );
        self.center + ndc * self.half_extent
    }
}
