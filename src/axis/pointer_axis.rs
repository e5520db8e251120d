use serde::{Deserialize, Serialize};
use std::fmt;

use crate::controller::device_sampler::PointerState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenDimension {
    #[default]
    Horizontal,
    Vertical,
}

impl ScreenDimension {
    /// Integer tag used by the key-value stores
    pub fn as_index(self) -> i64 {
        match self {
            ScreenDimension::Horizontal => 0,
            ScreenDimension::Vertical => 1,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(ScreenDimension::Horizontal),
            1 => Some(ScreenDimension::Vertical),
            _ => None,
        }
    }
}

impl fmt::Display for ScreenDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenDimension::Horizontal => write!(f, "X"),
            ScreenDimension::Vertical => write!(f, "Y"),
        }
    }
}

/// Screen size independent pointer position axis
///
/// `center` places the zero point on the screen (-1 left or bottom edge, +1
/// right or top edge). `range` is the fraction of the screen that spans the
/// full -1..1 output, 0 meaning a single pixel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerAxis {
    pub dimension: ScreenDimension,
    center: f32,
    range: f32,
}

impl Default for PointerAxis {
    fn default() -> Self {
        Self {
            dimension: ScreenDimension::Horizontal,
            center: 0.0,
            range: 0.5,
        }
    }
}

impl PointerAxis {
    pub fn new(dimension: ScreenDimension, center: f32, range: f32) -> Self {
        let mut axis = Self {
            dimension,
            ..Default::default()
        };
        axis.set_center(center);
        axis.set_range(range);
        axis
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    pub fn set_center(&mut self, center: f32) {
        self.center = if center.is_nan() {
            0.0
        } else {
            center.clamp(-1.0, 1.0)
        };
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn set_range(&mut self, range: f32) {
        self.range = if range.is_nan() {
            0.5
        } else {
            range.clamp(0.0, 1.0)
        };
    }

    /// Output for a pointer coordinate on a screen dimension of `screen_size` pixels
    pub fn output_for(&self, position: f32, screen_size: f32) -> f32 {
        let mut range_pixels = if self.range == 0.0 {
            1.0
        } else {
            screen_size * self.range / 2.0
        };
        // Zero sized screens report before the first resize
        if range_pixels == 0.0 {
            range_pixels = 1.0;
        }
        let center_pixel = screen_size / 2.0 + screen_size / 2.0 * self.center;
        ((position - center_pixel) / range_pixels).clamp(-1.0, 1.0)
    }

    pub fn evaluate(&self, pointer: &PointerState) -> f32 {
        match self.dimension {
            ScreenDimension::Horizontal => self.output_for(pointer.x, pointer.screen_width),
            ScreenDimension::Vertical => self.output_for(pointer.y, pointer.screen_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_quarter_position_saturates() {
        let axis = PointerAxis::new(ScreenDimension::Horizontal, 0.0, 0.5);
        assert_eq!(axis.output_for(750.0, 1000.0), 1.0);
        assert_eq!(axis.output_for(625.0, 1000.0), 0.5);
        assert_eq!(axis.output_for(500.0, 1000.0), 0.0);
    }

    #[test]
    fn center_offset_moves_zero_point() {
        let axis = PointerAxis::new(ScreenDimension::Vertical, -1.0, 1.0);
        // Zero at the bottom edge, full range spans half the screen
        assert_eq!(axis.output_for(0.0, 800.0), 0.0);
        assert_eq!(axis.output_for(200.0, 800.0), 0.5);
    }

    #[test]
    fn zero_range_is_one_pixel() {
        let axis = PointerAxis::new(ScreenDimension::Horizontal, 0.0, 0.0);
        assert_eq!(axis.output_for(501.0, 1000.0), 1.0);
        assert_eq!(axis.output_for(499.5, 1000.0), -0.5);
    }

    #[test]
    fn zero_screen_does_not_divide_by_zero() {
        let axis = PointerAxis::default();
        let pointer = PointerState::default();
        assert_eq!(axis.evaluate(&pointer), 0.0);
    }

    #[test]
    fn parameters_are_clamped() {
        let axis = PointerAxis::new(ScreenDimension::Horizontal, 3.0, -1.0);
        assert_eq!(axis.center(), 1.0);
        assert_eq!(axis.range(), 0.0);
    }

    #[test]
    fn evaluate_picks_dimension() {
        let pointer = PointerState {
            x: 1000.0,
            y: 0.0,
            screen_width: 1000.0,
            screen_height: 500.0,
        };
        let horizontal = PointerAxis::new(ScreenDimension::Horizontal, 0.0, 1.0);
        let vertical = PointerAxis::new(ScreenDimension::Vertical, 0.0, 1.0);
        assert_eq!(horizontal.evaluate(&pointer), 1.0);
        assert_eq!(vertical.evaluate(&pointer), -1.0);
    }
}
