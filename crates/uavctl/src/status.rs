//! Visual status signaling.
//!
//! The LED is a fire-and-forget side channel: routines announce what they
//! are doing, and a sink that cannot deliver the color logs that itself.
//! Nothing here may fail the run.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);
    pub const MAGENTA: Color = Color::new(255, 0, 255);
    pub const CYAN: Color = Color::new(0, 255, 255);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub trait StatusLed: Send + Sync {
    fn set(&self, color: Color);
    fn off(&self);
}

/// Default sink on hardware without an LED strip: color transitions go to
/// the log instead.
pub struct LogLed;

impl StatusLed for LogLed {
    fn set(&self, color: Color) {
        debug!(target: "uav.status", r = color.r, g = color.g, b = color.b, "status color");
    }

    fn off(&self) {
        debug!(target: "uav.status", "status off");
    }
}
