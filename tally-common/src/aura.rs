//! Pointer position math for the card aura effect.

pub const CARD_CLASS: &str = "card";
pub const MOUSE_X_PROPERTY: &str = "--mouse-x";
pub const MOUSE_Y_PROPERTY: &str = "--mouse-y";

/// Client-space bounding box of an element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Rect {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    /// Cursor position relative to this box, in percent of its size.
    ///
    /// Returns `None` for a collapsed box.
    pub fn pointer_percent(&self, client_x: f64, client_y: f64) -> Option<(f64, f64)> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = (client_x - self.left) / self.width * 100.0;
        let y = (client_y - self.top) / self.height * 100.0;
        Some((x, y))
    }
}

/// CSS value for a percentage, e.g. `50%`.
pub fn css_percent(value: f64) -> String {
    format!("{value}%")
}
