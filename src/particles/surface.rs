//! Drawing surfaces for the particle field.
//!
//! `Surface` is the small subset of a 2-D canvas context the field needs.
//! `DrawList` records the calls so a JavaScript host can replay them on a
//! real `CanvasRenderingContext2D`.

use std::fmt;

use glam::Vec2;
use serde::Serialize;

/// A fill or stroke colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Rgba { r: u8, g: u8, b: u8, a: f32 },
    /// Hue in degrees, saturation and lightness in percent.
    Hsla { h: f32, s: f32, l: f32, a: f32 },
}

/// CSS colour syntax, as accepted by `fillStyle` / `strokeStyle`.
impl fmt::Display for Paint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Paint::Rgba { r, g, b, a } => write!(f, "rgba({r}, {g}, {b}, {a})"),
            Paint::Hsla { h, s, l, a } => write!(f, "hsla({h}, {s}%, {l}%, {a})"),
        }
    }
}

pub trait Surface {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn fill_disc(&mut self, center: Vec2, radius: f32, paint: Paint);
    fn stroke_line(&mut self, from: Vec2, to: Vec2, paint: Paint, width: f32);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawCommand {
    Clear {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Disc {
        x: f32,
        y: f32,
        radius: f32,
        fill: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: String,
        width: f32,
    },
}

/// A surface that records draw calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        DrawList::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Surface for DrawList {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.commands.push(DrawCommand::Clear {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_disc(&mut self, center: Vec2, radius: f32, paint: Paint) {
        self.commands.push(DrawCommand::Disc {
            x: center.x,
            y: center.y,
            radius,
            fill: paint.to_string(),
        });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, paint: Paint, width: f32) {
        self.commands.push(DrawCommand::Line {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            stroke: paint.to_string(),
            width,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paints_format_as_css() {
        let cyan = Paint::Rgba {
            r: 0,
            g: 212,
            b: 255,
            a: 0.5,
        };
        assert_eq!(cyan.to_string(), "rgba(0, 212, 255, 0.5)");
        let hue = Paint::Hsla {
            h: 120.0,
            s: 100.0,
            l: 50.0,
            a: 0.8,
        };
        assert_eq!(hue.to_string(), "hsla(120, 100%, 50%, 0.8)");
    }

    #[test]
    fn draw_list_serializes_as_tagged_ops() {
        let mut list = DrawList::new();
        list.clear_rect(0.0, 0.0, 10.0, 20.0);
        list.stroke_line(
            Vec2::new(1.0, 2.0),
            Vec2::new(3.0, 4.0),
            Paint::Rgba { r: 1, g: 2, b: 3, a: 1.0 },
            0.5,
        );
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json[0]["op"], "clear");
        assert_eq!(json[0]["height"], 20.0);
        assert_eq!(json[1]["op"], "line");
        assert_eq!(json[1]["stroke"], "rgba(1, 2, 3, 1)");
        assert_eq!(list.len(), 2);
    }
}
