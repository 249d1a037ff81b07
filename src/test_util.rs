// Deterministic DrawContext for unit tests: monospace-estimate metrics
// (0.6 units per character and point) and a recording of what was drawn.

use crate::draw_context::{DrawContext, FontId, ShapedText, TextFormat};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text { text: String, x: i32, y: i32 },
    RectFilled { x: i32, y: i32, w: i32, h: i32, color: u32 },
    Line { x1: i32, y1: i32, x2: i32, y2: i32 },
    Image { x: i32, y: i32, destination: String },
}

#[derive(Debug, Default)]
pub struct FakeDrawContext {
    pub ops: Vec<DrawOp>,
    current_color: u32,
    clip_depth: usize,
    fail_on: Option<String>,
}

impl FakeDrawContext {
    pub fn new() -> Self {
        FakeDrawContext::default()
    }

    /// A context whose shaper fails for one exact string
    pub fn failing_on(text: &str) -> Self {
        FakeDrawContext {
            fail_on: Some(text.to_string()),
            ..FakeDrawContext::default()
        }
    }

    pub fn drawn_texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawContext for FakeDrawContext {
    fn set_color(&mut self, color: u32) {
        self.current_color = color;
    }

    fn set_font(&mut self, _font: FontId, _size: u8) {}

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn draw_rect_filled(&mut self, x: i32, y: i32, w: i32, h: i32) {
        let color = self.current_color;
        self.ops.push(DrawOp::RectFilled { x, y, w, h, color });
    }

    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.ops.push(DrawOp::Line { x1, y1, x2, y2 });
    }

    fn draw_image_placeholder(&mut self, x: i32, y: i32, _w: i32, _h: i32, destination: &str) {
        self.ops.push(DrawOp::Image {
            x,
            y,
            destination: destination.to_string(),
        });
    }

    // Monospace estimate: width ~ 0.6 * size per character
    fn text_width(&mut self, text: &str, _font: FontId, size: u8) -> f64 {
        text.chars().count() as f64 * f64::from(size) * 0.6
    }

    fn text_height(&self, _font: FontId, size: u8) -> i32 {
        (f64::from(size) * 1.2) as i32
    }

    fn text_descent(&self, _font: FontId, size: u8) -> i32 {
        (f64::from(size) * 0.2) as i32
    }

    fn push_clip(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {
        self.clip_depth += 1;
    }

    fn pop_clip(&mut self) {
        self.clip_depth = self.clip_depth.saturating_sub(1);
    }

    fn shape(&mut self, text: &str, format: TextFormat) -> Option<ShapedText> {
        if self.fail_on.as_deref() == Some(text) {
            return None;
        }
        let width = self.text_width(text, format.font, format.size);
        Some(ShapedText {
            text: text.to_string(),
            width,
        })
    }
}
