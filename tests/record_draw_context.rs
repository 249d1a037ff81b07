// Recording DrawContext for integration tests. Metrics are a monospace
// estimate (0.6 units per character and point) so geometry is fully
// deterministic across machines.

use mdview::draw_context::{DrawContext, FontId, ShapedText, TextFormat};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Text { text: String, x: i32, y: i32 },
    RectFilled { x: i32, y: i32, w: i32, h: i32, color: u32 },
    Line { x1: i32, y1: i32, x2: i32, y2: i32, color: u32 },
    Image { x: i32, y: i32, w: i32, h: i32, destination: String },
}

#[derive(Debug, Default)]
pub struct RecordDrawContext {
    pub ops: Vec<RecordedOp>,
    current_color: u32,
}

impl RecordDrawContext {
    pub fn new() -> Self {
        RecordDrawContext::default()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RecordedOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn rect_count_with_color(&self, color: u32) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::RectFilled { color: c, .. } if *c == color))
            .count()
    }
}

impl DrawContext for RecordDrawContext {
    fn set_color(&mut self, color: u32) {
        self.current_color = color;
    }

    fn set_font(&mut self, _font: FontId, _size: u8) {}

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.ops.push(RecordedOp::Text {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn draw_rect_filled(&mut self, x: i32, y: i32, w: i32, h: i32) {
        let color = self.current_color;
        self.ops.push(RecordedOp::RectFilled { x, y, w, h, color });
    }

    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let color = self.current_color;
        self.ops.push(RecordedOp::Line { x1, y1, x2, y2, color });
    }

    fn draw_image_placeholder(&mut self, x: i32, y: i32, w: i32, h: i32, destination: &str) {
        self.ops.push(RecordedOp::Image {
            x,
            y,
            w,
            h,
            destination: destination.to_string(),
        });
    }

    fn text_width(&mut self, text: &str, _font: FontId, size: u8) -> f64 {
        text.chars().count() as f64 * f64::from(size) * 0.6
    }

    fn text_height(&self, _font: FontId, size: u8) -> i32 {
        (f64::from(size) * 1.2) as i32
    }

    fn text_descent(&self, _font: FontId, size: u8) -> i32 {
        (f64::from(size) * 0.2) as i32
    }

    fn push_clip(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {}

    fn pop_clip(&mut self) {}

    fn shape(&mut self, text: &str, format: TextFormat) -> Option<ShapedText> {
        let width = self.text_width(text, format.font, format.size);
        Some(ShapedText {
            text: text.to_string(),
            width,
        })
    }
}
