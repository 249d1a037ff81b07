// Theme - every color, font and spacing constant the layout and draw
// passes consume. Values are data: the layout algorithm never hard-codes
// them. Loadable from TOML so a host can restyle without recompiling.

use crate::draw_context::{
    FONT_CODE, FONT_CONTENT, FONT_CONTENT_BOLD, FONT_CONTENT_BOLD_ITALIC, FONT_CONTENT_ITALIC,
    FONT_HEADING, FontId, TextFormat,
};
use crate::document::TextStyle;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    pub font: FontId,
    pub size: u8,
    pub color: u32,
}

impl FontSettings {
    pub fn format(&self, zoom: f64) -> TextFormat {
        TextFormat::new(self.font, scale_size(self.size, zoom))
    }
}

impl Default for FontSettings {
    fn default() -> Self {
        FontSettings {
            font: FONT_CONTENT,
            size: 14,
            color: 0x000000FF,
        }
    }
}

fn scale_size(size: u8, zoom: f64) -> u8 {
    ((size as f64) * zoom).round().clamp(4.0, 255.0) as u8
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background_color: u32,
    pub selection_color: u32,
    pub match_color: u32,
    pub active_match_color: u32,

    pub quote_bar_color: u32,
    pub quote_bar_width: f64,
    pub code_background: u32,
    pub rule_color: u32,
    pub heading_underline_color: u32,
    pub image_placeholder_color: u32,

    pub link_color: u32,
    pub link_hover_color: u32,

    pub padding_vertical: f64,
    pub padding_horizontal: f64,

    pub line_height: f64,
    /// Extra leading above a heading, multiplied by (7 - level)
    pub heading_leading_step: f64,
    pub heading_trailing_gap: f64,
    pub paragraph_gap: f64,
    pub list_gap: f64,
    pub list_indent: f64,
    pub quote_indent: f64,
    pub code_padding: f64,
    pub code_gap: f64,
    pub table_cell_padding: f64,
    pub ruby_annotation_scale: f64,
    pub image_width: f64,
    pub image_height: f64,
    /// Height of the search overlay bar the host draws at the top
    pub search_overlay_height: f64,

    pub plain_text: FontSettings,
    pub bold_text: FontSettings,
    pub italic_text: FontSettings,
    pub bold_italic_text: FontSettings,
    pub quote_text: FontSettings,
    pub code_text: FontSettings,
    pub header_level_1: FontSettings,
    pub header_level_2: FontSettings,
    pub header_level_3: FontSettings,
    pub link_text: FontSettings,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background_color: 0xFFFFF5FF,      // Off-white background
            selection_color: 0xB4D5FEFF,       // Light blue selection
            match_color: 0xFFF59DFF,           // Pale yellow search match
            active_match_color: 0xFFB74DFF,    // Orange active match
            quote_bar_color: 0xCCCCCCFF,
            quote_bar_width: 4.0,
            code_background: 0xF0F0E8FF,
            rule_color: 0xBBBBBBFF,
            heading_underline_color: 0xDDDDD0FF,
            image_placeholder_color: 0xE8E8E0FF,
            link_color: 0x0000EEFF,
            link_hover_color: 0x0000AAFF,

            padding_vertical: 10.0,
            padding_horizontal: 25.0,

            line_height: 17.0,
            heading_leading_step: 2.0,
            heading_trailing_gap: 10.0,
            paragraph_gap: 5.0,
            list_gap: 2.0,
            list_indent: 20.0,
            quote_indent: 20.0,
            code_padding: 5.0,
            code_gap: 10.0,
            table_cell_padding: 6.0,
            ruby_annotation_scale: 0.5,
            image_width: 240.0,
            image_height: 120.0,
            search_overlay_height: 32.0,

            plain_text: FontSettings {
                font: FONT_CONTENT,
                size: 14,
                color: 0x000000FF,
            },
            bold_text: FontSettings {
                font: FONT_CONTENT_BOLD,
                size: 14,
                color: 0x000000FF,
            },
            italic_text: FontSettings {
                font: FONT_CONTENT_ITALIC,
                size: 14,
                color: 0x000000FF,
            },
            bold_italic_text: FontSettings {
                font: FONT_CONTENT_BOLD_ITALIC,
                size: 14,
                color: 0x000000FF,
            },
            quote_text: FontSettings {
                font: FONT_CONTENT_ITALIC,
                size: 14,
                color: 0x555555FF,
            },
            code_text: FontSettings {
                font: FONT_CODE,
                size: 14,
                color: 0x0064C8FF,
            },
            header_level_1: FontSettings {
                font: FONT_HEADING,
                size: 24,
                color: 0x000000FF,
            },
            header_level_2: FontSettings {
                font: FONT_HEADING,
                size: 20,
                color: 0x000000FF,
            },
            header_level_3: FontSettings {
                font: FONT_HEADING,
                size: 18,
                color: 0x000000FF,
            },
            link_text: FontSettings {
                font: FONT_CONTENT,
                size: 14,
                color: 0x0000EEFF,
            },
        }
    }
}

impl Theme {
    /// Parse a theme from TOML. Missing keys fall back to the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Font settings for inline text with the given style flags
    pub fn text_settings(&self, style: &TextStyle) -> FontSettings {
        if style.bold && style.italic {
            self.bold_italic_text
        } else if style.bold {
            self.bold_text
        } else if style.italic {
            self.italic_text
        } else {
            self.plain_text
        }
    }

    /// Font settings for a heading level (levels beyond 3 reuse level 3
    /// metrics, matching the reference rendering)
    pub fn heading_settings(&self, level: u8) -> FontSettings {
        match level {
            1 => self.header_level_1,
            2 => self.header_level_2,
            _ => self.header_level_3,
        }
    }

    /// Extra vertical space above a heading, larger for higher levels
    pub fn heading_leading(&self, level: u8, zoom: f64) -> f64 {
        self.heading_leading_step * f64::from(7 - level.min(6)) * zoom
    }

    /// Visual line height for a font size at the given zoom
    pub fn line_height_for(&self, settings: &FontSettings, zoom: f64) -> f64 {
        let base = f64::from(settings.size) * 1.3;
        base.max(self.line_height) * zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_theme_is_consistent() {
        let theme = Theme::default();
        assert_eq!(theme.plain_text.size, 14);
        assert!(theme.heading_leading(1, 1.0) > theme.heading_leading(3, 1.0));
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let theme = Theme::from_toml_str(
            r#"
            background_color = 0xFFFFFFFF
            line_height = 20.0

            [plain_text]
            size = 16
            "#,
        )
        .unwrap();
        assert_eq!(theme.background_color, 0xFFFFFFFF);
        assert_eq!(theme.line_height, 20.0);
        assert_eq!(theme.plain_text.size, 16);
        // Untouched keys keep their defaults
        assert_eq!(theme.code_text.font, FONT_CODE);
    }

    #[test]
    fn text_settings_follow_style_flags() {
        let theme = Theme::default();
        let mut style = TextStyle::default();
        assert_eq!(theme.text_settings(&style).font, FONT_CONTENT);
        style.bold = true;
        assert_eq!(theme.text_settings(&style).font, FONT_CONTENT_BOLD);
        style.italic = true;
        assert_eq!(theme.text_settings(&style).font, FONT_CONTENT_BOLD_ITALIC);
    }

    #[test]
    fn zoom_scales_formats() {
        let theme = Theme::default();
        let format = theme.plain_text.format(2.0);
        assert_eq!(format.size, 28);
    }
}
