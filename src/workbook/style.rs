//! Cosmetic cell styling, mapped onto rust_xlsxwriter formats when saving

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};
use umya_spreadsheet::{Border, HorizontalAlignmentValues, VerticalAlignmentValues};

/// Common number formats.
pub struct CellFormat;

impl CellFormat {
    /// 1000 → 1,000
    pub const NUM_THOU: &'static str = "#,##0_ ";
    /// 1000 → 1,000.0
    pub const NUM_THOU_DEC: &'static str = "#,##0.0_ ";
    /// 1000 → 1,000.00
    pub const NUM_THOU_DEC2: &'static str = "#,##0.00_ ";
    pub const NUM_DEC: &'static str = "0.0_ ";
    pub const NUM_DEC2: &'static str = "0.00_ ";
    pub const NUM_DEC3: &'static str = "0.000_ ";
    pub const NUM_DEC4: &'static str = "0.0000_ ";
    pub const NUM_NORMAL: &'static str = "0_ ";
    pub const PERCENT_DEC2: &'static str = "0.00%";
    pub const PERCENT_DEC1: &'static str = "0.0%";
    pub const PERCENT_DEC0: &'static str = "0%";
    /// Text
    pub const TEXT: &'static str = "@";
    pub const GENERAL: &'static str = "General";
    pub const DEFAULT_SHORT_DATE: &'static str = "yyyy-mm-dd;@";
    pub const SHORT_DATE: &'static str = "yyyy/m/d";
    pub const DATE_TIME: &'static str = "yyyy-mm-dd hh:mm:ss";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Presentation attached to a written cell. Has no effect on cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct CellStyle {
    pub font_name: String,
    pub font_size: f64,
    pub bold: bool,
    pub border: bool,
    pub wrap_text: bool,
    /// RGB, e.g. `0xFFC7CE`
    pub background: Option<u32>,
    pub font_color: Option<u32>,
    pub number_format: Option<String>,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            font_name: "Calibri".to_string(),
            font_size: 10.0,
            bold: false,
            border: true,
            wrap_text: true,
            background: None,
            font_color: None,
            number_format: None,
            horizontal: HorizontalAlign::Left,
            vertical: VerticalAlign::Center,
        }
    }
}

impl CellStyle {
    pub fn with_font(mut self, name: impl Into<String>, size: f64) -> Self {
        self.font_name = name.into();
        self.font_size = size;
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_border(mut self, border: bool) -> Self {
        self.border = border;
        self
    }

    pub fn with_wrap_text(mut self, wrap: bool) -> Self {
        self.wrap_text = wrap;
        self
    }

    pub fn with_background(mut self, rgb: u32) -> Self {
        self.background = Some(rgb);
        self
    }

    pub fn with_font_color(mut self, rgb: u32) -> Self {
        self.font_color = Some(rgb);
        self
    }

    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    pub fn with_alignment(mut self, horizontal: HorizontalAlign, vertical: VerticalAlign) -> Self {
        self.horizontal = horizontal;
        self.vertical = vertical;
        self
    }

    pub(crate) fn to_format(&self) -> Format {
        let mut format = Format::new()
            .set_font_name(self.font_name.as_str())
            .set_font_size(self.font_size)
            .set_align(match self.horizontal {
                HorizontalAlign::Left => FormatAlign::Left,
                HorizontalAlign::Center => FormatAlign::Center,
                HorizontalAlign::Right => FormatAlign::Right,
            })
            .set_align(match self.vertical {
                VerticalAlign::Top => FormatAlign::Top,
                VerticalAlign::Center => FormatAlign::VerticalCenter,
                VerticalAlign::Bottom => FormatAlign::Bottom,
            });

        if self.bold {
            format = format.set_bold();
        }
        if self.border {
            format = format.set_border(FormatBorder::Thin);
        }
        if self.wrap_text {
            format = format.set_text_wrap();
        }
        if let Some(rgb) = self.background {
            format = format.set_background_color(Color::RGB(rgb));
        }
        if let Some(rgb) = self.font_color {
            format = format.set_font_color(Color::RGB(rgb));
        }
        if let Some(num_format) = &self.number_format {
            format = format.set_num_format(num_format.as_str());
        }
        format
    }

    /// Same mapping as [`to_format`](Self::to_format), onto a cell of a
    /// patched source workbook.
    pub(crate) fn apply_to(&self, style: &mut umya_spreadsheet::Style) {
        let font = style.get_font_mut();
        font.set_name(self.font_name.as_str());
        font.set_size(self.font_size);
        font.set_bold(self.bold);
        if let Some(rgb) = self.font_color {
            font.get_color_mut().set_argb(argb(rgb));
        }

        let alignment = style.get_alignment_mut();
        alignment.set_horizontal(match self.horizontal {
            HorizontalAlign::Left => HorizontalAlignmentValues::Left,
            HorizontalAlign::Center => HorizontalAlignmentValues::Center,
            HorizontalAlign::Right => HorizontalAlignmentValues::Right,
        });
        alignment.set_vertical(match self.vertical {
            VerticalAlign::Top => VerticalAlignmentValues::Top,
            VerticalAlign::Center => VerticalAlignmentValues::Center,
            VerticalAlign::Bottom => VerticalAlignmentValues::Bottom,
        });
        alignment.set_wrap_text(self.wrap_text);

        if self.border {
            let borders = style.get_borders_mut();
            borders.get_left_mut().set_border_style(Border::BORDER_THIN);
            borders.get_right_mut().set_border_style(Border::BORDER_THIN);
            borders.get_top_mut().set_border_style(Border::BORDER_THIN);
            borders.get_bottom_mut().set_border_style(Border::BORDER_THIN);
        }
        if let Some(rgb) = self.background {
            style.set_background_color(argb(rgb));
        }
        if let Some(num_format) = &self.number_format {
            style.get_number_format_mut().set_format_code(num_format.as_str());
        }
    }
}

/// `0xRRGGBB` → opaque `"FFRRGGBB"`
fn argb(rgb: u32) -> String {
    format!("FF{:06X}", rgb & 0xFF_FFFF)
}
