//! Cell format construction and caching

use indexmap::IndexMap;
use log::warn;
use rust_xlsxwriter::{Color, Format, FormatAlign};

use crate::column::StyleAttrs;

/// Cache key: the declared attributes plus which side of the column the
/// format is for. Column position and header never participate, so two
/// columns with identical attributes share one format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum StyleKey {
    Header(StyleAttrs),
    Data { attrs: StyleAttrs, v_center: bool },
}

/// Memoizes computed header and data formats for one export.
///
/// Each sheet writer owns its own cache; nothing is shared across exports.
#[derive(Debug, Default)]
pub struct StyleCache {
    formats: IndexMap<StyleKey, Format>,
}

impl StyleCache {
    /// Create an empty cache
    pub fn new() -> Self {
        StyleCache {
            formats: IndexMap::new(),
        }
    }

    /// Number of distinct cached formats
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Header format for a column: bold, blue font unless overridden,
    /// optional background fill
    pub fn header_format(&mut self, attrs: &StyleAttrs) -> Format {
        self.formats
            .entry(StyleKey::Header(attrs.clone()))
            .or_insert_with(|| build_header_format(attrs))
            .clone()
    }

    /// Data format for a column; row-span columns are vertically centered
    /// so merged groups read as one cell
    pub fn data_format(&mut self, attrs: &StyleAttrs, row_span: bool) -> Format {
        self.formats
            .entry(StyleKey::Data {
                attrs: attrs.clone(),
                v_center: row_span,
            })
            .or_insert_with(|| build_data_format(attrs, row_span))
            .clone()
    }
}

fn build_header_format(attrs: &StyleAttrs) -> Format {
    let mut format = Format::new().set_bold();

    match &attrs.header_font_color {
        Some(color) => {
            if let Some(c) = parse_color(color) {
                format = format.set_font_color(c);
            }
        }
        None => format = format.set_font_color(Color::Blue),
    }

    if let Some(bg) = &attrs.header_background_color {
        if let Some(c) = parse_color(bg) {
            format = format.set_background_color(c);
        }
    }

    format
}

fn build_data_format(attrs: &StyleAttrs, v_center: bool) -> Format {
    let mut format = Format::new();

    if let Some(color) = &attrs.font_color {
        if let Some(c) = parse_color(color) {
            format = format.set_font_color(c);
        }
    }

    if attrs.font_bold {
        format = format.set_bold();
    }

    if let Some(bg) = &attrs.background_color {
        if let Some(c) = parse_color(bg) {
            format = format.set_background_color(c);
        }
    }

    if let Some(num_format) = &attrs.num_format {
        if !num_format.is_empty() {
            format = format.set_num_format(num_format);
        }
    }

    if v_center {
        format = format.set_align(FormatAlign::VerticalCenter);
    }

    format
}

/// Parse a `#RRGGBB` (or `RRGGBB`) hex color. Invalid colors are dropped
/// with a warning; the attribute falls back to the default.
fn parse_color(value: &str) -> Option<Color> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 {
        warn!("invalid color '{}' - attribute ignored", value);
        return None;
    }
    match u32::from_str_radix(hex, 16) {
        Ok(rgb) => Some(Color::RGB(rgb)),
        Err(_) => {
            warn!("invalid color '{}' - attribute ignored", value);
            None
        }
    }
}
