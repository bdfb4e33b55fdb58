//! Graphic attributes shared by shapes, text, images and composites.

/// Number of channel slots a dynamic attribute carries (`A`..`E`).
pub const GRAPHIC_CHANNEL_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Static,
    Alarm,
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityMode {
    #[default]
    Static,
    IfNotZero,
    IfZero,
    Calc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillStyle {
    #[default]
    Solid,
    Outline,
}

/// The `basic attribute` block: how a shape is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicAttrs {
    /// Palette index of the foreground color.
    pub color: usize,
    pub style: LineStyle,
    pub fill: FillStyle,
    pub line_width: u32,
}

impl Default for BasicAttrs {
    fn default() -> Self {
        Self {
            color: 14, // black
            style: LineStyle::Solid,
            fill: FillStyle::Solid,
            line_width: 0,
        }
    }
}

/// The `dynamic attribute` block: color mode, visibility rule, calc
/// expression and up to five channels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphicAttrs {
    pub color_mode: ColorMode,
    pub visibility_mode: VisibilityMode,
    pub calc: String,
    pub channels: [String; GRAPHIC_CHANNEL_COUNT],
}

impl GraphicAttrs {
    /// True when at least one channel slot names a PV.
    pub fn has_channel(&self) -> bool {
        self.channels.iter().any(|name| !name.trim().is_empty())
    }

    /// True when the attribute actually reacts to channel data: some
    /// channel is named AND either color or visibility is dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.has_channel()
            && (self.color_mode != ColorMode::Static
                || self.visibility_mode != VisibilityMode::Static)
    }

    pub fn channel(&self, slot: usize) -> &str {
        self.channels
            .get(slot)
            .map(String::as_str)
            .unwrap_or("")
    }
}
