//! Keyword spellings for enum-valued keys. Reading tolerates unknown
//! spellings (falling back to the default with a warning); writing is
//! canonical.

use core_model::{
    BarDirection, ChoiceStacking, ColorMode, FillStyle, LineStyle, MonitorLabel,
    RelatedDisplayMode, StripChartUnits, VisibilityMode,
};
use core_colors::LimitSource;
use tracing::warn;

fn fall_back<T: Default>(key: &'static str, value: &str) -> T {
    warn!(target: "adl.read", key, value, "unknown keyword, using default");
    T::default()
}

pub(crate) fn color_mode_to_str(mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::Static => "static",
        ColorMode::Alarm => "alarm",
        ColorMode::Discrete => "discrete",
    }
}

pub(crate) fn color_mode_from_str(value: &str) -> ColorMode {
    match value {
        "static" => ColorMode::Static,
        "alarm" => ColorMode::Alarm,
        "discrete" => ColorMode::Discrete,
        other => fall_back("clrmod", other),
    }
}

pub(crate) fn visibility_to_str(mode: VisibilityMode) -> &'static str {
    match mode {
        VisibilityMode::Static => "static",
        VisibilityMode::IfNotZero => "if not zero",
        VisibilityMode::IfZero => "if zero",
        VisibilityMode::Calc => "calc",
    }
}

pub(crate) fn visibility_from_str(value: &str) -> VisibilityMode {
    match value {
        "static" => VisibilityMode::Static,
        "if not zero" => VisibilityMode::IfNotZero,
        "if zero" => VisibilityMode::IfZero,
        "calc" => VisibilityMode::Calc,
        other => fall_back("vis", other),
    }
}

pub(crate) fn line_style_to_str(style: LineStyle) -> &'static str {
    match style {
        LineStyle::Solid => "solid",
        LineStyle::Dash => "dash",
    }
}

pub(crate) fn line_style_from_str(value: &str) -> LineStyle {
    match value {
        "solid" => LineStyle::Solid,
        "dash" => LineStyle::Dash,
        other => fall_back("style", other),
    }
}

pub(crate) fn fill_style_to_str(fill: FillStyle) -> &'static str {
    match fill {
        FillStyle::Solid => "solid",
        FillStyle::Outline => "outline",
    }
}

pub(crate) fn fill_style_from_str(value: &str) -> FillStyle {
    match value {
        "solid" => FillStyle::Solid,
        "outline" => FillStyle::Outline,
        other => fall_back("fill", other),
    }
}

pub(crate) fn direction_to_str(direction: BarDirection) -> &'static str {
    match direction {
        BarDirection::Up => "up",
        BarDirection::Down => "down",
        BarDirection::Right => "right",
        BarDirection::Left => "left",
    }
}

pub(crate) fn direction_from_str(value: &str) -> BarDirection {
    match value {
        "up" => BarDirection::Up,
        "down" => BarDirection::Down,
        "right" => BarDirection::Right,
        "left" => BarDirection::Left,
        other => fall_back("direction", other),
    }
}

pub(crate) fn label_to_str(label: MonitorLabel) -> &'static str {
    match label {
        MonitorLabel::None => "none",
        MonitorLabel::NoDecorations => "no decorations",
        MonitorLabel::Outline => "outline",
        MonitorLabel::Limits => "limits",
        MonitorLabel::Channel => "channel",
    }
}

pub(crate) fn label_from_str(value: &str) -> MonitorLabel {
    match value {
        "none" => MonitorLabel::None,
        "no decorations" => MonitorLabel::NoDecorations,
        "outline" => MonitorLabel::Outline,
        "limits" => MonitorLabel::Limits,
        "channel" => MonitorLabel::Channel,
        other => fall_back("label", other),
    }
}

pub(crate) fn units_to_str(units: StripChartUnits) -> &'static str {
    match units {
        StripChartUnits::Milliseconds => "milli-second",
        StripChartUnits::Seconds => "second",
        StripChartUnits::Minutes => "minute",
    }
}

pub(crate) fn units_from_str(value: &str) -> StripChartUnits {
    match value {
        "milli-second" => StripChartUnits::Milliseconds,
        "second" => StripChartUnits::Seconds,
        "minute" => StripChartUnits::Minutes,
        other => fall_back("units", other),
    }
}

pub(crate) fn display_mode_to_str(mode: RelatedDisplayMode) -> &'static str {
    match mode {
        RelatedDisplayMode::AddWindow => "add window",
        RelatedDisplayMode::Replace => "replace window",
        RelatedDisplayMode::NewWindow => "new window",
    }
}

pub(crate) fn display_mode_from_str(value: &str) -> RelatedDisplayMode {
    match value {
        "add window" => RelatedDisplayMode::AddWindow,
        "replace window" => RelatedDisplayMode::Replace,
        "new window" => RelatedDisplayMode::NewWindow,
        other => fall_back("policy", other),
    }
}

pub(crate) fn stacking_to_str(stacking: ChoiceStacking) -> &'static str {
    match stacking {
        ChoiceStacking::Row => "row",
        ChoiceStacking::Column => "column",
        ChoiceStacking::RowColumn => "row column",
    }
}

pub(crate) fn stacking_from_str(value: &str) -> ChoiceStacking {
    match value {
        "row" => ChoiceStacking::Row,
        "column" => ChoiceStacking::Column,
        "row column" => ChoiceStacking::RowColumn,
        other => fall_back("stacking", other),
    }
}

pub(crate) fn limit_source_to_str(source: LimitSource) -> &'static str {
    match source {
        LimitSource::Channel => "channel",
        LimitSource::Default => "default",
        LimitSource::User => "user",
    }
}

pub(crate) fn limit_source_from_str(value: &str) -> LimitSource {
    match value {
        "channel" => LimitSource::Channel,
        "default" => LimitSource::Default,
        "user" => LimitSource::User,
        other => fall_back("limit source", other),
    }
}
