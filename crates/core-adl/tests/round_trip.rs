//! Round-trip laws: parse∘write is structural identity, and
//! write∘parse is byte identity on writer-produced text.

use core_adl::{load_display, parse_display, save_display, write_display};
use core_colors::{LimitSource, PvLimits};
use core_model::{
    BarConfig, BarDirection, BasicAttrs, ByteConfig, CartesianConfig, CartesianTrace,
    ChoiceButtonConfig, ChoiceStacking, ColorMode, Composite, Display, FillStyle, GraphicAttrs,
    HeatmapConfig, ImageConfig, LineStyle, MenuConfig, MessageButtonConfig, MeterConfig,
    MonitorLabel, PlotAxisRange, Rect, RelatedDisplayConfig, RelatedDisplayEntry,
    RelatedDisplayMode, ScaleConfig, ShellCommandConfig, ShellCommandEntry, SliderConfig,
    StripChartConfig, StripChartPen, StripChartUnits, TextConfig, TextEntryConfig,
    TextMonitorConfig, VisibilityMode, WheelSwitchConfig, Widget, WidgetKind,
};

fn dynamic_attrs() -> GraphicAttrs {
    let mut attrs = GraphicAttrs {
        color_mode: ColorMode::Alarm,
        visibility_mode: VisibilityMode::Calc,
        calc: "A=B&&C<2".into(),
        ..GraphicAttrs::default()
    };
    attrs.channels[0] = "S:VIS".into();
    attrs.channels[1] = "S:AUX".into();
    attrs.channels[4] = "pva://S:LAST".into();
    attrs
}

fn user_limits() -> PvLimits {
    PvLimits {
        low_source: LimitSource::User,
        low_default: -5.5,
        high_source: LimitSource::Default,
        high_default: 12.25,
        precision_source: LimitSource::User,
        precision_default: 3,
        ..PvLimits::default()
    }
}

fn full_display() -> Display {
    Display {
        file_name: "every_widget.adl".into(),
        version: 30122,
        geometry: Rect::new(0, 0, 800, 600),
        color: 14,
        background: 4,
        widgets: vec![
            Widget::new(
                Rect::new(0, 0, 40, 20),
                WidgetKind::Rectangle(
                    BasicAttrs {
                        color: 20,
                        style: LineStyle::Dash,
                        fill: FillStyle::Outline,
                        line_width: 2,
                    },
                    dynamic_attrs(),
                ),
            ),
            Widget::new(
                Rect::new(50, 0, 40, 20),
                WidgetKind::Oval(BasicAttrs::default(), GraphicAttrs::default()),
            ),
            Widget::new(
                Rect::new(100, 0, 40, 20),
                WidgetKind::Arc(BasicAttrs::default(), dynamic_attrs()),
            ),
            Widget::new(
                Rect::new(150, 0, 40, 20),
                WidgetKind::Line(BasicAttrs::default(), GraphicAttrs::default()),
            ),
            Widget::new(
                Rect::new(0, 30, 100, 40),
                WidgetKind::Polyline(
                    BasicAttrs::default(),
                    GraphicAttrs::default(),
                    vec![(0, 30), (50, 70), (100, 30)],
                ),
            ),
            Widget::new(
                Rect::new(0, 80, 100, 40),
                WidgetKind::Polygon(
                    BasicAttrs::default(),
                    dynamic_attrs(),
                    vec![(0, 80), (100, 80), (50, 120)],
                ),
            ),
            Widget::new(
                Rect::new(0, 130, 120, 20),
                WidgetKind::Text(TextConfig {
                    text: "quoted \"text\" with\nbreaks and \\slashes".into(),
                    basic: BasicAttrs::default(),
                    dynamic: GraphicAttrs::default(),
                }),
            ),
            Widget::new(
                Rect::new(0, 160, 64, 64),
                WidgetKind::Image(ImageConfig {
                    image_name: "beamline.gif".into(),
                    dynamic: dynamic_attrs(),
                }),
            ),
            Widget::new(
                Rect::new(200, 0, 80, 80),
                WidgetKind::Meter(MeterConfig {
                    channel: "BEAM:I".into(),
                    color: 15,
                    background: 2,
                    color_mode: ColorMode::Alarm,
                    label: MonitorLabel::Limits,
                    limits: user_limits(),
                }),
            ),
            Widget::new(
                Rect::new(290, 0, 30, 120),
                WidgetKind::Bar(BarConfig {
                    channel: "TANK:LVL".into(),
                    direction: BarDirection::Up,
                    label: MonitorLabel::Outline,
                    ..BarConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(330, 0, 30, 120),
                WidgetKind::Scale(ScaleConfig {
                    channel: "TANK:PRES".into(),
                    direction: BarDirection::Down,
                    ..ScaleConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(370, 0, 120, 20),
                WidgetKind::TextMonitor(TextMonitorConfig {
                    channel: "STATUS:MSG".into(),
                    color_mode: ColorMode::Alarm,
                    ..TextMonitorConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(370, 30, 120, 16),
                WidgetKind::Byte(ByteConfig {
                    channel: "STATUS:BITS".into(),
                    start_bit: 7,
                    end_bit: 0,
                    ..ByteConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(0, 240, 300, 120),
                WidgetKind::StripChart(StripChartConfig {
                    title: "Ring current".into(),
                    color: 14,
                    background: 0,
                    period: 120.0,
                    units: StripChartUnits::Minutes,
                    pens: vec![
                        StripChartPen {
                            channel: "RING:I".into(),
                            color: 20,
                            limits: user_limits(),
                        },
                        StripChartPen {
                            channel: "RING:LIFETIME".into(),
                            color: 25,
                            limits: PvLimits::default(),
                        },
                    ],
                }),
            ),
            Widget::new(
                Rect::new(310, 240, 300, 120),
                WidgetKind::CartesianPlot(CartesianConfig {
                    title: "Orbit".into(),
                    color: 14,
                    background: 0,
                    count: "ORBIT:N".into(),
                    traces: vec![CartesianTrace {
                        x_channel: "ORBIT:X".into(),
                        y_channel: "ORBIT:Y".into(),
                        color: 30,
                    }],
                    x_range: PlotAxisRange {
                        minimum: -10.0,
                        maximum: 10.0,
                        user_specified: true,
                    },
                    y_range: PlotAxisRange::default(),
                }),
            ),
            Widget::new(
                Rect::new(0, 370, 200, 150),
                WidgetKind::Heatmap(HeatmapConfig {
                    data_channel: "pva://CAM:IMAGE".into(),
                    width_source: "pva://CAM:IMAGE.dimension[0].size".into(),
                    height_source: "480".into(),
                    color: 14,
                    background: 0,
                }),
            ),
            Widget::new(
                Rect::new(500, 0, 160, 30),
                WidgetKind::Slider(SliderConfig {
                    channel: "BEAM:SET".into(),
                    step: 0.5,
                    limits: user_limits(),
                    ..SliderConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(500, 40, 160, 30),
                WidgetKind::WheelSwitch(WheelSwitchConfig {
                    channel: "MAG:FIELD".into(),
                    format: "%6.3f".into(),
                    ..WheelSwitchConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(500, 80, 160, 24),
                WidgetKind::TextEntry(TextEntryConfig {
                    channel: "OPER:NOTE".into(),
                    ..TextEntryConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(500, 110, 160, 40),
                WidgetKind::ChoiceButton(ChoiceButtonConfig {
                    channel: "MODE:SEL".into(),
                    stacking: ChoiceStacking::Column,
                    ..ChoiceButtonConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(500, 160, 160, 24),
                WidgetKind::Menu(MenuConfig {
                    channel: "SCAN:RATE".into(),
                    ..MenuConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(500, 190, 160, 30),
                WidgetKind::MessageButton(MessageButtonConfig {
                    channel: "ABORT:CMD".into(),
                    label: "ABORT".into(),
                    press_value: "1".into(),
                    release_value: "0".into(),
                    ..MessageButtonConfig::default()
                }),
            ),
            Widget::new(
                Rect::new(500, 230, 160, 30),
                WidgetKind::RelatedDisplay(RelatedDisplayConfig {
                    label: "More...".into(),
                    color: 14,
                    background: 4,
                    entries: vec![RelatedDisplayEntry {
                        label: "Vacuum".into(),
                        display_file: "vacuum.adl".into(),
                        args: "SECT=3".into(),
                        mode: RelatedDisplayMode::Replace,
                    }],
                }),
            ),
            Widget::new(
                Rect::new(500, 270, 160, 30),
                WidgetKind::ShellCommand(ShellCommandConfig {
                    label: "Tools".into(),
                    color: 14,
                    background: 4,
                    entries: vec![ShellCommandEntry {
                        label: "Save snapshot".into(),
                        command: "save_snapshot".into(),
                        args: "-v".into(),
                    }],
                }),
            ),
            Widget::new(
                Rect::new(620, 400, 150, 150),
                WidgetKind::Composite(Composite {
                    name: "pump group".into(),
                    composite_file: String::new(),
                    dynamic: Some(dynamic_attrs()),
                    children: vec![
                        Widget::new(
                            Rect::new(630, 410, 40, 40),
                            WidgetKind::Rectangle(
                                BasicAttrs::default(),
                                GraphicAttrs::default(),
                            ),
                        ),
                        Widget::new(
                            Rect::new(680, 410, 60, 40),
                            WidgetKind::Meter(MeterConfig {
                                channel: "PUMP:SPEED".into(),
                                ..MeterConfig::default()
                            }),
                        ),
                    ],
                }),
            ),
        ],
    }
}

#[test]
fn parse_write_is_structural_identity() {
    let display = full_display();
    let text = write_display(&display);
    let reparsed = parse_display(&text).expect("canonical text parses");
    assert_eq!(reparsed, display);
}

#[test]
fn write_parse_is_byte_identity() {
    let text = write_display(&full_display());
    let round = write_display(&parse_display(&text).unwrap());
    assert_eq!(round, text);
}

#[test]
fn disk_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("panel.adl");
    let display = full_display();
    save_display(&path, &display).unwrap();
    let loaded = load_display(&path).unwrap();
    assert_eq!(loaded, display);
}

#[test]
fn unknown_elements_are_skipped_not_fatal() {
    let text = "file {\n\tname=\"x.adl\"\n\tversion=030122\n}\ndisplay {\n\tobject {\n\t\tx=0\n\t\ty=0\n\t\twidth=100\n\t\theight=100\n\t}\n\tclr=14\n\tbclr=4\n}\nfrobnicator {\n\tobject {\n\t\tx=1\n\t\ty=1\n\t\twidth=5\n\t\theight=5\n\t}\n}\nrectangle {\n\tobject {\n\t\tx=0\n\t\ty=0\n\t\twidth=10\n\t\theight=10\n\t}\n}\n";
    let display = parse_display(text).unwrap();
    assert_eq!(display.widgets.len(), 1);
    assert!(matches!(
        display.widgets[0].kind,
        WidgetKind::Rectangle(..)
    ));
}

#[test]
fn bad_color_index_falls_back() {
    let text = "file {\n\tname=\"x.adl\"\n\tversion=030122\n}\ndisplay {\n\tobject {\n\t\tx=0\n\t\ty=0\n\t\twidth=100\n\t\theight=100\n\t}\n\tclr=99\n\tbclr=4\n}\n";
    let display = parse_display(text).unwrap();
    assert_eq!(display.color, 14, "out-of-palette index uses the default");
}

#[test]
fn missing_header_is_an_error() {
    assert!(parse_display("rectangle {\n}\n").is_err());
}

#[test]
fn channels_appear_verbatim_including_protocol_prefix() {
    let display = full_display();
    let text = write_display(&display);
    assert!(text.contains("chan=\"pva://CAM:IMAGE\"") || text.contains("data_chan=\"pva://CAM:IMAGE\""));
    assert!(text.contains("width_src=\"pva://CAM:IMAGE.dimension[0].size\""));
}
