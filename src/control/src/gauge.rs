use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::f32::consts::PI;

use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_6X10, FONT_7X13};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Arc, Circle, Line, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder};
use micromath::F32Ext;

// Sweep of the dial: a half circle opening downwards, left to right
const START_ANGLE: f32 = PI;
const SWEEP: f32 = PI;

const TICK_COUNT: u8 = 10;
const MAJOR_TICK_EVERY: u8 = 5;

const ARC_WIDTH: u32 = 10;
const LABEL_TOP: i32 = 10;

const TRACK_COLOUR: Rgb888 = Rgb888::new(0xe5, 0xe7, 0xeb);
const TICK_COLOUR: Rgb888 = Rgb888::new(0x9c, 0xa3, 0xaf);
const TICK_LABEL_COLOUR: Rgb888 = Rgb888::new(0x6b, 0x72, 0x80);
const VALUE_COLOUR: Rgb888 = Rgb888::new(0x1f, 0x29, 0x37);

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSpec {
    pub value: f32,
    pub max: f32,
    pub label: String,
    pub units: String,
}

impl GaugeSpec {
    pub fn new(value: f32, max: f32, label: &str, units: &str) -> Self {
        GaugeSpec {
            value,
            max,
            label: String::from(label),
            units: String::from(units),
        }
    }

    /// Fill fraction of the dial, always within `0.0..=1.0`.
    pub fn percentage(&self) -> f32 {
        (self.value / self.max).max(0.0).min(1.0)
    }
}

// Drawing area in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Viewport { width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(
            F32Ext::round(self.width) as u32,
            F32Ext::round(self.height) as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBand {
    Green,
    Yellow,
    Red,
}

impl ColorBand {
    // Fixed thresholds; a value sitting on a boundary flips colour with no hysteresis
    pub fn from_percentage(percentage: f32) -> ColorBand {
        if percentage < 0.3 {
            ColorBand::Green
        } else if percentage < 0.7 {
            ColorBand::Yellow
        } else {
            ColorBand::Red
        }
    }
}

impl From<ColorBand> for Rgb888 {
    fn from(band: ColorBand) -> Rgb888 {
        match band {
            ColorBand::Green => Rgb888::new(0x22, 0xc5, 0x5e),
            ColorBand::Yellow => Rgb888::new(0xea, 0xb3, 0x08),
            ColorBand::Red => Rgb888::new(0xef, 0x44, 0x44),
        }
    }
}

fn to_point(x: f32, y: f32) -> Point {
    Point::new(F32Ext::round(x) as i32, F32Ext::round(y) as i32)
}

fn polar(center: (f32, f32), radius: f32, angle: f32) -> Point {
    to_point(
        center.0 + radius * F32Ext::cos(angle),
        center.1 + radius * F32Ext::sin(angle),
    )
}

/// One mark on the scale. Major ticks carry the scale value they sit on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub line: Line,
    pub width: u32,
    pub label: Option<(Point, i64)>,
}

/// A gauge laid out for one viewport, ready to draw onto any `Rgb888`
/// target. Angles run clockwise from the positive x axis with y pointing
/// down.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeRendering {
    pub viewport: Viewport,
    pub center: Point,
    pub radius: f32,
    pub percentage: f32,
    pub band: ColorBand,
    pub label: String,
    pub value_text: String,
    pub ticks: Vec<Tick>,
}

impl GaugeRendering {
    /// Angle covered by the value arc.
    pub fn sweep(&self) -> f32 {
        self.percentage * SWEEP
    }

    fn diameter(&self, radius: f32) -> u32 {
        F32Ext::round(2.0 * radius) as u32
    }

    pub fn track(&self) -> Arc {
        Arc::with_center(
            self.center,
            self.diameter(self.radius),
            Angle::from_radians(START_ANGLE),
            Angle::from_radians(SWEEP),
        )
    }

    /// `None` for an empty gauge; there is nothing to stroke.
    pub fn value_arc(&self) -> Option<Arc> {
        if self.sweep() <= 0.0 {
            return None;
        }
        Some(Arc::with_center(
            self.center,
            self.diameter(self.radius),
            Angle::from_radians(START_ANGLE),
            Angle::from_radians(self.sweep()),
        ))
    }

    pub fn hub(&self) -> Circle {
        Circle::with_center(self.center, self.diameter(self.radius * 0.1))
    }

    pub fn value_position(&self) -> Point {
        Point::new(self.center.x, F32Ext::round(self.center.y as f32 * 1.5) as i32)
    }
}

fn centered() -> TextStyle {
    TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build()
}

impl Drawable for GaugeRendering {
    type Color = Rgb888;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let label_style = MonoTextStyle::new(&FONT_7X13, TICK_LABEL_COLOUR);
        Text::with_text_style(
            &self.label,
            Point::new(self.center.x, LABEL_TOP),
            label_style,
            centered(),
        )
        .draw(target)?;

        self.track()
            .into_styled(PrimitiveStyle::with_stroke(TRACK_COLOUR, ARC_WIDTH))
            .draw(target)?;
        if let Some(arc) = self.value_arc() {
            arc.into_styled(PrimitiveStyle::with_stroke(Rgb888::from(self.band), ARC_WIDTH))
                .draw(target)?;
        }

        self.hub()
            .into_styled(PrimitiveStyle::with_fill(TICK_COLOUR))
            .draw(target)?;

        let tick_label_style = MonoTextStyle::new(&FONT_6X10, TICK_LABEL_COLOUR);
        for tick in &self.ticks {
            tick.line
                .into_styled(PrimitiveStyle::with_stroke(TICK_COLOUR, tick.width))
                .draw(target)?;
            if let Some((position, value)) = tick.label {
                let text = format!("{}", value);
                Text::with_text_style(&text, position, tick_label_style, centered()).draw(target)?;
            }
        }

        let value_style = MonoTextStyle::new(&FONT_10X20, VALUE_COLOUR);
        Text::with_text_style(&self.value_text, self.value_position(), value_style, centered())
            .draw(target)?;

        Ok(())
    }
}

pub fn render(spec: &GaugeSpec, viewport: Viewport) -> GaugeRendering {
    let center = (viewport.width / 2.0, viewport.height * 0.6);
    let radius = center.0.min(center.1) * 0.8;

    let percentage = spec.percentage();

    let ticks = (0..=TICK_COUNT)
        .map(|i| {
            let fraction = f32::from(i) / f32::from(TICK_COUNT);
            let angle = START_ANGLE + fraction * SWEEP;
            let major = i % MAJOR_TICK_EVERY == 0;
            Tick {
                line: Line::new(
                    polar(center, radius * 0.8, angle),
                    polar(center, radius * 1.05, angle),
                ),
                width: if major { 3 } else { 1 },
                label: major.then(|| {
                    (
                        polar(center, radius * 1.15, angle),
                        F32Ext::round(fraction * spec.max) as i64,
                    )
                }),
            }
        })
        .collect();

    GaugeRendering {
        viewport,
        center: to_point(center.0, center.1),
        radius,
        percentage,
        band: ColorBand::from_percentage(percentage),
        label: spec.label.clone(),
        value_text: format!("{:.1}{}", spec.value, spec.units),
        ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use core::convert::Infallible;

    fn viewport() -> Viewport {
        Viewport::new(300.0, 160.0)
    }

    // Collects every pixel drawn, last colour wins
    struct Canvas {
        size: Size,
        pixels: BTreeMap<(i32, i32), Rgb888>,
    }

    impl Canvas {
        fn new(viewport: Viewport) -> Canvas {
            Canvas {
                size: viewport.size(),
                pixels: BTreeMap::new(),
            }
        }

        fn contains(&self, colour: Rgb888) -> bool {
            self.pixels.values().any(|pixel| *pixel == colour)
        }
    }

    impl OriginDimensions for Canvas {
        fn size(&self) -> Size {
            self.size
        }
    }

    impl DrawTarget for Canvas {
        type Color = Rgb888;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, colour) in pixels {
                self.pixels.insert((point.x, point.y), colour);
            }
            Ok(())
        }
    }

    fn draw(rendering: &GaugeRendering) -> Canvas {
        let mut canvas = Canvas::new(rendering.viewport);
        rendering.draw(&mut canvas).unwrap();
        canvas
    }

    // Within a pixel of `expected`
    fn assert_near(actual: Point, expected: Point) {
        let offset = actual - expected;
        assert!(offset.x.abs() <= 1 && offset.y.abs() <= 1, "{:?} != {:?}", actual, expected);
    }

    fn tick_labels(rendering: &GaugeRendering) -> Vec<i64> {
        rendering
            .ticks
            .iter()
            .filter_map(|tick| tick.label.map(|(_, value)| value))
            .collect()
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(GaugeSpec::new(-5.0, 100.0, "Power", "%").percentage(), 0.0);
        assert_eq!(GaugeSpec::new(50.0, 100.0, "Power", "%").percentage(), 0.5);
        assert_eq!(GaugeSpec::new(180.0, 150.0, "Temperature", "°C").percentage(), 1.0);
        assert_eq!(GaugeSpec::new(f32::NAN, 100.0, "Power", "%").percentage(), 0.0);
    }

    #[test]
    fn test_percentage_is_monotonic() {
        let mut previous = -1.0;
        for value in 0..=160 {
            let percentage = GaugeSpec::new(value as f32, 150.0, "Temperature", "°C").percentage();
            assert!(percentage >= previous);
            previous = percentage;
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ColorBand::from_percentage(0.0), ColorBand::Green);
        assert_eq!(ColorBand::from_percentage(0.299), ColorBand::Green);
        assert_eq!(ColorBand::from_percentage(0.3), ColorBand::Yellow);
        assert_eq!(ColorBand::from_percentage(0.699), ColorBand::Yellow);
        assert_eq!(ColorBand::from_percentage(0.7), ColorBand::Red);
        assert_eq!(ColorBand::from_percentage(1.0), ColorBand::Red);

        let rendering = render(&GaugeSpec::new(30.0, 100.0, "Power", "%"), viewport());
        assert_eq!(rendering.band, ColorBand::Yellow);
        let rendering = render(&GaugeSpec::new(70.0, 100.0, "Power", "%"), viewport());
        assert_eq!(rendering.band, ColorBand::Red);
    }

    #[test]
    fn test_empty_and_full_sweep() {
        let empty = render(&GaugeSpec::new(0.0, 100.0, "Power", "%"), viewport());
        assert_eq!(empty.sweep(), 0.0);
        assert_eq!(empty.value_arc(), None);

        let full = render(&GaugeSpec::new(150.0, 150.0, "Temperature", "°C"), viewport());
        assert_eq!(full.sweep(), PI);
        let arc = full.value_arc().unwrap();
        assert_eq!(arc, full.track());
        assert_eq!(arc.angle_start, Angle::from_radians(PI));
        assert_eq!(arc.angle_sweep, Angle::from_radians(PI));
    }

    #[test]
    fn test_eleven_ticks_with_thick_majors() {
        let rendering = render(&GaugeSpec::new(40.0, 100.0, "Power", "%"), viewport());
        assert_eq!(rendering.ticks.len(), 11);
        for (i, tick) in rendering.ticks.iter().enumerate() {
            let major = i % 5 == 0;
            assert_eq!(tick.width, if major { 3 } else { 1 }, "tick {}", i);
            assert_eq!(tick.label.is_some(), major, "tick {}", i);
        }
    }

    #[test]
    fn test_tick_labels_and_value_text() {
        let rendering = render(&GaugeSpec::new(74.96, 150.0, "Temperature", "°C"), viewport());
        assert_eq!(tick_labels(&rendering), vec![0, 75, 150]);
        assert_eq!(rendering.label, "Temperature");
        assert_eq!(rendering.value_text, "75.0°C");

        let rendering = render(&GaugeSpec::new(2.0, 100.0, "Power", "%"), viewport());
        assert_eq!(tick_labels(&rendering), vec![0, 50, 100]);
        assert_eq!(rendering.value_text, "2.0%");
    }

    #[test]
    fn test_geometry_follows_viewport() {
        let rendering = render(&GaugeSpec::new(0.0, 100.0, "Power", "%"), viewport());
        // center (150, 96), radius 0.8 * 96
        assert_eq!(rendering.center, Point::new(150, 96));
        let min = 76.79;
        let max = 76.81;
        assert!(min < rendering.radius, "{:?} < {:?}", min, rendering.radius);
        assert!(rendering.radius < max, "{:?} < {:?}", rendering.radius, max);
        assert_eq!(rendering.hub().diameter, 15);
        assert_eq!(rendering.value_position(), Point::new(150, 144));

        // First tick points left from the centre, middle one up, last one right
        let first = rendering.ticks[0].line;
        assert_near(first.start, Point::new(89, 96));
        assert_near(first.end, Point::new(69, 96));
        assert_near(rendering.ticks[5].line.end, Point::new(150, 15));
        assert_near(rendering.ticks[10].line.end, Point::new(231, 96));
        assert_near(rendering.ticks[10].label.unwrap().0, Point::new(238, 96));
    }

    #[test]
    fn test_draw_uses_band_colour() {
        let canvas = draw(&render(&GaugeSpec::new(80.0, 100.0, "Power", "%"), viewport()));
        assert!(canvas.contains(ColorBand::Red.into()));
        assert!(canvas.contains(TRACK_COLOUR));
        assert!(canvas.contains(TICK_COLOUR));
        assert!(canvas.contains(VALUE_COLOUR));
        assert!(!canvas.contains(ColorBand::Yellow.into()));
    }

    #[test]
    fn test_draw_empty_gauge_shows_track_only() {
        let canvas = draw(&render(&GaugeSpec::new(0.0, 100.0, "Power", "%"), viewport()));
        assert!(canvas.contains(TRACK_COLOUR));
        assert!(!canvas.contains(ColorBand::Green.into()));
    }
}
