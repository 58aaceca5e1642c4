//! SVG chart renderer.

use std::f64::consts::{FRAC_PI_2, TAU};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::model::{Chart, ChartError, ChartKind, LegendPosition, format_number};

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 90.0;
const MARGIN_BOTTOM: f64 = 80.0;
const RIGHT_LEGEND_WIDTH: f64 = 180.0;
const GRID_COLOR: &str = "#e0e0e0";
const AXIS_COLOR: &str = "#666666";
const TEXT_COLOR: &str = "#333333";

/// Renders charts to standalone SVG documents.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    width: u32,
    height: u32,
    background: String,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Drawing area inside the margins.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl PlotArea {
    fn bottom(&self) -> f64 {
        self.y + self.height
    }

    fn right(&self) -> f64 {
        self.x + self.width
    }
}

impl SvgRenderer {
    /// Creates a renderer producing `width` x `height` images on white.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: "white".to_owned(),
        }
    }

    /// Sets the background fill.
    #[must_use]
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Renders `chart` to an SVG document.
    pub fn render(&self, chart: &Chart) -> Result<String, ChartError> {
        chart.validate()?;

        let width = f64::from(self.width);
        let height = f64::from(self.height);

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
            w = self.width,
            h = self.height
        );
        svg.push_str(&format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            self.width,
            self.height,
            escape(&self.background)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="40" text-anchor="middle" font-size="18" font-weight="bold" fill="{TEXT_COLOR}">{}</text>"#,
            width / 2.0,
            escape(&chart.title)
        ));

        let legend_width = match chart.legend {
            LegendPosition::Right => RIGHT_LEGEND_WIDTH,
            LegendPosition::Top => 0.0,
        };
        let area = PlotArea {
            x: MARGIN_LEFT,
            y: MARGIN_TOP,
            width: (width - MARGIN_LEFT - MARGIN_RIGHT - legend_width).max(1.0),
            height: (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        };

        match chart.kind {
            ChartKind::Bar | ChartKind::Line => {
                let scale = Scale::for_max(chart.max_value());
                draw_axes(&mut svg, chart, area, &scale, height);
                if chart.kind == ChartKind::Bar {
                    draw_bars(&mut svg, chart, area, &scale);
                } else {
                    draw_lines(&mut svg, chart, area, &scale);
                }
                draw_series_legend(&mut svg, chart, width);
            }
            ChartKind::Pie => {
                draw_pie(&mut svg, chart, area);
                draw_label_legend(&mut svg, chart, width);
            }
        }

        svg.push_str("</svg>");
        Ok(svg)
    }

    /// Renders `chart` and wraps it in a base64 `data:` URI.
    pub fn render_data_uri(&self, chart: &Chart) -> Result<String, ChartError> {
        let svg = self.render(chart)?;
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
    }
}

/// Zero-based value axis with round tick steps.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    step: f64,
    top: f64,
}

impl Scale {
    const TARGET_TICKS: f64 = 5.0;
    const MAX_TICKS: usize = 20;

    fn for_max(max: f64) -> Self {
        if !max.is_finite() || max <= 0.0 {
            return Self { step: 1.0, top: 1.0 };
        }

        let raw = max / Self::TARGET_TICKS;
        let magnitude = 10f64.powf(raw.log10().floor());
        let residual = raw / magnitude;
        let nice = if residual <= 1.0 {
            1.0
        } else if residual <= 2.0 {
            2.0
        } else if residual <= 5.0 {
            5.0
        } else {
            10.0
        };
        let step = nice * magnitude;
        let top = (max / step).ceil() * step;

        if !step.is_finite() || !top.is_finite() {
            return Self { step: max, top: max };
        }
        Self { step, top }
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        let count = (self.top / self.step).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = if count.is_finite() {
            (count as usize).min(Self::MAX_TICKS)
        } else {
            0
        };
        (0..=count).map(move |i| {
            #[allow(clippy::cast_precision_loss)]
            let i = i as f64;
            i * self.step
        })
    }

    fn y(&self, area: PlotArea, value: f64) -> f64 {
        area.bottom() - value / self.top * area.height
    }
}

#[allow(clippy::cast_precision_loss)]
fn slot_width(area: PlotArea, count: usize) -> f64 {
    area.width / count.max(1) as f64
}

#[allow(clippy::cast_precision_loss)]
fn slot_center(area: PlotArea, count: usize, index: usize) -> f64 {
    area.x + slot_width(area, count) * (index as f64 + 0.5)
}

fn draw_axes(svg: &mut String, chart: &Chart, area: PlotArea, scale: &Scale, height: f64) {
    for tick in scale.ticks() {
        let y = scale.y(area, tick);
        svg.push_str(&format!(
            r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{GRID_COLOR}" stroke-width="1"/>"#,
            area.x,
            area.right()
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="12" fill="{TEXT_COLOR}">{}</text>"#,
            area.x - 8.0,
            y + 4.0,
            format_number(tick)
        ));
    }

    svg.push_str(&format!(
        r#"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#,
        x = area.x,
        top = area.y,
        bottom = area.bottom()
    ));
    svg.push_str(&format!(
        r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{AXIS_COLOR}" stroke-width="1"/>"#,
        area.x,
        area.right(),
        y = area.bottom()
    ));

    let count = chart.labels.len();
    for (i, label) in chart.labels.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12" fill="{TEXT_COLOR}">{}</text>"#,
            slot_center(area, count, i),
            area.bottom() + 20.0,
            escape(label)
        ));
    }

    if let Some(title) = &chart.x_axis_title {
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14" fill="{TEXT_COLOR}">{}</text>"#,
            area.x + area.width / 2.0,
            height - 25.0,
            escape(title)
        ));
    }

    if let Some(title) = &chart.y_axis_title {
        let x = 22.0;
        let y = area.y + area.height / 2.0;
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle" font-size="14" fill="{TEXT_COLOR}" transform="rotate(-90 {x:.1} {y:.1})">{}</text>"#,
            escape(title)
        ));
    }
}

fn draw_bars(svg: &mut String, chart: &Chart, area: PlotArea, scale: &Scale) {
    let count = chart.labels.len();
    let slot = slot_width(area, count);
    let group = slot * 0.7;
    #[allow(clippy::cast_precision_loss)]
    let bar_width = group / chart.datasets.len() as f64;

    for (d, dataset) in chart.datasets.iter().enumerate() {
        for (i, &value) in dataset.values.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = slot_center(area, count, i) - group / 2.0 + bar_width * d as f64;
            let y = scale.y(area, value);
            svg.push_str(&format!(
                r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{:.1}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
                area.bottom() - y,
                dataset.fill_at(i),
                dataset.border_at(i),
                dataset.border_width
            ));
        }
    }
}

fn draw_lines(svg: &mut String, chart: &Chart, area: PlotArea, scale: &Scale) {
    let count = chart.labels.len();

    for dataset in &chart.datasets {
        let points: Vec<(f64, f64)> = dataset
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| (slot_center(area, count, i), scale.y(area, v)))
            .collect();
        let path = points
            .iter()
            .map(|(x, y)| format!("{x:.1},{y:.1}"))
            .collect::<Vec<_>>()
            .join(" ");

        if dataset.area
            && let (Some(first), Some(last)) = (points.first(), points.last())
        {
            svg.push_str(&format!(
                r#"<polygon points="{:.1},{bottom:.1} {path} {:.1},{bottom:.1}" fill="{}" stroke="none"/>"#,
                first.0,
                last.0,
                dataset.fill_at(0),
                bottom = area.bottom()
            ));
        }

        svg.push_str(&format!(
            r#"<polyline points="{path}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            dataset.border_at(0),
            dataset.border_width
        ));

        for (x, y) in &points {
            svg.push_str(&format!(
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="5" fill="{}"/>"#,
                dataset.border_at(0)
            ));
        }
    }
}

fn draw_pie(svg: &mut String, chart: &Chart, area: PlotArea) {
    let Some(dataset) = chart.datasets.first() else {
        return;
    };
    let total = chart.total();
    let cx = area.x + area.width / 2.0;
    let cy = area.y + area.height / 2.0;
    let radius = (area.width.min(area.height) / 2.0 - 10.0).max(1.0);

    let mut angle = -FRAC_PI_2;
    for (i, &value) in dataset.values.iter().enumerate() {
        if value <= 0.0 {
            continue;
        }

        let sweep = value / total * TAU;
        let fill = dataset.fill_at(i);
        let border = dataset.border_at(i);
        let stroke_width = dataset.border_width;

        if sweep >= TAU - 1e-9 {
            svg.push_str(&format!(
                r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{radius:.1}" fill="{fill}" stroke="{border}" stroke-width="{stroke_width}"/>"#
            ));
        } else {
            let (x1, y1) = (cx + radius * angle.cos(), cy + radius * angle.sin());
            let end = angle + sweep;
            let (x2, y2) = (cx + radius * end.cos(), cy + radius * end.sin());
            let large_arc = u8::from(sweep > std::f64::consts::PI);
            svg.push_str(&format!(
                r#"<path d="M {cx:.1} {cy:.1} L {x1:.1} {y1:.1} A {radius:.1} {radius:.1} 0 {large_arc} 1 {x2:.1} {y2:.1} Z" fill="{fill}" stroke="{border}" stroke-width="{stroke_width}"/>"#
            ));
        }

        angle += sweep;
    }
}

/// Legend with one entry per dataset, centred above the plot.
fn draw_series_legend(svg: &mut String, chart: &Chart, width: f64) {
    const ENTRY_WIDTH: f64 = 160.0;
    #[allow(clippy::cast_precision_loss)]
    let total = ENTRY_WIDTH * chart.datasets.len() as f64;
    let start = (width - total) / 2.0;

    for (i, dataset) in chart.datasets.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = start + ENTRY_WIDTH * i as f64;
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="58" width="14" height="14" fill="{}" stroke="{}" stroke-width="1"/>"#,
            dataset.fill_at(0),
            dataset.border_at(0)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="70" font-size="12" fill="{TEXT_COLOR}">{}</text>"#,
            x + 20.0,
            escape(&dataset.label)
        ));
    }
}

/// Legend with one entry per label, stacked on the right.
fn draw_label_legend(svg: &mut String, chart: &Chart, width: f64) {
    let Some(dataset) = chart.datasets.first() else {
        return;
    };
    let x = width - RIGHT_LEGEND_WIDTH;

    for (i, label) in chart.labels.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = MARGIN_TOP + 24.0 * i as f64;
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="{y:.1}" width="14" height="14" fill="{}" stroke="{}" stroke-width="1"/>"#,
            dataset.fill_at(i),
            dataset.border_at(i)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="12" fill="{TEXT_COLOR}">{}</text>"#,
            x + 20.0,
            y + 12.0,
            escape(label)
        ));
    }
}

/// Escapes text for use in SVG content and attributes.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
