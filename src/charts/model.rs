//! Chart definitions and the built-in sample charts.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur while building or rendering a chart.
#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("chart has no data")]
    NoData,

    #[error("dataset '{dataset}' has {values} values for {labels} labels")]
    LengthMismatch {
        dataset: String,
        labels: usize,
        values: usize,
    },

    #[error("invalid value {value} for '{label}' (values must be finite and not negative)")]
    InvalidValue { label: String, value: f64 },

    #[error("value {value} for '{label}' is too large (limit is {limit})", limit = MAX_VALUE)]
    ValueTooLarge { label: String, value: f64 },

    #[error("pie chart values add up to zero")]
    ZeroTotal,

    #[error("unknown chart type '{0}' (expected bar, line or pie)")]
    UnknownKind(String),
}

/// Largest value a chart accepts. Keeps axis scales and totals finite.
pub const MAX_VALUE: f64 = 1e15;

/// Supported chart types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
        }
    }

    /// One-line description shown under the chart title.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Bar => "Bar chart: ideal for comparing values across categories",
            Self::Line => "Line chart: shows how values trend over time",
            Self::Pie => "Pie chart: shows the percentage distribution of the data",
        }
    }

    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Bar, Self::Line, Self::Pie]
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" | "bars" | "barras" => Ok(Self::Bar),
            "line" | "lines" | "lineas" | "líneas" => Ok(Self::Line),
            "pie" | "circular" | "pastel" => Ok(Self::Pie),
            other => Err(ChartError::UnknownKind(other.to_owned())),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CSS colour as accepted by SVG renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Rgba(u8, u8, u8, f32),
    Hsla(u16, u8, u8, f32),
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgba(r, g, b, a) => write!(f, "rgba({r}, {g}, {b}, {a})"),
            Self::Hsla(h, s, l, a) => write!(f, "hsla({h}, {s}%, {l}%, {a})"),
        }
    }
}

const BLUE: (u8, u8, u8) = (54, 162, 235);
const TEAL: (u8, u8, u8) = (75, 192, 192);
const PINK: (u8, u8, u8) = (255, 99, 132);
const YELLOW: (u8, u8, u8) = (255, 206, 86);

const fn rgba((r, g, b): (u8, u8, u8), alpha: f32) -> Color {
    Color::Rgba(r, g, b, alpha)
}

/// One series of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub values: Vec<f64>,

    /// Fill colours, cycled per data point.
    pub fill: Vec<Color>,

    /// Border colours, cycled per data point.
    pub border: Vec<Color>,

    pub border_width: u32,

    /// Shade the area under a line series.
    pub area: bool,
}

impl Dataset {
    #[must_use]
    pub fn fill_at(&self, index: usize) -> Color {
        cycle(&self.fill, index)
    }

    #[must_use]
    pub fn border_at(&self, index: usize) -> Color {
        cycle(&self.border, index)
    }
}

fn cycle(colors: &[Color], index: usize) -> Color {
    if colors.is_empty() {
        rgba(BLUE, 1.0)
    } else {
        colors[index % colors.len()]
    }
}

/// Where the legend is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    Top,
    Right,
}

/// A chart ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub x_axis_title: Option<String>,
    pub y_axis_title: Option<String>,
    pub legend: LegendPosition,
}

impl Chart {
    /// Returns one of the built-in sample charts.
    #[must_use]
    pub fn sample(kind: ChartKind) -> Self {
        let months: Vec<String> = ["January", "February", "March", "April", "May", "June"]
            .iter()
            .map(|&m| m.to_owned())
            .collect();
        let monthly = vec![65.0, 59.0, 80.0, 81.0, 56.0, 55.0];

        match kind {
            ChartKind::Bar => Self {
                kind,
                title: "Monthly Sales 2024".to_owned(),
                labels: months,
                datasets: vec![Dataset {
                    label: "Sales (thousands)".to_owned(),
                    values: monthly,
                    fill: vec![rgba(BLUE, 0.7)],
                    border: vec![rgba(BLUE, 1.0)],
                    border_width: 2,
                    area: false,
                }],
                x_axis_title: Some("Month".to_owned()),
                y_axis_title: Some("Thousands of pesos".to_owned()),
                legend: LegendPosition::Top,
            },
            ChartKind::Line => Self {
                kind,
                title: "Growth Trend".to_owned(),
                labels: months,
                datasets: vec![Dataset {
                    label: "Growth".to_owned(),
                    values: monthly,
                    fill: vec![rgba(TEAL, 0.2)],
                    border: vec![rgba(TEAL, 1.0)],
                    border_width: 3,
                    area: true,
                }],
                x_axis_title: None,
                y_axis_title: Some("Units".to_owned()),
                legend: LegendPosition::Top,
            },
            ChartKind::Pie => Self {
                kind,
                title: "Distribution by Product".to_owned(),
                labels: ["Product A", "Product B", "Product C", "Product D"]
                    .iter()
                    .map(|&p| p.to_owned())
                    .collect(),
                datasets: vec![Dataset {
                    label: "Distribution".to_owned(),
                    values: vec![30.0, 50.0, 15.0, 5.0],
                    fill: vec![
                        rgba(PINK, 0.8),
                        rgba(BLUE, 0.8),
                        rgba(YELLOW, 0.8),
                        rgba(TEAL, 0.8),
                    ],
                    border: vec![
                        rgba(PINK, 1.0),
                        rgba(BLUE, 1.0),
                        rgba(YELLOW, 1.0),
                        rgba(TEAL, 1.0),
                    ],
                    border_width: 2,
                    area: false,
                }],
                x_axis_title: None,
                y_axis_title: None,
                legend: LegendPosition::Right,
            },
        }
    }

    /// Builds a single-series chart from caller-supplied data.
    pub fn custom(
        kind: ChartKind,
        title: impl Into<String>,
        labels: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self, ChartError> {
        let title = title.into();

        let (fill, border): (Vec<Color>, Vec<Color>) = if kind == ChartKind::Pie {
            (0..values.len())
                .map(|i| {
                    let hue = u16::try_from((i * 60) % 360).unwrap_or(0);
                    (Color::Hsla(hue, 70, 60, 0.7), Color::Hsla(hue, 70, 50, 1.0))
                })
                .unzip()
        } else {
            (vec![rgba(BLUE, 0.7)], vec![rgba(BLUE, 1.0)])
        };

        let chart = Self {
            kind,
            title: title.clone(),
            labels,
            datasets: vec![Dataset {
                label: title,
                values,
                fill,
                border,
                border_width: 2,
                area: false,
            }],
            x_axis_title: None,
            y_axis_title: None,
            legend: if kind == ChartKind::Pie {
                LegendPosition::Right
            } else {
                LegendPosition::Top
            },
        };

        chart.validate()?;
        Ok(chart)
    }

    /// Checks that the chart can be drawn.
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.labels.is_empty() || self.datasets.is_empty() {
            return Err(ChartError::NoData);
        }

        for dataset in &self.datasets {
            if dataset.values.len() != self.labels.len() {
                return Err(ChartError::LengthMismatch {
                    dataset: dataset.label.clone(),
                    labels: self.labels.len(),
                    values: dataset.values.len(),
                });
            }

            for (label, &value) in self.labels.iter().zip(&dataset.values) {
                if !value.is_finite() || value < 0.0 {
                    return Err(ChartError::InvalidValue {
                        label: label.clone(),
                        value,
                    });
                }
                if value > MAX_VALUE {
                    return Err(ChartError::ValueTooLarge {
                        label: label.clone(),
                        value,
                    });
                }
            }
        }

        if self.kind == ChartKind::Pie && self.total() <= 0.0 {
            return Err(ChartError::ZeroTotal);
        }

        Ok(())
    }

    /// Sum of the first series.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.datasets
            .first()
            .map_or(0.0, |d| d.values.iter().sum())
    }

    /// Largest value of all series (0 when empty).
    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.datasets
            .iter()
            .flat_map(|d| d.values.iter().copied())
            .fold(0.0, f64::max)
    }

    /// Short text describing the data, shown under the chart.
    #[must_use]
    pub fn summary(&self) -> String {
        let Some(values) = self.datasets.first().map(|d| &d.values) else {
            return "No data".to_owned();
        };
        if values.is_empty() {
            return "No data".to_owned();
        }

        match self.kind {
            ChartKind::Bar => format!(
                "Monthly sales for the first half of the year. Total: ${},000",
                format_number(self.total())
            ),
            ChartKind::Line => {
                #[allow(clippy::cast_precision_loss)]
                let average = self.total() / values.len() as f64;
                format!("Growth trend averaging {average:.2} units")
            }
            ChartKind::Pie => {
                let total = self.total();
                let (index, top) = values
                    .iter()
                    .enumerate()
                    .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
                let share = if total > 0.0 { top / total * 100.0 } else { 0.0 };
                format!(
                    "{} leads with a {}% share",
                    self.labels.get(index).map_or("?", String::as_str),
                    format_number(share)
                )
            }
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        let formatted = format!("{value:.2}");
        formatted.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}
