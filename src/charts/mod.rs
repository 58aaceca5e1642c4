//! Chart generation.
//!
//! Builds sample or custom charts, renders them to SVG and wraps the
//! image in an Adaptive Card.

mod card;
mod model;
mod render;

pub use card::{
    SHOW_CHART_ACTION, SHOW_CHARTS_MENU_ACTION, charts_menu_card, custom_chart_card,
    sample_chart_card,
};
pub use model::{
    Chart, ChartError, ChartKind, Color, Dataset, LegendPosition, MAX_VALUE, format_number,
};
pub use render::SvgRenderer;
