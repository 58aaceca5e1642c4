//! Adaptive Card layouts for charts.

use serde_json::{Value, json};

use super::model::{Chart, ChartKind, format_number};

/// Submit action that opens the chart menu.
pub const SHOW_CHARTS_MENU_ACTION: &str = "show_charts_menu";

/// Submit action that renders the chart named in the `chart` field.
pub const SHOW_CHART_ACTION: &str = "show_chart";

const CARD_VERSION: &str = "1.4";

/// Card for one of the sample charts: title, description, image, summary.
#[must_use]
pub fn sample_chart_card(chart: &Chart, image_uri: &str) -> Value {
    json!({
        "type": "AdaptiveCard",
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": "📊 Data Chart",
                "weight": "Bolder",
                "size": "Large"
            },
            {
                "type": "TextBlock",
                "text": chart.kind.description(),
                "spacing": "None",
                "isSubtle": true,
                "wrap": true
            },
            {
                "type": "Image",
                "url": image_uri,
                "size": "Stretch",
                "altText": format!("{} chart", chart.kind)
            },
            {
                "type": "TextBlock",
                "text": "💡 **Data shown:**",
                "weight": "Bolder",
                "spacing": "Medium"
            },
            {
                "type": "TextBlock",
                "text": chart.summary(),
                "wrap": true,
                "spacing": "Small"
            }
        ],
        "actions": [
            {
                "type": "Action.Submit",
                "title": "🔄 See another chart",
                "data": { "action": SHOW_CHARTS_MENU_ACTION }
            }
        ]
    })
}

/// Card for a caller-supplied chart: title, image, and a fact per data point.
#[must_use]
pub fn custom_chart_card(chart: &Chart, image_uri: &str) -> Value {
    let facts: Vec<Value> = chart
        .datasets
        .first()
        .map(|dataset| {
            chart
                .labels
                .iter()
                .zip(&dataset.values)
                .map(|(label, &value)| json!({ "title": label, "value": format_number(value) }))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "type": "AdaptiveCard",
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": chart.title,
                "weight": "Bolder",
                "size": "Large",
                "wrap": true
            },
            {
                "type": "Image",
                "url": image_uri,
                "size": "Stretch",
                "altText": chart.title
            },
            {
                "type": "FactSet",
                "facts": facts
            }
        ]
    })
}

/// Card offering one button per sample chart.
#[must_use]
pub fn charts_menu_card() -> Value {
    let actions: Vec<Value> = ChartKind::all()
        .iter()
        .map(|kind| {
            json!({
                "type": "Action.Submit",
                "title": format!("{} chart", capitalize(kind.name())),
                "data": { "action": SHOW_CHART_ACTION, "chart": kind.name() }
            })
        })
        .collect();

    json!({
        "type": "AdaptiveCard",
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": "Which chart would you like to see?",
                "weight": "Bolder",
                "wrap": true
            }
        ],
        "actions": actions
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
