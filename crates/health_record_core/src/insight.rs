//! crates/health_record_core/src/insight.rs
//!
//! Turns the free-form `insights` field of an AI analysis into something the
//! views can render. The model may answer with a JSON object, with JSON inside
//! a markdown code fence, or with plain prose; all three are accepted and the
//! result is either a structured object or the text as received, never an error.

use crate::domain::SavedInsight;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Key used when an unparsed insight is sent back to the server.
pub const RAW_TEXT_KEY: &str = "rawText";

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?i:json)\s*([\s\S]*?)\s*```").expect("json fence pattern is valid")
});

static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+-]*\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
});

//=========================================================================================
// Insight Model
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightCategory {
    Trends,
    Correlations,
    Recommendations,
    Alerts,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 4] = [
        InsightCategory::Trends,
        InsightCategory::Correlations,
        InsightCategory::Recommendations,
        InsightCategory::Alerts,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            InsightCategory::Trends => "trends",
            InsightCategory::Correlations => "correlations",
            InsightCategory::Recommendations => "recommendations",
            InsightCategory::Alerts => "alerts",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            InsightCategory::Trends => "Trends",
            InsightCategory::Correlations => "Correlations",
            InsightCategory::Recommendations => "Recommendations",
            InsightCategory::Alerts => "Alerts",
        }
    }
}

/// A JSON object produced by the analysis. Unknown keys are preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredInsight(Map<String, Value>);

impl StructuredInsight {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The value stored under a category, treating `null` as absent.
    pub fn category(&self, category: InsightCategory) -> Option<&Value> {
        self.0.get(category.key()).filter(|v| !v.is_null())
    }

    pub fn recommendations(&self) -> Vec<String> {
        match self.category(InsightCategory::Recommendations) {
            Some(Value::Array(items)) => items.iter().map(render_scalar).collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

/// The normalized form of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Insight {
    Structured(StructuredInsight),
    /// Nothing structured could be recovered; the text is kept verbatim.
    Unparsed { raw_text: String },
}

impl Insight {
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Insight::Unparsed { .. })
    }

    /// The wire form: the object itself, or `{"rawText": ...}`.
    pub fn to_value(&self) -> Value {
        match self {
            Insight::Structured(structured) => Value::Object(structured.0.clone()),
            Insight::Unparsed { raw_text } => {
                let mut map = Map::new();
                map.insert(RAW_TEXT_KEY.to_string(), Value::String(raw_text.clone()));
                Value::Object(map)
            }
        }
    }

    /// Rebuilds the displayable insight from its persisted columns.
    pub fn from_saved(saved: &SavedInsight) -> Insight {
        let has_categories = saved.trends.is_some()
            || saved.correlations.is_some()
            || saved.alerts.is_some()
            || !saved.recommendations.is_empty();

        if !has_categories {
            if let Some(raw) = saved.insights_raw.as_deref().filter(|r| !r.trim().is_empty()) {
                return match normalize_text(raw) {
                    Insight::Structured(s) => match unwrap_raw_text(&s) {
                        Some(text) => Insight::Unparsed { raw_text: text },
                        None => Insight::Structured(s),
                    },
                    unparsed => unparsed,
                };
            }
        }

        let mut map = Map::new();
        if let Some(trends) = &saved.trends {
            map.insert("trends".into(), trends.clone());
        }
        if let Some(correlations) = &saved.correlations {
            map.insert("correlations".into(), correlations.clone());
        }
        map.insert(
            "recommendations".into(),
            Value::Array(saved.recommendations.iter().cloned().map(Value::String).collect()),
        );
        if let Some(alerts) = &saved.alerts {
            map.insert("alerts".into(), alerts.clone());
        }
        Insight::Structured(StructuredInsight(map))
    }
}

/// A saved `{"rawText": ...}` wrapper is the unparsed form, not a structure.
fn unwrap_raw_text(structured: &StructuredInsight) -> Option<String> {
    match (structured.0.len(), structured.0.get(RAW_TEXT_KEY)) {
        (1, Some(Value::String(text))) => Some(text.clone()),
        _ => None,
    }
}

//=========================================================================================
// Normalizer
//=========================================================================================

type TextParser = fn(&str) -> Option<StructuredInsight>;

/// Text parsers, in priority order. The first success wins.
const TEXT_PARSERS: [(&str, TextParser); 3] = [
    ("json code fence", from_json_fence),
    ("code fence", from_any_fence),
    ("whole text", from_whole_text),
];

/// Normalizes the `insights` field of an analysis response.
///
/// Returns `None` when there is nothing to show (`null` or an empty string).
pub fn normalize(value: &Value) -> Option<Insight> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(normalize_text(text)),
        Value::Object(map) => Some(Insight::Structured(StructuredInsight(map.clone()))),
        other => Some(Insight::Unparsed {
            raw_text: other.to_string(),
        }),
    }
}

/// Runs the text parsers in order and falls back to the raw text.
pub fn normalize_text(text: &str) -> Insight {
    for (name, parser) in TEXT_PARSERS {
        if let Some(structured) = parser(text) {
            tracing::debug!("Parsed insight from {}", name);
            return Insight::Structured(structured);
        }
    }
    tracing::debug!("Insight text is not structured; keeping it verbatim");
    Insight::Unparsed {
        raw_text: text.to_string(),
    }
}

fn from_json_fence(text: &str) -> Option<StructuredInsight> {
    let captures = JSON_FENCE.captures(text)?;
    parse_object(captures.get(1)?.as_str())
}

fn from_any_fence(text: &str) -> Option<StructuredInsight> {
    let captures = ANY_FENCE.captures(text)?;
    parse_object(captures.get(1)?.as_str())
}

fn from_whole_text(text: &str) -> Option<StructuredInsight> {
    parse_object(text)
}

/// Only a JSON object counts as structured data.
fn parse_object(candidate: &str) -> Option<StructuredInsight> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(StructuredInsight(map)),
        _ => None,
    }
}

//=========================================================================================
// Rendering
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    /// `Key: value` rows from an object category.
    Entries(Vec<(String, String)>),
    /// A numbered list.
    Ordered(Vec<String>),
    Items(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightSection {
    pub category: InsightCategory,
    pub body: SectionBody,
}

/// The display model the views render.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightDisplay {
    Sections(Vec<InsightSection>),
    RawText(String),
}

pub fn display(insight: &Insight) -> InsightDisplay {
    let structured = match insight {
        Insight::Unparsed { raw_text } => return InsightDisplay::RawText(raw_text.clone()),
        Insight::Structured(structured) => structured,
    };
    if let Some(text) = unwrap_raw_text(structured) {
        return InsightDisplay::RawText(text);
    }

    let mut sections = Vec::new();
    for category in InsightCategory::ALL {
        let body = if category == InsightCategory::Recommendations {
            let items = structured.recommendations();
            (!items.is_empty()).then_some(SectionBody::Ordered(items))
        } else {
            structured.category(category).and_then(section_body)
        };
        if let Some(body) = body {
            sections.push(InsightSection { category, body });
        }
    }
    InsightDisplay::Sections(sections)
}

fn section_body(value: &Value) -> Option<SectionBody> {
    match value {
        Value::Object(map) if !map.is_empty() => Some(SectionBody::Entries(
            map.iter()
                .map(|(k, v)| (capitalize(k), render_value(v)))
                .collect(),
        )),
        Value::Array(items) if !items.is_empty() => {
            Some(SectionBody::Items(items.iter().map(render_value).collect()))
        }
        Value::String(s) if !s.trim().is_empty() => Some(SectionBody::Text(s.clone())),
        Value::Bool(_) | Value::Number(_) => Some(SectionBody::Text(value.to_string())),
        _ => None,
    }
}

/// Arrays join with commas; objects become `key: value` pairs.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(render_scalar).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_scalar(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => render_scalar(other),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Plain-text rendering for terminals and logs.
pub fn render_text(insight: &Insight) -> String {
    match display(insight) {
        InsightDisplay::RawText(text) => text,
        InsightDisplay::Sections(sections) if sections.is_empty() => {
            "No insights available".to_string()
        }
        InsightDisplay::Sections(sections) => {
            let mut out = String::new();
            for section in sections {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(section.category.title());
                out.push('\n');
                match section.body {
                    SectionBody::Entries(rows) => {
                        for (key, value) in rows {
                            out.push_str(&format!("  {}: {}\n", key, value));
                        }
                    }
                    SectionBody::Ordered(items) => {
                        for (i, item) in items.iter().enumerate() {
                            out.push_str(&format!("  {}. {}\n", i + 1, item));
                        }
                    }
                    SectionBody::Items(items) => {
                        for item in items {
                            out.push_str(&format!("  - {}\n", item));
                        }
                    }
                    SectionBody::Text(text) => {
                        out.push_str(&format!("  {}\n", text));
                    }
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> Insight {
        match value {
            Value::Object(map) => Insight::Structured(StructuredInsight::new(map)),
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn json_fence_is_parsed() {
        let text = "```json\n{\"trends\":{\"a\":1}}\n```";
        assert_eq!(normalize_text(text), structured(json!({"trends": {"a": 1}})));
    }

    #[test]
    fn untagged_fence_is_parsed() {
        let text = "Here you go:\n```\n{\"alerts\": {\"bp\": \"high\"}}\n```\nStay well.";
        assert_eq!(normalize_text(text), structured(json!({"alerts": {"bp": "high"}})));
    }

    #[test]
    fn other_language_tag_is_parsed() {
        let text = "```javascript\n{\"recommendations\": [\"rest\"]}\n```";
        assert_eq!(
            normalize_text(text),
            structured(json!({"recommendations": ["rest"]}))
        );
    }

    #[test]
    fn plain_text_is_kept_verbatim() {
        assert_eq!(
            normalize_text("no json here"),
            Insight::Unparsed {
                raw_text: "no json here".to_string()
            }
        );
    }

    #[test]
    fn unfenced_object_is_parsed() {
        assert_eq!(
            normalize_text("{\"alerts\":{\"x\":\"y\"}}"),
            structured(json!({"alerts": {"x": "y"}}))
        );
    }

    #[test]
    fn object_input_is_returned_unchanged() {
        let value = json!({"trends": {"sleep": "improving"}, "extra": 3});
        assert_eq!(normalize(&value), Some(structured(value.clone())));
    }

    #[test]
    fn null_and_empty_yield_nothing() {
        assert_eq!(normalize(&Value::Null), None);
        assert_eq!(normalize(&json!("  ")), None);
    }

    #[test]
    fn fence_wins_over_whole_text() {
        // The whole string would not parse anyway; the fence content must be
        // used instead of falling straight back to raw text.
        let text = "Summary below\n```json\n{\"trends\": {\"mood\": \"stable\"}}\n```";
        assert_eq!(normalize_text(text), structured(json!({"trends": {"mood": "stable"}})));
    }

    #[test]
    fn broken_fence_falls_through_to_raw_text() {
        let text = "```json\n{not valid}\n```";
        assert_eq!(
            normalize_text(text),
            Insight::Unparsed {
                raw_text: text.to_string()
            }
        );
    }

    #[test]
    fn non_object_json_is_not_structured() {
        assert!(normalize_text("[1, 2, 3]").is_unparsed());
        assert!(normalize_text("42").is_unparsed());
    }

    #[test]
    fn unparsed_wire_form_uses_raw_text_key() {
        let insight = Insight::Unparsed {
            raw_text: "hello".into(),
        };
        assert_eq!(insight.to_value(), json!({"rawText": "hello"}));
    }

    #[test]
    fn display_renders_present_categories_only() {
        let insight = structured(json!({
            "trends": {"sleep": "improving", "temperature": [36.8, 37.1]},
            "recommendations": ["Sleep earlier", "Walk daily"],
        }));
        let InsightDisplay::Sections(sections) = display(&insight) else {
            panic!("expected sections");
        };
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category, InsightCategory::Trends);
        assert_eq!(
            sections[0].body,
            SectionBody::Entries(vec![
                ("Sleep".into(), "improving".into()),
                ("Temperature".into(), "36.8, 37.1".into()),
            ])
        );
        assert_eq!(
            sections[1].body,
            SectionBody::Ordered(vec!["Sleep earlier".into(), "Walk daily".into()])
        );

        let text = render_text(&insight);
        assert!(text.contains("  1. Sleep earlier"));
        assert!(text.contains("  2. Walk daily"));
        assert!(!text.contains("Alerts"));
    }

    #[test]
    fn saved_raw_wrapper_displays_as_text() {
        let saved = SavedInsight {
            id: "s1".into(),
            patient_name: None,
            analyzed_log_ids: vec![],
            logs_analyzed_count: 1,
            analysis_date: None,
            trends: None,
            correlations: None,
            recommendations: vec![],
            alerts: None,
            insights_raw: Some("{\"rawText\":\"Keep logging.\"}".into()),
            data_points_analyzed: 1,
        };
        assert_eq!(
            Insight::from_saved(&saved),
            Insight::Unparsed {
                raw_text: "Keep logging.".into()
            }
        );
    }

    #[test]
    fn saved_categories_rebuild_structure() {
        let saved = SavedInsight {
            id: "s2".into(),
            patient_name: Some("Ada".into()),
            analyzed_log_ids: vec!["l1".into()],
            logs_analyzed_count: 1,
            analysis_date: None,
            trends: Some(json!({"bp": "stable"})),
            correlations: None,
            recommendations: vec!["Rest".into()],
            alerts: None,
            insights_raw: None,
            data_points_analyzed: 4,
        };
        let Insight::Structured(s) = Insight::from_saved(&saved) else {
            panic!("expected structured insight");
        };
        assert_eq!(s.category(InsightCategory::Trends), Some(&json!({"bp": "stable"})));
        assert_eq!(s.recommendations(), vec!["Rest".to_string()]);
        assert!(s.category(InsightCategory::Alerts).is_none());
    }
}
