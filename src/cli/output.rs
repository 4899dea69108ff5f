use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::io::draft_io::DraftSummary;
use crate::model::draft::Draft;
use crate::model::schema::{CategorySchema, FieldKind};
use crate::model::session::Session;
use crate::model::value::FieldValue;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct CategoryJson {
    pub key: &'static str,
    pub label: &'static str,
    pub endpoint: &'static str,
    pub service_key: String,
    pub required: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct DraftJson<'a> {
    pub category: &'static str,
    pub fields: &'a IndexMap<String, FieldValue>,
}

#[derive(Serialize)]
pub struct DraftSummaryJson {
    pub category: &'static str,
    pub label: &'static str,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct ListChangeJson {
    pub field: String,
    pub changed: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ImagesJson {
    pub added: usize,
    pub failed: usize,
    /// The draft was discarded while the images were processing
    pub dropped: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

#[derive(Serialize)]
pub struct SessionJson {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

#[derive(Serialize)]
pub struct ConfigJson {
    pub path: String,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub max_width: u32,
    pub quality: u8,
    pub max_parallel: usize,
    pub maps_api_key: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn category_to_json(schema: &'static CategorySchema, service_key: String) -> CategoryJson {
    CategoryJson {
        key: schema.key,
        label: schema.label,
        endpoint: schema.endpoint,
        service_key,
        required: schema.required_spec(),
    }
}

pub fn draft_to_json(draft: &Draft) -> DraftJson<'_> {
    DraftJson {
        category: draft.schema().key,
        fields: draft.fields(),
    }
}

pub fn summary_to_json(summary: &DraftSummary) -> DraftSummaryJson {
    DraftSummaryJson {
        category: summary.category.key,
        label: summary.category.label,
        updated_at: summary.updated_at.to_rfc3339(),
    }
}

pub fn session_to_json(session: &Session) -> SessionJson {
    SessionJson {
        signed_in: session.is_authenticated(),
        user: session
            .user
            .as_ref()
            .and_then(|u| serde_json::to_value(u).ok()),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Left-align `s` in a column of `width` display cells.
pub fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - w))
    }
}

/// Rows of cells rendered as aligned columns, two spaces apart.
pub fn format_table(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| UnicodeWidthStr::width(c.as_str()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    rows.iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    if i + 1 == row.len() {
                        c.clone()
                    } else {
                        pad(c, widths[i])
                    }
                })
                .collect();
            cells.join("  ")
        })
        .collect()
}

/// Field-by-field view of a draft. Required fields are marked `*`; image
/// data is summarized rather than printed.
pub fn format_draft_detail(draft: &Draft) -> Vec<String> {
    let schema = draft.schema();
    let mut lines = vec![format!("== {} ({}) ==", schema.label, schema.key)];

    let rows: Vec<Vec<String>> = schema
        .fields
        .iter()
        .map(|spec| {
            let marker = if spec.required { "*" } else { " " };
            let value = match (spec.kind, draft.get(spec.path)) {
                (FieldKind::Images, _) => format!("{} attached", draft.list_len(spec.path)),
                (_, Some(v)) => v.display(),
                (_, None) => "-".to_string(),
            };
            vec![
                format!("{} {}", marker, spec.label),
                spec.path.to_string(),
                value,
            ]
        })
        .collect();
    lines.extend(format_table(&rows));
    lines
}

/// One line per published listing: name, then location when present.
pub fn format_listing(entity: &Value) -> String {
    let text = |key: &str| {
        entity
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    let name = text("name").or_else(|| text("title")).unwrap_or("(unnamed)");
    match text("location").or_else(|| text("address")) {
        Some(location) => format!("{} ({})", name, location),
        None => name.to_string(),
    }
}
