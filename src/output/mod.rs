//! Rendering detection results for people and for machines.
//!
//! A [`Report`] is a flattened, serializable snapshot of one parser:
//! fields grouped by tab, metadata properties, and available images.
//! [`text`] prints it with colors; [`Report::to_json`] serializes it.

pub mod text;

use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::OutputConfig;
use crate::romdata::fields::{age, lang_code_str, DateTimeFlags, Field, FieldData, FieldType, ListData, ListExtra, ListRows};
use crate::romdata::metadata::PropertyValue;
use crate::romdata::{ExtUrl, RomData, SystemNameType};

/// One field, rendered.
#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Display text for the text renderer.
    #[serde(skip)]
    pub text: String,
    /// Structured value for JSON.
    pub value: Value,
}

/// Fields sharing one tab.
#[derive(Debug, Clone, Serialize)]
pub struct TabReport {
    /// `None` for unnamed tabs.
    pub name: Option<String>,
    pub fields: Vec<FieldReport>,
}

/// A metadata property, rendered.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyReport {
    pub name: &'static str,
    pub value: PropertyValue,
}

/// Everything known about one detected file.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub path: String,
    pub class_name: &'static str,
    pub system: Option<&'static str>,
    pub file_type: &'static str,
    pub tabs: Vec<TabReport>,
    pub metadata: Vec<PropertyReport>,
    /// Internal image types the parser can decode.
    pub images: Vec<&'static str>,
    pub ext_urls: Vec<ExtUrl>,
}

impl Report {
    /// Snapshot `rd`. Loads fields and metadata if not loaded yet.
    pub fn from_rom(path: &Path, rd: &dyn RomData, opts: &OutputConfig) -> Self {
        let fields = rd.fields();
        let mut tabs: Vec<TabReport> = (0..fields.tab_count())
            .map(|idx| TabReport {
                name: fields.tab_name(idx).map(str::to_string),
                fields: Vec::new(),
            })
            .collect();
        for field in fields.iter().filter(|f| f.is_valid) {
            if let Some(tab) = tabs.get_mut(field.tab_idx) {
                tab.fields.push(render_field(field, opts.age_ratings_newlines));
            }
        }
        // Tab 0 always shows; later unnamed tabs only on request.
        let tabs = tabs
            .into_iter()
            .enumerate()
            .filter(|(idx, tab)| !tab.fields.is_empty() && (*idx == 0 || tab.name.is_some() || opts.show_hidden_tabs))
            .map(|(_, tab)| tab)
            .collect();

        let metadata = rd
            .metadata()
            .iter()
            .map(|(prop, value)| PropertyReport {
                name: prop.name(),
                value: value.clone(),
            })
            .collect();

        let supported = rd.supported_image_types();
        let images = supported
            .iter()
            .filter(|t| t.is_internal())
            .map(|t| t.name())
            .collect();
        let ext_urls = supported
            .iter()
            .filter(|t| !t.is_internal())
            .flat_map(|&t| rd.ext_urls(t))
            .collect();

        Self {
            path: path.display().to_string(),
            class_name: rd.class_name(),
            system: rd.system_name(SystemNameType::Long),
            file_type: rd.file_type().name(),
            tabs,
            metadata,
            images,
            ext_urls,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Format a timestamp the way its flags describe it.
pub fn format_date_time(timestamp: Option<i64>, flags: DateTimeFlags) -> String {
    let Some(dt) = timestamp.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)) else {
        return "Unknown".to_string();
    };
    let date_fmt = if flags.contains(DateTimeFlags::NO_YEAR) { "%m-%d" } else { "%Y-%m-%d" };
    let fmt = match (
        flags.contains(DateTimeFlags::HAS_DATE),
        flags.contains(DateTimeFlags::HAS_TIME),
    ) {
        (true, true) => format!("{date_fmt} %H:%M:%S"),
        (true, false) => date_fmt.to_string(),
        (false, true) => "%H:%M:%S".to_string(),
        (false, false) => return "Unknown".to_string(),
    };
    let mut out = dt.format(&fmt).to_string();
    if flags.contains(DateTimeFlags::HAS_TIME) && flags.contains(DateTimeFlags::IS_UTC) {
        out.push_str(" UTC");
    }
    out
}

fn rows_to_json(rows: &[Vec<String>]) -> Value {
    Value::from(rows.iter().map(|r| Value::from(r.clone())).collect::<Vec<_>>())
}

fn rows_to_text(rows: &[Vec<String>], checked: Option<u32>) -> String {
    rows.iter()
        .enumerate()
        .map(|(idx, r)| match checked {
            Some(bits) if idx < 32 && bits & (1 << idx) != 0 => format!("[x] {}", r.join(" | ")),
            Some(_) => format!("[ ] {}", r.join(" | ")),
            None => r.join(" | "),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text and JSON for a table. Checkbox state only covers the first 32 rows.
fn render_list(list: &ListData) -> (String, Value) {
    let headers = list.headers.clone().unwrap_or_default();
    let checked = match list.extra {
        ListExtra::Checkboxes(bits) => Some(bits),
        _ => None,
    };
    let default_rows = list.rows.default_rows();
    let header_line = if headers.is_empty() { String::new() } else { headers.join(" | ") + "\n" };
    let text = header_line + &rows_to_text(default_rows, checked);

    let rows = match &list.rows {
        ListRows::Single(rows) => rows_to_json(rows),
        ListRows::Multi(map) => Value::Object(
            map.iter()
                .map(|(lc, rows)| (lang_code_str(*lc), rows_to_json(rows)))
                .collect(),
        ),
    };
    let mut value = json!({
        "headers": headers,
        "rows": rows,
        "flags": list.flags.names(),
    });
    if list.rows_visible != 0 {
        value["rows_visible"] = json!(list.rows_visible);
    }
    if let Some(bits) = checked {
        let states: Vec<bool> = (0..default_rows.len()).map(|idx| idx < 32 && bits & (1 << idx) != 0).collect();
        value["checked"] = json!(states);
    }
    (text, value)
}

/// Render one field as display text plus a JSON value.
pub fn render_field(field: &Field, age_ratings_newlines: bool) -> FieldReport {
    let (text, value) = match &field.data {
        FieldData::String { value, .. } => {
            let s = value.clone().unwrap_or_default();
            (s.clone(), Value::from(s))
        }
        FieldData::Bitfield { names, value, .. } => {
            let set: Vec<&str> = names
                .iter()
                .enumerate()
                .filter(|(bit, name)| !name.is_empty() && *bit < 32 && value & (1 << bit) != 0)
                .map(|(_, name)| name.as_str())
                .collect();
            let text = if set.is_empty() { "(none)".to_string() } else { set.join(", ") };
            (text, json!({ "value": value, "set": set }))
        }
        FieldData::ListData(list) => render_list(list),
        FieldData::DateTime { timestamp, flags } => {
            (format_date_time(*timestamp, *flags), json!({ "timestamp": timestamp, "flags": flags }))
        }
        FieldData::AgeRatings(ratings) => {
            let text = age::decode_all(ratings, age_ratings_newlines);
            let by_body: serde_json::Map<String, Value> = ratings
                .iter()
                .enumerate()
                .filter(|(_, &r)| r & age::ACTIVE != 0)
                .map(|(country, &r)| {
                    let key = age::abbrev(country).map(str::to_string).unwrap_or_else(|| country.to_string());
                    (key, Value::from(age::decode(country, r)))
                })
                .collect();
            (text, Value::Object(by_body))
        }
        FieldData::Dimensions(dims) => {
            let used: Vec<String> = dims
                .iter()
                .take_while(|&&d| d != 0)
                .map(u32::to_string)
                .collect();
            (used.join("x"), json!(dims))
        }
    };

    FieldReport {
        name: field.name.clone(),
        field_type: field.field_type(),
        text,
        value,
    }
}
