use log::warn;
use serde::Deserialize;

/// Optional overrides served next to the page.
pub const CONFIG_SOURCE: &str = "advisor-config.json";

pub const ORDER_STORAGE_KEY: &str = "advisor-order-2026";

pub const TAG_COLORS: [&str; 7] = [
    "rgba(124, 143, 241, 0.25)",
    "rgba(94, 199, 182, 0.25)",
    "rgba(249, 161, 59, 0.25)",
    "rgba(200, 107, 177, 0.25)",
    "rgba(137, 179, 74, 0.25)",
    "rgba(87, 160, 224, 0.25)",
    "rgba(240, 113, 103, 0.25)",
];

/// How the ranking is laid out in the posted form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadShape {
    /// A fixed number of `<ordinal> Choice` inputs.
    DiscreteFields { slots: usize },
    /// One field carrying a row-per-rank CSV blob.
    SerializedBlob { field: String },
}

impl Default for PayloadShape {
    fn default() -> Self {
        Self::DiscreteFields { slots: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub data_source: String,
    pub storage_key: String,
    pub submit_endpoint: String,
    pub form_name: String,
    pub name_column: String,
    pub capacity_column: String,
    pub tag_column_hint: String,
    pub tag_column_index: usize,
    pub tag_column_default: String,
    pub email_domain: String,
    pub payload_shape: PayloadShape,
    pub resize_debounce_ms: u32,
    pub flash_ms: u32,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            data_source: "2026-Capstone-Advisors.csv".to_owned(),
            storage_key: ORDER_STORAGE_KEY.to_owned(),
            submit_endpoint: "/".to_owned(),
            form_name: "advisor-lottery".to_owned(),
            name_column: "Name".to_owned(),
            capacity_column: "Capacity".to_owned(),
            tag_column_hint: "methods".to_owned(),
            tag_column_index: 2,
            tag_column_default: "Tags".to_owned(),
            email_domain: "columbia.edu".to_owned(),
            payload_shape: PayloadShape::default(),
            resize_debounce_ms: 50,
            flash_ms: 600,
        }
    }
}

impl FormConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Defaults when `text` is absent or does not parse.
    pub fn from_json_or_default(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Self::default();
        };
        Self::from_json(text).unwrap_or_else(|err| {
            warn!("Ignoring malformed {}: {}", CONFIG_SOURCE, err);
            Self::default()
        })
    }
}
