//! Wire records for the remote services and lenient field decoding.
//!
//! The upstream services are loose about JSON types: ids arrive as numbers
//! or numeric strings, flags as `true`, `1` or `"1"`, timestamps as RFC 3339
//! or `YYYY-MM-DD HH:MM:SS`, and empty maps sometimes as `[]`. The
//! `lenient_*` deserializers accept all of these.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{EmailTemplate, RenderedPreview, TemplateId, TemplateType};
use crate::error::DeskError;

/// Checks the HTTP status and the `success` flag, returning the JSON body.
///
/// # Errors
///
/// Returns [`DeskError::Transport`] on non-2xx statuses or unparsable
/// bodies, and [`DeskError::Rejected`] when the body says
/// `success: false`.
pub async fn read_envelope(response: reqwest::Response) -> Result<Value, DeskError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(DeskError::Transport(format!("upstream returned {status}: {text}")));
    }
    let value: Value = response
        .json()
        .await
        .map_err(|e| DeskError::Transport(format!("malformed payload: {e}")))?;
    if value.get("success").and_then(lenient_flag) == Some(false) {
        let message = ["message", "mesaj", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .unwrap_or("request failed")
            .to_string();
        return Err(DeskError::Rejected(message));
    }
    Ok(value)
}

/// Decodes a typed record out of an envelope body.
///
/// # Errors
///
/// Returns [`DeskError::Transport`] when the body does not match `T`.
pub fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, DeskError> {
    serde_json::from_value(value).map_err(|e| DeskError::Transport(format!("malformed payload: {e}")))
}

/// Template row as sent by the persistence service.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRecord {
    /// Row id.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    /// Template type.
    #[serde(default, alias = "type", deserialize_with = "lenient_text")]
    pub template_type: Option<String>,
    /// Display name.
    #[serde(default, alias = "name", deserialize_with = "lenient_string")]
    pub template_name: String,
    /// Subject text.
    #[serde(default, alias = "subject", deserialize_with = "lenient_string")]
    pub subject_template: String,
    /// Body text.
    #[serde(default, alias = "body", deserialize_with = "lenient_string")]
    pub body_template: String,
    /// Active flag (defaults to `true` when absent).
    #[serde(default = "default_true", deserialize_with = "lenient_bool")]
    pub is_active: bool,
    /// Default flag.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_default: bool,
    /// Creation timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Author of the first save.
    #[serde(default, deserialize_with = "lenient_text")]
    pub created_by: Option<String>,
    /// Display name of the last editor.
    #[serde(
        default,
        alias = "updated_by_display_name",
        deserialize_with = "lenient_text"
    )]
    pub updated_by_name: Option<String>,
}

impl TemplateRecord {
    /// Converts into the domain aggregate. Rows without a parsable type
    /// belong to `slot_type`.
    #[must_use]
    pub fn into_template(self, slot_type: &TemplateType) -> EmailTemplate {
        let template_type = self
            .template_type
            .as_deref()
            .and_then(|raw| TemplateType::parse(raw).ok())
            .unwrap_or_else(|| slot_type.clone());
        EmailTemplate {
            id: self.id.map(TemplateId::new),
            template_type,
            name: self.template_name,
            subject: self.subject_template,
            body: self.body_template,
            active: self.is_active,
            default: self.is_default,
            created_at: self.created_at,
            updated_at: self.updated_at,
            created_by: self.created_by,
            updated_by_name: self.updated_by_name,
        }
    }
}

/// Body of `GET ?action=load`.
#[derive(Debug, Deserialize)]
pub struct LoadResponse {
    /// Current template, if one exists.
    #[serde(default)]
    pub template: Option<TemplateRecord>,
    /// Preview values.
    #[serde(default, deserialize_with = "lenient_object")]
    pub sample_data: Map<String, Value>,
    /// Known variables with metadata.
    #[serde(default, deserialize_with = "lenient_object")]
    pub available_variables: Map<String, Value>,
}

/// Body of `GET ?action=history`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    /// Past and alternate rows.
    #[serde(default)]
    pub history: Vec<TemplateRecord>,
}

/// Body of `POST ?action=save`.
#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    /// Canonical row after the save.
    pub template: TemplateRecord,
}

/// Body of `POST ?action=test`.
#[derive(Debug, Deserialize)]
pub struct TestSendResponse {
    /// Server-rendered preview of what was sent.
    pub preview: PreviewRecord,
}

/// Rendered subject/body pair.
#[derive(Debug, Deserialize)]
pub struct PreviewRecord {
    /// Rendered subject.
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: String,
    /// Rendered body.
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: String,
}

impl From<PreviewRecord> for RenderedPreview {
    fn from(record: PreviewRecord) -> Self {
        Self {
            subject: record.subject,
            body: record.body,
        }
    }
}

/// Body of `POST ?action=save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveTemplateRequest {
    /// Row to update; `None` creates a new row.
    pub template_id: Option<i64>,
    /// Template type.
    pub template_type: String,
    /// Display name.
    pub template_name: String,
    /// Subject text.
    pub subject_template: String,
    /// Body text.
    pub body_template: String,
    /// Active flag.
    pub is_active: bool,
    /// Default flag.
    pub is_default: bool,
}

impl From<&EmailTemplate> for SaveTemplateRequest {
    fn from(template: &EmailTemplate) -> Self {
        Self {
            template_id: template.id.map(TemplateId::get),
            template_type: template.template_type.to_string(),
            template_name: template.name.clone(),
            subject_template: template.subject.clone(),
            body_template: template.body.clone(),
            is_active: template.active,
            is_default: template.default,
        }
    }
}

/// Body of `POST ?action=test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSendRequest {
    /// Row the test is for, if saved.
    pub template_id: Option<i64>,
    /// Template type.
    pub template_type: String,
    /// Subject text (unsaved edits included).
    pub subject_template: String,
    /// Body text (unsaved edits included).
    pub body_template: String,
    /// Validated recipient.
    pub recipient_email: String,
}

/// Action posted to the simulation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationActionRequest {
    /// `send_test_email` or `execute_auto_order`.
    pub action: &'static str,
    /// Target product.
    pub product_id: i64,
    /// Validated recipient for test emails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_recipient: Option<String>,
}

/// Acknowledgement from the simulation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationAck {
    /// Human-readable outcome.
    #[serde(default, alias = "mesaj", deserialize_with = "lenient_string")]
    pub message: String,
    /// Created order identifier (execute only).
    #[serde(default, alias = "numar_comanda", deserialize_with = "lenient_text")]
    pub order_number: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Interprets `true`/`false`, non-zero numbers and `"1"`/`"true"` strings.
fn lenient_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "da" => Some(true),
            "0" | "false" | "no" | "nu" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Converts scalars to text; `null`, arrays and objects become `None`.
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_flag(&value).unwrap_or(false))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(value).filter(|s| !s.is_empty()))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(value).unwrap_or_default())
}

fn lenient_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(parse_timestamp))
}

/// Parses RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn template_record_accepts_php_style_types() {
        let Ok(record) = serde_json::from_value::<TemplateRecord>(json!({
            "id": "12",
            "template_type": "auto_order",
            "template_name": "Comanda automata",
            "subject_template": "Comanda {{ORDER_NUMBER}}",
            "body_template": "Salut {{SUPPLIER_NAME}}",
            "is_active": "1",
            "is_default": 0,
            "updated_at": "2024-03-05 10:20:30",
            "created_by": 4,
            "updated_by_name": null
        })) else {
            panic!("record decodes");
        };
        let template = record.into_template(&TemplateType::auto_order());
        assert_eq!(template.id, Some(TemplateId::new(12)));
        assert!(template.active);
        assert!(!template.default);
        assert_eq!(template.created_by.as_deref(), Some("4"));
        assert!(template.updated_by_name.is_none());
        let Some(updated) = template.updated_at else {
            panic!("timestamp parsed");
        };
        assert_eq!((updated.year(), updated.hour()), (2024, 10));
    }

    #[test]
    fn template_record_short_aliases_and_defaults() {
        let Ok(record) = serde_json::from_value::<TemplateRecord>(json!({
            "name": "n", "subject": "s", "body": "b"
        })) else {
            panic!("record decodes");
        };
        let template = record.into_template(&TemplateType::auto_order());
        assert!(template.id.is_none());
        assert!(template.active);
        assert_eq!(template.template_type, TemplateType::auto_order());
        assert_eq!(template.subject, "s");
    }

    #[test]
    fn load_response_tolerates_empty_arrays_for_maps() {
        let Ok(load) = serde_json::from_value::<LoadResponse>(json!({
            "template": null, "sample_data": [], "available_variables": {"SUPPLIER_NAME": "Furnizor"}
        })) else {
            panic!("load decodes");
        };
        assert!(load.template.is_none());
        assert!(load.sample_data.is_empty());
        assert_eq!(load.available_variables.len(), 1);
    }

    #[test]
    fn rfc3339_timestamps() {
        let Some(ts) = parse_timestamp("2024-03-05T10:20:30+02:00") else {
            panic!("rfc3339 parses");
        };
        assert_eq!(ts.hour(), 8);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn save_request_serializes_wire_names() {
        let mut template = EmailTemplate::blank(TemplateType::auto_order());
        template.name = "n".to_string();
        let json = serde_json::to_value(SaveTemplateRequest::from(&template)).unwrap_or_default();
        assert_eq!(json.get("template_id"), Some(&Value::Null));
        assert_eq!(json.get("template_type"), Some(&json!("auto_order")));
        assert_eq!(json.get("is_active"), Some(&json!(true)));
    }

    #[test]
    fn ack_accepts_numeric_order_number() {
        let Ok(ack) = serde_json::from_value::<SimulationAck>(json!({
            "success": true, "mesaj": "Comanda creata", "order_number": 5512
        })) else {
            panic!("ack decodes");
        };
        assert_eq!(ack.message, "Comanda creata");
        assert_eq!(ack.order_number.as_deref(), Some("5512"));
    }

    #[test]
    fn flags() {
        assert_eq!(lenient_flag(&json!("1")), Some(true));
        assert_eq!(lenient_flag(&json!(0)), Some(false));
        assert_eq!(lenient_flag(&json!("maybe")), None);
    }
}
