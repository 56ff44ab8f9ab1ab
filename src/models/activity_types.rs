use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::models::common::non_blank;

pub const DEFAULT_CATEGORY: &str = "OTHER";

text_enum! {
    pub enum ActivityTypeStatus {
        Draft => "DRAFT",
        Submitted => "SUBMITTED",
        UnderReview => "UNDER_REVIEW",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

impl ActivityTypeStatus {
    pub fn awaiting_review(&self) -> bool {
        matches!(
            self,
            ActivityTypeStatus::Submitted | ActivityTypeStatus::UnderReview
        )
    }
}

text_enum! {
    pub enum FieldType {
        Text => "text",
        Number => "number",
        Date => "date",
        Select => "select",
        Checkbox => "checkbox",
        Url => "url",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct ActivityType {
    pub id: Uuid,
    pub institute_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub is_primitive: bool,
    pub status: ActivityTypeStatus,
    pub form_schema: Json<Vec<FormField>>,
    pub min_credits: i32,
    pub max_credits: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActivityType {
    /// Primitive types are shared by every institute.
    pub fn visible_to(&self, institute_id: Uuid) -> bool {
        self.is_primitive || self.institute_id == Some(institute_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActivityTypeRequest {
    #[validate(length(min = 1, max = 120, message = "Activity type name is required"), custom = "non_blank")]
    pub name: String,
    #[validate(length(max = 60, message = "Key must be at most 60 characters"))]
    pub key: Option<String>,
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub is_primitive: bool,
    #[serde(default)]
    pub form_schema: Vec<FormField>,
    #[serde(default)]
    pub min_credits: i32,
    #[serde(default)]
    pub max_credits: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateActivityTypeRequest {
    #[validate(length(min = 1, max = 120, message = "Activity type name is required"), custom = "non_blank")]
    pub name: Option<String>,
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<ActivityTypeStatus>,
    pub form_schema: Option<Vec<FormField>>,
    pub min_credits: Option<i32>,
    pub max_credits: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityTypeQuery {
    pub category: Option<String>,
    pub status: Option<ActivityTypeStatus>,
}

/// Validated insert for `tbl_activity_types`.
#[derive(Debug, Clone)]
pub struct NewActivityType {
    pub institute_id: Option<Uuid>,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub is_primitive: bool,
    pub status: ActivityTypeStatus,
    pub form_schema: Vec<FormField>,
    pub min_credits: i32,
    pub max_credits: i32,
    pub created_by: Uuid,
}

/// Trimmed lowercase key, derived from the name when none is given.
pub fn normalize_key(key: Option<&str>, name: &str) -> Result<String, String> {
    let source = match key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => key,
        None => name.trim(),
    };

    let mut normalized = String::with_capacity(source.len());
    for c in source.to_lowercase().chars() {
        if c.is_alphanumeric() {
            normalized.push(c);
        } else if !normalized.ends_with('_') {
            normalized.push('_');
        }
    }
    let normalized = normalized.trim_matches('_').to_string();

    if normalized.is_empty() {
        return Err("Activity type key could not be derived from the name".into());
    }
    Ok(normalized)
}

pub fn normalize_category(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

pub fn validate_credits(min_credits: i32, max_credits: i32) -> Result<(), String> {
    if min_credits < 0 || max_credits < 0 {
        return Err("Credits cannot be negative".into());
    }
    if min_credits > max_credits {
        return Err("Minimum credit cannot be greater than maximum credit".into());
    }
    Ok(())
}

pub fn validate_form_schema(fields: &[FormField]) -> Result<(), String> {
    let mut keys = HashSet::new();

    for (index, field) in fields.iter().enumerate() {
        let position = index + 1;
        let key = field.key.trim();
        if key.is_empty() {
            return Err(format!("Field {position}: key is required"));
        }
        if field.label.trim().is_empty() {
            return Err(format!("Field {position}: label is required"));
        }
        if !keys.insert(key.to_string()) {
            return Err(format!("Field {position}: duplicate key \"{key}\""));
        }
        if matches!(field.field_type, FieldType::Select | FieldType::Checkbox) {
            if field.options.iter().all(|o| o.trim().is_empty()) {
                return Err(format!(
                    "Field {position}: {} fields need at least one option",
                    field.field_type
                ));
            }
        }
    }

    Ok(())
}

/// Checks an activity's `details` object against the type's form schema.
///
/// With an empty schema any object is accepted; otherwise unknown keys are
/// rejected.
pub fn validate_details(fields: &[FormField], details: &Value) -> Result<(), String> {
    let empty = Map::new();
    let object = match details {
        Value::Object(object) => object,
        Value::Null => &empty,
        _ => return Err("details must be an object".into()),
    };

    if fields.is_empty() {
        return Ok(());
    }

    if let Some(unknown) = object
        .keys()
        .find(|key| !fields.iter().any(|f| f.key.trim() == key.as_str()))
    {
        return Err(format!("details.{unknown} is not part of this activity type"));
    }

    for field in fields {
        let key = field.key.trim();
        let value = object.get(key).filter(|v| !is_blank(v));
        match value {
            None if field.required => return Err(format!("details.{key} is required")),
            None => continue,
            Some(value) => check_field_value(field, key, value)?,
        }
    }

    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_field_value(field: &FormField, key: &str, value: &Value) -> Result<(), String> {
    match (field.field_type, value) {
        (FieldType::Text, Value::String(_)) => Ok(()),
        (FieldType::Number, Value::Number(_)) => Ok(()),
        (FieldType::Date, Value::String(s)) => {
            let valid = NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || DateTime::parse_from_rfc3339(s).is_ok();
            if valid {
                Ok(())
            } else {
                Err(format!("details.{key} must be a date (YYYY-MM-DD)"))
            }
        }
        (FieldType::Url, Value::String(s)) => {
            if s.starts_with("http://") || s.starts_with("https://") {
                Ok(())
            } else {
                Err(format!("details.{key} must be an http(s) URL"))
            }
        }
        (FieldType::Select, Value::String(s)) => {
            if field.options.iter().any(|o| o == s) {
                Ok(())
            } else {
                Err(format!("details.{key} must be one of: {}", field.options.join(", ")))
            }
        }
        (FieldType::Checkbox, Value::Array(items)) => {
            let all_known = items.iter().all(|item| {
                item.as_str()
                    .map(|s| field.options.iter().any(|o| o == s))
                    .unwrap_or(false)
            });
            if all_known {
                Ok(())
            } else {
                Err(format!(
                    "details.{key} must only contain: {}",
                    field.options.join(", ")
                ))
            }
        }
        (field_type, _) => Err(format!("details.{key} must be a valid {field_type} value")),
    }
}
