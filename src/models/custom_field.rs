use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    #[default]
    Text,
    Number,
    Date,
    Select,
}

impl CustomFieldType {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "number" => Self::Number,
            "date" => Self::Date,
            "select" => Self::Select,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for CustomFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
            Self::Select => write!(f, "select"),
        }
    }
}

/// Administrator-defined extra resident attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: Option<i64>,
    pub name: String,
    pub field_type: CustomFieldType,
    /// Comma-separated choices for `Select`
    pub options: Option<String>,
    pub required: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl CustomField {
    pub fn new(name: impl Into<String>, field_type: CustomFieldType) -> Self {
        Self {
            id: None,
            name: name.into(),
            field_type,
            options: None,
            required: false,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn options_list(&self) -> Vec<&str> {
        self.options
            .as_ref()
            .map(|o| o.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), crate::utils::error::AppError> {
        use crate::utils::error::AppError;

        if self.name.trim().is_empty() {
            return Err(AppError::validation("Custom field name is required"));
        }
        if self.field_type == CustomFieldType::Select && self.options_list().is_empty() {
            return Err(AppError::validation("Select fields need at least one option"));
        }
        Ok(())
    }

    /// Check a value against the field type
    pub fn validate_value(&self, value: &str) -> Result<(), crate::utils::error::AppError> {
        use crate::utils::error::AppError;

        let value = value.trim();
        if value.is_empty() {
            if self.required {
                return Err(AppError::validation(format!("{} is required", self.name)));
            }
            return Ok(());
        }

        match self.field_type {
            CustomFieldType::Text => Ok(()),
            CustomFieldType::Number => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| AppError::validation(format!("{} must be a number", self.name))),
            CustomFieldType::Date => crate::utils::date::parse_date(value)
                .map(|_| ())
                .ok_or_else(|| AppError::validation(format!("{} must be a date", self.name))),
            CustomFieldType::Select => {
                if self.options_list().contains(&value) {
                    Ok(())
                } else {
                    Err(AppError::validation(format!(
                        "{} must be one of: {}",
                        self.name,
                        self.options_list().join(", ")
                    )))
                }
            }
        }
    }
}

/// Value of a custom field for one resident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentCustomField {
    pub id: Option<i64>,
    pub resident_id: i64,
    pub custom_field_id: i64,
    pub value: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
