use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Intake form collected once, before registration. Field names follow the
/// backend's `POST /register_user` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: String,
    pub gender: String,
    pub country: String,
    pub education: String,
    pub field: String,
    #[serde(rename = "yearsOfStudy")]
    pub years_of_study: String,
}

impl Demographics {
    /// Every field is required; whitespace-only counts as missing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("age", &self.age),
            ("gender", &self.gender),
            ("country", &self.country),
            ("education", &self.education),
            ("field", &self.field),
            ("yearsOfStudy", &self.years_of_study),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ValidationError::MissingField(*name)),
            None => Ok(()),
        }
    }

    /// Copy with surrounding whitespace stripped from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            age: self.age.trim().to_string(),
            gender: self.gender.trim().to_string(),
            country: self.country.trim().to_string(),
            education: self.education.trim().to_string(),
            field: self.field.trim().to_string(),
            years_of_study: self.years_of_study.trim().to_string(),
        }
    }
}
