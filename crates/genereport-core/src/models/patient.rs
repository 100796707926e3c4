//! Patient models.
//!
//! Patients are owned by the surrounding records system; this core only reads
//! them to add demographic context to report prompts.

use serde::{Deserialize, Serialize};

/// A patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// UUID
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth (YYYY-MM-DD)
    pub date_of_birth: Option<String>,
    /// Sex as recorded at registration
    pub sex: Option<String>,
    pub ethnicity: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(first_name: String, last_name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            first_name,
            last_name,
            date_of_birth: None,
            sex: None,
            ethnicity: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Age in whole years on `today`, if the date of birth parses.
    pub fn age_on(&self, today: chrono::NaiveDate) -> Option<u32> {
        let dob = chrono::NaiveDate::parse_from_str(self.date_of_birth.as_deref()?, "%Y-%m-%d").ok()?;
        today.years_since(dob)
    }

    /// Demographic lines for report prompts. Names are left out on purpose.
    pub fn demographic_summary(&self, today: chrono::NaiveDate) -> String {
        let mut lines = Vec::new();
        if let Some(age) = self.age_on(today) {
            lines.push(format!("Age: {} years", age));
        }
        if let Some(sex) = &self.sex {
            lines.push(format!("Sex: {}", sex));
        }
        if let Some(ethnicity) = &self.ethnicity {
            lines.push(format!("Ethnicity: {}", ethnicity));
        }
        lines.join("\n")
    }
}
