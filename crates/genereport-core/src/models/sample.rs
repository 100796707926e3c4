//! Biological sample models.

use serde::{Deserialize, Serialize};

/// Sample type with kind-specific details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleKind {
    Blood {
        volume_ml: Option<f64>,
        anticoagulant: Option<String>,
    },
    Dna {
        concentration_ng_per_ul: Option<f64>,
        /// A260/A280 ratio
        purity_ratio: Option<f64>,
    },
    Saliva {
        collection_kit: Option<String>,
    },
}

impl SampleKind {
    /// Discriminant stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Blood { .. } => "blood",
            SampleKind::Dna { .. } => "dna",
            SampleKind::Saliva { .. } => "saliva",
        }
    }

    /// Human-readable label for prompts.
    pub fn label(&self) -> &'static str {
        match self {
            SampleKind::Blood { .. } => "Blood",
            SampleKind::Dna { .. } => "DNA",
            SampleKind::Saliva { .. } => "Saliva",
        }
    }

    /// Kind-specific details as `key: value` lines.
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self {
            SampleKind::Blood {
                volume_ml,
                anticoagulant,
            } => {
                if let Some(v) = volume_ml {
                    lines.push(format!("Volume: {} mL", v));
                }
                if let Some(a) = anticoagulant {
                    lines.push(format!("Anticoagulant: {}", a));
                }
            }
            SampleKind::Dna {
                concentration_ng_per_ul,
                purity_ratio,
            } => {
                if let Some(c) = concentration_ng_per_ul {
                    lines.push(format!("DNA concentration: {} ng/uL", c));
                }
                if let Some(p) = purity_ratio {
                    lines.push(format!("Purity (A260/A280): {}", p));
                }
            }
            SampleKind::Saliva { collection_kit } => {
                if let Some(k) = collection_kit {
                    lines.push(format!("Collection kit: {}", k));
                }
            }
        }
        lines
    }
}

/// Sample lifecycle status, owned by the lab workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SampleStatus {
    Registered,
    Received,
    InAnalysis,
    Analyzed,
    Rejected,
}

impl SampleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SampleStatus::Registered => "Registered",
            SampleStatus::Received => "Received",
            SampleStatus::InAnalysis => "In analysis",
            SampleStatus::Analyzed => "Analyzed",
            SampleStatus::Rejected => "Rejected",
        }
    }
}

/// A biological sample registered for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// UUID
    pub sample_id: String,
    /// Owning patient
    pub patient_id: String,
    pub kind: SampleKind,
    pub status: SampleStatus,
    /// Collection date (YYYY-MM-DD)
    pub collection_date: String,
    /// Free-text lab notes
    pub notes: Option<String>,
    pub created_at: String,
}

impl Sample {
    pub fn new(patient_id: String, kind: SampleKind, collection_date: String) -> Self {
        Self {
            sample_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            kind,
            status: SampleStatus::Registered,
            collection_date,
            notes: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
