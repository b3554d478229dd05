use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use thiserror::Error;
use vision_llm::{NOT_SPECIFIED, PromptKind, parse_json_object};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    PrescriptionSimple,
    PrescriptionFull,
    LabReport,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 3] = [
        DocumentCategory::PrescriptionSimple,
        DocumentCategory::PrescriptionFull,
        DocumentCategory::LabReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::PrescriptionSimple => "prescription_simple",
            DocumentCategory::PrescriptionFull => "prescription_full",
            DocumentCategory::LabReport => "lab_report",
        }
    }

    pub fn prompt_kind(&self) -> PromptKind {
        match self {
            DocumentCategory::PrescriptionSimple => PromptKind::PrescriptionSimple,
            DocumentCategory::PrescriptionFull => PromptKind::PrescriptionFull,
            DocumentCategory::LabReport => PromptKind::LabReport,
        }
    }

    /// Decode raw model text into this category's record.
    pub fn parse_response(&self, raw: &str) -> vision_llm::Result<ExtractionResult> {
        Ok(match self {
            DocumentCategory::PrescriptionSimple => {
                ExtractionResult::PrescriptionSimple(parse_json_object(raw)?)
            }
            DocumentCategory::PrescriptionFull => {
                ExtractionResult::PrescriptionFull(parse_json_object(raw)?)
            }
            DocumentCategory::LabReport => ExtractionResult::LabReport(parse_json_object(raw)?),
        })
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown document category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for DocumentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "prescription_simple" => Ok(DocumentCategory::PrescriptionSimple),
            "prescription_full" | "prescription" => Ok(DocumentCategory::PrescriptionFull),
            "lab_report" => Ok(DocumentCategory::LabReport),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// A text field read off a document.
///
/// Accepts strings, numbers and booleans; `null` or an absent nested field becomes
/// `"Non spécifié"`. Objects or arrays where text is expected are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Text(pub String);

impl Text {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Text {
    fn default() -> Self {
        Text(NOT_SPECIFIED.to_string())
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text(value.to_string())
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Text::default()),
            Value::String(s) => Ok(Text(s)),
            Value::Number(n) => Ok(Text(n.to_string())),
            Value::Bool(b) => Ok(Text(b.to_string())),
            Value::Array(_) => Err(de::Error::custom("expected text, found an array")),
            Value::Object(_) => Err(de::Error::custom("expected text, found an object")),
        }
    }
}

/// Nested record the model may replace with `null` or a placeholder string such as
/// `"Non spécifié"`; both read as the all-default record.
fn lenient_record<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: de::DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::String(_) => Ok(T::default()),
        value @ Value::Object(_) => serde_json::from_value(value).map_err(de::Error::custom),
        other => Err(de::Error::custom(format!(
            "expected an object, found {}",
            other
        ))),
    }
}

// Simple prescription

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplePrescription {
    #[serde(rename = "nom_docteur")]
    pub doctor_name: Text,
    #[serde(rename = "specialite")]
    pub specialty: Text,
    pub date: Text,
    #[serde(rename = "institut")]
    pub institution: Text,
    #[serde(rename = "contenu")]
    pub content: Text,
}

// Full prescription

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriberInfo {
    #[serde(rename = "nom")]
    pub name: Text,
    #[serde(rename = "specialite")]
    pub specialty: Text,
    #[serde(rename = "adresse")]
    pub address: Text,
    #[serde(rename = "telephone")]
    pub phone: Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriptionPatient {
    #[serde(rename = "nom")]
    pub name: Text,
    pub age: Text,
    #[serde(rename = "autres_infos")]
    pub other_info: Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Medication {
    #[serde(rename = "nom")]
    pub name: Text,
    pub dosage: Text,
    #[serde(rename = "forme")]
    pub form: Text,
    #[serde(rename = "posologie")]
    pub posology: Text,
    #[serde(rename = "duree")]
    pub duration: Text,
    #[serde(rename = "quantite")]
    pub quantity: Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPrescription {
    #[serde(rename = "docteur")]
    pub doctor: PrescriberInfo,
    #[serde(default, deserialize_with = "lenient_record")]
    pub patient: PrescriptionPatient,
    pub date: Text,
    #[serde(rename = "medicaments")]
    pub medications: Vec<Medication>,
    #[serde(rename = "instructions_generales", default)]
    pub general_instructions: Text,
    #[serde(rename = "texte_brut_complet", default)]
    pub full_text: Text,
}

// Lab report

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaboratoryInfo {
    #[serde(rename = "nom")]
    pub name: Text,
    #[serde(rename = "adresse")]
    pub address: Text,
    #[serde(rename = "telephone")]
    pub phone: Text,
    #[serde(rename = "autres_infos")]
    pub other_info: Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabPatient {
    #[serde(rename = "nom")]
    pub name: Text,
    pub age: Text,
    #[serde(rename = "sexe")]
    pub sex: Text,
    #[serde(rename = "date_naissance")]
    pub birth_date: Text,
    #[serde(rename = "autres_infos")]
    pub other_info: Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisInfo {
    #[serde(rename = "date_prelevement")]
    pub sampled_at: Text,
    #[serde(rename = "date_rapport")]
    pub reported_at: Text,
    #[serde(rename = "medecin_prescripteur")]
    pub prescriber: Text,
    #[serde(rename = "type_analyse")]
    pub analysis_type: Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabParameter {
    #[serde(rename = "nom")]
    pub name: Text,
    #[serde(rename = "valeur")]
    pub value: Text,
    #[serde(rename = "unite")]
    pub unit: Text,
    #[serde(rename = "valeur_reference")]
    pub reference_range: Text,
    #[serde(rename = "statut")]
    pub status: Text,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabSection {
    #[serde(rename = "titre")]
    pub title: Text,
    #[serde(rename = "methode")]
    pub method: Text,
    #[serde(rename = "parametres")]
    pub parameters: Vec<LabParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReport {
    #[serde(rename = "informations_laboratoire", default, deserialize_with = "lenient_record")]
    pub laboratory: LaboratoryInfo,
    #[serde(rename = "informations_patient", default, deserialize_with = "lenient_record")]
    pub patient: LabPatient,
    #[serde(rename = "informations_analyse", default, deserialize_with = "lenient_record")]
    pub analysis: AnalysisInfo,
    #[serde(rename = "resultats_par_section")]
    pub sections: BTreeMap<String, LabSection>,
    #[serde(rename = "commentaires_biologiste", default)]
    pub biologist_comments: Text,
    #[serde(rename = "signatures_cachets", default)]
    pub signatures: Text,
    #[serde(rename = "texte_brut_complet", default)]
    pub full_text: Text,
}

/// Structured output of one extraction, serialized with the prompt's own keys
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    PrescriptionSimple(SimplePrescription),
    PrescriptionFull(FullPrescription),
    LabReport(LabReport),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImagePathRequest {
    pub image_path: String,
}
