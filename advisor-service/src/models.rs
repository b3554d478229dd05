use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vision_llm::OFF_TOPIC_REFUSAL;

/// Structured consultation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceRequest {
    pub symptoms: Vec<String>,
    pub age: u32,
    pub is_emergency: bool,
    pub location: String,
    pub budget: f64,
}

impl AdviceRequest {
    /// The French consultation prompt sent as the user message.
    pub fn user_prompt(&self) -> String {
        format!(
            "Patient de {} ans à {}.\nSymptômes: {}\nUrgence: {}\nBudget: {}€\n\n\
             Donne des conseils rassurants et recommande des spécialistes appropriés. \
             Identifie la spécialité principale si possible.",
            self.age,
            self.location,
            self.symptoms.join(", "),
            if self.is_emergency { "Oui" } else { "Non" },
            self.budget
        )
    }

    pub fn has_symptoms(&self) -> bool {
        self.symptoms.iter().any(|s| !s.trim().is_empty())
    }
}

/// Free-text question for the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistRecommendation {
    #[serde(rename = "specialite")]
    pub specialty: String,
    #[serde(rename = "raison")]
    pub reason: String,
    #[serde(rename = "nom_medecin", default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SpecialistRecommendation {
    pub fn generic(specialty: &str, reason: &str) -> Self {
        Self {
            specialty: specialty.to_string(),
            reason: reason.to_string(),
            doctor_name: None,
            email: None,
            phone: None,
            address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceResult {
    pub reassurance: String,
    #[serde(rename = "specialite_identifiee", default)]
    pub identified_specialty: Option<String>,
    #[serde(rename = "conseils_generaux")]
    pub general_tips: Vec<String>,
    #[serde(rename = "specialistes_recommandes")]
    pub recommended_specialists: Vec<SpecialistRecommendation>,
    #[serde(rename = "message_final")]
    pub final_message: String,
}

impl AdviceResult {
    /// Answer for questions outside the medical domain.
    pub fn refusal() -> Self {
        Self {
            reassurance: String::new(),
            identified_specialty: None,
            general_tips: Vec::new(),
            recommended_specialists: Vec::new(),
            final_message: OFF_TOPIC_REFUSAL.to_string(),
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.final_message == OFF_TOPIC_REFUSAL
            && self.reassurance.is_empty()
            && self.recommended_specialists.is_empty()
    }

    /// The identified specialty, ignoring blanks and a literal "null" some models write.
    pub fn specialty_to_lookup(&self) -> Option<&str> {
        self.identified_specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
    }
}

/// Read-only projection of a doctor row and its consultation count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DoctorRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub consultation_count: i64,
}

impl DoctorRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What the advisor knows about the consultation besides the model answer
#[derive(Debug, Clone, Default)]
pub struct ConsultationContext {
    pub symptoms: Option<Vec<String>>,
    pub age: Option<u32>,
    pub location: Option<String>,
    pub user_prompt: String,
}

impl ConsultationContext {
    pub fn from_request(request: &AdviceRequest) -> Self {
        Self {
            symptoms: Some(request.symptoms.clone()),
            age: Some(request.age),
            location: Some(request.location.clone()),
            user_prompt: request.user_prompt(),
        }
    }

    pub fn from_chat(user_prompt: &str) -> Self {
        Self {
            user_prompt: user_prompt.to_string(),
            ..Default::default()
        }
    }

    pub fn symptoms(&self) -> &[String] {
        self.symptoms.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub symptoms: Option<Vec<String>>,
    pub age: Option<u32>,
    pub location: Option<String>,
    pub user_prompt: String,
    pub advice: AdviceResult,
}

impl ConsultationRecord {
    pub fn new(context: ConsultationContext, advice: AdviceResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            symptoms: context.symptoms,
            age: context.age,
            location: context.location,
            user_prompt: context.user_prompt,
            advice,
        }
    }
}
