//! Specialist list post-processing.
//!
//! Real doctors replace the model's generic suggestions when the directory has any. A medical
//! answer always ends with at least two recommendations: the general practitioner first, then a
//! specialty picked from [`SYMPTOM_SPECIALTIES`] or, when no keyword matches, a generic one.

use tracing::debug;

use crate::models::{DoctorRecord, SpecialistRecommendation};

pub const MIN_SPECIALISTS: usize = 2;

const GENERAL_PRACTITIONER: (&str, &str) = (
    "Médecin généraliste",
    "Pour une première évaluation et un suivi global",
);
const GENERIC_SPECIALIST: (&str, &str) = (
    "Spécialiste approprié",
    "Pour un examen plus approfondi de vos symptômes",
);
const DOCTOR_REASON: &str = "Médecin recommandé pour vos symptômes.";

/// A symptom keyword and the specialty it points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymptomRule {
    /// Matched as a lowercase substring of a reported symptom
    pub keyword: &'static str,
    pub specialty: &'static str,
    pub reason: &'static str,
}

const CARDIAC: &str = "Pour un avis spécialisé concernant des symptômes cardiaques";
const SKIN: &str = "Pour un diagnostic précis de l'éruption cutanée";
const CHILD: &str = "Pour un suivi adapté à l'enfant";
const EMERGENCY: &str = "Pour une prise en charge rapide";

/// Keyword table, checked in order for each symptom.
pub const SYMPTOM_SPECIALTIES: &[SymptomRule] = &[
    SymptomRule { keyword: "douleur thoracique", specialty: "Cardiologue", reason: CARDIAC },
    SymptomRule { keyword: "chest pain", specialty: "Cardiologue", reason: CARDIAC },
    SymptomRule { keyword: "essoufflement", specialty: "Cardiologue", reason: CARDIAC },
    SymptomRule { keyword: "palpitations", specialty: "Cardiologue", reason: CARDIAC },
    SymptomRule { keyword: "hypertension", specialty: "Cardiologue", reason: CARDIAC },
    SymptomRule { keyword: "éruption cutanée", specialty: "Dermatologue", reason: SKIN },
    SymptomRule { keyword: "éruptions cutanées", specialty: "Dermatologue", reason: SKIN },
    SymptomRule { keyword: "skin rash", specialty: "Dermatologue", reason: SKIN },
    SymptomRule { keyword: "acné", specialty: "Dermatologue", reason: SKIN },
    SymptomRule { keyword: "allergies cutanées", specialty: "Dermatologue", reason: SKIN },
    SymptomRule { keyword: "chute de cheveux", specialty: "Dermatologue", reason: SKIN },
    SymptomRule { keyword: "fièvre enfant", specialty: "Pédiatre", reason: CHILD },
    SymptomRule { keyword: "troubles de croissance", specialty: "Pédiatre", reason: CHILD },
    SymptomRule { keyword: "maladies infantiles", specialty: "Pédiatre", reason: CHILD },
    SymptomRule { keyword: "traumatisme", specialty: "Urgentiste", reason: EMERGENCY },
    SymptomRule { keyword: "hémorragie", specialty: "Urgentiste", reason: EMERGENCY },
    SymptomRule {
        keyword: "difficultés respiratoires sévères",
        specialty: "Urgentiste",
        reason: EMERGENCY,
    },
];

pub fn doctor_recommendation(doctor: &DoctorRecord) -> SpecialistRecommendation {
    SpecialistRecommendation {
        specialty: doctor.specialty.clone(),
        reason: DOCTOR_REASON.to_string(),
        doctor_name: Some(doctor.full_name()),
        email: doctor.email.clone(),
        phone: doctor.phone.clone(),
        address: doctor.address.clone(),
    }
}

/// Replace `specialists` with the directory's doctors. Returns false and leaves the list alone
/// when there are none.
pub fn apply_doctor_records(
    specialists: &mut Vec<SpecialistRecommendation>,
    doctors: &[DoctorRecord],
) -> bool {
    if doctors.is_empty() {
        return false;
    }
    *specialists = doctors.iter().map(doctor_recommendation).collect();
    true
}

/// First rule whose keyword appears in a symptom, scanning symptoms in the order reported.
pub fn match_symptom(symptoms: &[String]) -> Option<&'static SymptomRule> {
    symptoms.iter().find_map(|symptom| {
        let symptom = symptom.to_lowercase();
        SYMPTOM_SPECIALTIES
            .iter()
            .find(|rule| symptom.contains(rule.keyword))
    })
}

pub fn ensure_minimum_specialists(
    specialists: &mut Vec<SpecialistRecommendation>,
    symptoms: &[String],
) {
    if specialists.len() >= MIN_SPECIALISTS {
        return;
    }

    push_unique(specialists, GENERAL_PRACTITIONER.0, GENERAL_PRACTITIONER.1);
    if specialists.len() >= MIN_SPECIALISTS {
        return;
    }

    let (specialty, reason) = match match_symptom(symptoms) {
        Some(rule) => (rule.specialty, rule.reason),
        None => GENERIC_SPECIALIST,
    };
    push_unique(specialists, specialty, reason);
}

fn push_unique(specialists: &mut Vec<SpecialistRecommendation>, specialty: &str, reason: &str) {
    let present = specialists
        .iter()
        .any(|s| s.specialty.to_lowercase() == specialty.to_lowercase());
    if !present {
        debug!("Adding fallback recommendation: {}", specialty);
        specialists.push(SpecialistRecommendation::generic(specialty, reason));
    }
}
