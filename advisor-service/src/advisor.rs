use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use vision_llm::{
    ChatMessage, LlmError, OFF_TOPIC_REFUSAL, PromptKind, ResponseMode, VendorCaller,
    extract_json_object, template,
};

use crate::{
    doctors::DoctorDirectory,
    history::ConsultationHistory,
    models::{AdviceRequest, AdviceResult, ConsultationContext, ConsultationRecord},
    postprocess::{apply_doctor_records, ensure_minimum_specialists},
};

const ADVICE_MAX_TOKENS: u32 = 1000;
const DOCTOR_LOOKUP_LIMIT: i64 = 5;
const REQUIRED_KEYS: [&str; 4] = [
    "reassurance",
    "conseils_generaux",
    "specialistes_recommandes",
    "message_final",
];

/// Triage advisor: asks the model for reassuring advice, then swaps in real doctors and tops up
/// the specialist list.
pub struct MedicalAdvisor {
    caller: VendorCaller,
    directory: Arc<dyn DoctorDirectory>,
    history: ConsultationHistory,
}

impl MedicalAdvisor {
    pub fn new(caller: VendorCaller, directory: Arc<dyn DoctorDirectory>) -> Self {
        Self {
            caller,
            directory,
            history: ConsultationHistory::new(),
        }
    }

    pub async fn get_medical_advice(
        &self,
        request: &AdviceRequest,
    ) -> vision_llm::Result<AdviceResult> {
        info!(
            "Medical advice requested: {} symptom(s), emergency={}",
            request.symptoms.len(),
            request.is_emergency
        );

        let context = ConsultationContext::from_request(request);
        let raw = self.ask(&context.user_prompt).await?;
        self.process(&raw, context).await
    }

    /// Free-text question. Anything the model does not answer with a JSON object is treated as
    /// off-topic.
    pub async fn chat(&self, user_prompt: &str) -> vision_llm::Result<AdviceResult> {
        let raw = self.ask(user_prompt).await?;

        if !raw.trim_start().starts_with('{') {
            info!("Chat answer is not JSON, returning off-topic refusal");
            return Ok(AdviceResult::refusal());
        }
        self.process(&raw, ConsultationContext::from_chat(user_prompt))
            .await
    }

    pub async fn process(
        &self,
        raw: &str,
        context: ConsultationContext,
    ) -> vision_llm::Result<AdviceResult> {
        let value = extract_json_object(raw)?;

        if value.get("reassurance").and_then(Value::as_str) == Some(OFF_TOPIC_REFUSAL) {
            info!("Model refused an off-topic question");
            return Ok(AdviceResult::refusal());
        }

        let missing: Vec<&str> = REQUIRED_KEYS
            .into_iter()
            .filter(|key| value.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(LlmError::UnexpectedShape {
                reason: format!("missing keys: {}", missing.join(", ")),
                raw_text: raw.to_string(),
            });
        }

        let mut advice: AdviceResult =
            serde_json::from_value(value).map_err(|e| LlmError::UnexpectedShape {
                reason: e.to_string(),
                raw_text: raw.to_string(),
            })?;

        if let Some(specialty) = advice.specialty_to_lookup().map(str::to_string) {
            info!("Specialty identified by the model: {}", specialty);
            let doctors = self
                .directory
                .doctors_by_specialty(&specialty, DOCTOR_LOOKUP_LIMIT)
                .await;
            if !apply_doctor_records(&mut advice.recommended_specialists, &doctors) {
                warn!(
                    "No doctors found for {}, keeping the model's suggestions",
                    specialty
                );
            }
        }

        ensure_minimum_specialists(&mut advice.recommended_specialists, context.symptoms());

        self.history
            .record(ConsultationRecord::new(context, advice.clone()))
            .await;
        Ok(advice)
    }

    pub async fn history(&self) -> Vec<ConsultationRecord> {
        self.history.snapshot().await
    }

    async fn ask(&self, user_prompt: &str) -> vision_llm::Result<String> {
        let messages = vec![
            ChatMessage::system(template(PromptKind::TriageAdvice).render()),
            ChatMessage::user(user_prompt),
        ];
        self.caller
            .call(messages, ResponseMode::FreeText, ADVICE_MAX_TOKENS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctors::InMemoryDoctorDirectory;
    use crate::models::DoctorRecord;
    use serde_json::json;
    use vision_llm::mock::ScriptedClient;

    fn advisor_with(client: Arc<ScriptedClient>, directory: InMemoryDoctorDirectory) -> MedicalAdvisor {
        MedicalAdvisor::new(
            VendorCaller::new(client, "advisor-test", 1234),
            Arc::new(directory),
        )
    }

    fn cardiac_request() -> AdviceRequest {
        AdviceRequest {
            symptoms: vec!["douleur thoracique".into(), "essoufflement".into()],
            age: 45,
            is_emergency: true,
            location: "Paris".into(),
            budget: 100.0,
        }
    }

    fn model_answer(specialty: Value, specialists: Value) -> String {
        json!({
            "reassurance": "Vos symptômes sont pris au sérieux et tout va bien se passer.",
            "specialite_identifiee": specialty,
            "conseils_generaux": ["Reposez-vous", "Hydratez-vous bien"],
            "specialistes_recommandes": specialists,
            "message_final": "Prenez soin de vous."
        })
        .to_string()
    }

    fn cardiologist(id: &str, last: &str, consultations: i64) -> DoctorRecord {
        DoctorRecord {
            id: id.to_string(),
            first_name: "Nadia".to_string(),
            last_name: last.to_string(),
            specialty: "cardiologue".to_string(),
            email: None,
            phone: Some("0600000000".to_string()),
            address: Some("Paris 15e".to_string()),
            consultation_count: consultations,
        }
    }

    #[tokio::test]
    async fn advice_without_doctors_gets_gp_and_cardiologist() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new().reply(model_answer(json!("cardiologue"), json!([]))));
        let advisor = advisor_with(client.clone(), InMemoryDoctorDirectory::new());

        let advice = advisor.get_medical_advice(&cardiac_request()).await?;

        let names: Vec<_> = advice
            .recommended_specialists
            .iter()
            .map(|s| s.specialty.as_str())
            .collect();
        assert_eq!(names, vec!["Médecin généraliste", "Cardiologue"]);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mode, ResponseMode::FreeText);
        assert_eq!(requests[0].max_tokens, ADVICE_MAX_TOKENS);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(
            requests[0].messages[1],
            ChatMessage::user(cardiac_request().user_prompt())
        );

        let history = advisor.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].age, Some(45));
        assert_eq!(history[0].location.as_deref(), Some("Paris"));
        assert_eq!(history[0].advice, advice);
        Ok(())
    }

    #[tokio::test]
    async fn directory_doctors_replace_model_suggestions() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new().reply(model_answer(
            json!("Cardiologue"),
            json!([{ "specialite": "Cardiologue", "raison": "Avis spécialisé" }]),
        )));
        let directory = InMemoryDoctorDirectory::with_doctors([
            cardiologist("1", "Benali", 4),
            cardiologist("2", "Durand", 9),
            cardiologist("3", "Haddad", 1),
        ]);
        let advisor = advisor_with(client, directory);

        let advice = advisor.get_medical_advice(&cardiac_request()).await?;

        let doctors: Vec<_> = advice
            .recommended_specialists
            .iter()
            .map(|s| s.doctor_name.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(doctors, vec!["Nadia Durand", "Nadia Benali", "Nadia Haddad"]);
        Ok(())
    }

    #[tokio::test]
    async fn non_json_chat_answer_is_an_off_topic_refusal() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new().reply(OFF_TOPIC_REFUSAL));
        let advisor = advisor_with(client, InMemoryDoctorDirectory::new());

        let advice = advisor.chat("Quelle est la capitale de l'Australie ?").await?;

        assert!(advice.reassurance.is_empty());
        assert!(advice.general_tips.is_empty());
        assert!(advice.recommended_specialists.is_empty());
        assert_eq!(advice.final_message, OFF_TOPIC_REFUSAL);
        assert!(advisor.history().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn refusal_inside_json_is_normalized() -> anyhow::Result<()> {
        let raw = json!({
            "reassurance": OFF_TOPIC_REFUSAL,
            "specialite_identifiee": null,
            "conseils_generaux": [],
            "specialistes_recommandes": [],
            "message_final": OFF_TOPIC_REFUSAL
        })
        .to_string();
        let advisor = advisor_with(
            Arc::new(ScriptedClient::new().reply(raw)),
            InMemoryDoctorDirectory::new(),
        );

        let advice = advisor.chat("Recette de la tarte tatin ?").await?;

        assert!(advice.is_refusal());
        assert!(advisor.history().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn chat_records_the_prompt_in_history() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new().reply(model_answer(Value::Null, json!([]))));
        let advisor = advisor_with(client, InMemoryDoctorDirectory::new());

        let advice = advisor.chat("J'ai mal à la tête depuis hier").await?;
        assert_eq!(advice.recommended_specialists.len(), 2);

        let history = advisor.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_prompt, "J'ai mal à la tête depuis hier");
        assert!(history[0].symptoms.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn missing_required_keys_is_an_unexpected_shape() {
        let raw = r#"{"reassurance": "Tout ira bien", "message_final": "Courage"}"#;
        let advisor = advisor_with(
            Arc::new(ScriptedClient::new().reply(raw)),
            InMemoryDoctorDirectory::new(),
        );

        let err = advisor.get_medical_advice(&cardiac_request()).await.unwrap_err();

        match &err {
            LlmError::UnexpectedShape { reason, .. } => {
                assert!(reason.contains("conseils_generaux"));
                assert!(reason.contains("specialistes_recommandes"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.raw_text(), Some(raw));
        assert!(advisor.history().await.is_empty());
    }

    #[tokio::test]
    async fn advice_without_json_is_a_parse_error() {
        let advisor = advisor_with(
            Arc::new(ScriptedClient::new().reply("Consultez un médecin.")),
            InMemoryDoctorDirectory::new(),
        );

        let err = advisor.get_medical_advice(&cardiac_request()).await.unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { .. }));
    }

    #[tokio::test]
    async fn vendor_failure_is_not_retried_in_free_text_mode() {
        let client = Arc::new(ScriptedClient::new().fail("rate limited"));
        let advisor = advisor_with(client.clone(), InMemoryDoctorDirectory::new());

        let err = advisor.get_medical_advice(&cardiac_request()).await.unwrap_err();

        assert!(matches!(err, LlmError::VendorCall(_)));
        assert_eq!(client.call_count(), 1);
    }
}
