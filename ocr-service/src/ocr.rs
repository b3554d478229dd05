use std::path::Path;

use tracing::{error, info};
use vision_llm::{ChatMessage, ResponseMode, VendorCaller, encode_image_file, template};

use crate::models::{DocumentCategory, ExtractionResult};

const OCR_MAX_TOKENS: u32 = 2048;

/// Sends document images to the vision model and decodes its answer into typed records
pub struct MedicalOcr {
    caller: VendorCaller,
}

impl MedicalOcr {
    pub fn new(caller: VendorCaller) -> Self {
        Self { caller }
    }

    /// Image → prompt → vendor call → typed record.
    ///
    /// A missing file fails with `NotFound` before any network call. Unparseable model output is
    /// reported as `ResponseParse` with the raw text, for every category.
    pub async fn extract(
        &self,
        category: DocumentCategory,
        image_path: &Path,
    ) -> vision_llm::Result<ExtractionResult> {
        let raw = self.read_document(category, image_path).await?;
        log_outcome(category, category.parse_response(&raw))
    }

    async fn read_document(
        &self,
        category: DocumentCategory,
        image_path: &Path,
    ) -> vision_llm::Result<String> {
        info!(
            category = %category,
            path = %image_path.display(),
            "Starting document extraction"
        );

        let image = encode_image_file(image_path).await?;
        let prompt = template(category.prompt_kind()).render();
        let messages = vec![ChatMessage::user_with_image(prompt, image.data_uri())];

        self.caller
            .call(messages, ResponseMode::StrictJson, OCR_MAX_TOKENS)
            .await
    }
}

fn log_outcome<T>(
    category: DocumentCategory,
    parsed: vision_llm::Result<T>,
) -> vision_llm::Result<T> {
    match &parsed {
        Ok(_) => info!(category = %category, "Extraction completed"),
        Err(e) => error!(category = %category, error = %e, "Model output could not be parsed"),
    }
    parsed
}
