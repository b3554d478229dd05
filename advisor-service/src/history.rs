use tokio::sync::RwLock;

use crate::models::ConsultationRecord;

/// Consultations answered since the process started. Nothing is persisted.
#[derive(Default)]
pub struct ConsultationHistory {
    entries: RwLock<Vec<ConsultationRecord>>,
}

impl ConsultationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, record: ConsultationRecord) {
        self.entries.write().await.push(record);
    }

    pub async fn snapshot(&self) -> Vec<ConsultationRecord> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
