use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::models::DoctorRecord;

/// Source of real doctors for an identified specialty.
///
/// Implementations never fail: a lookup problem is logged and reported as no results, so advice
/// can still be produced with generic recommendations.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Up to `limit` doctors of `specialty`, busiest first.
    async fn doctors_by_specialty(&self, specialty: &str, limit: i64) -> Vec<DoctorRecord>;
}

/// Specialty names are matched lowercased and trimmed.
pub fn normalize_specialty(specialty: &str) -> String {
    specialty.trim().to_lowercase()
}

const DOCTORS_BY_SPECIALTY_SQL: &str = r#"
SELECT
    d.id::text AS id,
    d.first_name,
    d.last_name,
    d.specialty::text AS specialty,
    u.email,
    u.phone,
    u.address,
    COUNT(c.id) AS consultation_count
FROM doctors AS d
LEFT JOIN consultations AS c ON d.id = c.doctor_id
LEFT JOIN users AS u ON d.user_id = u.id
WHERE d.specialty = $1::doctors_specialty_enum
GROUP BY d.id, d.first_name, d.last_name, d.specialty, u.email, u.phone, u.address
ORDER BY consultation_count DESC
LIMIT $2
"#;

/// Doctor lookup against the medical-system PostgreSQL database
pub struct PostgresDoctorDirectory {
    pool: PgPool,
}

impl PostgresDoctorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a bounded pool without touching the network. Connections are opened on first use.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl DoctorDirectory for PostgresDoctorDirectory {
    async fn doctors_by_specialty(&self, specialty: &str, limit: i64) -> Vec<DoctorRecord> {
        let specialty = normalize_specialty(specialty);
        info!("Looking up doctors for specialty: {}", specialty);

        match sqlx::query_as::<_, DoctorRecord>(DOCTORS_BY_SPECIALTY_SQL)
            .bind(specialty.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => {
                info!("Found {} doctors for {}", rows.len(), specialty);
                rows
            }
            Err(e) => {
                error!("Doctor lookup failed for {}: {}", specialty, e);
                Vec::new()
            }
        }
    }
}

/// Doctors held in memory, keyed by normalized specialty
pub struct InMemoryDoctorDirectory {
    doctors: Arc<DashMap<String, Vec<DoctorRecord>>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self {
            doctors: Arc::new(DashMap::new()),
        }
    }

    pub fn with_doctors(doctors: impl IntoIterator<Item = DoctorRecord>) -> Self {
        let directory = Self::new();
        for doctor in doctors {
            directory.insert(doctor);
        }
        directory
    }

    pub fn insert(&self, doctor: DoctorRecord) {
        self.doctors
            .entry(normalize_specialty(&doctor.specialty))
            .or_default()
            .push(doctor);
    }
}

impl Default for InMemoryDoctorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn doctors_by_specialty(&self, specialty: &str, limit: i64) -> Vec<DoctorRecord> {
        let Some(entry) = self.doctors.get(&normalize_specialty(specialty)) else {
            return Vec::new();
        };

        let mut doctors = entry.value().clone();
        doctors.sort_by(|a, b| b.consultation_count.cmp(&a.consultation_count));
        doctors.truncate(usize::try_from(limit).unwrap_or(0));
        doctors
    }
}
