use advisor_service::{
    AdviceRequest, DoctorDirectory, InMemoryDoctorDirectory, MedicalAdvisor,
    PostgresDoctorDirectory,
};
use anyhow::Result;
use std::sync::Arc;
use vision_llm::{VendorCaller, VendorConfig};

fn demo_consultations() -> Vec<(&'static str, AdviceRequest)> {
    vec![
        (
            "Consultation cardiaque",
            AdviceRequest {
                symptoms: vec!["douleur thoracique".into(), "essoufflement".into()],
                age: 45,
                is_emergency: true,
                location: "Paris".into(),
                budget: 100.0,
            },
        ),
        (
            "Consultation dermatologique",
            AdviceRequest {
                symptoms: vec!["éruption cutanée".into(), "démangeaisons".into()],
                age: 30,
                is_emergency: false,
                location: "Lyon".into(),
                budget: 50.0,
            },
        ),
        (
            "Consultation pédiatrique",
            AdviceRequest {
                symptoms: vec!["fièvre".into(), "toux".into()],
                age: 5,
                is_emergency: false,
                location: "Marseille".into(),
                budget: 40.0,
            },
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = match VendorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Example: export GROQ_API_KEY='your_key_here'");
            std::process::exit(1);
        }
    };

    let directory: Arc<dyn DoctorDirectory> = match std::env::var("DATABASE_URL") {
        Ok(url) => Arc::new(PostgresDoctorDirectory::connect_lazy(&url, 2)?),
        Err(_) => {
            println!("DATABASE_URL not set, using generic recommendations only");
            Arc::new(InMemoryDoctorDirectory::new())
        }
    };
    let advisor = MedicalAdvisor::new(VendorCaller::from_config(&config)?, directory);

    for (i, (title, request)) in demo_consultations().iter().enumerate() {
        println!();
        println!("=== Exemple {}: {} ===", i + 1, title);
        match advisor.get_medical_advice(request).await {
            Ok(advice) => println!("{}", serde_json::to_string_pretty(&advice)?),
            Err(e) => {
                eprintln!("Consultation failed: {}", e);
                if let Some(raw) = e.raw_text() {
                    eprintln!("Raw model text:");
                    eprintln!("{}", raw);
                }
            }
        }
    }

    println!();
    println!("=== Historique des consultations ===");
    println!("{}", serde_json::to_string_pretty(&advisor.history().await)?);

    Ok(())
}
