use anyhow::Result;
use ocr_service::{DocumentCategory, MedicalOcr, OutputFormat, save_results};
use std::env;
use std::path::{Path, PathBuf};
use vision_llm::{VendorCaller, VendorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Medical OCR smoke test: image -> vision model -> structured JSON");
    println!("================================================================");

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!(
            "Usage: {} <prescription_image> [lab_image] [out_dir]",
            args[0]
        );
        eprintln!("Example: {} ordonnance.jpg analyse.png ./resultats", args[0]);
        std::process::exit(1);
    }

    let prescription = PathBuf::from(&args[1]);
    let lab = args.get(2).map(PathBuf::from);
    let out_dir = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = match VendorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Example: export GROQ_API_KEY='your_key_here'");
            std::process::exit(1);
        }
    };
    println!("Model: {}", config.model);
    println!();

    tokio::fs::create_dir_all(&out_dir).await?;
    let ocr = MedicalOcr::new(VendorCaller::from_config(&config)?);

    let mut runs = vec![
        (DocumentCategory::PrescriptionSimple, prescription.clone()),
        (DocumentCategory::PrescriptionFull, prescription),
    ];
    if let Some(lab) = lab {
        runs.push((DocumentCategory::LabReport, lab));
    }

    let mut failures = 0;
    for (category, image) in runs {
        if !run_one(&ocr, category, &image, &out_dir).await {
            failures += 1;
        }
    }

    println!();
    if failures > 0 {
        eprintln!("{} extraction(s) failed", failures);
        eprintln!();
        eprintln!("Troubleshooting:");
        eprintln!("   - Check the image files exist and are readable");
        eprintln!("   - Ensure GROQ_API_KEY is valid");
        std::process::exit(1);
    }

    println!("All extractions succeeded");
    Ok(())
}

async fn run_one(ocr: &MedicalOcr, category: DocumentCategory, image: &Path, out_dir: &Path) -> bool {
    println!("Extracting {} from {}", category, image.display());

    match ocr.extract(category, image).await {
        Ok(result) => {
            let out = out_dir.join(format!("{}.{}", category, OutputFormat::Json.extension()));
            if let Err(e) = save_results(&result, &out, OutputFormat::Json).await {
                eprintln!("   Could not save result: {:#}", e);
                return false;
            }
            println!("   Saved to {}", out.display());
            true
        }
        Err(e) => {
            eprintln!("   Extraction failed: {}", e);
            if let Some(raw) = e.raw_text() {
                eprintln!("   Raw model text:");
                eprintln!("{}", raw);
            }
            false
        }
    }
}
