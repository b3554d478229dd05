pub mod models;
pub mod ocr;
pub mod output;
pub mod service;
pub mod upload;

pub use models::*;
pub use ocr::MedicalOcr;
pub use output::{OutputFormat, save_results};
pub use service::{AppState, build_router, create_app};
