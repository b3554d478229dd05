pub mod advisor;
pub mod doctors;
pub mod history;
pub mod models;
pub mod postprocess;
pub mod service;

pub use advisor::MedicalAdvisor;
pub use doctors::{
    DoctorDirectory, InMemoryDoctorDirectory, PostgresDoctorDirectory, normalize_specialty,
};
pub use models::*;
pub use service::{AppState, build_router, create_app};
