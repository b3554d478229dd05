use advisor_service::create_app;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if std::env::var("GROQ_API_KEY").is_err() {
        eprintln!("Error: GROQ_API_KEY environment variable is required");
        std::process::exit(1);
    }

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8001".to_string())
        .parse::<u16>()
        .unwrap_or(8001);

    let app = create_app()?;
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    let addr = listener.local_addr()?;

    info!("Medical Advisor Service starting on {}", addr);
    info!("API overview available at http://{}/", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Advice endpoint: POST http://{}/medical-advice", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
