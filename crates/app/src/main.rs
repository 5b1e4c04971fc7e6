//! Remove-user runner entry point.

use app::AppError;
use app::config::Config;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration
    let config = Config::from_env()?;

    // 2. Initialize tracing
    app::init_tracing(&config);
    tracing::info!(?config, "starting remove-user runner");

    // 3. Run the scenarios and print each response
    for report in app::run_scenarios(config.execute_options()).await {
        let body = serde_json::to_string_pretty(&report.response)?;
        println!("{}: {body}", report.name);
    }

    Ok(())
}
