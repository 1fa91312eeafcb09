//! `dermachat serve`: Start the HTTP gateway and chat page.

use dermachat_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🩺 DermaChat Gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Context:   {}", config.context.source);

    dermachat_gateway::start(config).await?;

    Ok(())
}
