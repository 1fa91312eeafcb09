//! `dermachat doctor`: Diagnose configuration.

use dermachat_config::{AppConfig, ContextSourceKind};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 DermaChat Doctor — Configuration Diagnostics");
    println!("==============================================\n");

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file (defaults in use) — run `dermachat onboard`");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    let mut issues = report(&config);
    for line in &issues.lines {
        println!("{line}");
    }

    // Reach the generative model with the configured key
    if config.gemini_api_key.is_some() {
        let pipeline = dermachat_agent::RagPipeline::from_config(&config);
        match pipeline.generator().health_check().await {
            Ok(true) => println!("  ✅ Generative model reachable"),
            Ok(false) => {
                println!("  ❌ Generative model rejected the request (check gemini_api_key)");
                issues.count += 1;
            }
            Err(e) => {
                println!("  ❌ Generative model unreachable: {e}");
                issues.count += 1;
            }
        }
    }

    // Summary
    println!();
    if issues.count == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {} issue(s) found. See above for details.", issues.count);
    }

    Ok(())
}

struct Report {
    lines: Vec<String>,
    count: usize,
}

fn report(config: &AppConfig) -> Report {
    let mut lines = Vec::new();
    let mut count = 0;

    let missing = config.missing_keys();
    for key in ["openai_api_key", "pinecone_api_key", "gemini_api_key"] {
        if missing.contains(&key) {
            lines.push(format!("  ❌ {key} not set"));
            count += 1;
        } else {
            lines.push(format!("  ✅ {key} configured"));
        }
    }

    lines.push(format!("  ✅ Embedding model:  {}", config.embedding.model));
    lines.push(format!("  ✅ Generation model: {}", config.generation.model));
    match &config.retrieval.index_host {
        Some(host) => lines.push(format!("  ✅ Vector index host: {host}")),
        None => lines.push(format!(
            "  ✅ Vector index: {} (host resolved at first query)",
            config.retrieval.index_name
        )),
    }

    lines.push(format!("  ✅ Context source: {}", config.context.source));
    if config.context.source == ContextSourceKind::Static
        && config.context.fixed.formulario.is_none()
        && config.context.fixed.tratamiento.is_none()
    {
        lines.push("  ⚠️  Static context has no values; placeholders will be used".into());
        count += 1;
    }

    Report { lines, count }
}
