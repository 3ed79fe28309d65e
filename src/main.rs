use clap::Parser;
use dotenv::dotenv;

use portfolio_report::adapters::ollama::OllamaChat;
use portfolio_report::adapters::smtp::SmtpMailer;
use portfolio_report::config::env::{AgentEndpoints, EmailSettings};
use portfolio_report::domain::mock_data::CannedChat;
use portfolio_report::domain::ports::{ChatModel, ConfigProvider, Mailer};
use portfolio_report::utils::error::{ErrorSeverity, ReportError};
use portfolio_report::utils::{logger, validation::Validate};
use portfolio_report::{CliConfig, LocalStorage, ReportEngine, ReportPipeline};

fn fail_config(e: ReportError) -> ! {
    tracing::error!("❌ Configuration validation failed: {}", e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(3);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let mut config = CliConfig::parse();
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting portfolio-report");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // Live runs need the service URLs from the environment; mock runs
    // never touch them.
    if !config.mock {
        match AgentEndpoints::from_env() {
            Ok(endpoints) => config.endpoints = endpoints,
            Err(e) => fail_config(e),
        }
    }

    if let Err(e) = config.validate() {
        fail_config(e);
    }

    println!("=== Portfolio Report ===");
    println!(
        "Model: {}  |  Source: {}  |  Email: {}",
        config.model,
        if config.mock {
            "MOCK"
        } else {
            "LIVE (Robinhood + Fidelity)"
        },
        if config.email_enabled() { "on" } else { "off" }
    );

    let client = reqwest::Client::new();

    let llm: Box<dyn ChatModel> = if config.mock {
        Box::new(CannedChat)
    } else {
        Box::new(OllamaChat::new(
            client.clone(),
            &config.endpoints.ollama_url,
            &config.model,
            config.max_tokens,
        ))
    };

    let mailer: Option<Box<dyn Mailer>> = if config.email_enabled() {
        match EmailSettings::from_env() {
            Ok(settings) => Some(Box::new(SmtpMailer::new(settings))),
            Err(e) => fail_config(e),
        }
    } else {
        None
    };

    let storage = LocalStorage::new(config.output_path.clone());
    let cache = LocalStorage::new(config.cache_path.clone());

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = ReportPipeline::new(storage, cache, config, client, llm, mailer);
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Report run completed successfully!");
            println!("✅ Report run completed successfully!");
            println!("📄 {}", outcome);
        }
        Err(e) => {
            tracing::error!(
                "❌ Report run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
