use clap::{Parser, Subcommand};
use resource_service::config::ResourceConfig;
use resource_service::startup::Application;
use resource_service::utils::{hash_password, Password};
use service_core::observability::init_tracing;
use std::io::BufRead;

#[derive(Parser)]
#[command(name = "resource-service")]
#[command(about = "Student resource library service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default).
    Serve,
    /// Print an Argon2 PHC hash for seeding the admin password.
    HashPassword {
        /// Read from stdin when omitted.
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::HashPassword { password } => print_hash(password),
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = ResourceConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "resource-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        backend = ?config.store.backend,
        port = config.common.port,
        "Starting resource-service"
    );

    let application = Application::build(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to build application: {}", e))?;
    application.run_until_stopped().await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

fn print_hash(password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    let hash = hash_password(&Password::new(password))?;
    println!("{}", hash.as_str());
    Ok(())
}
