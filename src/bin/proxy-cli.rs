use clap::{Parser, Subcommand};
use serde_json::Value;

use failover_proxy::backends::BackendStatus;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the failover proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(long, default_value = "")]
    username: String,

    #[arg(long, default_value = "")]
    password: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every backend with its health and active flag
    Backends,
    /// Show the backend currently receiving traffic
    Active,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/v0/backends", cli.url.trim_end_matches('/')))
        .basic_auth(&cli.username, Some(&cli.password))
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match cli.command {
        Commands::Backends => {
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Active => {
            let backends: Vec<BackendStatus> = res.json().await?;
            match backends.into_iter().find(|b| b.active) {
                Some(active) => println!("{} ({}:{})", active.name, active.host, active.port),
                None => println!("No active backend"),
            }
        }
    }

    Ok(())
}
