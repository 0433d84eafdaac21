//! entra-flows CLI binary entry point.

use std::process::ExitCode;

use clap::Parser;
use entra_flows::cli::{flows, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("entra_flows=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv(); // flags read ENTRA_* through clap too
    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Commands::AuthorizeUrl(args) => flows::authorize_url(&global, args),
        Commands::ClientCredentials(args) => flows::client_credentials(&global, args).await,
        Commands::DeviceCode(args) => flows::device_code(&global, args).await,
        Commands::OnBehalfOf(args) => flows::on_behalf_of(&global, args).await,
        Commands::Password(args) => flows::password(&global, args).await,
        Commands::RedeemCode(args) => flows::redeem_code(&global, args).await,
        Commands::Refresh(args) => flows::refresh(&global, args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(oauth) = e.oauth_error() {
                for code in &oauth.error_codes {
                    eprintln!("  AADSTS{code}");
                }
            }
            ExitCode::FAILURE
        }
    }
}
