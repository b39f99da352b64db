use clap::Parser;
use gatekey::cli::{Args, build_config, init_logging, load_password, validate_identity_url};
use gatekey::{HttpIdentityClient, SessionManager};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(identity_url) = validate_identity_url(&args.identity_url) else {
        std::process::exit(1);
    };

    let Some(password) = load_password(args.offline) else {
        std::process::exit(1);
    };

    let config = build_config(&args);
    let identity = HttpIdentityClient::new(identity_url, config.request_timeout);
    let manager = SessionManager::new(config, identity);

    let principal = match manager.login(&args.username, &password).await {
        Ok(principal) => principal,
        Err(e) => {
            error!(error = %e, "Login failed");
            std::process::exit(1);
        }
    };

    if !manager.check_authenticated().await {
        error!("Session rejected immediately after login");
        std::process::exit(1);
    }

    info!(phase = manager.phase().await.label(), "Session healthy");

    match serde_json::to_string_pretty(&principal) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!(error = %e, "Failed to serialize principal");
            std::process::exit(1);
        }
    }

    manager.logout().await;
}
