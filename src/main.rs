use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use skillup_client::{SessionContext, Settings};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "skillup-client", about = "SkillUp session and account CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the stored session.
    Status,
    Login {
        email: String,
        #[arg(long, env = "SKILLUP_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        remember_me: bool,
        /// In-app route to resume after signing in.
        #[arg(long)]
        return_url: Option<String>,
    },
    Logout,
    /// Exchange the stored refresh token for a new access token.
    Refresh,
    Profile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let cli = Cli::parse();
    let config = Settings::new().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Configuration loaded ({} environment)", config.environment);
    let context = SessionContext::new(config)?;

    if let Err(e) = run(&context, cli.command).await {
        error!("Command failed: {}", e);
        anyhow::bail!(e.user_message());
    }
    Ok(())
}

async fn run(context: &SessionContext, command: Command) -> skillup_client::Result<()> {
    let auth = &context.auth;
    match command {
        Command::Status => match auth.current_user() {
            Some(user) if auth.is_authenticated() => {
                println!("Signed in as {} <{}> ({})", user.display_name(), user.email, user.role);
                if let Some(expires_at) = auth.token_expiration_date() {
                    println!("Session expires at {}", expires_at.to_rfc3339());
                }
            }
            _ => println!("Not signed in"),
        },
        Command::Login {
            email,
            password,
            remember_me,
            return_url,
        } => {
            let mut navigation = context.navigator.subscribe();
            let user = auth
                .login_and_resume(&email, &password, remember_me, return_url.as_deref())
                .await?;
            println!("Welcome, {}", user.display_name());
            if let Ok(destination) = navigation.try_recv() {
                println!("Continue at {}", destination.route());
            }
        }
        Command::Logout => {
            auth.logout().await;
            println!("Signed out");
        }
        Command::Refresh => {
            auth.refresh_token().await?;
            println!("Session refreshed");
        }
        Command::Profile => {
            let profile = context.users.get_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}
