use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gems::api::{self, ServerConfig};
use gems::db::Database;
use gems::models::CreateUserInput;

#[derive(Parser)]
#[command(name = "gems")]
#[command(about = "Gem catalogue with owner-scoped editing and comments")]
struct Cli {
    /// Database file (defaults to GEMS_DATABASE, then the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Register a user and print its bearer token
    AddUser {
        username: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "gems=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let path = path.or_else(|| std::env::var_os("GEMS_DATABASE").map(PathBuf::from));
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(db: Database, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting gems server on port {}", port);

    let app = api::create_router_with_config(db, ServerConfig::from_env());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("gems server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let db = open_database(cli.db)?;

    match cli.command {
        Some(Commands::Serve { port }) => serve(db, port).await?,
        Some(Commands::AddUser { username }) => {
            let issued = db.create_user(CreateUserInput { username })?;
            tracing::info!(user_id = %issued.user.id, "registered user {}", issued.user.username);
            // Only chance to see the token; the database keeps its hash
            println!("{}", issued.token);
        }
        None => serve(db, 3000).await?,
    }

    Ok(())
}
