//! hermod — CLI for the business-management backend
//!
//! Login, list the main resources, and download generated documents.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::Password;
use hermod::config::{self, Config};
use hermod::{DocumentCacheConfig, Hermod, JsonFileHighlightStore};

/// Hermod CLI
#[derive(Parser)]
#[command(name = "hermod")]
#[command(version = hermod::PKG_VERSION)]
#[command(about = "Business-management API client")]
struct Args {
    /// Config file path
    #[arg(short, long, env = "HERMOD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the token pair
    Login {
        /// Username (password is prompted)
        username: String,
    },

    /// Forget the stored token pair
    Logout,

    /// List clients
    Clients,

    /// List projects
    Projects,

    /// List quotes
    Quotes,

    /// List invoices
    Invoices,

    /// List suppliers
    Suppliers,

    /// List unread notifications
    Notifications,

    /// Show dashboard KPIs
    Kpis,

    /// Download a quote PDF
    QuotePdf {
        /// Quote id
        id: i64,
        /// Output file (default: quote_<id>.pdf)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate and download a delivery note
    DeliveryNote {
        /// Quote id
        id: i64,
        /// Output file (default: delivery_note_<id>.pdf)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let token_path = config::default_token_path();

    let mut builder = Hermod::builder()
        .base_url(config.api.base_url.clone())
        .timeout(std::time::Duration::from_secs(config.api.timeout_secs))
        .document_cache(DocumentCacheConfig::new())
        .highlight_store(Arc::new(JsonFileHighlightStore::new(
            JsonFileHighlightStore::default_path(),
        )));
    if let Some(tokens) = config::load_tokens(&token_path)? {
        builder = builder.tokens(tokens);
    }
    let client = builder.build()?;

    match args.command {
        Command::Login { username } => {
            let password = Password::new().with_prompt("Password").interact()?;
            client.login(&username, &password).await?;
            let tokens = client.session().tokens().expect("tokens after login");
            config::save_tokens(&token_path, &tokens)?;
            println!("logged in as {username}");
            return Ok(());
        }
        Command::Logout => {
            client.logout();
            config::clear_tokens(&token_path)?;
            println!("logged out");
            return Ok(());
        }
        Command::Clients => {
            let mut handle = client.clients().watch_list();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            for c in snapshot.data.iter().flat_map(|l| l.iter()) {
                println!("{:>5}  {:<30} {:?}  {}", c.id, c.name, c.status, c.city);
            }
        }
        Command::Projects => {
            let mut handle = client.projects().watch_list();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            for p in snapshot.data.iter().flat_map(|l| l.iter()) {
                println!(
                    "{:>5}  {:<30} {:<12} budget {:>12.2}",
                    p.id, p.name, p.status, p.budget_total
                );
            }
        }
        Command::Quotes => {
            let mut handle = client.quotes().watch_list();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            for q in snapshot.data.iter().flat_map(|l| l.iter()) {
                println!(
                    "{:>5}  {:<16} {:<30} {:>12.2} excl. tax",
                    q.id, q.number, q.subject, q.total_excl_tax
                );
            }
        }
        Command::Invoices => {
            let mut handle = client.invoices().watch_list();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            for i in snapshot.data.iter().flat_map(|l| l.iter()) {
                println!("{:>5}  {:<16} quote #{}  {}", i.id, i.number, i.quote, i.created_at);
            }
        }
        Command::Suppliers => {
            let mut handle = client.suppliers().watch_list();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            for s in snapshot.data.iter().flat_map(|l| l.iter()) {
                println!("{:>5}  {:<30} {:?}", s.id, s.name, s.kind);
            }
        }
        Command::Notifications => {
            let mut handle = client.notifications().watch_list();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            for n in snapshot.data.iter().flat_map(|l| l.iter()) {
                if !n.is_read {
                    println!("[{:?}] {}: {}", n.kind, n.title, n.message);
                }
            }
        }
        Command::Kpis => {
            let mut handle = client.dashboard().watch_kpis();
            let snapshot = handle.ready().await;
            fail_on_error(&snapshot.error)?;
            if let Some(kpis) = snapshot.data {
                println!("projects:        {}", kpis.total_projects);
                println!("active projects: {}", kpis.active_projects);
                println!("quoted amount:   {:.2}", kpis.total_quotes_amount);
                println!("invoiced amount: {:.2}", kpis.total_invoices_amount);
            }
        }
        Command::QuotePdf { id, out } => {
            let blob = client.quotes().pdf(id).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("quote_{id}.pdf")));
            std::fs::write(&out, blob.as_slice())?;
            println!("wrote {} ({} bytes)", out.display(), blob.len());
        }
        Command::DeliveryNote { id, out } => {
            let blob = client.tracking().delivery_note(id).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("delivery_note_{id}.pdf")));
            std::fs::write(&out, blob.as_slice())?;
            println!("wrote {} ({} bytes)", out.display(), blob.len());
        }
    }

    // A 401 mid-command may have rotated the access token.
    if let Some(tokens) = client.session().tokens() {
        config::save_tokens(&token_path, &tokens)?;
    }

    Ok(())
}

fn fail_on_error(
    error: &Option<std::sync::Arc<hermod::HermodError>>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(error) = error {
        return Err(error.summary().into());
    }
    Ok(())
}
