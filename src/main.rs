use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use support_chat::app::CHAT_ERROR_TEXT;
use support_chat::transcript::ProductCard;
use support_chat::{
    classify, handler, tui, ui, App, ChatRequest, ComparisonTable, Config, RenderInstruction,
    SupportClient, WebsiteCard,
};

#[derive(Parser)]
#[command(name = "support-chat")]
#[command(about = "Chat with the support agent and manage the website directory")]
struct Cli {
    /// Backend base URL (defaults to the saved config, then http://localhost:8000)
    #[arg(long, env = "SUPPORT_CHAT_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message to the agent and print the reply
    Ask {
        /// Your message
        message: String,
        /// Scope the question to a registered website
        #[arg(short, long)]
        website_id: Option<i64>,
    },
    /// List registered websites
    Websites,
    /// Register a website by url
    Register {
        /// Website url
        url: String,
    },
    /// Save the url given with --base-url as the default backend
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("{}: {}", "Logging disabled".yellow(), e);
    }

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    let client = SupportClient::new(&base_url);
    info!(base_url = %base_url, "starting");

    match cli.command {
        None => run_tui(client).await,
        Some(Commands::Ask { message, website_id }) => ask(&client, &message, website_id).await,
        Some(Commands::Websites) => list_websites(&client).await,
        Some(Commands::Register { url }) => register(&client, &url).await,
        Some(Commands::Config) => save_default_backend(cli.base_url.as_deref()),
    }
}

fn save_default_backend(base_url: Option<&str>) -> Result<()> {
    let url = base_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| anyhow!("Pass the url to save with --base-url"))?;

    Config::save_base_url(url)?;
    println!("Default backend set to {}", url.bold());
    Ok(())
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("support-chat");
    fs::create_dir_all(&log_dir)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("support-chat.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("{}", e))?;

    Ok(())
}

async fn run_tui(client: SupportClient) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(client);
    app.refresh_websites();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    events: &mut tui::EventHandler,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_tasks().await;
    }
    Ok(())
}

async fn ask(client: &SupportClient, message: &str, website_id: Option<i64>) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        return Err(anyhow!("Message is empty"));
    }

    let request = ChatRequest::new(message, website_id);
    let instruction = match client.chat(&request).await {
        Ok(reply) => classify(&reply),
        Err(e) => {
            warn!(error = %e, "chat request failed");
            RenderInstruction::agent_message(CHAT_ERROR_TEXT)
        }
    };

    match instruction {
        RenderInstruction::Message { text, .. } => {
            println!("{} {}", "Agent:".bold().yellow(), text);
        }
        RenderInstruction::Product(product) => {
            print_product(&ProductCard::from_product(&product));
        }
        RenderInstruction::Comparison(products) => {
            if let Some(table) = ComparisonTable::from_products(&products) {
                print_comparison(&table);
            }
        }
    }

    Ok(())
}

fn print_product(card: &ProductCard) {
    println!("{}", card.title.bold().green());
    if !card.description.is_empty() {
        println!("  {}", card.description);
    }
    println!("  {} {}", "Image:".dimmed(), card.image);
    if let Some(price) = &card.price {
        println!("  {} {}", "Price:".dimmed(), price.bold());
    }
    if let Some(link) = &card.link {
        println!("  {} {}", "View:".dimmed(), link.underline().blue());
    }
}

fn print_comparison(table: &ComparisonTable) {
    let mut rows = table.text_rows().into_iter();
    if let Some(header) = rows.next() {
        println!("{}", header.bold().magenta());
        println!("{}", "─".repeat(header.chars().count()).dimmed());
    }
    for row in rows {
        println!("{}", row);
    }
}

async fn list_websites(client: &SupportClient) -> Result<()> {
    println!("\n{}", "🌐 Registered Websites".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    match client.list_websites().await {
        Ok(websites) if websites.is_empty() => {
            println!("{}", "No websites yet. Add one with: support-chat register <url>".yellow());
        }
        Ok(websites) => {
            for site in websites {
                let id = site.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
                let card = WebsiteCard::from_record(&site);
                println!(
                    "  {} {} {}",
                    format!("#{}", id).bold(),
                    card.name.green(),
                    site.url().unwrap_or_default().dimmed()
                );
            }
        }
        Err(e) => {
            println!("{}: {}", "Could not fetch websites".red(), e);
        }
    }

    Ok(())
}

async fn register(client: &SupportClient, url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(anyhow!("Url is empty"));
    }

    let card = match client.register_website(url).await {
        Ok(record) => {
            if let Some(id) = record.id {
                println!("Registered as {}", format!("#{}", id).bold());
            }
            WebsiteCard::from_record(&record)
        }
        Err(e) => {
            warn!(error = %e, "registration failed");
            WebsiteCard::unavailable()
        }
    };

    println!("{}", card.name.bold().green());
    if !card.description.is_empty() {
        println!("  {}", card.description);
    }
    println!("  {} {}", "Icon:".dimmed(), card.icon_label());

    Ok(())
}
