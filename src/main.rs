use anyhow::Result;
use clap::Parser;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use trelloctl::{
    commands::{self, CardFields, Outcome},
    config::Config,
    http::CallOptions,
    runtime::RealRuntime,
    trello::TrelloApi,
};

/// trelloctl - Trello from the command line
///
/// Reads credentials from TRELLO_API_KEY and TRELLO_TOKEN. Transient failures
/// (rate limits, server errors, network trouble) are retried with backoff;
/// tune with TRELLO_MAX_RETRIES, TRELLO_BASE_DELAY_MS and TRELLO_MAX_DELAY_MS.
///
/// Examples:
///   trelloctl boards                 # List your open boards
///   trelloctl cards <list-id>        # List the cards on a list
#[derive(Parser, Debug)]
#[command(author, version = env!("TRELLOCTL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (defaults to https://api.trello.com/1; also via TRELLO_API_URL)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Retries after the first failed attempt (also via TRELLO_MAX_RETRIES)
    #[arg(long = "max-retries", value_name = "N", global = true)]
    pub max_retries: Option<u32>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the member the token belongs to
    Me,

    /// List your open boards
    Boards,

    /// List the open lists on a board
    Lists {
        #[arg(value_name = "BOARD_ID")]
        board_id: String,
    },

    /// List the cards on a list
    Cards {
        #[arg(value_name = "LIST_ID")]
        list_id: String,
    },

    /// Show a card
    Card {
        #[arg(value_name = "CARD_ID")]
        card_id: String,
    },

    /// Create a card on a list
    CreateCard(CreateCardArgs),

    /// Move a card to another list
    MoveCard {
        #[arg(value_name = "CARD_ID")]
        card_id: String,
        #[arg(value_name = "LIST_ID")]
        list_id: String,
    },

    /// Comment on a card
    Comment {
        #[arg(value_name = "CARD_ID")]
        card_id: String,
        text: String,
    },

    /// Search boards and cards
    Search {
        query: String,
        /// Maximum results per kind
        #[arg(long, value_name = "N")]
        limit: Option<u32>,
    },
}

#[derive(clap::Args, Debug)]
pub struct CreateCardArgs {
    #[arg(value_name = "LIST_ID")]
    pub list_id: String,

    pub name: String,

    /// Card description
    #[arg(long)]
    pub desc: Option<String>,

    /// Due date, ISO 8601
    #[arg(long)]
    pub due: Option<String>,
}

async fn run(api: &dyn TrelloApi, command: Commands, out: &mut dyn Write) -> Result<Outcome> {
    match command {
        Commands::Me => commands::me(api, out).await,
        Commands::Boards => commands::boards(api, out).await,
        Commands::Lists { board_id } => commands::lists(api, &board_id, out).await,
        Commands::Cards { list_id } => commands::cards(api, &list_id, out).await,
        Commands::Card { card_id } => commands::card(api, &card_id, out).await,
        Commands::CreateCard(args) => {
            let fields = CardFields {
                desc: args.desc,
                due: args.due,
            };
            commands::create_card(api, &args.list_id, &args.name, fields, out).await
        }
        Commands::MoveCard { card_id, list_id } => {
            commands::move_card(api, &card_id, &list_id, out).await
        }
        Commands::Comment { card_id, text } => commands::comment(api, &card_id, &text, out).await,
        Commands::Search { query, limit } => commands::search(api, &query, limit, out).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = Config::from_runtime(&RealRuntime)?.with_overrides(cli.api_url, cli.max_retries);

    // Ctrl-C aborts the in-flight request or backoff sleep instead of waiting it out.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let client = config
        .build_client()?
        .with_call_options(CallOptions::default().with_cancel(cancel));

    let mut stdout = std::io::stdout().lock();
    let outcome = run(&client, cli.command, &mut stdout).await?;
    stdout.flush()?;

    commands::print_rate_limit(&mut std::io::stderr(), outcome.as_ref())?;
    Ok(())
}
