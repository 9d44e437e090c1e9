use clap::{Args, Parser, Subcommand};
use gnotes::google_oauth::{
    LoopbackBroker, PrintUrl, SignInOutcome, SystemBrowser, broker::BrowserOpener,
    build_http_client,
};
use gnotes::notes::{Note, NoteDraft};
use gnotes::session::FilePreferences;
use gnotes::{AppError, Config, GoogleOauthService, NotesService, RecordStore, SessionCache};
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "gnotes", version, about = "Notes with Google sign-in")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with Google and remember the user
    Signin {
        /// Print the consent URL instead of launching a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Forget the remembered user
    Signout,
    /// Show the remembered user
    Whoami,
    /// Manage notes
    #[command(subcommand)]
    Notes(NotesCommand),
    /// Database maintenance
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand)]
enum NotesCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Add(DraftArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Toggle the favorite flag
    Fav { id: i64 },
    Rm { id: i64 },
}

#[derive(Args)]
struct DraftArgs {
    #[arg(long)]
    title: String,
    /// Left out on edit, the current content is kept
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

impl From<DraftArgs> for NoteDraft {
    fn from(a: DraftArgs) -> Self {
        NoteDraft {
            title: a.title,
            content: a.content,
            category: a.category,
            color: a.color,
        }
    }
}

#[derive(Subcommand)]
enum DbCommand {
    Info,
    /// Delete the database file
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    info!(
        data_dir = %cfg.data_dir().display(),
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
    );

    match cli.command {
        Command::Signin { no_browser } => {
            if no_browser {
                sign_in(&cfg, PrintUrl).await?
            } else {
                sign_in(&cfg, SystemBrowser).await?
            }
        }
        Command::Signout => {
            let session = open_session(&cfg)?;
            session.clear()?;
            session.close()?;
            println!("Signed out.");
        }
        Command::Whoami => match open_session(&cfg)?.current() {
            Some(s) => println!("{} <{}>\n{}", s.name, s.email, s.photo_url),
            None => println!("Not signed in."),
        },
        Command::Notes(cmd) => {
            let store = Arc::new(RecordStore::new(cfg.database_path()));
            let result = run_notes(NotesService::new(store.clone()), cmd).await;
            store.close().await;
            result?;
        }
        Command::Db(cmd) => {
            let store = RecordStore::new(cfg.database_path());
            match cmd {
                DbCommand::Info => {
                    let info = store.info().await?;
                    println!(
                        "{}\nexists: {}\nsize: {}",
                        info.path.display(),
                        info.exists,
                        info.size_formatted()
                    );
                }
                DbCommand::Reset => {
                    store.delete_database().await?;
                    println!("Database deleted.");
                }
            }
        }
    }
    Ok(())
}

fn open_session(cfg: &Config) -> Result<SessionCache<FilePreferences>, AppError> {
    let prefs = FilePreferences::open(cfg.preferences_path())?;
    let (events, _) = broadcast::channel(4);
    Ok(SessionCache::new(prefs, events))
}

async fn sign_in<O: BrowserOpener>(cfg: &Config, opener: O) -> Result<(), AppError> {
    if cfg.oauth.client_id.is_empty() {
        return Err(AppError::Validation(
            "oauth.client_id is not configured (set GNOTES_OAUTH__CLIENT_ID)".to_string(),
        ));
    }
    let http_client = build_http_client(cfg.proxy.as_ref())?;
    let broker = LoopbackBroker::new(
        cfg.oauth.redirect_uri.clone(),
        cfg.oauth.callback_timeout(),
        opener,
    );
    let service = GoogleOauthService::new(cfg.oauth.clone(), http_client, broker);
    let session = open_session(cfg)?;

    let outcome = tokio::select! {
        res = service.sign_in() => res,
        _ = tokio::signal::ctrl_c() => Ok(SignInOutcome::Cancelled),
    };

    match outcome {
        Ok(SignInOutcome::SignedIn(user)) => {
            session.save(&user)?;
            println!(
                "Signed in as {} <{}>",
                user.name.as_deref().unwrap_or("-"),
                user.email.as_deref().unwrap_or("-")
            );
        }
        Ok(SignInOutcome::Cancelled) => println!("Sign-in cancelled."),
        Err(e) if e.is_provider_failure() => {
            eprintln!(
                "hint: check oauth.client_id, oauth.client_secret and that {} is a registered redirect URI",
                cfg.oauth.redirect_uri
            );
            return Err(e);
        }
        Err(e) => return Err(e),
    }
    session.close()?;
    Ok(())
}

async fn run_notes(notes: NotesService, cmd: NotesCommand) -> Result<(), AppError> {
    match cmd {
        NotesCommand::List { search } => {
            for note in notes.list(search.as_deref()).await? {
                print_note(&note);
            }
        }
        NotesCommand::Add(draft) => {
            let note = notes.create(draft.into()).await?;
            println!("Created note {}", note.id);
        }
        NotesCommand::Edit { id, draft } => {
            let note = notes.update(id, draft.into()).await?;
            print_note(&note);
        }
        NotesCommand::Fav { id } => {
            let note = notes.toggle_favorite(id).await?;
            print_note(&note);
        }
        NotesCommand::Rm { id } => {
            if notes.delete(id).await? {
                println!("Deleted note {id}");
            } else {
                println!("No note {id}");
            }
        }
    }
    Ok(())
}

fn print_note(note: &Note) {
    let star = if note.is_favorite { "*" } else { " " };
    println!(
        "{star} [{}] {} ({}, {}) updated {}",
        note.id,
        note.title,
        note.category,
        note.color,
        note.updated_at.format("%Y-%m-%d %H:%M")
    );
    if !note.content.is_empty() {
        println!("      {}", note.content);
    }
}
