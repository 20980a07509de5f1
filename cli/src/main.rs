//! `portfolio`: command-line access to the portfolio/blog backend.
//!
//! Sign-in state is kept in the same token file the client library uses, so
//! `portfolio login` once and later admin commands reuse the session. All
//! results print as pretty JSON on stdout; failures print the user-facing
//! message on stderr and exit with status 1.


use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use portfolio_client::config::ConfigError;
use portfolio_client::net::types::{
    ContactStatus, ContactSubmission, Credentials, PageView, PostDraft, PostQuery, PostStatus,
};
use portfolio_client::util::slugify;
use portfolio_client::util::validation::{FieldErrors, validate_contact, validate_post};
use portfolio_client::{ApiClient, AuthApi, AuthSessionManager, ClientConfig, ClientError, FileTokenStore, SessionPolicy};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid input")]
    Invalid(FieldErrors),
    #[error("not signed in; run `portfolio login` first")]
    NotSignedIn,
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl CliError {
    /// Text shown on stderr.
    fn user_message(&self) -> String {
        match self {
            Self::Client(e) => e.user_message(),
            Self::Invalid(fields) => fields.iter().map(|(f, m)| format!("{f}: {m}")).collect::<Vec<_>>().join("\n"),
            Self::Config(_) | Self::NotSignedIn | Self::Render(_) => self.to_string(),
        }
    }
}

impl From<FieldErrors> for CliError {
    fn from(fields: FieldErrors) -> Self {
        Self::Invalid(fields)
    }
}

#[derive(Parser, Debug)]
#[command(name = "portfolio", about = "Portfolio and blog backend CLI")]
struct Cli {
    /// Backend base URL, e.g. `http://localhost:5000/api`.
    #[arg(long, env = "PORTFOLIO_API_URL")]
    api_url: Option<String>,

    /// Where the session token is stored.
    #[arg(long, env = "PORTFOLIO_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Log request details to stderr.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session token.
    Login(LoginArgs),
    /// Sign out and forget the stored token.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Blog posts.
    #[command(subcommand)]
    Posts(PostsCommand),
    /// List blog categories.
    Categories,
    /// List blog tags.
    Tags,
    /// Portfolio projects.
    #[command(subcommand)]
    Projects(ProjectsCommand),
    /// Public contact form.
    #[command(subcommand)]
    Contact(ContactCommand),
    /// Contact submissions inbox (admin).
    #[command(subcommand)]
    Contacts(ContactsCommand),
    /// Record a page view.
    Track {
        path: String,
        #[arg(long)]
        referrer: Option<String>,
        /// Defaults to a fresh id per invocation.
        #[arg(long)]
        visitor_id: Option<Uuid>,
    },
    /// Analytics overview (admin).
    Summary,
    /// Print the URL slug for some text. Works offline.
    Slugify {
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long, env = "PORTFOLIO_EMAIL")]
    email: String,
    #[arg(long, env = "PORTFOLIO_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value_t = false)]
    remember: bool,
}

#[derive(Subcommand, Debug)]
enum PostsCommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    Get {
        slug: String,
    },
    /// Create a post (admin). Slug and excerpt are derived when omitted.
    Create(PostArgs),
    /// Delete a post by id (admin).
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
struct PostArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    content: String,
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    excerpt: Option<String>,
    #[arg(long)]
    cover_image: Option<String>,
    #[arg(long, value_enum, default_value_t = StatusArg::Draft)]
    status: StatusArg,
    #[arg(long)]
    category_id: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
}

impl PostArgs {
    fn into_draft(self) -> PostDraft {
        PostDraft {
            title: self.title,
            slug: self.slug,
            content: self.content,
            excerpt: self.excerpt,
            cover_image: self.cover_image,
            status: self.status.into(),
            category_id: self.category_id,
            tags: self.tags,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StatusArg {
    Draft,
    Published,
    Archived,
}

impl From<StatusArg> for PostStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => Self::Draft,
            StatusArg::Published => Self::Published,
            StatusArg::Archived => Self::Archived,
        }
    }
}

#[derive(Subcommand, Debug)]
enum ProjectsCommand {
    List,
    Get { id: String },
    /// Delete a project by id (admin).
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ContactCommand {
    /// Submit the public contact form.
    Send {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
}

#[derive(Subcommand, Debug)]
enum ContactsCommand {
    /// List submissions (admin).
    List,
    /// Change a submission's status (admin).
    Mark {
        id: String,
        #[arg(value_enum)]
        status: ContactStatusArg,
    },
    /// Delete a submission (admin).
    Delete { id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ContactStatusArg {
    New,
    Read,
    Replied,
    Archived,
}

impl From<ContactStatusArg> for ContactStatus {
    fn from(arg: ContactStatusArg) -> Self {
        match arg {
            ContactStatusArg::New => Self::New,
            ContactStatusArg::Read => Self::Read,
            ContactStatusArg::Replied => Self::Replied,
            ContactStatusArg::Archived => Self::Archived,
        }
    }
}

/// Services shared by every command.
struct CliContext {
    api: Arc<ApiClient>,
    auth: AuthSessionManager,
}

impl CliContext {
    fn new(config: &ClientConfig) -> Result<Self, CliError> {
        let api = Arc::new(ApiClient::new(config)?);
        let store = Arc::new(FileTokenStore::new(config.token_file.clone(), config.token_key.clone()));
        let auth_api: Arc<dyn AuthApi> = api.clone();
        let auth = AuthSessionManager::new(auth_api, store, SessionPolicy::from_config(config));
        Ok(Self { api, auth })
    }

    /// Restore the stored session; fail if there is none.
    async fn require_session(&self) -> Result<(), CliError> {
        if self.auth.initialize().await.is_authenticated() {
            Ok(())
        } else {
            Err(CliError::NotSignedIn)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = dotenv
        && !e.not_found()
    {
        tracing::warn!(error = %e, "failed to load .env");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();
}

/// Build the client config, letting flags override the environment.
fn load_config(cli: &Cli) -> Result<ClientConfig, ConfigError> {
    ClientConfig::from_lookup(|key| match key {
        "PORTFOLIO_API_URL" if cli.api_url.is_some() => cli.api_url.clone(),
        "PORTFOLIO_TOKEN_FILE" if cli.token_file.is_some() => {
            cli.token_file.as_ref().map(|p| p.to_string_lossy().into_owned())
        }
        _ => std::env::var(key).ok(),
    })
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Slugify { text } = &cli.command {
        return print_json(&slugify(&text.join(" ")));
    }

    let config = load_config(&cli)?;
    tracing::debug!(api_url = %config.api_base_url, token_file = %config.token_file.display(), "config loaded");
    let ctx = CliContext::new(&config)?;

    match cli.command {
        Command::Login(args) => run_login(&ctx, args).await,
        Command::Logout => {
            ctx.auth.initialize().await;
            if let Err(e) = ctx.auth.sign_out().await {
                tracing::warn!(error = %e, "backend logout failed, local session cleared");
            }
            print_json(&serde_json::json!({ "signedOut": true }))
        }
        Command::Whoami => {
            ctx.require_session().await?;
            print_json(&ctx.auth.snapshot().user())
        }
        Command::Posts(cmd) => run_posts(&ctx, cmd).await,
        Command::Categories => print_json(&ctx.api.list_categories().await?),
        Command::Tags => print_json(&ctx.api.list_tags().await?),
        Command::Projects(cmd) => run_projects(&ctx, cmd).await,
        Command::Contact(ContactCommand::Send { name, email, subject, message }) => {
            let form = ContactSubmission { name, email, subject, message };
            validate_contact(&form)?;
            ctx.api.submit_contact(&form).await?;
            print_json(&serde_json::json!({ "sent": true }))
        }
        Command::Contacts(cmd) => run_contacts(&ctx, cmd).await,
        Command::Track { path, referrer, visitor_id } => {
            let view = PageView { path, referrer, visitor_id: visitor_id.unwrap_or_else(Uuid::new_v4) };
            ctx.api.track_page_view(&view).await?;
            print_json(&view)
        }
        Command::Summary => {
            ctx.require_session().await?;
            print_json(&ctx.api.analytics_summary().await?)
        }
        Command::Slugify { .. } => Ok(()),
    }
}

async fn run_login(ctx: &CliContext, args: LoginArgs) -> Result<(), CliError> {
    ctx.auth.initialize().await;
    let credentials = Credentials { email: args.email, password: args.password, remember_me: args.remember };
    let session = ctx.auth.login(&credentials).await?;
    print_json(&serde_json::json!({
        "user": session.user,
        "expiresAt": session.expires_at.unix_timestamp(),
    }))
}

async fn run_posts(ctx: &CliContext, cmd: PostsCommand) -> Result<(), CliError> {
    match cmd {
        PostsCommand::List { page, limit, category, tag, search, status } => {
            let query = PostQuery { page, limit, category, tag, search, status: status.map(PostStatus::from) };
            print_json(&ctx.api.list_posts(&query).await?)
        }
        PostsCommand::Get { slug } => print_json(&ctx.api.get_post(&slug).await?),
        PostsCommand::Create(args) => {
            let draft = args.into_draft();
            validate_post(&draft)?;
            ctx.require_session().await?;
            print_json(&ctx.api.create_post(&draft.with_derived_fields()).await?)
        }
        PostsCommand::Delete { id } => {
            ctx.require_session().await?;
            ctx.api.delete_post(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_projects(ctx: &CliContext, cmd: ProjectsCommand) -> Result<(), CliError> {
    match cmd {
        ProjectsCommand::List => print_json(&ctx.api.list_projects().await?),
        ProjectsCommand::Get { id } => print_json(&ctx.api.get_project(&id).await?),
        ProjectsCommand::Delete { id } => {
            ctx.require_session().await?;
            ctx.api.delete_project(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_contacts(ctx: &CliContext, cmd: ContactsCommand) -> Result<(), CliError> {
    ctx.require_session().await?;
    match cmd {
        ContactsCommand::List => print_json(&ctx.api.list_contacts().await?),
        ContactsCommand::Mark { id, status } => print_json(&ctx.api.update_contact_status(&id, status.into()).await?),
        ContactsCommand::Delete { id } => {
            ctx.api.delete_contact(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
