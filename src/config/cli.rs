//! Command-line surface for `scrittoio`.
//! Kept in its own file so tests can reuse the same definitions as the
//! binary itself.

use std::path::PathBuf;

use clap::{Parser, Subcommand, builder::BoolishValueParser};

#[derive(Parser, Debug)]
#[command(name = "scrittoio", version, about = "Scrittoio blog authoring CLI", long_about = None)]
pub struct Cli {
    /// API base URL, e.g. <http://localhost:8000/api/>
    #[arg(long, env = "SCRITTOIO_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Path to a file containing the API token (takes precedence over env)
    #[arg(long, env = "SCRITTOIO_TOKEN_FILE", value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// API token from env (CLI flag intentionally disabled to avoid shell history leaks)
    #[arg(hide = true, env = "SCRITTOIO_TOKEN")]
    pub token_env: Option<String>,

    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCRITTOIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Post management (list/create/status/delete/restore/purge)
    Posts(PostsArgs),
    /// Save a draft without publishing
    Save(EditorArgs),
    /// Upload the cover, save the post and publish an HTML snapshot
    Publish(EditorArgs),
}

#[derive(Parser, Debug)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub action: PostsCmd,
}

#[derive(Subcommand, Debug)]
pub enum PostsCmd {
    /// List posts
    List {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        /// Include soft-deleted posts in the listing
        #[arg(long, default_value_t = false)]
        show_deleted: bool,
    },
    /// Create an empty draft and print its id
    Create,
    /// Flip a post between draft and published
    ToggleStatus { id: String },
    /// Soft-delete a post (recoverable)
    Delete { id: String },
    /// Restore a soft-deleted post
    Restore { id: String },
    /// Permanently delete a post
    Purge {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
pub struct EditorArgs {
    pub id: String,

    #[arg(long)]
    pub title: String,

    /// Explicit slug; derived from the title when omitted
    #[arg(long)]
    pub slug: Option<String>,

    /// Comma-separated tag list
    #[arg(long)]
    pub tags: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    /// Post body as raw HTML
    #[arg(long)]
    pub body: Option<String>,

    /// Read the post body from a file instead
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    /// Local image file to upload as the cover
    #[arg(long, value_name = "PATH")]
    pub cover: Option<PathBuf>,

    #[arg(long)]
    pub cover_caption: Option<String>,
}
