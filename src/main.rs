//! scrittoio: headless blog-authoring CLI.
//! Wires the moderation and publish services to the command surface and
//! reports queued notices on the way out.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::error;

use scrittoio::application::moderation::{ModerationService, MutationOutcome, SkipReason};
use scrittoio::application::notify::{Notice, NoticeHub};
use scrittoio::application::publish::{PublishError, PublishForm, PublishService};
use scrittoio::application::render::parse_tags;
use scrittoio::application::store::PostStore;
use scrittoio::application::tracker::OperationTracker;
use scrittoio::config::{self, Cli, Commands, EditorArgs, PostsCmd, TokenSource};
use scrittoio::domain::entities::PostId;
use scrittoio::infra::api::{ApiClient, ApiError, StaticToken, TokenFile, TokenProvider};
use scrittoio::infra::error::InfraError;
use scrittoio::infra::telemetry;

const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("failed to read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Aborted(String),
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

struct Ctx {
    moderation: ModerationService,
    publish: PublishService,
    store: Arc<PostStore>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match config::load(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("scrittoio: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = telemetry::init(&settings.logging) {
        eprintln!("scrittoio: {err}");
        return ExitCode::FAILURE;
    }

    let notices = NoticeHub::new();
    let mut notice_rx = notices.subscribe();

    let result = run(cli, &settings, notices).await;

    // Queued user-facing notices go to stderr so JSON output stays clean.
    loop {
        match notice_rx.try_recv() {
            Ok(notice) => eprintln!("{}", render_notice(&notice)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("scrittoio: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cli: Cli,
    settings: &config::Settings,
    notices: NoticeHub,
) -> Result<(), CliError> {
    let tokens: Arc<dyn TokenProvider> = match &settings.api.token {
        TokenSource::File(path) => Arc::new(TokenFile::new(path.clone())),
        TokenSource::Inline(token) => Arc::new(StaticToken::new(token.clone())),
    };
    let api = Arc::new(ApiClient::new(
        settings.api.base_url.as_str(),
        tokens,
        settings.api.timeout,
    )?);

    let store = Arc::new(PostStore::new());
    let tracker = Arc::new(OperationTracker::new());
    let moderation = ModerationService::new(
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::clone(&api),
        notices.clone(),
    );
    let publish = PublishService::new(
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::clone(&api),
        notices,
        settings.snapshot.base_href.clone(),
    );

    let ctx = Ctx {
        moderation,
        publish,
        store,
    };

    match cli.command {
        Commands::Posts(posts) => handle_posts(&ctx, posts.action).await,
        Commands::Save(editor) => handle_save(&ctx, editor).await,
        Commands::Publish(editor) => handle_publish(&ctx, editor).await,
    }
}

async fn handle_posts(ctx: &Ctx, cmd: PostsCmd) -> Result<(), CliError> {
    match cmd {
        PostsCmd::List {
            limit,
            skip,
            show_deleted,
        } => {
            ctx.moderation.refresh(limit, skip).await?;
            print_json(&ctx.store.visible(show_deleted))
        }
        PostsCmd::Create => {
            let id = ctx.moderation.create().await?;
            print_json(&serde_json::json!({ "id": id }))
        }
        PostsCmd::ToggleStatus { id } => {
            let id = prime_store(ctx, &id).await?;
            finish(ctx.moderation.toggle_status(&id).await, "toggle status")
        }
        PostsCmd::Delete { id } => {
            let id = prime_store(ctx, &id).await?;
            finish(ctx.moderation.soft_delete(&id).await, "delete")
        }
        PostsCmd::Restore { id } => {
            let id = prime_store(ctx, &id).await?;
            finish(ctx.moderation.restore(&id).await, "restore")
        }
        PostsCmd::Purge { id, yes } => {
            if !yes {
                return Err(CliError::Aborted(
                    "permanent deletion is unrecoverable; pass --yes to confirm".to_string(),
                ));
            }
            let id = prime_store(ctx, &id).await?;
            finish(ctx.moderation.purge(&id).await, "purge")
        }
    }
}

async fn handle_save(ctx: &Ctx, editor: EditorArgs) -> Result<(), CliError> {
    let (id, form) = build_form(editor).await?;
    let saved = ctx.publish.save_draft(&id, &form).await?;
    print_json(&saved)
}

async fn handle_publish(ctx: &Ctx, editor: EditorArgs) -> Result<(), CliError> {
    let (id, form) = build_form(editor).await?;
    let outcome = ctx.publish.publish(&id, &form).await?;
    print_json(&PublishReport {
        id: &id,
        preview_link: &outcome.preview_link,
        slug: &outcome.saved.slug,
        cover_failure: outcome.cover_failure.as_deref(),
    })
}

#[derive(Serialize)]
struct PublishReport<'a> {
    id: &'a PostId,
    preview_link: &'a str,
    slug: &'a str,
    cover_failure: Option<&'a str>,
}

/// Mutations operate on the in-memory listing, so fetch it first.
async fn prime_store(ctx: &Ctx, raw_id: &str) -> Result<PostId, CliError> {
    ctx.moderation.refresh(DEFAULT_LIST_LIMIT, 0).await?;
    Ok(PostId::from(raw_id))
}

async fn build_form(editor: EditorArgs) -> Result<(PostId, PublishForm), CliError> {
    let raw_html = match (editor.body, editor.body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => read_input(&path).await?,
        (None, None) => String::new(),
    };

    let form = PublishForm {
        title: editor.title,
        slug: editor.slug.unwrap_or_default(),
        tags: editor.tags.as_deref().map(parse_tags).unwrap_or_default(),
        summary: editor.summary,
        raw_html,
        cover_caption: editor.cover_caption,
        staged_cover: editor.cover,
    };

    Ok((PostId::from(editor.id.as_str()), form))
}

async fn read_input(path: &PathBuf) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Input {
            path: path.display().to_string(),
            source,
        })
}

fn finish(outcome: MutationOutcome, context: &str) -> Result<(), CliError> {
    match outcome {
        MutationOutcome::Committed => {
            print_json(&serde_json::json!({ "ok": true, "operation": context }))
        }
        MutationOutcome::RolledBack => Err(CliError::Aborted(format!(
            "{context} failed and was rolled back"
        ))),
        MutationOutcome::Skipped(SkipReason::NotFound) => {
            Err(CliError::Aborted(format!("{context}: post not found")))
        }
        MutationOutcome::Skipped(SkipReason::InFlight) => Err(CliError::Aborted(format!(
            "{context}: an operation for this post is already in flight"
        ))),
    }
}

fn render_notice(notice: &Notice) -> String {
    format!(
        "[{}] {}: {}",
        notice.level.as_str(),
        notice.context,
        notice.detail
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
