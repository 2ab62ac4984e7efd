use clap::Parser;
use directories::ProjectDirs;
use prefsync::columns::{ColumnEngine, Direction};
use prefsync::config::PrefsConfig;
use prefsync::environment::ColorSchemeSignal;
use prefsync::error::{PrefsError, Result};
use prefsync::filter;
use prefsync::model::{GridKey, TeamColorScheme, TeamId, Theme};
use prefsync::store::fs::FileStore;
use prefsync::PreferenceReconciler;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod args;
mod print;
use args::{Cli, ColumnAction, Commands, FilterAction, TeamAction};
use print::{
    print_columns, print_document, print_failure, print_info, print_success, print_team,
    print_theme,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct AppContext {
    reconciler: PreferenceReconciler<FileStore>,
    store: Arc<FileStore>,
    config: PrefsConfig,
    poller: JoinHandle<()>,
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = data_dir()?;

    // Config edits must work even when the preference file is unreadable.
    if let Some(Commands::Config { key, value }) = &cli.command {
        return handle_config(&data_dir, key.as_deref(), value.as_deref());
    }

    let ctx = init_context(&data_dir).await?;
    match cli.command {
        Some(Commands::Show { json }) => handle_show(&ctx, json).await,
        Some(Commands::Theme { value }) => handle_theme(&ctx, value).await,
        Some(Commands::Team { action }) => handle_team(&ctx, action).await,
        Some(Commands::Columns { grid, action }) => handle_columns(&ctx, grid, action).await,
        Some(Commands::Filter { action }) => handle_filter(&ctx, action).await,
        Some(Commands::Reset) => handle_reset(&ctx).await,
        Some(Commands::Config { .. }) => Ok(()),
        None => handle_show(&ctx, false).await,
    }
}

fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os("PREFSYNC_HOME") {
        return Ok(PathBuf::from(home));
    }
    let dirs = ProjectDirs::from("com", "prefsync", "prefsync")
        .ok_or_else(|| PrefsError::Config("Could not determine data dir".to_string()))?;
    Ok(dirs.data_dir().to_path_buf())
}

async fn init_context(data_dir: &Path) -> Result<AppContext> {
    let config = PrefsConfig::load(data_dir)?;
    let store = Arc::new(FileStore::new(data_dir, config.user.clone()));
    let signal = ColorSchemeSignal::detect();
    let poller = signal.spawn_poller(config.poll_system_theme());
    let reconciler = PreferenceReconciler::new(Arc::clone(&store), signal.subscribe());
    reconciler.wait_until_loaded().await;

    // Writing over a document that could not be read would lose it.
    if let Some(err) = reconciler.load_error() {
        poller.abort();
        return Err(err);
    }

    Ok(AppContext {
        reconciler,
        store,
        config,
        poller,
    })
}

async fn handle_show(ctx: &AppContext, json: bool) -> Result<()> {
    let doc = ctx.reconciler.document();
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }
    let last_saved = ctx.store.last_modified().await?;
    print_document(&doc, ctx.reconciler.resolved_theme(), last_saved);
    Ok(())
}

async fn handle_theme(ctx: &AppContext, value: Option<Theme>) -> Result<()> {
    if let Some(theme) = value {
        ctx.reconciler.set_theme(theme).await?;
        print_success(&format!("Theme set to {}", theme));
    }
    print_theme(&ctx.reconciler.document(), ctx.reconciler.resolved_theme());
    Ok(())
}

async fn handle_team(ctx: &AppContext, action: TeamAction) -> Result<()> {
    match action {
        TeamAction::Set {
            team,
            primary,
            secondary,
            accent,
        } => {
            let mut colors = TeamColorScheme::new(primary, secondary);
            if let Some(accent) = accent {
                colors = colors.with_accent(accent);
            }
            ctx.reconciler.set_team_color_scheme(team, colors).await?;
            print_success(&format!("Colors set for team {}", team));
            show_team(ctx, team);
        }
        TeamAction::Rm { team } => {
            if ctx.reconciler.get_team_color_scheme(team).is_none() {
                print_info(&format!("No colors set for team {}", team));
                return Ok(());
            }
            ctx.reconciler.remove_team_color_scheme(team).await?;
            print_success(&format!("Colors removed for team {}", team));
        }
        TeamAction::Get { team } => show_team(ctx, team),
    }
    Ok(())
}

fn show_team(ctx: &AppContext, team: TeamId) {
    match ctx.reconciler.get_team_color_scheme(team) {
        Some(colors) => print_team(team, &colors),
        None => print_info(&format!("No colors set for team {}", team)),
    }
}

async fn handle_columns(ctx: &AppContext, grid: GridKey, action: Option<ColumnAction>) -> Result<()> {
    let engine = ColumnEngine::builder(ctx.reconciler.clone(), grid)
        .width_delay(ctx.config.debounce())
        .build();

    let moved = match action.unwrap_or(ColumnAction::List) {
        ColumnAction::List => true,
        ColumnAction::Toggle { column } => {
            let visible = engine.toggle(&column)?;
            let state = if visible { "shown" } else { "hidden" };
            print_success(&format!("{} {}", column, state));
            true
        }
        ColumnAction::Up { column } => engine.move_column(&column, Direction::Up),
        ColumnAction::Down { column } => engine.move_column(&column, Direction::Down),
        ColumnAction::Move { from, to } => engine.move_to_position(&from, &to),
        ColumnAction::Reset => {
            engine.reset_to_defaults();
            print_success(&format!("Columns of {} reset", grid));
            true
        }
        ColumnAction::Width { column, width } => {
            engine.resize(&column, width)?;
            engine.flush_widths().await?;
            print_success(&format!("{} width set to {}px", column, width));
            true
        }
    };
    if !moved {
        print_info("Nothing to move");
    }

    engine.settled().await;
    if let Some(err) = ctx.reconciler.save_state().error {
        return Err(err);
    }
    print_columns(&engine.display_columns());
    Ok(())
}

async fn handle_filter(ctx: &AppContext, action: FilterAction) -> Result<()> {
    match action {
        FilterAction::Parse { expression } => {
            let value = parse_filter(&expression)?;
            println!("{}", filter::format(value.as_ref()));
        }
        FilterAction::Eval { expression, value } => {
            let parsed = parse_filter(&expression)?;
            if filter::evaluate(value, parsed.as_ref()) {
                print_success("pass");
            } else {
                print_failure("fail");
            }
        }
        FilterAction::Set {
            grid,
            column,
            expression,
        } => {
            let value = ctx
                .reconciler
                .set_numeric_filter_expr(grid, &column, &expression)
                .await?;
            print_success(&format!("{}.{} filter set to {}", grid, column, value));
        }
        FilterAction::Clear { grid, column } => {
            ctx.reconciler.set_numeric_filter(grid, &column, None).await?;
            print_success(&format!("{}.{} filter cleared", grid, column));
        }
    }
    Ok(())
}

/// Blank text means "no filter"; anything else must parse.
fn parse_filter(expression: &str) -> Result<Option<filter::NumericFilterValue>> {
    if expression.trim().is_empty() {
        return Ok(None);
    }
    filter::parse(expression)
        .map(Some)
        .ok_or_else(|| PrefsError::InvalidFilter(expression.to_string()))
}

async fn handle_reset(ctx: &AppContext) -> Result<()> {
    ctx.reconciler.reset_preferences().await?;
    print_success("Preferences reset to defaults");
    Ok(())
}

fn handle_config(data_dir: &Path, key: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = PrefsConfig::load(data_dir)?;
    match (key, value) {
        (None, _) => {
            for key in PrefsConfig::KEYS {
                println!("{} = {}", key, config.get(key)?);
            }
        }
        (Some(key), None) => println!("{} = {}", key, config.get(key)?),
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save(data_dir)?;
            print_success(&format!("{} = {}", key, config.get(key)?));
        }
    }
    Ok(())
}
