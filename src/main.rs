pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
    time::Duration,
};
use tracing::{debug, info, warn};
use webbrowser::Browser;

use quizr::{
    app::{App, AppAction},
    app_dirs::AppDirs,
    catalog::{BundledCatalog, JsonFileCatalog, QuizSource},
    config::{Config, ConfigOverrides, ConfigStore, FileConfigStore},
    history::{export_csv, format_duration},
    logging,
    quiz::Category,
    runtime::{CrosstermEventSource, FixedTicker, QuizEvent, Runner},
    store::{SqliteUserStore, UserStore},
};

const TICK_RATE_MS: u64 = 100;
const LIST_LIMIT: usize = 10;

/// timed multiple-choice quizzes in your terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed multiple-choice quizzes in the terminal. Finished quizzes earn points that are kept per player, with a local leaderboard and result history."
)]
pub struct Cli {
    /// player id to play as
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// display name for the player
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// start this quiz right away instead of showing the menu
    #[clap(short = 'q', long)]
    quiz: Option<String>,

    /// load quizzes from a JSON file instead of the bundled set
    #[clap(long, value_name = "PATH")]
    quiz_file: Option<PathBuf>,

    /// shuffle question order
    #[clap(short = 's', long)]
    shuffle: bool,

    /// print the available quizzes and exit
    #[clap(long)]
    list: bool,

    /// print the leaderboard and exit
    #[clap(long)]
    leaderboard: bool,

    /// print the player's recent results and exit
    #[clap(long)]
    history: bool,

    /// write every stored result as CSV to PATH ("-" for stdout) and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// config file to use
    #[clap(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// database file to use
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            user_id: self.user.clone(),
            display_name: self.name.clone(),
            shuffle_questions: self.shuffle,
        }
    }

    fn is_batch(&self) -> bool {
        self.list || self.leaderboard || self.history || self.export.is_some()
    }

    fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("quizr.db"))
    }
}

fn config_store(cli: &Cli) -> FileConfigStore {
    match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    }
}

/// Merge what was read from `store` with the command line, writing the file
/// back when it was missing or the identity changed.
fn settle_config(
    store: &FileConfigStore,
    loaded: io::Result<Option<Config>>,
    overrides: &ConfigOverrides,
) -> Config {
    let (mut config, missing) = match loaded {
        Ok(Some(config)) => (config, false),
        Ok(None) => {
            debug!(path = %store.path().display(), "no config file, using defaults");
            (Config::default(), true)
        }
        Err(err) => {
            warn!(path = %store.path().display(), error = %err, "unreadable config, using defaults");
            (Config::default(), false)
        }
    };

    // a new identity sticks for later runs, one-off flags like --shuffle do not
    let identity_changed = overrides.user_id.is_some() || overrides.display_name.is_some();
    if identity_changed {
        config = config.with_overrides(&ConfigOverrides {
            shuffle_questions: false,
            ..overrides.clone()
        });
    }
    if missing || identity_changed {
        if let Err(err) = store.save(&config) {
            warn!(path = %store.path().display(), error = %err, "could not write config");
        }
    }
    config.with_overrides(overrides)
}

fn load_categories(cli: &Cli) -> Result<Vec<Category>, Box<dyn Error>> {
    let categories = match &cli.quiz_file {
        Some(path) => JsonFileCatalog::open(path)?.categories()?,
        None => BundledCatalog::load()?.categories()?,
    };
    Ok(categories)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // the log level lives in the config, so read it first and settle it once
    // logging is up
    let config_store = config_store(&cli);
    let loaded = config_store.load();
    let log_level = match &loaded {
        Ok(Some(config)) => config.log_level.clone(),
        _ => Config::default().log_level,
    };
    if let Some(log_path) = AppDirs::log_path() {
        if let Err(err) = logging::init(&log_path, &log_level) {
            eprintln!("quizr: logging disabled ({err})");
        }
    }
    debug!(?cli, "starting");
    let config = settle_config(&config_store, loaded, &cli.overrides());

    let categories = load_categories(&cli)?;

    let mut store = SqliteUserStore::open(cli.db_path())?;

    if cli.is_batch() {
        return run_batch(&cli, &config, &categories, &mut store);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut app = App::new(config, categories, Box::new(store), runner.sender())?;
    if let Some(id) = &cli.quiz {
        app.start_quiz(id);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::screen::draw(app, f))?;

    loop {
        let before = app.state;

        match runner.step() {
            QuizEvent::Key(key) => match app.handle_key(key) {
                AppAction::Quit => break,
                AppAction::Share(url) => {
                    if Browser::is_available() {
                        webbrowser::open(&url).unwrap_or_default();
                    }
                }
                AppAction::None => {}
            },
            QuizEvent::Tick(epoch) => app.on_tick(epoch),
            QuizEvent::Resize | QuizEvent::Idle => {}
        }

        if app.state != before {
            debug!(from = %before, to = %app.state, "state changed");
        }
        terminal.draw(|f| ui::screen::draw(app, f))?;
    }

    app.abandon();
    info!("bye");
    Ok(())
}

fn run_batch(
    cli: &Cli,
    config: &Config,
    categories: &[Category],
    store: &mut SqliteUserStore,
) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout().lock();

    if cli.list {
        print_quizzes(categories, &mut out)?;
    }
    if cli.leaderboard {
        print_leaderboard(&*store, &mut out)?;
    }
    if cli.history {
        let user = store.identify(&config.user_id, &config.display_name)?;
        print_history(&*store, &user.id, categories, &mut out)?;
    }
    if let Some(path) = &cli.export {
        let results = store.all_results()?;
        if path.as_os_str() == "-" {
            export_csv(&results, &mut out)?;
        } else {
            export_csv(&results, File::create(path)?)?;
            writeln!(out, "exported {} results to {}", results.len(), path.display())?;
        }
    }
    Ok(())
}

fn print_quizzes<W: Write>(categories: &[Category], out: &mut W) -> Result<(), Box<dyn Error>> {
    for category in categories {
        writeln!(out, "{}", category.name)?;
        for quiz in &category.quizzes {
            writeln!(
                out,
                "  {:<6} {:<28} {:>2} questions {:>3} min {:>4} pts",
                quiz.id,
                quiz.title,
                quiz.question_count(),
                quiz.time_limit_minutes,
                quiz.points_reward
            )?;
        }
    }
    Ok(())
}

fn print_leaderboard<W: Write>(store: &dyn UserStore, out: &mut W) -> Result<(), Box<dyn Error>> {
    let users = store.leaderboard(LIST_LIMIT)?;
    if users.is_empty() {
        writeln!(out, "nobody has finished a quiz yet")?;
    }
    for (rank, user) in users.iter().enumerate() {
        writeln!(
            out,
            "#{:<3} {:<20} {:>6} pts {:>4} quizzes",
            rank + 1,
            user.name,
            user.points,
            user.total_quizzes
        )?;
    }
    Ok(())
}

fn print_history<W: Write>(
    store: &dyn UserStore,
    user_id: &str,
    categories: &[Category],
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let results = store.results_for(user_id, LIST_LIMIT)?;
    if results.is_empty() {
        writeln!(out, "no results for {user_id}")?;
    }
    for result in &results {
        let title = categories
            .iter()
            .flat_map(|c| c.quizzes.iter())
            .find(|q| q.id == result.quiz_id)
            .map(|q| q.title.as_str())
            .unwrap_or(result.quiz_id.as_str());
        writeln!(
            out,
            "{}  {:<28} {}/{}  +{} pts  {}",
            result.completed_at.format("%Y-%m-%d %H:%M"),
            title,
            result.score,
            result.total_questions,
            result.points_earned,
            format_duration(result.time_taken_secs)
        )?;
    }
    Ok(())
}
