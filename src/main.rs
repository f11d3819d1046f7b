// Entry point and high-level CLI flow.
//
// One-shot mode loads the file, applies the year selection and prints every
// view. `--interactive` keeps a session open behind a small menu so the
// selection can be changed and the views recomputed without reloading.
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use ride_explorer::{output, summarize, ExplorerConfig, Session, YearFilter};

/// Rows shown per view in the console.
const CONSOLE_ROWS: usize = 15;

#[derive(Parser)]
#[command(
    name = "ride_explorer",
    version,
    about = "Descriptive analytics for ride-booking CSV exports"
)]
struct Cli {
    /// Booking CSV file (one header row).
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Years to include: `all`, a range `2021-2023`, or a list `2021,2023`.
    #[arg(short, long, default_value = "all")]
    years: YearFilter,

    /// Print the dataset preview table.
    #[arg(long)]
    sample: bool,

    /// Print shape and per-column statistics of the loaded data.
    #[arg(long)]
    describe: bool,

    /// Directory to write each view as CSV plus `views.json`.
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// JSON file overriding column names and cleaning options.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep the session open behind a menu.
    #[arg(short, long)]
    interactive: bool,

    /// Enable verbose (INFO level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging.
    #[arg(short, long)]
    debug: bool,
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("ride_explorer={}", level.as_str().to_lowercase()))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init();
}

/// Read a single line of input after printing `prompt`. `None` once stdin
/// is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to return to the menu. `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(resp) = read_line("Back to menu (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn open_session(path: &Path, config: ExplorerConfig) -> Result<Session> {
    Session::open(path, config).with_context(|| {
        format!(
            "could not load '{}'; please provide a valid booking CSV file",
            path.display()
        )
    })
}

fn generate(session: &Session, out_dir: Option<&Path>) -> Result<()> {
    let views = session.views()?;
    println!("Year selection: {}\n", session.filter());
    output::print_views(&views, session.show_sample(), CONSOLE_ROWS);
    if let Some(dir) = out_dir {
        let written = output::export_views(dir, &views)
            .with_context(|| format!("failed to export views to '{}'", dir.display()))?;
        println!(
            "Outputs saved to {} ({} files)\n",
            dir.display(),
            written.len()
        );
    }
    Ok(())
}

fn handle_select_years(session: &mut Session) {
    match session.year_bounds() {
        Some((lo, hi)) => println!(
            "Years in data: {}-{} ({:?})",
            lo,
            hi,
            session.available_years()
        ),
        None => println!("No parseable years in data."),
    }
    let Some(text) = read_line("Years (all, 2021-2023, 2021,2023): ") else {
        return;
    };
    match text.parse::<YearFilter>() {
        Ok(filter) => {
            session.set_filter(filter);
            println!("Selection set to {}.\n", session.filter());
        }
        Err(e) => println!("{}\n", e),
    }
}

/// Ask for a file to load, defaulting to `current`. On success `current`
/// follows the new file; on failure the loaded data is kept.
fn handle_reload(session: &mut Session, current: &mut PathBuf) {
    let Some(text) = read_line(&format!("File path [{}]: ", current.display())) else {
        return;
    };
    let path = if text.is_empty() {
        current.clone()
    } else {
        PathBuf::from(text)
    };
    match session.reload(&path) {
        Ok(()) => {
            output::print_load_report(session.report());
            *current = path;
        }
        Err(e) => eprintln!("Failed to load '{}': {}\n", path.display(), e),
    }
}

fn run_interactive(mut session: Session, input: &Path, out_dir: Option<&Path>) -> Result<()> {
    let mut current = input.to_path_buf();
    loop {
        println!("Select an option:");
        println!("[1] Load a file");
        println!("[2] Select years");
        println!(
            "[3] Toggle sample data (currently {})",
            if session.show_sample() { "on" } else { "off" }
        );
        println!("[4] Generate views");
        println!("[5] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => handle_reload(&mut session, &mut current),
            "2" => handle_select_years(&mut session),
            "3" => {
                let show = !session.show_sample();
                session.set_show_sample(show);
            }
            "4" => {
                println!();
                generate(&session, out_dir)?;
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "5" => break,
            _ => println!("Invalid choice. Please enter 1-5.\n"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match &cli.config {
        Some(path) => ExplorerConfig::from_json_file(path)?,
        None => ExplorerConfig::default(),
    };
    info!(input = %cli.input.display(), "loading booking data");

    let mut session = open_session(&cli.input, config)?;
    session.set_filter(cli.years.clone());
    session.set_show_sample(cli.sample);
    output::print_load_report(session.report());

    if cli.describe {
        output::print_summary(&summarize(session.dataset()));
    }

    if cli.interactive {
        run_interactive(session, &cli.input, cli.out_dir.as_deref())
    } else {
        generate(&session, cli.out_dir.as_deref())
    }
}
