use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use featurescope::page::{DurationSource, TrackPanel, FEATURES};
use featurescope::playback::format_time;
use featurescope::report::{self, Summary};
use featurescope::{probe, AnalysisDocument, Config};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Audio extensions looked for when scanning the audio directory
const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "wave", "flac", "ogg", "oga", "opus", "m4a", "aac", "aiff", "aif",
];

#[derive(Parser, Debug)]
#[command(name = "featurescope")]
#[command(author, version, about = "Chart precomputed audio features next to a synchronized player")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Analysis document (JSON, track name -> features)
    analysis: Option<PathBuf>,

    /// Launch GUI file picker (auto-enabled when double-clicked)
    #[arg(long)]
    gui: bool,

    /// Output report file (.html, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "featurescope-reports")]
    report_dir: PathBuf,

    /// Directory holding the audio files (overrides the config file)
    #[arg(short, long)]
    audio_dir: Option<PathBuf>,

    /// Config file (default: ./featurescope.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Show per-chart details and debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the page, audio and player bundle over HTTP
    Serve {
        /// Analysis document
        analysis: PathBuf,

        /// Port to listen on (default from config: 3002)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory holding the audio files
        #[arg(short, long)]
        audio_dir: Option<PathBuf>,
    },

    /// Print what each track has and what can be charted
    Summary {
        /// Analysis document
        analysis: PathBuf,

        /// Directory holding the audio files
        #[arg(short, long)]
        audio_dir: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args) {
        eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .init();
}

fn load_config(path: Option<&Path>, audio_dir: Option<PathBuf>) -> Config {
    let mut config = Config::load(path);
    if let Some(dir) = audio_dir {
        config.audio_dir = dir;
    }
    config
}

fn run(args: Args) -> Result<()> {
    // Handle subcommands first
    if let Some(cmd) = args.command {
        return match cmd {
            Command::Serve { analysis, port, audio_dir } => {
                let config = load_config(args.config.as_deref(), audio_dir);
                let port = port.unwrap_or(config.server.port);
                featurescope::serve::start(port, &analysis, &config)
                    .with_context(|| format!("serving {}", analysis.display()))
            }
            Command::Summary { analysis, audio_dir } => {
                let config = load_config(args.config.as_deref(), audio_dir);
                print_summary(&analysis, &config)
            }
        };
    }

    // With GUI feature: launch GUI if --gui flag OR no path provided
    #[cfg(feature = "gui")]
    let use_gui = args.gui || args.analysis.is_none();

    #[cfg(not(feature = "gui"))]
    let use_gui = false;

    #[cfg(feature = "gui")]
    let analysis = match (use_gui, args.analysis.clone()) {
        (false, Some(p)) => p,
        _ => match pick_analysis_gui() {
            Some(p) => p,
            None => {
                eprintln!("No analysis file selected.");
                return Ok(());
            }
        },
    };

    #[cfg(not(feature = "gui"))]
    let analysis = match args.analysis.clone() {
        Some(p) => p,
        None => {
            if args.gui {
                eprintln!("Note: GUI mode not available in this build.");
            }
            eprintln!("Usage: featurescope <ANALYSIS>");
            eprintln!("Run 'featurescope --help' for more options.");
            std::process::exit(1);
        }
    };

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let config = load_config(args.config.as_deref(), args.audio_dir.clone());
    let doc = AnalysisDocument::load(&analysis)
        .with_context(|| format!("loading {}", analysis.display()))?;

    if doc.is_empty() {
        eprintln!("No tracks in {}", analysis.display());
        std::process::exit(1);
    }

    if !args.quiet {
        eprintln!("\x1b[1mfeaturescope\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!(
            "Found {} track(s), audio from {}\n",
            doc.tracks.len(),
            config.audio_dir.display()
        );
    }

    // Set up progress bar
    let pb = if !args.quiet && doc.tracks.len() > 1 {
        let pb = ProgressBar::new(doc.tracks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let page = report::build_page(&doc, &config, |panel| {
        if let Some(ref pb) = pb {
            pb.inc(1);
            pb.set_message(panel.name.clone());
        }
    });

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if !args.quiet {
        for panel in &page.tracks {
            print_panel(panel, args.verbose);
        }
    }

    let summary = Summary::from_page(&page);
    if !args.quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  Tracks:          {}", summary.tracks);
        eprintln!("  \x1b[32mCharts drawn:\x1b[0m    {}", summary.charts_drawn);
        eprintln!("  \x1b[33mUnavailable:\x1b[0m     {}", summary.charts_failed);
        if summary.without_audio > 0 {
            eprintln!("  \x1b[90mWithout audio:\x1b[0m   {}", summary.without_audio);
        }
    }

    // Determine report path
    let report_path = match args.output {
        Some(ref output) => output.clone(),
        None => {
            std::fs::create_dir_all(&args.report_dir)
                .with_context(|| format!("creating {}", args.report_dir.display()))?;
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            args.report_dir
                .join(format!("featurescope_report_{}.html", timestamp))
        }
    };

    report::generate(&report_path, &page)
        .with_context(|| format!("writing report {}", report_path.display()))?;
    if !args.quiet {
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", report_path.display());
        if let Some(hint) = playback_hint(&report_path, &analysis) {
            eprintln!("\x1b[90m{}\x1b[0m", hint);
        }
    }

    // Open report
    if !args.no_open {
        if use_gui {
            // In GUI mode, auto-open the report (no prompt)
            let _ = open::that(&report_path);
        } else if !args.quiet {
            // In terminal mode, ask first
            eprint!("\nOpen report in browser? [Y/n] ");
            io::stderr().flush().ok();

            let mut input = String::new();
            if io::stdin().read_line(&mut input).is_ok() {
                let input = input.trim().to_lowercase();
                if input.is_empty() || input == "y" || input == "yes" {
                    if let Err(e) = open::that(&report_path) {
                        eprintln!("Failed to open report: {}", e);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Browsers won't load the player module from a `file://` page, and the page
/// looks for `pkg/` and the audio next to itself.
fn playback_hint(report_path: &Path, analysis: &Path) -> Option<String> {
    let ext = report_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext == "json" {
        return None;
    }
    Some(format!(
        "Charts work offline; for playback run: featurescope serve {}",
        analysis.display()
    ))
}

fn print_panel(panel: &TrackPanel, verbose: bool) {
    let (color, label) = match (panel.duration.source, panel.failed()) {
        (DurationSource::Unknown, _) => ("\x1b[90m", "[no time]"),
        (_, 0) => ("\x1b[32m", "[ok]"),
        _ => ("\x1b[33m", "[partial]"),
    };
    let reset = "\x1b[0m";

    println!(
        "{}{:<10}{} {:>2}/{:<2} charts  {:>6}  {}",
        color,
        label,
        reset,
        panel.drawn(),
        panel.charts.len(),
        duration_text(panel.duration.seconds),
        truncate(&panel.name, 40)
    );

    if verbose {
        for slot in &panel.charts {
            if let Err(ref e) = slot.chart {
                eprintln!("    {}: {}", slot.feature.key, e);
            }
        }
    }
}

fn print_summary(analysis: &Path, config: &Config) -> Result<()> {
    let doc = AnalysisDocument::load(analysis)
        .with_context(|| format!("loading {}", analysis.display()))?;

    for track in &doc.tracks {
        let duration = probe::resolve_duration(track, &config.audio_dir);
        println!(
            "\x1b[1m{}\x1b[0m  {} ({})",
            track.name,
            duration_text(duration.seconds),
            source_label(duration.source)
        );

        for spec in FEATURES {
            match spec.selector.select(track) {
                Ok(data) => {
                    let stats = data.stats();
                    println!(
                        "    {:<20} {:>6} pts  min {:>10}  max {:>10}",
                        spec.key,
                        stats.points,
                        number_text(stats.min),
                        number_text(stats.max)
                    );
                }
                Err(e) => println!("    {:<20} \x1b[90m{}\x1b[0m", spec.key, e),
            }
        }
    }

    let audio = audio_files(&config.audio_dir);
    let named: HashSet<&str> = doc.tracks.iter().map(|t| t.name.as_str()).collect();

    let orphans: Vec<&String> = audio.iter().filter(|n| !named.contains(n.as_str())).collect();
    if !orphans.is_empty() {
        println!("\nAudio without analysis:");
        for name in orphans {
            println!("    {}", name);
        }
    }

    let missing: Vec<&str> = doc
        .tracks
        .iter()
        .map(|t| t.name.as_str())
        .filter(|n| !audio.iter().any(|a| a == n))
        .collect();
    if !missing.is_empty() {
        println!("\nTracks without audio in {}:", config.audio_dir.display());
        for name in missing {
            println!("    {}", name);
        }
    }

    Ok(())
}

/// File names of audio directly inside `dir`, sorted.
fn audio_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

fn source_label(source: DurationSource) -> &'static str {
    match source {
        DurationSource::Probed => "from audio",
        DurationSource::Analysis => "from last timestamp",
        DurationSource::Unknown => "unknown",
    }
}

fn duration_text(seconds: f64) -> String {
    if seconds.is_finite() {
        format_time(seconds)
    } else {
        "-:--".to_string()
    }
}

fn number_text(v: Option<f64>) -> String {
    v.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}

#[cfg(feature = "gui")]
fn pick_analysis_gui() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select analysis document")
        .add_filter("Analysis JSON", &["json"])
        .pick_file()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
