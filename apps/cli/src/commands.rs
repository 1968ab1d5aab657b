//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitepipe_core::pipeline::{
    BuildConfig, BuildResult, CheckResult, LocaleSummary, ProgressReporter, build_site, check_site,
};
use sitepipe_shared::{AppConfig, FallbackPolicy, SourceKind, init_config, load_config};
use sitepipe_source::{ContentSource, ContentfulOptions, ContentfulSource, FileSource};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitepipe: build a bilingual static site from CMS content.
#[derive(Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build per-locale indices, detail pages and a merged sitemap from CMS content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./sitepipe.toml, then ~/.sitepipe/sitepipe.toml).
    #[arg(long, global = true, env = "SITEPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Content source override.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum SourceArg {
    Contentful,
    File,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Contentful => SourceKind::Contentful,
            SourceArg::File => SourceKind::File,
        }
    }
}

/// Options shared by `build` and `check`.
#[derive(clap::Args, Debug)]
pub(crate) struct SourceArgs {
    /// Where content comes from (overrides [source].kind).
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Directory of exported entries for the file source.
    #[arg(long)]
    pub entries_dir: Option<PathBuf>,

    /// Locale fallback policy: strict or fallback-to-primary.
    #[arg(long)]
    pub fallback: Option<FallbackPolicy>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch content and write the site.
    Build {
        /// Output directory (overrides [site].output_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Fetch and validate content without writing anything.
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a sitepipe.toml with defaults.
    Init {
        /// Directory to write into (defaults to the current directory).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitepipe=info",
        1 => "sitepipe=debug",
        _ => "sitepipe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build { out, source } => cmd_build(config_path, out, &source).await,
        Command::Check { source } => cmd_check(config_path, &source).await,
        Command::Config { action } => match action {
            ConfigAction::Init { dir } => cmd_config_init(dir).await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file and apply command-line overrides.
fn resolve_config(
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    args: &SourceArgs,
) -> Result<AppConfig> {
    let mut config = load_config(config_path)?;

    if let Some(out) = out {
        config.site.output_dir = out;
    }
    if let Some(source) = args.source {
        config.source.kind = source.into();
    }
    if let Some(dir) = &args.entries_dir {
        config.source.entries_dir = dir.clone();
    }
    if let Some(policy) = args.fallback {
        config.locales.fallback = policy;
    }

    config.validate()?;
    Ok(config)
}

/// Which source a command runs against.
enum Source {
    Contentful(ContentfulSource),
    File(FileSource),
}

impl Source {
    fn from_config(config: &AppConfig) -> Result<Self> {
        match config.source.kind {
            SourceKind::Contentful => {
                let opts =
                    ContentfulOptions::from_config(&config.source, &config.content.content_type)?;
                Ok(Self::Contentful(ContentfulSource::new(opts)?))
            }
            SourceKind::File => {
                let dir = &config.source.entries_dir;
                if !dir.is_dir() {
                    return Err(eyre!(
                        "entries directory '{}' does not exist",
                        dir.display()
                    ));
                }
                Ok(Self::File(FileSource::new(dir.clone())))
            }
        }
    }
}

async fn cmd_build(config_path: Option<&Path>, out: Option<PathBuf>, args: &SourceArgs) -> Result<()> {
    let config = resolve_config(config_path, out, args)?;
    let build_config = BuildConfig::from_app(&config);

    info!(
        source = ?config.source.kind,
        out = %config.site.output_dir.display(),
        fallback = ?config.locales.fallback,
        "building site"
    );

    let reporter = CliProgress::new();
    let result = match Source::from_config(&config)? {
        Source::Contentful(source) => build_with(&source, &build_config, &reporter).await?,
        Source::File(source) => build_with(&source, &build_config, &reporter).await?,
    };

    print_build_summary(&result, &config);
    Ok(())
}

async fn build_with<S: ContentSource>(
    source: &S,
    config: &BuildConfig,
    reporter: &CliProgress,
) -> Result<BuildResult> {
    match build_site(source, config, reporter).await {
        Ok(result) => Ok(result),
        Err(e) => {
            reporter.finish();
            Err(e.into())
        }
    }
}

async fn cmd_check(config_path: Option<&Path>, args: &SourceArgs) -> Result<()> {
    let config = resolve_config(config_path, None, args)?;
    let build_config = BuildConfig::from_app(&config);

    let reporter = CliProgress::new();
    let result = match Source::from_config(&config)? {
        Source::Contentful(source) => check_site(&source, &build_config, &reporter).await,
        Source::File(source) => check_site(&source, &build_config, &reporter).await,
    };
    reporter.finish();

    print_check_summary(&result?);
    Ok(())
}

fn print_locale_line(summary: &LocaleSummary) {
    println!(
        "  {:<10} {:>4} fetched  {:>4} published  {:>4} rejected  {:>4} not in locale  ({} categories)",
        summary.locale,
        summary.fetched,
        summary.published,
        summary.rejected,
        summary.not_applicable,
        summary.categories
    );
}

fn print_build_summary(result: &BuildResult, config: &AppConfig) {
    println!();
    println!("  Site built successfully!");
    println!("  Build:    {}", result.build_id);
    for summary in &result.per_locale {
        print_locale_line(summary);
    }
    println!("  Pages:    {}", result.pages_written);
    println!(
        "  Sitemap:  {} URLs ({} new, {} refreshed)",
        result.sitemap.total, result.sitemap.added, result.sitemap.refreshed
    );
    println!("  Output:   {}", config.site.output_dir.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn print_check_summary(result: &CheckResult) {
    println!();
    println!("  Check {}", result.build_id);
    for summary in &result.per_locale {
        print_locale_line(summary);
    }
    if result.rejected.is_empty() {
        println!("  No rejected records.");
    } else {
        println!("  Rejected records:");
        for rejected in &result.rejected {
            println!(
                "    [{}] {} (slug '{}'): {}",
                rejected.locale, rejected.entry_id, rejected.slug, rejected.reason
            );
        }
    }
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn locale_done(&self, summary: &LocaleSummary) {
        self.spinner.set_message(format!(
            "{}: {} published, {} rejected",
            summary.locale, summary.published, summary.rejected
        ));
    }

    fn page_written(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {path}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.finish();
    }
}

async fn cmd_config_init(dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| eyre!("cannot determine working directory: {e}"))?,
    };
    let path = init_config(&dir)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
