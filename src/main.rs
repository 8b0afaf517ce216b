use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use pmc_fetch::config::{find_config_file, load_config, Config};
use pmc_fetch::eutils::EutilsClient;
use pmc_fetch::models::{ArticleIdentifier, IdentifierKind, ResolutionMode, ResolveRequest};
use pmc_fetch::ui::{self, OwoColorize, Status};
use pmc_fetch::utils::HttpClient;
use pmc_fetch::{print_status, Resolver};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// pmc-fetch - Download PubMed Central articles and DOI-resolved PDFs
#[derive(Parser, Debug)]
#[command(name = "pmc-fetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve PMC ids and DOIs to article PDFs and archives", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Directory to write articles into (overrides config)
    #[arg(long, short = 'd', global = true)]
    output_dir: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Resolution mode
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Run every strategy and keep every distinct artifact
    CollectAll,
    /// Stop after the first artifact written
    FirstSuccess,
}

impl From<Mode> for ResolutionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::CollectAll => ResolutionMode::CollectAll,
            Mode::FirstSuccess => ResolutionMode::FirstSuccess,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the archive and PDFs of a PubMed Central article
    Pmc {
        /// PMC id, with or without the PMC prefix
        id: String,

        /// DOI to try when the PMC id yields nothing
        #[arg(long)]
        doi: Option<String>,

        /// Resolution mode (overrides config)
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Print the resolution report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download the PDF behind a DOI or DOI URL
    Doi {
        /// DOI (10.x/y), doi: form, or URL
        doi: String,

        /// Exact output file name, written inside the output directory (no path separators)
        filename: Option<String>,
    },

    /// Show what each strategy finds, without downloading
    #[command(alias = "r")]
    Resolve {
        /// PMC id or DOI
        id: String,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search PMC and download every matching article
    #[command(alias = "s")]
    Search {
        /// Search term
        term: String,

        /// Maximum number of articles
        #[arg(long, short, default_value_t = 20)]
        max_results: usize,

        /// Articles resolved concurrently [default: resolution.batch_jobs]
        #[arg(long, short)]
        jobs: Option<usize>,
    },

    /// Write PubMed XML for an id list or search query
    Pubmed {
        /// Comma-separated PubMed ids, or a search query
        query: String,

        /// Output file
        #[arg(long, short, default_value = "pubmed_ids.xml")]
        output: PathBuf,

        /// Maximum number of records when searching
        #[arg(long, short, default_value_t = 20)]
        max_results: usize,
    },

    /// Print the effective configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("pmc-fetch - Environment Variables");
    println!();
    println!("HTTP:");
    println!("  PMC_FETCH_HTTP__TIMEOUT_SECS          Request timeout in seconds (default: 8)");
    println!("  PMC_FETCH_HTTP__CONNECT_TIMEOUT_SECS  Connect timeout in seconds (default: 5)");
    println!("  PMC_FETCH_HTTP__USER_AGENT            User-Agent header sent with every request");
    println!();
    println!("Downloads:");
    println!("  PMC_FETCH_DOWNLOADS__OUTPUT_DIR        Directory articles are written to (default: .)");
    println!("  PMC_FETCH_DOWNLOADS__MAX_FILE_SIZE_MB  Largest accepted download in MB (default: 100)");
    println!();
    println!("Resolution:");
    println!("  PMC_FETCH_RESOLUTION__MODE        collect-all or first-success (default: collect-all)");
    println!("  PMC_FETCH_RESOLUTION__STRATEGIES  Comma-separated strategy order");
    println!("                                    (default: oa_service,pmc_search,doi_landing)");
    println!("  PMC_FETCH_RESOLUTION__BATCH_JOBS  Articles resolved concurrently in a batch (default: 1)");
    println!();
    println!("Endpoints:");
    println!("  PMC_FETCH_ENDPOINTS__OA_SERVICE    PMC OA service URL");
    println!("  PMC_FETCH_ENDPOINTS__PMC_SEARCH    PMC search page URL");
    println!("  PMC_FETCH_ENDPOINTS__DOI_RESOLVER  DOI resolver base URL");
    println!("  PMC_FETCH_ENDPOINTS__EUTILS        E-utilities base URL");
    println!();
    println!("Proxy (read by the HTTP client):");
    println!("  HTTP_PROXY / HTTPS_PROXY / NO_PROXY");
    println!();
    println!("Other Settings:");
    println!("  PMC_FETCH_LOGGING__LEVEL  Log level when no -v is given (default: warn)");
    println!("  RUST_LOG                  Full tracing filter, overrides everything else");
    println!();
    println!("Example:");
    println!("  export PMC_FETCH_DOWNLOADS__OUTPUT_DIR=\"./articles\"");
    println!("  export PMC_FETCH_RESOLUTION__MODE=\"first-success\"");
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pmc_fetch={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_effective_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().or_else(find_config_file);

    let mut config = load_config(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config from environment".to_string(),
    })?;

    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }
    if let Some(dir) = &cli.output_dir {
        config.downloads.output_dir = dir.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
        return Ok(());
    }

    let config = load_effective_config(&cli)?;
    init_tracing(&cli, &config);

    if let Some(path) = &cli.config {
        tracing::info!("Using config file: {}", path.display());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        std::process::exit(2);
    };

    match command {
        Commands::Pmc {
            id,
            doi,
            mode,
            json,
        } => {
            let mut resolver = Resolver::from_config(&config)?;
            if let Some(mode) = mode {
                resolver = resolver.with_mode(mode.into());
            }

            let mut request = ResolveRequest::new(&id);
            if let Some(doi) = doi {
                request = request.fallback_doi(doi);
            }

            let spinner = (!cli.quiet && !json).then(|| ui::Spinner::new(&format!("Resolving {}", id)));
            let result = resolver.resolve(&request).await;
            if let Some(spinner) = &spinner {
                match &result {
                    Ok(resolution) => spinner.finish_with_success(&format!(
                        "{} → {} file(s)",
                        resolution.identifier,
                        resolution.artifacts.len()
                    )),
                    Err(e) => spinner.finish_with_error(&format!("{}: {}", id, e)),
                }
            }

            let resolution = result?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else if !cli.quiet {
                ui::print_resolution(&resolution);
            }
        }

        Commands::Doi { doi, filename } => {
            let identifier = ArticleIdentifier::parse(&doi)?;
            if identifier.kind() != IdentifierKind::Doi {
                bail!("'{}' is not a DOI or DOI URL", doi);
            }

            let resolver = Resolver::from_config(&config)?;
            let mut request = ResolveRequest::new(&doi);
            if let Some(filename) = filename {
                request = request.file_name(filename);
            }

            let resolution = resolver.resolve(&request).await?;
            if !cli.quiet {
                ui::print_resolution(&resolution);
            }
        }

        Commands::Resolve { id, json } => {
            let resolver = Resolver::from_config(&config)?;
            let reports = resolver.dry_run(&id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                ui::print_section(&format!("Strategies for {}", id));
                ui::print_reports(&reports);
            }
        }

        Commands::Search {
            term,
            max_results,
            jobs,
        } => {
            let client = HttpClient::from_config(&config.http)?;
            let eutils = EutilsClient::new(client, &config.endpoints.eutils);
            let ids = eutils.search_ids("pmc", &term, max_results).await?;

            if ids.is_empty() {
                print_status!(Status::Warning, format!("No PMC articles match \"{}\"", term));
                return Ok(());
            }

            if !cli.quiet {
                print_status!(
                    Status::Search,
                    format!("{} articles for \"{}\"", ids.len().to_string().green(), term.cyan())
                );
            }

            let jobs = jobs.unwrap_or(config.resolution.batch_jobs);
            let resolver = Resolver::from_config(&config)?;
            let progress = ui::create_progress_bar(ids.len() as u64, "Downloading");

            let report = resolver
                .resolve_batch(ids, jobs, |entry| {
                    progress.inc(1);
                    if !cli.quiet && !entry.is_success() {
                        progress.println(&format!(
                            "{} {} {}",
                            ui::status_icon(Status::Error).red(),
                            entry.identifier.yellow(),
                            entry.error.as_deref().unwrap_or_default().dimmed()
                        ));
                    }
                })
                .await;
            progress.finish_and_clear();

            if !cli.quiet {
                for entry in report.entries.iter().filter(|e| e.is_success()) {
                    ui::print_batch_entry(entry);
                }
                ui::print_batch_summary(&report);
            }
        }

        Commands::Pubmed {
            query,
            output,
            max_results,
        } => {
            let client = HttpClient::from_config(&config.http)?;
            let eutils = EutilsClient::new(client, &config.endpoints.eutils);
            let spinner = (!cli.quiet).then(|| ui::Spinner::new("Fetching PubMed records"));
            let export = match eutils.pubmed_export(&query, max_results).await {
                Ok(export) => export,
                Err(e) => {
                    if let Some(spinner) = &spinner {
                        spinner.finish_with_error(&e.to_string());
                    }
                    return Err(e.into());
                }
            };

            if let Some(spinner) = &spinner {
                spinner.set_message(&format!("Writing {}", output.display()));
            }
            std::fs::write(&output, export.xml.as_bytes())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if let Some(spinner) = &spinner {
                spinner.finish_and_clear();
            }

            if !cli.quiet {
                print_status!(
                    Status::Success,
                    format!(
                        "{} records → {} ({})",
                        export.ids.len(),
                        output.display(),
                        ui::format_file_size(export.xml.len() as u64)
                    )
                );
            }
        }

        Commands::Config => {
            if let Some(path) = cli.config.clone().or_else(find_config_file) {
                println!("# Loaded from {}", path.display());
            }
            print!("{}", config.to_toml()?);
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pmc-fetch", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["pmc-fetch"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.timeout.is_none());
        assert!(cli.output_dir.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["pmc-fetch", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["pmc-fetch", "-vv", "config"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["pmc-fetch", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_global_overrides() {
        let cli = Cli::parse_from([
            "pmc-fetch",
            "--timeout",
            "15",
            "-d",
            "/tmp/articles",
            "--config",
            "/path/to/config.toml",
            "config",
        ]);
        assert_eq!(cli.timeout, Some(15));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/articles")));
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_pmc_command() {
        let cli = Cli::parse_from([
            "pmc-fetch",
            "pmc",
            "PMC5334499",
            "--doi",
            "10.1038/srep43",
            "--mode",
            "first-success",
            "--json",
        ]);
        match cli.command {
            Some(Commands::Pmc {
                id,
                doi,
                mode,
                json,
            }) => {
                assert_eq!(id, "PMC5334499");
                assert_eq!(doi.as_deref(), Some("10.1038/srep43"));
                assert_eq!(mode, Some(Mode::FirstSuccess));
                assert!(json);
            }
            _ => panic!("Expected Pmc command"),
        }
    }

    #[test]
    fn test_cli_doi_command_with_filename() {
        let cli = Cli::parse_from(["pmc-fetch", "doi", "https://doi.org/10.1/x", "out.pdf"]);
        match cli.command {
            Some(Commands::Doi { doi, filename }) => {
                assert_eq!(doi, "https://doi.org/10.1/x");
                assert_eq!(filename.as_deref(), Some("out.pdf"));
            }
            _ => panic!("Expected Doi command"),
        }
    }

    #[test]
    fn test_cli_search_defaults() {
        let cli = Cli::parse_from(["pmc-fetch", "search", "BRCA1"]);
        match cli.command {
            Some(Commands::Search {
                term,
                max_results,
                jobs,
            }) => {
                assert_eq!(term, "BRCA1");
                assert_eq!(max_results, 20);
                assert_eq!(jobs, None);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_explicit_single_job() {
        let cli = Cli::parse_from(["pmc-fetch", "search", "BRCA1", "-j", "1"]);
        match cli.command {
            Some(Commands::Search { jobs, .. }) => assert_eq!(jobs, Some(1)),
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_pubmed_defaults() {
        let cli = Cli::parse_from(["pmc-fetch", "pubmed", "1,2,3"]);
        match cli.command {
            Some(Commands::Pubmed { query, output, .. }) => {
                assert_eq!(query, "1,2,3");
                assert_eq!(output, PathBuf::from("pubmed_ids.xml"));
            }
            _ => panic!("Expected Pubmed command"),
        }
    }

    #[test]
    fn test_cli_missing_argument_is_error() {
        assert!(Cli::try_parse_from(["pmc-fetch", "pmc"]).is_err());
        assert!(Cli::try_parse_from(["pmc-fetch", "pmc", "1", "--mode", "sometimes"]).is_err());
    }

    #[test]
    fn test_mode_conversion() {
        assert_eq!(ResolutionMode::from(Mode::CollectAll), ResolutionMode::CollectAll);
        assert_eq!(ResolutionMode::from(Mode::FirstSuccess), ResolutionMode::FirstSuccess);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
