//! Command-line interface for the archgraph utility
//!
//! Validates, merges, queries and renders architecture graph YAML files.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::tty::IsTty;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use archgraph::core::logging::init_logging;
use archgraph::load;
use archgraph::mermaid::{self, MermaidSettings};
use archgraph::query;
use archgraph::Graph;

/// Archgraph - architecture graphs as YAML, rendered with Mermaid
#[derive(Parser)]
#[command(name = "archgraph")]
#[command(about = "Validate, merge, query and diagram architecture graph YAML files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// Output format for query results
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a graph file for structural problems
    ValidateConfig {
        /// Graph YAML file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Check that a query file is well-formed
    ValidateQuery {
        /// Query YAML file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Check that a diagram settings file is well-formed
    ValidateMermaid {
        /// Mermaid settings YAML file (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Merge every graph file in a directory into one graph
    MergeConfig {
        /// Directory containing .yaml/.yml graph files
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the merged graph (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Filter a graph with a query
    ExecuteQuery {
        /// Graph YAML file (use - for stdin)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Query YAML file
        #[arg(short, long)]
        query: PathBuf,

        /// Output file for the filtered graph (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Render a graph as a Mermaid flowchart
    GenerateMermaid {
        /// Graph YAML file (use - for stdin)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Mermaid settings YAML file; defaults apply when omitted
        #[arg(short, long)]
        mermaid: Option<PathBuf>,

        /// Output file for the diagram (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Main CLI application
#[derive(Default)]
pub struct ArchgraphApp;

impl ArchgraphApp {
    /// Create a new application instance
    pub fn new() -> Self {
        Self
    }

    /// Run the application with the given CLI arguments
    pub fn run(&self, cli: Cli) -> Result<()> {
        let level = cli
            .log_level
            .map(|level| level.as_str())
            .or(if cli.verbose { Some("debug") } else { None });
        if let Err(e) = init_logging(level, cli.log_format.map(|format| format.as_str())) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("archgraph v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::ValidateConfig { input } => self.validate_config_command(input),
            Commands::ValidateQuery { input } => self.validate_query_command(input),
            Commands::ValidateMermaid { input } => self.validate_mermaid_command(input),
            Commands::MergeConfig { input, output } => self.merge_config_command(&input, output),
            Commands::ExecuteQuery {
                config,
                query,
                output,
                format,
            } => self.execute_query_command(config, &query, output, format),
            Commands::GenerateMermaid {
                config,
                mermaid,
                output,
            } => self.generate_mermaid_command(config, mermaid, output),
        }
    }

    fn load_valid_graph(&self, input: Option<PathBuf>) -> Result<Graph> {
        let content = self.read_input(input)?;
        let graph = load::parse_graph(&content).context("error parsing graph")?;
        graph.validate().context("error validating graph")?;
        Ok(graph)
    }

    /// Handle the validate-config command
    fn validate_config_command(&self, input: Option<PathBuf>) -> Result<()> {
        let graph = self.load_valid_graph(input)?;
        println!(
            "✓ Valid graph ({} nodes, {} links)",
            graph.node_count(),
            graph.link_count()
        );
        Ok(())
    }

    /// Handle the validate-query command
    fn validate_query_command(&self, input: Option<PathBuf>) -> Result<()> {
        let content = self.read_input(input)?;
        let query = load::parse_query(&content).context("error parsing query")?;
        query.validate().context("error validating query")?;
        println!("✓ Valid query");
        Ok(())
    }

    /// Handle the validate-mermaid command
    fn validate_mermaid_command(&self, input: Option<PathBuf>) -> Result<()> {
        let content = self.read_input(input)?;
        let settings = load::parse_settings(&content).context("error parsing mermaid settings")?;
        settings
            .validate()
            .context("error validating mermaid settings")?;
        println!("✓ Valid mermaid settings");
        Ok(())
    }

    /// Handle the merge-config command
    fn merge_config_command(&self, input: &Path, output: Option<PathBuf>) -> Result<()> {
        let graph = load::load_folder(input).context("error loading folder")?;
        graph.validate().context("error validating graph")?;
        info!(node_count = graph.node_count(), "Merged graph is valid");
        self.write_output(output, &graph.to_yaml()?)
    }

    /// Handle the execute-query command
    fn execute_query_command(
        &self,
        config: Option<PathBuf>,
        query_path: &Path,
        output: Option<PathBuf>,
        format: OutputFormat,
    ) -> Result<()> {
        let graph = self.load_valid_graph(config)?;
        let query = load::load_query(query_path).context("error loading query")?;
        query.validate().context("error validating query")?;

        let result = query::execute(&query, &graph).context("error executing query")?;
        let rendered = match format {
            OutputFormat::Yaml => result.to_yaml()?,
            OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        };
        self.write_output(output, &rendered)
    }

    /// Handle the generate-mermaid command
    fn generate_mermaid_command(
        &self,
        config: Option<PathBuf>,
        mermaid_path: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let graph = self.load_valid_graph(config)?;
        let settings = match mermaid_path {
            Some(path) => load::load_settings(&path).context("error loading mermaid settings")?,
            None => MermaidSettings::default(),
        };
        debug!(direction = %settings.direction, "Loaded diagram settings");

        let diagram =
            mermaid::render(&graph, &settings).context("error generating Mermaid diagram")?;
        self.write_output(output, &diagram)
    }

    /// Read input from file or stdin
    ///
    /// Stdin is only read when it is not a terminal.
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let stdin = io::stdin();
                if stdin.is_tty() {
                    bail!("No input provided via stdin");
                }
                let mut content = String::new();
                stdin.lock().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let stdout_content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", stdout_content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    const GRAPH: &str = "\
nodes:
  - id: platform
    type: System
  - id: api
    type: Microservice
    parent: platform
links:
  - source: api
    target: platform
    type: reports
";

    #[test]
    fn test_cli_parsing_execute_query_command() {
        let args = vec![
            "archgraph",
            "execute-query",
            "--config",
            "config.yaml",
            "--query",
            "query.yaml",
            "--format",
            "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::ExecuteQuery {
                config,
                query,
                output,
                format,
            } => {
                assert_eq!(config.unwrap().to_string_lossy(), "config.yaml");
                assert_eq!(query.to_string_lossy(), "query.yaml");
                assert!(output.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("Expected ExecuteQuery command"),
        }
    }

    #[test]
    fn test_cli_parsing_query_is_required() {
        let args = vec!["archgraph", "execute-query", "--config", "config.yaml"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parsing_generate_mermaid_command() {
        let args = vec!["archgraph", "generate-mermaid", "-c", "c.yaml", "-m", "m.yaml"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::GenerateMermaid {
                config, mermaid, ..
            } => {
                assert_eq!(config.unwrap().to_string_lossy(), "c.yaml");
                assert_eq!(mermaid.unwrap().to_string_lossy(), "m.yaml");
            }
            _ => panic!("Expected GenerateMermaid command"),
        }
    }

    #[test]
    fn test_cli_parsing_merge_config_command() {
        let args = vec!["archgraph", "merge-config", "--input", "arch/"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(cli.command, Commands::MergeConfig { .. }));
    }

    #[test]
    fn test_global_flags() {
        let args = vec![
            "archgraph",
            "validate-config",
            "--verbose",
            "--log-level",
            "trace",
            "--log-format",
            "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_read_input_from_file() {
        let app = ArchgraphApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        fs::write(&file_path, GRAPH).unwrap();

        let content = app.read_input(Some(file_path)).unwrap();
        assert_eq!(content, GRAPH);
    }

    #[test]
    fn test_read_input_missing_file() {
        let app = ArchgraphApp::new();
        let err = app
            .read_input(Some(PathBuf::from("/no/such/config.yaml")))
            .unwrap_err();
        assert!(err.to_string().contains("/no/such/config.yaml"));
    }

    #[test]
    fn test_write_output_to_file() {
        let app = ArchgraphApp::new();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("out.mmd");

        app.write_output(Some(file_path.clone()), "flowchart TD\n")
            .unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "flowchart TD\n");
    }

    #[test]
    fn test_execute_query_command_writes_json() {
        let app = ArchgraphApp::new();
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        let query = dir.path().join("query.yaml");
        let output = dir.path().join("result.json");
        fs::write(&config, GRAPH).unwrap();
        fs::write(
            &query,
            "nodes:\n  filters:\n    - condition:\n        field: type\n        operator: equals\n        value: Microservice\n",
        )
        .unwrap();

        app.execute_query_command(Some(config), &query, Some(output.clone()), OutputFormat::Json)
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["nodes"][0]["id"], "api");
        assert!(json["nodes"][0].get("parent").is_none());
        assert_eq!(json["links"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_generate_mermaid_command_defaults() {
        let app = ArchgraphApp::new();
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        let output = dir.path().join("diagram.mmd");
        fs::write(&config, GRAPH).unwrap();

        app.generate_mermaid_command(Some(config), None, Some(output.clone()))
            .unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "flowchart TD\n    %% Nodes\n    api\n    platform\n\n    %% Links\n    api -->|reports| platform\n"
        );
    }

    #[test]
    fn test_merge_config_command_rejects_duplicates() {
        let app = ArchgraphApp::new();
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), GRAPH).unwrap();
        fs::write(dir.path().join("b.yml"), "nodes:\n  - id: api\n    type: Worker\n").unwrap();

        let err = app
            .merge_config_command(dir.path(), Some(dir.path().join("merged.yaml")))
            .unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "error loading folder: duplicate node ID 'api' found"
        );
    }

    #[test]
    fn test_validate_config_command_reports_chain() {
        let app = ArchgraphApp::new();
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        fs::write(&config, "nodes:\n  - id: a\n    type: T\n    parent: ghost\n").unwrap();

        let err = app.validate_config_command(Some(config)).unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "error validating graph: node 'a' has non-existent parent 'ghost'"
        );
    }
}
