mod commands;
mod telemetry;

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use specter_config::client::RequestEncoding;
use specter_config::fuzz::FuzzTarget;
use specter_config::{ClientConfig, LogFormat, LogLevel, LoggingConfig};
use specter_graphql::client::ClientError;
use specter_graphql::introspection::IntrospectionError;

#[derive(Debug, Parser)]
#[command(
    name = "specter",
    version,
    about = "GraphQL schema reconnaissance for endpoints with introspection disabled"
)]
pub struct Cli {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover or download a schema.
    #[command(subcommand)]
    Schema(SchemaCommand),
}

#[derive(Debug, Subcommand)]
pub enum SchemaCommand {
    /// Iteratively rebuild the schema from validation errors.
    Fuzz(FuzzArgs),
    /// Send the standard introspection query and save the response.
    Introspect(IntrospectArgs),
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log verbosity: trace, debug, info, warn or error.
    #[arg(long, global = true, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// Log output format.
    #[arg(long, global = true, default_value = "pretty-compact", value_parser = ["pretty-compact", "json"])]
    pub log_format: String,

    /// Raw env-filter directives, overriding --log-level.
    #[arg(long, global = true)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    pub fn logging_config(&self) -> LoggingConfig {
        let level = match self.log_level.as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        };
        let format = match self.log_format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::PrettyCompact,
        };
        LoggingConfig {
            level,
            format,
            filter: self.log_filter.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ClientArgs {
    /// The GraphQL endpoint URL.
    #[arg(long, short = 'u')]
    pub url: String,

    /// Extra header, `Name: value`. May be given multiple times.
    #[arg(long = "header", short = 'H', value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Raw `Cookie` header value.
    #[arg(long, short = 'c')]
    pub cookies: Option<String>,

    /// `Authorization` header value.
    #[arg(long)]
    pub auth: Option<String>,

    /// Proxy URL for all probe traffic.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Reject invalid TLS certificates instead of accepting them.
    #[arg(long)]
    pub strict_tls: bool,

    /// Request encoding: json envelope or raw application/graphql body.
    #[arg(long, default_value = "json", value_parser = ["json", "graphql"])]
    pub content_type: String,
}

impl ClientArgs {
    pub fn to_config(&self) -> Result<ClientConfig, CliError> {
        let mut headers = HashMap::new();
        for header in &self.headers {
            let Some((name, value)) = header.split_once(':') else {
                return Err(CliError::InvalidHeader(header.clone()));
            };
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }

        let mut config = ClientConfig::new(&self.url);
        config.headers = headers;
        config.cookies = self.cookies.clone();
        config.authorization = self.auth.clone();
        config.proxy = self.proxy.clone();
        config.timeout_secs = self.timeout;
        config.accept_invalid_certs = !self.strict_tls;
        config.content_type = match self.content_type.as_str() {
            "graphql" => RequestEncoding::Graphql,
            _ => RequestEncoding::Json,
        };
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct FuzzArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// The fuzzing wordlist, one word per line.
    #[arg(long, short = 'w')]
    pub wordlist: PathBuf,

    /// Path for the resulting introspection JSON.
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Number of concurrent probe workers per job.
    #[arg(long, short = 't', default_value_t = 1)]
    pub threads: usize,

    /// Scopes to fuzz: query, mutation, query.<field> or mutation.<field>.
    #[arg(long = "fuzz", short = 'f', value_name = "TARGET", default_values_t = FuzzTarget::defaults())]
    pub targets: Vec<FuzzTarget>,

    /// A previously saved introspection document to resume from.
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IntrospectArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Path for the introspection response.
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid header {0:?}: expected `Name: value`")]
    InvalidHeader(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
    #[error("failed to encode schema: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryInitError),
}

pub async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    telemetry::init(&cli.log.logging_config())?;

    match cli.command {
        Command::Schema(SchemaCommand::Fuzz(args)) => commands::schema::fuzz(args).await,
        Command::Schema(SchemaCommand::Introspect(args)) => {
            commands::schema::introspect(args).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_full_fuzz_invocation() {
        let cli = Cli::parse_from([
            "specter",
            "schema",
            "fuzz",
            "--url",
            "https://example.com/graphql",
            "--wordlist",
            "words.txt",
            "--output",
            "schema.json",
            "--threads",
            "4",
            "--fuzz",
            "query.search",
            "-H",
            "X-Api-Key: secret",
        ]);

        let Command::Schema(SchemaCommand::Fuzz(args)) = cli.command else {
            panic!("expected fuzz command");
        };
        assert_eq!(args.threads, 4);
        assert_eq!(args.targets.len(), 1);
        assert_eq!(args.targets[0].to_string(), "query.search");

        let config = args.client.to_config().unwrap();
        assert_eq!(config.headers["X-Api-Key"], "secret");
        assert!(config.accept_invalid_certs);
    }
}
