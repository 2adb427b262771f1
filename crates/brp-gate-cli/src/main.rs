// crates/brp-gate-cli/src/main.rs
// ============================================================================
// Module: BRP Gate CLI Entry Point
// Description: Command dispatcher for the `brp-gate` binary.
// Purpose: Run the gateway, check configuration, and mint tokenization keys.
// Dependencies: clap, brp-gate-config, brp-gate-core, brp-gate-server, rand
// ============================================================================

//! ## Overview
//! `brp-gate serve` starts the BRP gateway from a TOML config file.
//! `brp-gate config validate` loads the same config together with the field
//! catalog, tokenization keys and verification keys without binding a socket.
//! `brp-gate keys generate` prints fresh tokenization keys for rotation.
//! Security posture: config and key material are operator input and are
//! validated before use; see `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use brp_gate_cli::i18n::Locale;
use brp_gate_cli::i18n::set_locale;
use brp_gate_cli::t;
use brp_gate_config::GatewayConfig;
use brp_gate_config::build_endpoints;
use brp_gate_core::runtime::KEY_LENGTH;
use brp_gate_core::runtime::encode_key;
use brp_gate_server::GatewayServer;
use brp_gate_server::HaalCentraalClient;
use brp_gate_server::JwtVerifier;
use brp_gate_server::init_logging;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "BRP_GATE_LANG";
/// Upper bound for `keys generate --count`.
const MAX_GENERATED_KEYS: usize = 16;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "brp-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `BRP_GATE_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the BRP gateway.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Tokenization key utilities.
    Keys {
        /// Selected keys subcommand.
        #[command(subcommand)]
        command: KeysCommand,
    },
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config file path (defaults to `BRP_GATE_CONFIG` or `brp-gate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and check a config file without starting the gateway.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `BRP_GATE_CONFIG` or `brp-gate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Keys subcommands.
#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Print new random tokenization keys.
    Generate(KeysGenerateCommand),
}

/// Arguments for `keys generate`.
#[derive(Args, Debug)]
struct KeysGenerateCommand {
    /// Number of keys to print.
    #[arg(long, default_value_t = 1, value_name = "N")]
    count: usize,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Dutch.
    Nl,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Nl => Self::Nl,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
        Commands::Keys {
            command: KeysCommand::Generate(command),
        } => command_keys_generate(&command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = GatewayConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("serve.config.load_failed", error = err)))?;
    init_logging(&config.logging)
        .map_err(|err| CliError::new(t!("serve.logging_failed", error = err)))?;
    let server = GatewayServer::from_config(&config)
        .map_err(|err| CliError::new(t!("serve.init_failed", error = err)))?;
    server.serve().await.map_err(|err| CliError::new(t!("serve.failed", error = err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let lines = validate_config(command.config.as_deref())?;
    for line in lines {
        write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Loads everything `serve` would load and returns a summary of it.
fn validate_config(path: Option<&Path>) -> CliResult<Vec<String>> {
    let config = GatewayConfig::load(path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let addr = config
        .server
        .bind_addr()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let endpoints = build_endpoints(&config)
        .map_err(|err| CliError::new(t!("config.catalog_failed", error = err)))?;
    let cipher = config
        .tokenization
        .build_cipher()
        .map_err(|err| CliError::new(t!("config.keys_failed", error = err)))?;
    JwtVerifier::from_config(&config.auth)
        .map_err(|err| CliError::new(t!("config.auth_failed", error = err)))?;
    HaalCentraalClient::from_config(&config.upstream)
        .map_err(|err| CliError::new(t!("config.upstream_failed", error = err)))?;

    let mut lines = vec![t!("config.validate.ok"), t!("config.validate.bind", addr = addr)];
    for endpoint in &endpoints {
        lines.push(t!(
            "config.validate.endpoint",
            path = endpoint.public_path,
            upstream = endpoint.upstream_url,
            variants = endpoint.variants.len()
        ));
    }
    lines.push(t!("config.validate.keys", count = cipher.key_count()));
    if !config.audit.enabled {
        lines.push(t!("config.validate.audit_disabled"));
    }
    Ok(lines)
}

// ============================================================================
// SECTION: Keys Commands
// ============================================================================

/// Executes `keys generate`.
fn command_keys_generate(command: &KeysGenerateCommand) -> CliResult<ExitCode> {
    for key in generate_keys(command.count)? {
        write_stdout_line(&key).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Returns `count` encoded random tokenization keys.
fn generate_keys(count: usize) -> CliResult<Vec<String>> {
    if count == 0 || count > MAX_GENERATED_KEYS {
        return Err(CliError::new(t!("keys.count_invalid", max = MAX_GENERATED_KEYS)));
    }
    let mut keys = Vec::with_capacity(count);
    for _ in 0 .. count {
        let mut key = [0_u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        keys.push(encode_key(&key));
    }
    Ok(keys)
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
