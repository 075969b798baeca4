//! Configuration module for the telnet shell server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::error::ConfigError;
use crate::session::{
    SessionConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_ARGS, DEFAULT_PROMPT, DEFAULT_WELCOME,
};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the shell server
#[derive(Parser, Debug)]
#[command(name = "telnet-shell")]
#[command(author = "telnet-shell authors")]
#[command(version = "0.1.0")]
#[command(about = "A minimal telnet command shell server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:2323)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Maximum number of concurrent sessions
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Receive buffer size per session, which bounds the line length
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Maximum number of arguments parsed from one line
    #[arg(long)]
    pub max_args: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionToml,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of worker threads
    pub workers: Option<usize>,
    /// Maximum number of concurrent sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Session-related configuration
#[derive(Debug, Deserialize)]
pub struct SessionToml {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_max_args")]
    pub max_args: usize,
    #[serde(default = "default_welcome")]
    pub welcome: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl Default for SessionToml {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            max_args: default_max_args(),
            welcome: default_welcome(),
            prompt: default_prompt(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:2323".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_max_args() -> usize {
    DEFAULT_MAX_ARGS
}

fn default_welcome() -> String {
    DEFAULT_WELCOME.to_string()
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub workers: Option<usize>,
    pub max_connections: usize,
    pub session: SessionConfig,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref path) = cli.config {
            let contents =
                std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
                    path: path.clone(),
                    source,
                })?;
            toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
                path: path.clone(),
                source,
            })?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let config = Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            workers: cli.workers.or(toml_config.server.workers),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            session: SessionConfig {
                buffer_size: cli.buffer_size.unwrap_or(toml_config.session.buffer_size),
                max_args: cli.max_args.unwrap_or(toml_config.session.max_args),
                welcome: toml_config.session.welcome,
                prompt: toml_config.session.prompt,
            },
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "buffer_size",
                reason: "must be greater than zero",
            });
        }
        if self.session.max_args == 0 {
            return Err(ConfigError::Invalid {
                field: "max_args",
                reason: "must be greater than zero",
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "max_connections",
                reason: "must be greater than zero",
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("telnet-shell").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:2323");
        assert_eq!(config.server.max_connections, 1024);
        assert_eq!(config.session.buffer_size, 1024);
        assert_eq!(config.session.max_args, 32);
        assert_eq!(config.session.prompt, "SHELL> ");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:2424"
            workers = 4

            [session]
            buffer_size = 4096
            max_args = 8
            prompt = "> "

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:2424");
        assert_eq!(config.server.workers, Some(4));
        assert_eq!(config.server.max_connections, 1024);
        assert_eq!(config.session.buffer_size, 4096);
        assert_eq!(config.session.max_args, 8);
        assert_eq!(config.session.prompt, "> ");
        assert_eq!(config.session.welcome, "Welcome to telnet server\r\n");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:2424"

            [session]
            max_args = 8

            [logging]
            level = "warn"
        "#,
        )
        .unwrap();

        let config = Config::merge(
            cli(&["--listen", "127.0.0.1:9000", "--max-args", "4"]),
            toml_config,
        )
        .unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.session.max_args, 4);
        assert_eq!(config.session.buffer_size, 1024);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let result = Config::merge(cli(&["--buffer-size", "0"]), TomlConfig::default());
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "buffer_size",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_cli(cli(&["--config", "/nonexistent/telnet-shell.toml"]));
        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }
}
