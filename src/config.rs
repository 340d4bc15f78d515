//! Server configuration from command-line arguments.

use crate::handler::DEFAULT_MAX_BODY_SIZE;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use thiserror::Error;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Largest accepted request body in bytes
    pub max_body_size: usize,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_filter: "info".to_string(),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve(Config),
    Help,
    Version,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid port number: {0:?}")]
    InvalidPort(String),

    #[error("invalid size: {0:?}")]
    InvalidSize(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

impl Config {
    /// Parses command-line arguments, excluding the program name.
    pub fn from_args<I>(args: I) -> Result<Command, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
            };

            match arg.as_str() {
                "--host" | "-h" => config.host = value(&arg)?,
                "--port" | "-p" => {
                    let port = value(&arg)?;
                    config.port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
                }
                "--max-body" => {
                    let size = value(&arg)?;
                    config.max_body_size =
                        size.parse().map_err(|_| ConfigError::InvalidSize(size))?;
                }
                "--log" | "-l" => config.log_filter = value(&arg)?,
                "--help" => return Ok(Command::Help),
                "--version" | "-v" => return Ok(Command::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(Command::Serve(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn help_text() -> String {
    format!(
        r#"
restkv - An in-memory key-value store served over HTTP

USAGE:
    restkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: {host})
    -p, --port <PORT>        Port to listen on (default: {port})
        --max-body <BYTES>   Largest accepted request body (default: {max_body})
    -l, --log <FILTER>       Log filter when RUST_LOG is unset (default: info)
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    restkv                         # Start on {host}:{port}
    restkv --port 9090             # Start on port 9090
    restkv --log restkv=debug      # Log every request

USAGE OVER HTTP:
    $ curl -X PUT --data-binary newvalue localhost:{port}/name
    $ curl localhost:{port}/name
    newvalue
    $ curl -X DELETE localhost:{port}/name
"#,
        host = DEFAULT_HOST,
        port = DEFAULT_PORT,
        max_body = DEFAULT_MAX_BODY_SIZE,
    )
}
