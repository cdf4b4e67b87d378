//! Server Configuration
//!
//! Command-line arguments with environment fallbacks.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

use crate::engine::QueryOptions;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3001;

/// System prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Be helpful and concise, and say so when you do not know something.";

/// Parley relay server - streams model replies to chat clients
#[derive(Parser, Clone, Debug)]
#[command(name = "parley-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(short = 'p', long, env = "PARLEY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "PARLEY_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Ollama host
    #[arg(long, env = "OLLAMA_HOST", default_value = "localhost")]
    pub ollama_host: String,

    /// Ollama port
    #[arg(long, env = "OLLAMA_PORT", default_value_t = 11434)]
    pub ollama_port: u16,

    /// Model to generate with
    #[arg(short = 'm', long, env = "PARLEY_MODEL", default_value = "llama3.2")]
    pub model: String,

    /// System prompt for every query
    #[arg(long, env = "PARLEY_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PARLEY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Address the server listens on
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Options passed to the engine with every query
    #[must_use]
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default().with_system_prompt(self.system_prompt.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_arguments() {
        let config = ServerConfig::try_parse_from([
            "parley-server",
            "--port",
            "4000",
            "--bind",
            "127.0.0.1",
            "--ollama-host",
            "gpu-box",
            "--ollama-port",
            "9999",
            "--model",
            "qwen2.5",
            "--system-prompt",
            "Be terse",
        ])
        .unwrap();

        assert_eq!(config.socket_addr(), "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.ollama_host, "gpu-box");
        assert_eq!(config.ollama_port, 9999);
        assert_eq!(config.model, "qwen2.5");

        let options = config.query_options();
        assert_eq!(options.system_prompt.as_deref(), Some("Be terse"));
        assert!(options.allowed_tools.is_empty());
        assert!(options.streaming_enabled);
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(ServerConfig::try_parse_from(["parley-server", "--port", "http"]).is_err());
    }
}
