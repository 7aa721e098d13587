//! Command line and environment configuration.

use std::net::SocketAddr;

use clap::Parser;

/// Runtime configuration, read from flags with environment fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(name = "ecoponto-server")]
#[command(about = "HTTP API for browsing and registering waste collection points")]
pub(crate) struct Config {
    /// Address the HTTP listener binds to.
    #[arg(long, env = "ECOPONTO_BIND", default_value = "0.0.0.0:3333")]
    pub bind: SocketAddr,

    /// `SQLite` database URL; the file is created when missing.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://ecoponto.db?mode=rwc")]
    pub database_url: String,

    /// Prefix prepended to stored image references to form absolute URLs.
    #[arg(
        long,
        env = "ECOPONTO_ASSET_BASE_URL",
        default_value = "http://localhost:3333/uploads/"
    )]
    pub asset_base_url: String,

    /// Upper bound on pooled database connections.
    #[arg(long, env = "ECOPONTO_DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "ecoponto-server",
            "--bind",
            "127.0.0.1:8080",
            "--asset-base-url",
            "https://cdn.example.com/",
        ])
        .expect("parsed");
        assert_eq!(config.bind.port(), 8080, "bind port");
        assert_eq!(config.asset_base_url, "https://cdn.example.com/", "asset base");
    }
}
