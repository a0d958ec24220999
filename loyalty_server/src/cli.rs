use clap::Parser;
use log::*;
use loyalty_common::Secret;

use crate::config::ServerConfig;

/// Command-line flags. Each one overrides the matching environment variable.
#[derive(Parser, Debug, Default)]
#[command(version, about = "Loyalty points accrual service")]
pub struct Arguments {
    /// Address to bind the HTTP server to, e.g. `127.0.0.1:8080` [env: RUN_ADDRESS]
    #[arg(short = 'a', long = "address")]
    pub run_address: Option<String>,
    /// Base URL of the accrual service [env: ACCRUAL_SYSTEM_ADDRESS]
    #[arg(short = 'r', long = "accrual")]
    pub accrual_address: Option<String>,
    /// SQLite database URL. Leave unset to keep everything in memory [env: DATABASE_URI]
    #[arg(short = 'd', long = "database")]
    pub database_uri: Option<String>,
    /// Secret for password hashes and access tokens [env: HASH_SECRET]
    #[arg(short = 'k', long = "key")]
    pub hash_secret: Option<String>,
}

impl Arguments {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(address) = self.run_address {
            debug!("🪛️ Run address {address} set on the command line");
            config.run_address = address;
        }
        if let Some(address) = self.accrual_address {
            debug!("🪛️ Accrual service address {address} set on the command line");
            config.accrual_address = address;
        }
        if let Some(uri) = self.database_uri.filter(|s| !s.is_empty()) {
            config.database_uri = Some(uri);
        }
        if let Some(secret) = self.hash_secret.filter(|s| !s.is_empty()) {
            config.hash_secret = Secret::new(secret);
        }
        config
    }
}
