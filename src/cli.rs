//! Command-line interface parsing for the PhraseApp CLI
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the credentials and cache settings the client is built from.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::cache::{CacheConfig, DEFAULT_CACHE_SIZE_MAX};
use crate::client::{Credentials, LocaleDownloadParams};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// A zero cache size would clear the cache on every write
    #[error("Invalid cache size: '{0}'. The cache size must be greater than zero")]
    InvalidCacheSize(u64),
}

/// PhraseApp CLI - Query projects and download locales
#[derive(Parser, Debug)]
#[command(name = "phraseapp")]
#[command(about = "PhraseApp API client with an on-disk response cache")]
#[command(version)]
pub struct Cli {
    /// Access token used for authentication
    #[arg(long, env = "PHRASEAPP_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Username used for basic authentication
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Password used together with --username
    #[arg(long, env = "PHRASEAPP_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// One-time password for accounts with two-factor authentication
    #[arg(long, global = true)]
    pub otp: Option<String>,

    /// API host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Print debug logs to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Cache GET responses on disk and revalidate them with ETags
    #[arg(long, global = true)]
    pub cache: bool,

    /// Directory for the response cache (implies --cache)
    #[arg(long, value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Cache size in bytes above which the whole cache is cleared (implies --cache)
    #[arg(long, value_name = "BYTES", global = true)]
    pub cache_size_max: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Project commands
    Projects {
        #[command(subcommand)]
        action: ProjectsCommand,
    },
    /// Commands on the locales of a project
    Locales {
        #[command(subcommand)]
        action: LocalesCommand,
    },
    /// Commands on a single locale
    Locale {
        #[command(subcommand)]
        action: LocaleCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProjectsCommand {
    /// List all projects the current user has access to
    List {
        #[command(flatten)]
        pagination: Pagination,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LocalesCommand {
    /// List all locales for the given project
    List {
        project_id: String,
        #[command(flatten)]
        pagination: Pagination,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LocaleCommand {
    /// Get details on a single locale
    Show { project_id: String, locale_id: String },
    /// Download a locale in a specific file format
    Download {
        project_id: String,
        locale_id: String,
        /// File format name (e.g. yml, json, strings)
        #[arg(long)]
        file_format: Option<String>,
        /// Limit the download to keys tagged with this tag
        #[arg(long)]
        tag: Option<String>,
        /// Leave out unverified translations
        #[arg(long)]
        skip_unverified_translations: bool,
    },
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 25)]
    pub per_page: u32,
}

impl LocaleCommand {
    /// Download options for `locale download`
    pub fn download_params(&self) -> Option<LocaleDownloadParams> {
        match self {
            LocaleCommand::Download {
                file_format,
                tag,
                skip_unverified_translations,
                ..
            } => Some(LocaleDownloadParams {
                file_format: file_format.clone(),
                tag: tag.clone(),
                skip_unverified_translations: *skip_unverified_translations,
                ..Default::default()
            }),
            LocaleCommand::Show { .. } => None,
        }
    }
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupConfig {
    pub credentials: Credentials,
    /// Response cache settings; `None` disables caching
    pub cache: Option<CacheConfig>,
    pub debug: bool,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if the cache size is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let credentials = Credentials {
            token: cli.token.clone(),
            username: cli.username.clone(),
            password: cli.password.clone(),
            otp: cli.otp.clone(),
            host: cli.host.clone(),
        };

        if let Some(0) = cli.cache_size_max {
            return Err(CliError::InvalidCacheSize(0));
        }

        let caching = cli.cache || cli.cache_dir.is_some() || cli.cache_size_max.is_some();
        let cache = caching.then(|| CacheConfig {
            cache_dir: cli.cache_dir.clone(),
            cache_size_max: cli.cache_size_max.unwrap_or(DEFAULT_CACHE_SIZE_MAX),
        });

        Ok(StartupConfig {
            credentials,
            cache,
            debug: cli.debug,
        })
    }
}
