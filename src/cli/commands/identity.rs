//! Provider connection and device storage arguments, shared by every
//! subcommand.

use crate::auth::{client::DEFAULT_AUTH_URL, types::DEFAULT_REDIRECT_URL};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::path::PathBuf;

pub const ARG_API_KEY: &str = "api-key";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_REDIRECT_URL: &str = "redirect-url";
pub const ARG_STATE_DIR: &str = "state-dir";

pub const DEFAULT_STATE_DIR: &str = ".magiclink";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Identity provider web API key")
                .env("MAGICLINK_API_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Identity provider base URL")
                .env("MAGICLINK_AUTH_URL")
                .default_value(DEFAULT_AUTH_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URL)
                .long(ARG_REDIRECT_URL)
                .help("URL the emailed link redirects to; the provider appends the sign-in code")
                .env("MAGICLINK_REDIRECT_URL")
                .default_value(DEFAULT_REDIRECT_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long(ARG_STATE_DIR)
                .help("Directory for device-local state (pending sign-in, cached session)")
                .env("MAGICLINK_STATE_DIR")
                .default_value(DEFAULT_STATE_DIR)
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub api_key: SecretString,
    pub auth_url: String,
    pub redirect_url: String,
    pub state_dir: PathBuf,
}

impl Options {
    /// # Errors
    /// Returns an error if the API key is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_key = matches
            .get_one::<String>(ARG_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .context("missing required argument: --api-key")?;

        let auth_url = matches
            .get_one::<String>(ARG_AUTH_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());

        let redirect_url = matches
            .get_one::<String>(ARG_REDIRECT_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string());

        let state_dir = matches
            .get_one::<PathBuf>(ARG_STATE_DIR)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        Ok(Self {
            api_key: SecretString::from(api_key),
            auth_url,
            redirect_url,
            state_dir,
        })
    }
}
