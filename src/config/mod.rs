// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the dashboard state service
//!
//! Loads and parses configuration from environment variables.

use std::time::Duration;


/// Default configuration values
pub mod defaults {
    pub const SERVER_ADDR: &str = "0.0.0.0:9191";
    pub const API_URL: &str = "http://127.0.0.1:6010";
    pub const POLL_INTERVAL_SECS: u64 = 10;
    pub const CACHE_TTL_MS: u64 = 5_000;
    pub const ABSENT_TTL_SECS: u64 = 60;
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const SERVER_ADDR: &str = "SERVER_ADDR";
    pub const API_URL: &str = "CUBEOS_API_URL";
    pub const API_TOKEN: &str = "CUBEOS_API_TOKEN";
    pub const POLL_INTERVAL: &str = "POLL_INTERVAL_SECONDS";
    pub const CACHE_TTL: &str = "CACHE_TTL_MS";
    pub const ABSENT_TTL: &str = "ABSENT_TTL_SECONDS";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECONDS";
}

/// Freshness and suppression windows shared by every resource cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub absent_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(defaults::CACHE_TTL_MS),
            absent_ttl: Duration::from_secs(defaults::ABSENT_TTL_SECS),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub api_url: String,
    pub api_token: Option<String>,
    pub poll_interval_secs: u64,
    pub cache: CachePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: defaults::SERVER_ADDR.to_string(),
            api_url: defaults::API_URL.to_string(),
            api_token: None,
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
            cache: CachePolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let server_addr = std::env::var(env_vars::SERVER_ADDR)
            .unwrap_or_else(|_| defaults::SERVER_ADDR.to_string());

        let api_url = std::env::var(env_vars::API_URL).unwrap_or_else(|_| {
            tracing::warn!(
                "{} not set, using {}",
                env_vars::API_URL,
                defaults::API_URL
            );
            defaults::API_URL.to_string()
        });

        let api_token = std::env::var(env_vars::API_TOKEN)
            .ok()
            .filter(|token| !token.trim().is_empty());

        let config = Config {
            server_addr,
            api_url,
            api_token,
            poll_interval_secs: env_u64(env_vars::POLL_INTERVAL, defaults::POLL_INTERVAL_SECS),
            cache: CachePolicy {
                ttl: Duration::from_millis(env_u64(env_vars::CACHE_TTL, defaults::CACHE_TTL_MS)),
                absent_ttl: Duration::from_secs(env_u64(
                    env_vars::ABSENT_TTL,
                    defaults::ABSENT_TTL_SECS,
                )),
                request_timeout: Duration::from_secs(env_u64(
                    env_vars::REQUEST_TIMEOUT,
                    defaults::REQUEST_TIMEOUT_SECS,
                )),
            },
        };

        if let Err(e) = config.validate() {
            tracing::error!("Invalid configuration: {}", e);
            tracing::warn!("Falling back to defaults for invalid values");
            return config.sanitized();
        }

        config
    }

    /// Validates configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(format!(
                "Invalid API URL '{}': expected http:// or https://",
                self.api_url
            ));
        }

        if !self.server_addr.contains(':') {
            return Err(format!(
                "Invalid server address '{}': expected 'host:port'",
                self.server_addr
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err("Poll interval must be at least 1 second".to_string());
        }

        if self.cache.request_timeout.is_zero() {
            return Err("Request timeout must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Replaces every invalid field with its default
    fn sanitized(self) -> Self {
        let fallback = Config::default();
        let api_url =
            if self.api_url.starts_with("http://") || self.api_url.starts_with("https://") {
                self.api_url
            } else {
                fallback.api_url
            };
        let server_addr = if self.server_addr.contains(':') {
            self.server_addr
        } else {
            fallback.server_addr
        };
        let poll_interval_secs = if self.poll_interval_secs == 0 {
            fallback.poll_interval_secs
        } else {
            self.poll_interval_secs
        };
        let request_timeout = if self.cache.request_timeout.is_zero() {
            fallback.cache.request_timeout
        } else {
            self.cache.request_timeout
        };

        Config {
            server_addr,
            api_url,
            api_token: self.api_token,
            poll_interval_secs,
            cache: CachePolicy {
                request_timeout,
                ..self.cache
            },
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<u64>().unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}='{}': {}. Using {}", name, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}
