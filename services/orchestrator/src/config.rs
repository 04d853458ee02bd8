use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::backend_http::Endpoints;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub endpoints: Endpoints,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("TSUNAMI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let poll_interval = match lookup("TSUNAMI_POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("TSUNAMI_POLL_INTERVAL_SECS is not a number: {raw:?}"))?;
                if secs == 0 {
                    bail!("TSUNAMI_POLL_INTERVAL_SECS must be at least 1");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_POLL_INTERVAL,
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            calculate: path(&lookup, "TSUNAMI_CALCULATE_PATH", defaults.calculate)?,
            travel_times: path(&lookup, "TSUNAMI_TRAVEL_TIMES_PATH", defaults.travel_times)?,
            run_simulation: path(&lookup, "TSUNAMI_RUN_PATH", defaults.run_simulation)?,
            job_status: path(&lookup, "TSUNAMI_STATUS_PATH", defaults.job_status)?,
        };

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            bail!("TSUNAMI_API_URL must start with http:// or https://");
        }

        Ok(Self {
            api_url,
            poll_interval,
            endpoints,
        })
    }
}

fn path<F>(lookup: &F, key: &str, default: String) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(p) if p.starts_with('/') => Ok(p),
        Some(p) => bail!("{key} must start with '/', got {p:?}"),
        None => Ok(default),
    }
}
