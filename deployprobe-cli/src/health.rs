//! Production health check against the public endpoints
//!
//! Runs from the operator machine, not through ssh. Endpoints are checked one
//! at a time.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use deployprobe_common::{ProberConfig, PublicEndpoint};
use reqwest::Client;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};

use crate::render::{self, OutputFormat};
use crate::Verdict;

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// Request timeout in seconds (default from config)
    #[arg(short, long)]
    pub timeout: Option<u64>,
    /// Output format (text, json, yaml)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EndpointOutcome {
    Healthy { status: u16, latency_ms: u64 },
    Unhealthy { status: u16, latency_ms: u64 },
    Unreachable { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointCheck {
    pub name: String,
    pub url: String,
    pub expect_status: u16,
    pub outcome: EndpointOutcome,
}

impl EndpointCheck {
    pub fn is_healthy(&self) -> bool {
        matches!(self.outcome, EndpointOutcome::Healthy { .. })
    }
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("deployprobe/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub async fn check_endpoint(client: &Client, endpoint: &PublicEndpoint) -> EndpointCheck {
    let started = Instant::now();
    let outcome = match client.get(&endpoint.url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let latency_ms = started.elapsed().as_millis() as u64;
            if status == endpoint.expect_status {
                EndpointOutcome::Healthy { status, latency_ms }
            } else {
                warn!(
                    "{} returned {} (expected {})",
                    endpoint.url, status, endpoint.expect_status
                );
                EndpointOutcome::Unhealthy { status, latency_ms }
            }
        }
        Err(e) => {
            warn!("{} unreachable: {}", endpoint.url, e);
            EndpointOutcome::Unreachable {
                message: e.to_string(),
            }
        }
    };

    EndpointCheck {
        name: endpoint.name.clone(),
        url: endpoint.url.clone(),
        expect_status: endpoint.expect_status,
        outcome,
    }
}

pub async fn check_all(client: &Client, endpoints: &[PublicEndpoint]) -> Vec<EndpointCheck> {
    let mut checks = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        checks.push(check_endpoint(client, endpoint).await);
    }
    checks
}

#[derive(Tabled)]
struct CheckLine {
    #[tabled(rename = "ENDPOINT")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "RESULT")]
    result: String,
    #[tabled(rename = "LATENCY")]
    latency: String,
}

pub fn display_checks(checks: &[EndpointCheck]) -> String {
    let lines = checks.iter().map(|check| {
        let (result, latency) = match &check.outcome {
            EndpointOutcome::Healthy { status, latency_ms } => {
                (format!("OK ({})", status), format!("{} ms", latency_ms))
            }
            EndpointOutcome::Unhealthy { status, latency_ms } => (
                format!("FAILED ({}, expected {})", status, check.expect_status),
                format!("{} ms", latency_ms),
            ),
            EndpointOutcome::Unreachable { message } => {
                (format!("FAILED ({})", message), "-".to_string())
            }
        };
        CheckLine {
            name: check.name.clone(),
            url: check.url.clone(),
            result,
            latency,
        }
    });

    let mut table = Table::new(lines);
    table.with(Style::rounded());

    let healthy = checks.iter().filter(|c| c.is_healthy()).count();
    format!("{}\n{}/{} endpoints healthy", table, healthy, checks.len())
}

pub async fn handle_command(args: HealthArgs, config: &ProberConfig) -> Result<Verdict> {
    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.health_timeout_secs));
    let client = build_client(timeout)?;
    let endpoints = config.effective_public_endpoints();
    info!("Checking {} public endpoints", endpoints.len());

    let checks = check_all(&client, &endpoints).await;
    match args.format {
        OutputFormat::Text => println!("{}", display_checks(&checks)),
        format => println!("{}", render::serialize(&checks, format)?),
    }

    if checks.iter().all(EndpointCheck::is_healthy) {
        Ok(Verdict::Pass)
    } else {
        Ok(Verdict::Degraded)
    }
}
