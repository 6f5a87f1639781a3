// # MyDNS HTTP Client
//
// This crate provides the `DnsUpdater` implementation that talks to the real
// services:
//
// 1. `GET http://jsonip.com/` → `{"ip": "203.0.113.5", ...}`
// 2. `GET http://www.mydns.jp/directip.html?MID=..&PWD=..&IPV4ADDR=..`
//
// ## Behavior
//
// - One attempt per call: no retry, no backoff (the interval is the retry)
// - A non-2xx lookup short-circuits; the provider is never contacted
// - Query values are URL-escaped
// - Both requests share one client with a bounded timeout
// - Every failure is folded into `UpdateStatus::Failure`; nothing propagates
//
// ## Security
//
// The password never appears in logs; logged URLs carry `PWD=***`.

use async_trait::async_trait;
use mydns_core::{
    ClientConfig, Credentials, DnsUpdater, Error, RequestStage, Result, UpdateResult,
};
use reqwest::Url;
use serde::Deserialize;
use std::net::IpAddr;

/// Placeholder substituted for the password in logged URLs
const REDACTED: &str = "***";

/// Body returned by the public IP lookup service
///
/// Only `ip` is consumed; any other field the service adds is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicIpInfo {
    /// Caller's public address as text
    pub ip: String,

    /// Informational link returned by jsonip.com
    #[serde(default)]
    pub about: Option<String>,

    /// Upsell link jsonip.com sends under the key `Pro!`
    #[serde(rename = "Pro!", default)]
    pub pro: Option<String>,
}

impl PublicIpInfo {
    /// Address in the `ip` field
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: `ip` holds an IPv4 or IPv6 address
    /// - `Err(Error::Parse)`: `ip` is not an address
    pub fn address(&self) -> Result<IpAddr> {
        self.ip
            .trim()
            .parse()
            .map_err(|_| Error::parse(format!("Invalid IP address: {}", self.ip)))
    }
}

/// Build the provider update URL with escaped query values
///
/// # Parameters
///
/// - `base`: Provider endpoint, e.g. `http://www.mydns.jp/directip.html`
/// - `credentials`: Supplies `MID` and `PWD`
/// - `ip`: Supplies `IPV4ADDR`
pub fn build_update_url(base: &str, credentials: &Credentials, ip: IpAddr) -> Result<Url> {
    let ip = ip.to_string();
    Url::parse_with_params(
        base,
        &[
            ("MID", credentials.master_id.as_str()),
            ("PWD", credentials.password.as_str()),
            ("IPV4ADDR", ip.as_str()),
        ],
    )
    .map_err(|e| Error::config(format!("Invalid update URL '{}': {}", base, e)))
}

/// Reject endpoints reqwest could not send to (e.g. `http://` with no host)
fn check_endpoint(field: &str, url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        Ok(_) => Err(Error::config(format!("{} has no host: {}", field, url))),
        Err(e) => Err(Error::config(format!("{} is not a valid URL '{}': {}", field, url, e))),
    }
}

/// Copy of `url` safe to log
pub fn redact_url(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "PWD" {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Update client for MyDNS
#[derive(Debug)]
pub struct DnsUpdateClient {
    config: ClientConfig,

    /// HTTP client (timeout applied per request)
    client: reqwest::Client,
}

impl DnsUpdateClient {
    /// Create a client
    ///
    /// # Returns
    ///
    /// - `Ok(DnsUpdateClient)`: Ready to use
    /// - `Err(Error::Config)`: Invalid configuration or the HTTP client could not be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        check_endpoint("lookup_url", &config.lookup_url)?;
        check_endpoint("update_url", &config.update_url)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client for the fixed public services
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Step 1: resolve the public IP
    pub async fn lookup_ip(&self) -> Result<IpAddr> {
        tracing::debug!("Looking up public IP via {}", self.config.lookup_url);

        let response = self
            .client
            .get(&self.config.lookup_url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("IP lookup request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(RequestStage::Lookup, status.as_u16()));
        }

        let info: PublicIpInfo = response.json().await.map_err(|e| {
            if e.is_decode() {
                Error::parse(format!("Invalid lookup response: {}", e))
            } else {
                Error::transport(format!("Failed to read lookup response: {}", e))
            }
        })?;

        let ip = info.address()?;
        tracing::debug!("Public IP is {}", ip);
        Ok(ip)
    }

    /// Step 2: push `ip` to the provider
    pub async fn submit(&self, credentials: &Credentials, ip: IpAddr) -> Result<()> {
        let url = build_update_url(&self.config.update_url, credentials, ip)?;
        tracing::debug!("Submitting update: {}", redact_url(&url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Update request failed: {}", e.without_url())))?;

        let status = response.status();

        // Body carries nothing we need; read it so the exchange completes
        response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read update response: {}", e.without_url())))?;

        if !status.is_success() {
            return Err(Error::http_status(RequestStage::Update, status.as_u16()));
        }

        Ok(())
    }

    /// Run both steps and keep the precise error
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The address that was pushed
    /// - `Err(Error)`: `Transport`, `HttpStatus` or `Parse`
    pub async fn try_update(&self, credentials: &Credentials) -> Result<IpAddr> {
        let ip = self.lookup_ip().await?;
        self.submit(credentials, ip).await?;
        Ok(ip)
    }
}

#[async_trait]
impl DnsUpdater for DnsUpdateClient {
    async fn update(&self, credentials: &Credentials) -> UpdateResult {
        match self.try_update(credentials).await {
            Ok(ip) => {
                tracing::info!("MyDNS updated: {} -> {}", credentials.master_id, ip);
                UpdateResult::success()
            }
            Err(e) => {
                tracing::warn!("MyDNS update failed for {}: {}", credentials.master_id, e);
                UpdateResult::failure()
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "mydns"
    }
}
