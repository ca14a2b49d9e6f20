//! First-run credential reset for the message broker.
//!
//! Waits for the management API, provisions an administrator with a generated
//! password and removes the default accounts. Deletion is best-effort: an
//! account that is already gone is not an error.

use crate::config::toml_config::BrokerSection;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{self, Validate};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MANAGEMENT_URL: &str = "http://localhost:15672";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub url: String,
    pub bootstrap: Credentials,
    pub admin_user: String,
    pub vhost: String,
    pub delete_users: Vec<String>,
    pub ready_retries: u32,
    pub ready_interval: Duration,
    pub password_length: usize,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_MANAGEMENT_URL.to_string(),
            bootstrap: Credentials::new("guest", "guest"),
            admin_user: "admin".to_string(),
            vhost: "/".to_string(),
            delete_users: vec!["guest".to_string()],
            ready_retries: 30,
            ready_interval: Duration::from_secs(2),
            password_length: 32,
        }
    }
}

impl BrokerSettings {
    pub fn from_section(section: Option<&BrokerSection>) -> Self {
        let mut settings = Self::default();
        let Some(section) = section else {
            return settings;
        };

        if let Some(url) = &section.url {
            settings.url = url.clone();
        }
        if let Some(user) = &section.bootstrap_user {
            settings.bootstrap.username = user.clone();
        }
        if let Some(password) = &section.bootstrap_password {
            settings.bootstrap.password = password.clone();
        }
        if let Some(admin) = &section.admin_user {
            settings.admin_user = admin.clone();
        }
        if let Some(vhost) = &section.vhost {
            settings.vhost = vhost.clone();
        }
        if let Some(users) = &section.delete_users {
            settings.delete_users = users.clone();
        }
        if let Some(retries) = section.ready_retries {
            settings.ready_retries = retries;
        }
        if let Some(seconds) = section.ready_interval_seconds {
            settings.ready_interval = Duration::from_secs(seconds);
        }
        if let Some(length) = section.password_length {
            settings.password_length = length;
        }
        settings
    }
}

impl Validate for BrokerSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("broker.url", &self.url)?;
        validation::validate_non_empty_string("broker.admin_user", &self.admin_user)?;
        validation::validate_non_empty_string("broker.vhost", &self.vhost)?;
        validation::validate_range("broker.password_length", self.password_length, 16, 128)?;
        Ok(())
    }
}

pub fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[derive(Serialize)]
struct UserBody<'a> {
    password: &'a str,
    tags: &'a str,
}

#[derive(Serialize)]
struct PermissionBody {
    configure: &'static str,
    write: &'static str,
    read: &'static str,
}

/// Thin client over the broker's HTTP management API.
#[derive(Debug, Clone)]
pub struct ManagementClient {
    client: Client,
    base: Url,
}

impl ManagementClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| LedgerError::InvalidConfigValueError {
            field: "broker.url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    /// `segments` are percent-encoded individually, so a vhost of `/` becomes `%2F`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| LedgerError::InvalidConfigValueError {
                field: "broker.url".to_string(),
                value: self.base.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<StatusCode> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("{} -> {}", operation, status);
        if status.is_success() {
            Ok(status)
        } else {
            Err(LedgerError::BrokerRejected {
                operation: operation.to_string(),
                status: status.as_u16(),
            })
        }
    }

    pub async fn overview(&self, auth: &Credentials) -> Result<()> {
        let url = self.endpoint(&["overview"])?;
        let request = self
            .client
            .get(url)
            .basic_auth(&auth.username, Some(&auth.password));
        self.send("read overview", request).await?;
        Ok(())
    }

    pub async fn put_user(&self, auth: &Credentials, user: &Credentials, tags: &str) -> Result<()> {
        let url = self.endpoint(&["users", &user.username])?;
        let request = self
            .client
            .put(url)
            .basic_auth(&auth.username, Some(&auth.password))
            .json(&UserBody {
                password: &user.password,
                tags,
            });
        self.send(&format!("create user {}", user.username), request)
            .await?;
        Ok(())
    }

    pub async fn grant_all(&self, auth: &Credentials, vhost: &str, username: &str) -> Result<()> {
        let url = self.endpoint(&["permissions", vhost, username])?;
        let request = self
            .client
            .put(url)
            .basic_auth(&auth.username, Some(&auth.password))
            .json(&PermissionBody {
                configure: ".*",
                write: ".*",
                read: ".*",
            });
        self.send(&format!("grant permissions to {}", username), request)
            .await?;
        Ok(())
    }

    pub async fn delete_user(&self, auth: &Credentials, username: &str) -> Result<()> {
        let url = self.endpoint(&["users", username])?;
        let request = self
            .client
            .delete(url)
            .basic_auth(&auth.username, Some(&auth.password));
        self.send(&format!("delete user {}", username), request)
            .await?;
        Ok(())
    }
}

/// Connection failures and server errors mean the broker is still starting.
fn is_transient(error: &LedgerError) -> bool {
    match error {
        LedgerError::BrokerHttp(_) => true,
        LedgerError::BrokerRejected { status, .. } => *status >= 500,
        _ => false,
    }
}

pub struct CredentialReset {
    client: ManagementClient,
    settings: BrokerSettings,
}

impl CredentialReset {
    pub fn new(settings: BrokerSettings) -> Result<Self> {
        let client = ManagementClient::new(&settings.url)?;
        Ok(Self { client, settings })
    }

    /// Polls up to `ready_retries` times, then makes one final attempt whose error is returned.
    /// A client error such as 401 fails immediately.
    pub async fn wait_until_ready(&self) -> Result<()> {
        let bootstrap = &self.settings.bootstrap;
        for attempt in 1..=self.settings.ready_retries {
            match self.client.overview(bootstrap).await {
                Ok(()) => {
                    tracing::info!("Broker ready after {} attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) if is_transient(&e) => {
                    tracing::debug!(
                        "Broker not ready ({}/{}): {}",
                        attempt,
                        self.settings.ready_retries,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.settings.ready_interval).await;
        }

        tracing::warn!("Broker still not ready, trying one last time");
        self.client.overview(bootstrap).await
    }

    pub async fn run(&self) -> Result<Credentials> {
        self.wait_until_ready().await?;

        let admin = Credentials::new(
            self.settings.admin_user.clone(),
            generate_password(self.settings.password_length),
        );
        let bootstrap = &self.settings.bootstrap;

        self.client
            .put_user(bootstrap, &admin, "administrator")
            .await?;
        self.client
            .grant_all(bootstrap, &self.settings.vhost, &admin.username)
            .await?;
        tracing::info!("Provisioned administrator {}", admin.username);

        // Authenticate as the new administrator so the bootstrap account can delete itself.
        for user in &self.settings.delete_users {
            if *user == admin.username {
                tracing::warn!("Not deleting {}: it is the new administrator", user);
                continue;
            }
            match self.client.delete_user(&admin, user).await {
                Ok(()) => tracing::info!("Deleted default account {}", user),
                Err(e) => tracing::warn!("Could not delete {} (ignored): {}", user, e),
            }
        }

        Ok(admin)
    }
}
