//! The Credential Refresher (spec §4.6): a process-wide singleton that keeps
//! temporary AWS-style credentials fresh via the EC2/ECS instance metadata
//! service, falling back to nothing when static credentials are already
//! ambient.
//!
//! Grounded on `server.py`'s `get_imdsv2_token` / `get_credentials_from_imds`
//! / `refresh_credentials_from_imds` functions; `reqwest` stands in for the
//! Python reference's `requests` calls, matching how the rest of this
//! workspace reaches for `reqwest` over a hand-rolled HTTP client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use relay_core::{CredentialSink, Credentials};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const IMDS_BASE: &str = "http://169.254.169.254/latest";
const IMDSV2_TOKEN_TTL_SECONDS: &str = "21600";
const RETRY_DELAY: Duration = Duration::from_secs(300);
const MIN_REFRESH_DELAY: i64 = 60;
const MAX_REFRESH_DELAY: i64 = 3600;
const EXPIRY_SAFETY_MARGIN: i64 = 300;

/// Keeps at most one refresh loop running for the lifetime of the process.
pub struct CredentialRefresher {
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CredentialRefresher {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        })
    }

    /// Start the refresh loop, unless one is already running or the sink
    /// reports ambient static credentials (spec §4.6: "if present, use them,
    /// do nothing"). A second call while already running is a no-op.
    pub async fn start(self: &Arc<Self>, sink: Arc<dyn CredentialSink>) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("credential refresher already running, start() is a no-op");
            return;
        }

        if sink.has_static_credentials() {
            info!("static credentials present in environment, refresher stays idle");
            self.running.store(false, Ordering::SeqCst);
            return;
        }

        let refresher = Arc::clone(self);
        let handle = tokio::spawn(async move { refresher.run(sink).await });
        *self.handle.lock().await = Some(handle);
    }

    /// Cancel the refresh loop, if running, and await its exit (spec §4.6:
    /// "on cancellation, exit cleanly").
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.running.store(false, Ordering::SeqCst);
    }

    async fn run(self: Arc<Self>, sink: Arc<dyn CredentialSink>) {
        loop {
            match fetch_credentials_from_imds().await {
                Ok((credentials, expiry)) => {
                    sink.publish(&credentials);
                    let delay = next_refresh_delay(expiry);
                    info!(seconds = delay.as_secs(), "credentials refreshed");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(error = %err, "failed to refresh credentials from IMDS, retrying in 300s");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

/// `min(max(expiry - now - 300, 60), 3600)` (spec §4.6, tested against S6).
/// A missing expiry (the IMDS response omitted or mis-parsed it) falls back
/// to the maximum delay rather than refreshing aggressively.
fn next_refresh_delay(expiry: Option<DateTime<Utc>>) -> Duration {
    let Some(expiry) = expiry else {
        return Duration::from_secs(MAX_REFRESH_DELAY as u64);
    };
    let seconds_until_expiry = (expiry - Utc::now()).num_seconds();
    let delay = (seconds_until_expiry - EXPIRY_SAFETY_MARGIN).clamp(MIN_REFRESH_DELAY, MAX_REFRESH_DELAY);
    Duration::from_secs(delay as u64)
}

async fn fetch_imdsv2_token(client: &reqwest::Client) -> Option<String> {
    let response = client
        .put(format!("{IMDS_BASE}/api/token"))
        .header("X-aws-ec2-metadata-token-ttl-seconds", IMDSV2_TOKEN_TTL_SECONDS)
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .ok()?;
    if response.status().is_success() {
        response.text().await.ok()
    } else {
        None
    }
}

/// Fetch temporary credentials from the instance metadata service, trying
/// IMDSv2 first and falling back to IMDSv1 if the token fetch fails (spec
/// §4.6).
async fn fetch_credentials_from_imds() -> Result<(Credentials, Option<DateTime<Utc>>), String> {
    let client = reqwest::Client::new();
    let token = fetch_imdsv2_token(&client).await;

    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(token) = &token {
        let value = token
            .parse()
            .map_err(|err| format!("invalid IMDSv2 token: {err}"))?;
        headers.insert("X-aws-ec2-metadata-token", value);
    }

    let role_response = client
        .get(format!("{IMDS_BASE}/meta-data/iam/security-credentials/"))
        .headers(headers.clone())
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .map_err(|err| format!("failed to retrieve IAM role name: {err}"))?;
    if !role_response.status().is_success() {
        return Err(format!(
            "failed to retrieve IAM role name: HTTP {}",
            role_response.status()
        ));
    }
    let role_name = role_response
        .text()
        .await
        .map_err(|err| err.to_string())?
        .trim()
        .to_string();

    let credentials_response = client
        .get(format!(
            "{IMDS_BASE}/meta-data/iam/security-credentials/{role_name}"
        ))
        .headers(headers)
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .map_err(|err| format!("failed to retrieve credentials: {err}"))?;
    if !credentials_response.status().is_success() {
        return Err(format!(
            "failed to retrieve credentials: HTTP {}",
            credentials_response.status()
        ));
    }

    let body: serde_json::Value = credentials_response
        .json()
        .await
        .map_err(|err| err.to_string())?;

    let credentials = Credentials {
        access_key_id: body["AccessKeyId"].as_str().unwrap_or_default().to_string(),
        secret_access_key: body["SecretAccessKey"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        session_token: body["Token"].as_str().unwrap_or_default().to_string(),
    };
    let expiry = body["Expiration"]
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok((credentials, expiry))
}

/// Publishes refreshed credentials to the process environment — the default
/// [`CredentialSink`], source-compatible with the Python reference's direct
/// `os.environ` mutation.
#[allow(unsafe_code)]
pub struct EnvCredentialSink;

#[allow(unsafe_code)]
impl CredentialSink for EnvCredentialSink {
    fn publish(&self, credentials: &Credentials) {
        // SAFETY: the credential refresher is the only writer of these
        // variables, and it runs as a single process-wide task (spec §4.6,
        // §5 shared-resource policy).
        unsafe {
            std::env::set_var("AWS_ACCESS_KEY_ID", &credentials.access_key_id);
            std::env::set_var("AWS_SECRET_ACCESS_KEY", &credentials.secret_access_key);
            std::env::set_var("AWS_SESSION_TOKEN", &credentials.session_token);
        }
    }

    fn has_static_credentials(&self) -> bool {
        std::env::var("AWS_ACCESS_KEY_ID").is_ok() && std::env::var("AWS_SECRET_ACCESS_KEY").is_ok()
    }
}
