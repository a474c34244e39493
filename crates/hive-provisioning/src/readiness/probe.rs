//! Reachability probes.

use std::future::Future;
use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::debug;

/// Answers "is anything listening at this address".
pub trait ReadinessProbe: Send + Sync + 'static {
    fn probe(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// Issues a body-less `HEAD` request. Any HTTP response, whatever its
/// status, means the endpoint exists; only transport failures count as
/// unreachable.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let _ = rustls::crypto::ring::default_provider().install_default();

        // A 3xx is already an answer; redirects are not followed.
        let http = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { http, timeout })
    }
}

impl ReadinessProbe for HttpProbe {
    async fn probe(&self, address: &str) -> bool {
        match self.http.head(address).timeout(self.timeout).send().await {
            Ok(resp) => {
                debug!(%address, status = resp.status().as_u16(), "Probe answered");
                true
            }
            Err(e) => {
                debug!(%address, error = %e, "Probe failed");
                false
            }
        }
    }
}
