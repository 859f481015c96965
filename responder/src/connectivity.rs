//! Per-provider reachability with a cool-down window.

use cake_core::{ProbeError, Provider, ReachabilityProbe};
use chrono::{DateTime, Utc};
use config::ProviderCredentials;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::telemetry::ResponderTelemetry;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct ConnectivityRecord {
    reachable: bool,
    checked_at: Instant,
    checked_at_utc: DateTime<Utc>,
}

/// Point-in-time view of one provider's record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivitySnapshot {
    pub provider: Provider,
    pub reachable: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

/// Caches probe results per provider. Concurrent callers past the cool-down
/// may probe the same provider twice; the last write wins.
pub struct ConnectivityTracker {
    probe: Arc<dyn ReachabilityProbe>,
    records: DashMap<Provider, ConnectivityRecord>,
    cooldown: Duration,
    telemetry: Arc<ResponderTelemetry>,
}

impl ConnectivityTracker {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        cooldown: Duration,
        telemetry: Arc<ResponderTelemetry>,
    ) -> Self {
        Self {
            probe,
            records: DashMap::new(),
            cooldown,
            telemetry,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Trusts the last result inside the cool-down window, otherwise probes.
    pub fn is_reachable(&self, provider: Provider) -> bool {
        if provider.is_static() {
            return true;
        }

        if let Some(record) = self.records.get(&provider).map(|r| *r) {
            if record.checked_at.elapsed() < self.cooldown {
                return record.reachable;
            }
        }

        self.probe_now(provider)
    }

    /// Probes regardless of the cool-down and records the result.
    pub fn probe_now(&self, provider: Provider) -> bool {
        self.probe_detailed(provider).unwrap_or(false)
    }

    /// Like [`Self::probe_now`] but keeps the probe's own failure. A failed
    /// probe is recorded as unreachable.
    pub fn probe_detailed(&self, provider: Provider) -> Result<bool, ProbeError> {
        if provider.is_static() {
            return Ok(true);
        }

        let outcome = self.probe.probe(provider);
        let reachable = match &outcome {
            Ok(reachable) => *reachable,
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Reachability probe failed");
                false
            }
        };

        self.records.insert(
            provider,
            ConnectivityRecord {
                reachable,
                checked_at: Instant::now(),
                checked_at_utc: Utc::now(),
            },
        );
        self.telemetry
            .record_connectivity_probe(provider.as_ref(), reachable);
        tracing::debug!(provider = %provider, reachable, "Recorded provider reachability");
        outcome
    }

    /// Current records for every remote provider; never probes.
    pub fn snapshot(&self) -> Vec<ConnectivitySnapshot> {
        Provider::remote()
            .into_iter()
            .map(|provider| {
                let record = self.records.get(&provider).map(|r| *r);
                ConnectivitySnapshot {
                    provider,
                    reachable: record.is_some_and(|r| r.reachable),
                    last_checked: record.map(|r| r.checked_at_utc),
                }
            })
            .collect()
    }
}

/// Reachability based on configured credentials: hosted providers need an
/// API key, the local provider needs a base URL.
pub struct CredentialProbe {
    credentials: ProviderCredentials,
}

impl CredentialProbe {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self { credentials }
    }
}

impl ReachabilityProbe for CredentialProbe {
    fn probe(&self, provider: Provider) -> Result<bool, ProbeError> {
        let Some(credential) = self.credentials.for_provider(provider) else {
            return Ok(true);
        };
        Ok(match provider {
            Provider::OpenAi | Provider::Anthropic => credential.has_key(),
            Provider::Local => credential.has_base(),
            Provider::Static => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::ProviderCredential;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
        answer: AtomicBool,
        fail: AtomicBool,
    }

    impl CountingProbe {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer: AtomicBool::new(answer),
                fail: AtomicBool::new(false),
            })
        }
    }

    impl ReachabilityProbe for CountingProbe {
        fn probe(&self, _provider: Provider) -> Result<bool, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err("probe exploded".into());
            }
            Ok(self.answer.load(Ordering::SeqCst))
        }
    }

    fn tracker(probe: Arc<CountingProbe>) -> ConnectivityTracker {
        ConnectivityTracker::new(
            probe,
            DEFAULT_COOLDOWN,
            Arc::new(ResponderTelemetry::disabled()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_trusted_within_cooldown() {
        let probe = CountingProbe::new(true);
        let tracker = tracker(probe.clone());

        assert!(tracker.is_reachable(Provider::OpenAi));
        probe.answer.store(false, Ordering::SeqCst);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(tracker.is_reachable(Provider::OpenAi));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!tracker.is_reachable(Provider::OpenAi));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_provider_never_probed() {
        let probe = CountingProbe::new(false);
        let tracker = tracker(probe.clone());

        assert!(tracker.is_reachable(Provider::Static));
        assert!(tracker.probe_now(Provider::Static));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_means_unreachable() {
        let probe = CountingProbe::new(true);
        probe.fail.store(true, Ordering::SeqCst);
        let tracker = tracker(probe.clone());

        assert!(!tracker.is_reachable(Provider::Anthropic));
        assert!(!tracker.is_reachable(Provider::Anthropic));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_detailed_keeps_error() {
        let probe = CountingProbe::new(true);
        probe.fail.store(true, Ordering::SeqCst);
        let tracker = tracker(probe.clone());

        assert!(tracker.probe_detailed(Provider::OpenAi).is_err());
        let record = tracker
            .snapshot()
            .into_iter()
            .find(|s| s.provider == Provider::OpenAi)
            .unwrap();
        assert!(!record.reachable);
        assert!(record.last_checked.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_tracked_independently() {
        let probe = CountingProbe::new(true);
        let tracker = tracker(probe.clone());

        tracker.is_reachable(Provider::OpenAi);
        tracker.is_reachable(Provider::Local);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 3);
        let anthropic = snapshot
            .iter()
            .find(|s| s.provider == Provider::Anthropic)
            .unwrap();
        assert!(anthropic.last_checked.is_none());
    }

    #[test]
    fn test_credential_probe() {
        let credentials = ProviderCredentials {
            openai: ProviderCredential {
                api_key: Some("sk-live".to_string()),
                api_base: None,
            },
            anthropic: ProviderCredential::default(),
            local: ProviderCredential {
                api_key: None,
                api_base: Some("http://localhost:11434/v1".to_string()),
            },
        };
        let probe = CredentialProbe::new(credentials);
        assert!(probe.probe(Provider::OpenAi).unwrap());
        assert!(!probe.probe(Provider::Anthropic).unwrap());
        assert!(probe.probe(Provider::Local).unwrap());
        assert!(probe.probe(Provider::Static).unwrap());
    }
}
