use metrics::{counter, gauge, histogram};

/// Metric emission for the responder. Every method is a no-op when metrics
/// are disabled or no recorder is installed.
#[derive(Debug, Clone)]
pub struct ResponderTelemetry {
    enabled: bool,
}

impl Default for ResponderTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponderTelemetry {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_response(&self, subject: &str, provenance: &str, duration_ms: f64) {
        if !self.enabled {
            return;
        }
        let labels = [
            ("subject", subject.to_string()),
            ("provenance", provenance.to_string()),
        ];
        counter!("cake_responses_total", &labels).increment(1);
        histogram!("cake_response_duration_seconds", &labels).record(duration_ms / 1000.0);
    }

    pub fn record_model_attempt(&self, provider: &str, outcome: &str) {
        if !self.enabled {
            return;
        }
        counter!("cake_model_attempts_total",
            "provider" => provider.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    pub fn record_fallback(&self, subject: &str, reason: &str) {
        if !self.enabled {
            return;
        }
        counter!("cake_static_fallbacks_total",
            "subject" => subject.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn record_cache_hit(&self) {
        if self.enabled {
            counter!("cake_cache_hits_total").increment(1);
        }
    }

    pub fn record_cache_miss(&self) {
        if self.enabled {
            counter!("cake_cache_misses_total").increment(1);
        }
    }

    pub fn record_cache_size(&self, size: usize) {
        if self.enabled {
            gauge!("cake_cache_entries").set(size as f64);
        }
    }

    pub fn record_connectivity_probe(&self, provider: &str, reachable: bool) {
        if !self.enabled {
            return;
        }
        counter!("cake_connectivity_probes_total",
            "provider" => provider.to_string(),
            "reachable" => reachable.to_string()
        )
        .increment(1);
    }

    pub fn record_config_update(&self, subject: &str, accepted: bool) {
        if !self.enabled {
            return;
        }
        counter!("cake_config_updates_total",
            "subject" => subject.to_string(),
            "accepted" => accepted.to_string()
        )
        .increment(1);
    }
}
