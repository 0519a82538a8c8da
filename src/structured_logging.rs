//! Structured logging for swap sessions

use uuid::Uuid;

/// Structured logger for one swap session's lifecycle events
#[derive(Debug, Clone)]
pub struct SwapLogger {
    session_id: String,
}

impl SwapLogger {
    pub fn new(session_id: String) -> Self {
        Self { session_id }
    }

    /// Logger with a fresh random correlation id
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_transition(&self, from: &str, to: &str) {
        tracing::debug!(
            session_id = %self.session_id,
            from = %from,
            to = %to,
            "Session transition"
        );
    }

    pub fn log_quote(&self, input: &str, output: &str, in_amount: u64, out_amount: u64) {
        tracing::info!(
            session_id = %self.session_id,
            input = %input,
            output = %output,
            in_amount = %in_amount,
            out_amount = %out_amount,
            "Quote accepted into session"
        );
    }

    pub fn log_swap_attempt(&self, input: &str, output: &str, in_amount: u64) {
        tracing::info!(
            session_id = %self.session_id,
            input = %input,
            output = %output,
            in_amount = %in_amount,
            "Executing swap"
        );
    }

    pub fn log_broadcast(&self, signature: &str) {
        tracing::info!(
            session_id = %self.session_id,
            signature = %signature,
            "Swap transaction broadcast"
        );
    }

    pub fn log_outcome(&self, status: &str, signature: &str, latency_ms: u64) {
        tracing::info!(
            session_id = %self.session_id,
            status = %status,
            signature = %signature,
            latency_ms = %latency_ms,
            "Swap settled"
        );
    }

    pub fn log_failure(&self, kind: &str, error: &str) {
        tracing::warn!(
            session_id = %self.session_id,
            kind = %kind,
            error = %error,
            "Swap step failed"
        );
    }
}

impl Default for SwapLogger {
    fn default() -> Self {
        Self::generate()
    }
}
