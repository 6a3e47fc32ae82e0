//! Injection sink trait and the stock log-only implementation.

use std::collections::HashMap;
use std::future::Future;

use tracing::info;

use crate::station::Scope;
use crate::synth::MetarPacket;

/// Error type for injection failures.
///
/// A failed write is logged and retried on a later tick; the engine keeps
/// advancing its desired state regardless so a later successful write
/// converges on the latest smoothed weather.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("simulator connection is not available")]
    NotConnected,
    #[error("write failed: {0}")]
    Write(String),
}

/// Delivers framed METAR packets to the simulator.
///
/// Implementations own their channel (FSUIPC offset write, SimConnect
/// observation, a test buffer) and must serialize their own writes if the
/// backing channel is not thread-safe. For a given scope the engine calls
/// `inject` in wall-clock order; the sink may discard superseded packets.
pub trait InjectionSink: Send {
    fn inject(
        &mut self,
        scope: &Scope,
        packet: &MetarPacket,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Log-only sink for running without a simulator.
///
/// Records the last METAR per scope so operators (and tests) can see what
/// would have been injected.
#[derive(Debug, Default)]
pub struct LogSink {
    last: HashMap<Scope, String>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last METAR delivered for a scope.
    pub fn last_for(&self, scope: &Scope) -> Option<&str> {
        self.last.get(scope).map(String::as_str)
    }

    /// Number of scopes that have received at least one packet.
    pub fn scope_count(&self) -> usize {
        self.last.len()
    }
}

impl InjectionSink for LogSink {
    async fn inject(&mut self, scope: &Scope, packet: &MetarPacket) -> Result<(), SinkError> {
        info!(scope = %scope, metar = packet.metar_str(), "Weather injection");
        self.last.insert(scope.clone(), packet.metar_str().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_records_last_per_scope() {
        let mut sink = LogSink::new();
        let scope = Scope::Station("EGLL".into());

        let first = MetarPacket::encode("METAR EGLL 191200Z 24010KT 10SM CLR 12/08 Q1015").unwrap();
        let second = MetarPacket::encode("METAR EGLL 191300Z 24012KT 10SM CLR 12/08 Q1016").unwrap();
        sink.inject(&scope, &first).await.unwrap();
        sink.inject(&scope, &second).await.unwrap();

        assert_eq!(sink.scope_count(), 1);
        assert_eq!(sink.last_for(&scope), Some(second.metar_str()));
        assert_eq!(sink.last_for(&Scope::Global), None);
    }
}
