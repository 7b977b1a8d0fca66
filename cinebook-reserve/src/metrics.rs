use prometheus::{register_int_counter_with_registry, Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Business counters for the reservation path, registered on a dedicated
/// registry so the exporter carries only cinebook metrics.
///
/// `integrity_alarms` counts failed compensations: a seat left claimed
/// with no booking record. Operators page on it; tests assert on it.
#[derive(Clone)]
pub struct ReservationMetrics {
    registry: Arc<Registry>,

    pub attempts: IntCounter,
    pub confirmed: IntCounter,
    pub conflicts: IntCounter,
    pub rollbacks: IntCounter,
    pub integrity_alarms: IntCounter,
}

impl ReservationMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let attempts = register_int_counter_with_registry!(
            Opts::new("reservation_attempts_total", "Reservation attempts that passed validation"),
            registry
        )?;

        let confirmed = register_int_counter_with_registry!(
            Opts::new("reservations_confirmed_total", "Reservations committed with a booking record"),
            registry
        )?;

        let conflicts = register_int_counter_with_registry!(
            Opts::new("seat_conflicts_total", "Reservations rejected because a requested seat was taken"),
            registry
        )?;

        let rollbacks = register_int_counter_with_registry!(
            Opts::new("seat_rollbacks_total", "Seat claims released after a failed booking write"),
            registry
        )?;

        let integrity_alarms = register_int_counter_with_registry!(
            Opts::new(
                "integrity_alarms_total",
                "Failed seat-claim rollbacks leaving a claimed seat with no booking record"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            attempts,
            confirmed,
            conflicts,
            rollbacks,
            integrity_alarms,
        })
    }

    /// Export in Prometheus text format for scraping.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_registered_counters() {
        let metrics = ReservationMetrics::new().unwrap();
        metrics.attempts.inc();
        metrics.conflicts.inc();

        let text = metrics.export().unwrap();
        assert!(text.contains("reservation_attempts_total 1"));
        assert!(text.contains("seat_conflicts_total 1"));
        assert!(text.contains("integrity_alarms_total 0"));
    }
}
