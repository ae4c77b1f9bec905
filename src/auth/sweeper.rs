//! Background expiry sweep

use std::sync::Arc;
use std::time::Duration;

use super::service::AuthService;

/// Default interval between sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Periodically drop expired nonces and sessions.
///
/// Runs until the task is aborted or the runtime shuts down. The sweep goes
/// through the same store locks as request handling.
pub async fn run_sweeper(auth_service: Arc<AuthService>, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting expiry sweeper");

    loop {
        tokio::time::sleep(interval).await;

        let report = auth_service.sweep().await;
        if report.nonces > 0 || report.sessions > 0 {
            tracing::info!(
                nonces = report.nonces,
                sessions = report.sessions,
                "Swept expired entries"
            );
        } else {
            tracing::trace!("Sweep found nothing to remove");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::identity::EvmAddress;
    use crate::auth::oracle::EvmPersonalSignOracle;
    use crate::auth::service::AuthSettings;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_sweeper_reaps_in_background() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let service = Arc::new(AuthService::new(
            AuthSettings::default(),
            Arc::new(EvmAddress),
            Arc::new(EvmPersonalSignOracle),
            Arc::new(clock.clone()),
        ));

        service
            .request_challenge("0xabc0000000000000000000000000000000000001")
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(10));

        let handle = tokio::spawn(run_sweeper(service.clone(), Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(service.stats().await.active_nonces, 0);
        handle.abort();
    }
}
