// Session inactivity monitor
// Locks the session after the app has been in the background for too long

use super::clock::Clock;
use super::notifier::{LifecycleNotifier, MonitorSubscription};
use super::types::{
    AppLifecycleState, InactivityConfig, LockDecision, LogoutReason, UnlockedReason,
};
use crate::platform::{BiometricOutcome, BiometricPrompt, Navigator, PlatformCapabilities};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Observes lifecycle transitions and enforces the inactivity lock.
///
/// Transitions are handled one at a time: a second call to
/// [`InactivityMonitor::handle_transition`] waits for the first to finish
/// (including a pending biometric prompt) and then sees the state the first
/// one left behind.
pub struct InactivityMonitor {
    platform: Arc<dyn PlatformCapabilities>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    config: InactivityConfig,
    state: AtomicU8,
    in_flight: Mutex<()>,
}

impl InactivityMonitor {
    pub fn new(
        platform: Arc<dyn PlatformCapabilities>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        config: InactivityConfig,
    ) -> Self {
        Self {
            platform,
            navigator,
            clock,
            config,
            state: AtomicU8::new(AppLifecycleState::Active.to_u8()),
            in_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &InactivityConfig {
        &self.config
    }

    /// Last state the monitor has processed
    pub fn current_state(&self) -> AppLifecycleState {
        AppLifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether a transition is being handled right now
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Apply one lifecycle transition
    pub async fn handle_transition(&self, next: AppLifecycleState) -> LockDecision {
        let _guard = self.in_flight.lock().await;
        let previous = self.current_state();

        let decision = match (previous.is_active(), next.is_active()) {
            (true, false) => self.record_last_active().await,
            (false, true) => self.check_inactivity().await,
            _ => LockDecision::Ignored,
        };

        self.state.store(next.to_u8(), Ordering::SeqCst);
        debug!("Lifecycle {} -> {}: {:?}", previous, next, decision);

        decision
    }

    /// Subscribe to `notifier` and handle its events on a background task.
    ///
    /// A subscriber that falls behind drops its backlog and handles the
    /// notifier's latest state instead, so stale events never reach the
    /// biometric prompt or the navigator.
    pub fn attach(self: &Arc<Self>, notifier: &LifecycleNotifier) -> MonitorSubscription {
        let mut rx = notifier.subscribe();
        let latest = notifier.watch_latest();
        let monitor = Arc::clone(self);

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(state) => {
                        monitor.handle_transition(state).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        rx = rx.resubscribe();
                        let current = *latest.borrow();
                        warn!(
                            "Inactivity monitor lagged by {} lifecycle events, resyncing to {:?}",
                            skipped, current
                        );
                        if let Some(state) = current {
                            monitor.handle_transition(state).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        info!("Inactivity monitor attached to lifecycle notifier");
        MonitorSubscription::new(handle)
    }

    async fn record_last_active(&self) -> LockDecision {
        let now = self.clock.now_millis();

        let persisted = match self
            .platform
            .set(&self.config.last_active_key, &now.to_string())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist last-active timestamp: {}", e);
                false
            }
        };

        LockDecision::Recorded {
            at_ms: now,
            persisted,
        }
    }

    async fn check_inactivity(&self) -> LockDecision {
        let Some(last_active) = self.read_last_active().await else {
            return LockDecision::FreshSession;
        };

        let elapsed_ms = self.clock.now_millis().saturating_sub(last_active);
        if elapsed_ms <= self.config.lock_after_millis() {
            return LockDecision::WithinWindow { elapsed_ms };
        }

        info!(
            "Session inactive for {}s, lock window is {}s",
            elapsed_ms / 1000,
            self.config.lock_after.as_secs()
        );

        if !self.platform.supports_biometrics() {
            self.force_logout();
            return LockDecision::LoggedOut {
                elapsed_ms,
                reason: LogoutReason::NoBiometricSupport,
            };
        }

        // Native with biometrics turned off stays unlocked, unlike web
        if !self.biometrics_enabled().await {
            info!("Biometrics disabled by user, leaving expired session unlocked");
            return LockDecision::LeftUnlocked {
                elapsed_ms,
                reason: UnlockedReason::BiometricsDisabled,
            };
        }

        let prompt = BiometricPrompt {
            message: self.config.prompt_message.clone(),
            cancel_label: self.config.cancel_label.clone(),
            disable_device_fallback: true,
        };

        match self.platform.authenticate_if_available(&prompt).await {
            BiometricOutcome::Authenticated => LockDecision::Reauthenticated { elapsed_ms },
            BiometricOutcome::Unavailable => {
                info!("Biometrics unavailable, leaving expired session unlocked");
                LockDecision::LeftUnlocked {
                    elapsed_ms,
                    reason: UnlockedReason::BiometricsUnavailable,
                }
            }
            BiometricOutcome::Rejected(_) => {
                self.force_logout();
                LockDecision::LoggedOut {
                    elapsed_ms,
                    reason: LogoutReason::BiometricRejected,
                }
            }
        }
    }

    async fn read_last_active(&self) -> Option<i64> {
        match self.platform.get(&self.config.last_active_key).await {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(millis) => Some(millis),
                Err(e) => {
                    warn!("Ignoring malformed last-active timestamp '{}': {}", raw, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read last-active timestamp: {}", e);
                None
            }
        }
    }

    async fn biometrics_enabled(&self) -> bool {
        match self.platform.get(&self.config.biometric_preference_key).await {
            Ok(Some(value)) => value.trim().eq_ignore_ascii_case("true"),
            Ok(None) => false,
            Err(e) => {
                warn!("Failed to read biometric preference: {}", e);
                false
            }
        }
    }

    fn force_logout(&self) {
        warn!("Forcing logout after inactivity");
        if let Err(e) = self.navigator.replace(&self.config.login_route) {
            warn!("Failed to navigate to {}: {}", self.config.login_route, e);
        }
    }
}
