use async_trait::async_trait;
use joinq_auth::lifecycle::{
    AppLifecycleState, Clock, InactivityConfig, InactivityMonitor, LifecycleNotifier,
    LockDecision, LogoutReason, ManualClock, UnlockedReason,
};
use joinq_auth::platform::{
    BiometricAuthenticator, BiometricError, BiometricPrompt, ChannelNavigator, KeyValueStore,
    MemoryKeyValueStore, NativePlatform, NavigationCommand, Navigator, PlatformCapabilities,
    StorageError, WebPlatform,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const T0: i64 = 1_700_000_000_000;
const MINUTE_MS: i64 = 60_000;

struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
        }
    }

    fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, route: &str) -> Result<(), String> {
        self.routes.lock().unwrap().push(route.to_string());
        Ok(())
    }
}

struct ScriptedAuthenticator {
    hardware: bool,
    enrolled: bool,
    result: Result<(), BiometricError>,
    prompts: Mutex<Vec<BiometricPrompt>>,
}

impl ScriptedAuthenticator {
    fn new(hardware: bool, enrolled: bool, result: Result<(), BiometricError>) -> Self {
        Self {
            hardware,
            enrolled,
            result,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl BiometricAuthenticator for ScriptedAuthenticator {
    async fn has_hardware(&self) -> bool {
        self.hardware
    }

    async fn is_enrolled(&self) -> bool {
        self.enrolled
    }

    async fn authenticate(&self, prompt: &BiometricPrompt) -> Result<(), BiometricError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.result.clone()
    }
}

/// Store whose every operation fails
struct BrokenStore {
    writes: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("keychain locked".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Io("disk full".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("disk full".to_string()))
    }
}

struct Harness {
    monitor: Arc<InactivityMonitor>,
    clock: Arc<ManualClock>,
    navigator: Arc<RecordingNavigator>,
    store: Arc<MemoryKeyValueStore>,
    authenticator: Option<Arc<ScriptedAuthenticator>>,
}

impl Harness {
    fn web() -> Self {
        let store = Arc::new(MemoryKeyValueStore::new());
        let platform: Arc<dyn PlatformCapabilities> = Arc::new(WebPlatform::new(store.clone()));
        Self::build(platform, store, None)
    }

    fn native(authenticator: ScriptedAuthenticator) -> Self {
        let store = Arc::new(MemoryKeyValueStore::new());
        let authenticator = Arc::new(authenticator);
        let platform: Arc<dyn PlatformCapabilities> =
            Arc::new(NativePlatform::new(store.clone(), authenticator.clone()));
        Self::build(platform, store, Some(authenticator))
    }

    fn build(
        platform: Arc<dyn PlatformCapabilities>,
        store: Arc<MemoryKeyValueStore>,
        authenticator: Option<Arc<ScriptedAuthenticator>>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let navigator = Arc::new(RecordingNavigator::new());
        let monitor = Arc::new(InactivityMonitor::new(
            platform,
            navigator.clone(),
            clock.clone(),
            InactivityConfig::default(),
        ));

        Self {
            monitor,
            clock,
            navigator,
            store,
            authenticator,
        }
    }

    async fn set_biometrics(&self, enabled: bool) {
        self.store
            .set("biometricEnabled", if enabled { "true" } else { "false" })
            .await
            .unwrap();
    }

    /// Background now, foreground after `gap_ms`
    async fn away_for(&self, gap_ms: i64) -> LockDecision {
        self.monitor
            .handle_transition(AppLifecycleState::Background)
            .await;
        self.clock.set(self.clock.now_millis() + gap_ms);
        self.monitor.handle_transition(AppLifecycleState::Active).await
    }

    fn prompt_count(&self) -> usize {
        self.authenticator
            .as_ref()
            .map(|a| a.prompt_count())
            .unwrap_or(0)
    }
}

// Scenarios

#[tokio::test]
async fn ten_minutes_away_does_not_lock() {
    let harness = Harness::native(ScriptedAuthenticator::new(true, true, Ok(())));
    harness.set_biometrics(true).await;

    let decision = harness.away_for(10 * MINUTE_MS).await;

    assert_eq!(
        decision,
        LockDecision::WithinWindow {
            elapsed_ms: 10 * MINUTE_MS
        }
    );
    assert!(harness.navigator.routes().is_empty());
    assert_eq!(harness.prompt_count(), 0);
}

#[tokio::test]
async fn native_biometrics_disabled_leaves_expired_session_unlocked_observed_gap() {
    // Unlike web, native with biometrics off takes no forced action
    let harness = Harness::native(ScriptedAuthenticator::new(true, true, Ok(())));
    harness.set_biometrics(false).await;

    let decision = harness.away_for(20 * MINUTE_MS).await;

    assert_eq!(
        decision,
        LockDecision::LeftUnlocked {
            elapsed_ms: 20 * MINUTE_MS,
            reason: UnlockedReason::BiometricsDisabled
        }
    );
    assert!(harness.navigator.routes().is_empty());
    assert_eq!(harness.prompt_count(), 0);
}

#[tokio::test]
async fn missing_biometric_preference_counts_as_disabled() {
    let harness = Harness::native(ScriptedAuthenticator::new(true, true, Err(BiometricError::Cancelled)));

    let decision = harness.away_for(20 * MINUTE_MS).await;

    assert!(matches!(
        decision,
        LockDecision::LeftUnlocked {
            reason: UnlockedReason::BiometricsDisabled,
            ..
        }
    ));
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn biometrics_enabled_and_successful_preserves_session() {
    let harness = Harness::native(ScriptedAuthenticator::new(true, true, Ok(())));
    harness.set_biometrics(true).await;

    let decision = harness.away_for(20 * MINUTE_MS).await;

    assert_eq!(
        decision,
        LockDecision::Reauthenticated {
            elapsed_ms: 20 * MINUTE_MS
        }
    );
    assert!(harness.navigator.routes().is_empty());
    assert_eq!(harness.prompt_count(), 1);
}

#[tokio::test]
async fn biometric_prompt_uses_lock_message_and_no_passcode_fallback() {
    let harness = Harness::native(ScriptedAuthenticator::new(true, true, Ok(())));
    harness.set_biometrics(true).await;

    harness.away_for(16 * MINUTE_MS).await;

    let prompts = harness.authenticator.as_ref().unwrap().prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].message, "Session locked due to inactivity");
    assert_eq!(prompts[0].cancel_label, "Logout");
    assert!(prompts[0].disable_device_fallback);
}

#[tokio::test]
async fn cancelled_prompt_logs_out_once() {
    let harness = Harness::native(ScriptedAuthenticator::new(
        true,
        true,
        Err(BiometricError::Cancelled),
    ));
    harness.set_biometrics(true).await;

    let decision = harness.away_for(20 * MINUTE_MS).await;

    assert_eq!(
        decision,
        LockDecision::LoggedOut {
            elapsed_ms: 20 * MINUTE_MS,
            reason: LogoutReason::BiometricRejected
        }
    );
    assert_eq!(harness.navigator.routes(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn no_hardware_or_not_enrolled_leaves_session_unlocked() {
    for (hardware, enrolled) in [(false, true), (true, false), (false, false)] {
        let harness = Harness::native(ScriptedAuthenticator::new(
            hardware,
            enrolled,
            Err(BiometricError::Failed("should not prompt".to_string())),
        ));
        harness.set_biometrics(true).await;

        let decision = harness.away_for(20 * MINUTE_MS).await;

        assert!(matches!(
            decision,
            LockDecision::LeftUnlocked {
                reason: UnlockedReason::BiometricsUnavailable,
                ..
            }
        ));
        assert!(harness.navigator.routes().is_empty());
        assert_eq!(harness.prompt_count(), 0);
    }
}

#[tokio::test]
async fn web_logs_out_regardless_of_preference() {
    for enabled in [false, true] {
        let harness = Harness::web();
        harness.set_biometrics(enabled).await;

        let decision = harness.away_for(20 * MINUTE_MS).await;

        assert_eq!(
            decision,
            LockDecision::LoggedOut {
                elapsed_ms: 20 * MINUTE_MS,
                reason: LogoutReason::NoBiometricSupport
            }
        );
        assert_eq!(harness.navigator.routes(), vec!["/login".to_string()]);
    }
}

#[tokio::test]
async fn foreground_without_timestamp_is_fresh_session() {
    let harness = Harness::web();

    harness
        .monitor
        .handle_transition(AppLifecycleState::Inactive)
        .await;
    // Simulate a timestamp that was never written
    harness.store.delete("lastActiveTimestamp").await.unwrap();

    let decision = harness
        .monitor
        .handle_transition(AppLifecycleState::Active)
        .await;

    assert_eq!(decision, LockDecision::FreshSession);
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn malformed_timestamp_is_treated_as_absent() {
    let harness = Harness::web();

    harness
        .monitor
        .handle_transition(AppLifecycleState::Background)
        .await;
    harness
        .store
        .set("lastActiveTimestamp", "yesterday")
        .await
        .unwrap();
    harness.clock.set(T0 + 60 * MINUTE_MS);

    let decision = harness
        .monitor
        .handle_transition(AppLifecycleState::Active)
        .await;

    assert_eq!(decision, LockDecision::FreshSession);
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn storage_failures_are_swallowed() {
    let store = Arc::new(BrokenStore {
        writes: AtomicUsize::new(0),
    });
    let navigator = Arc::new(RecordingNavigator::new());
    let clock = Arc::new(ManualClock::new(T0));
    let monitor = InactivityMonitor::new(
        Arc::new(WebPlatform::new(store.clone())),
        navigator.clone(),
        clock.clone(),
        InactivityConfig::default(),
    );

    let recorded = monitor
        .handle_transition(AppLifecycleState::Background)
        .await;
    assert_eq!(
        recorded,
        LockDecision::Recorded {
            at_ms: T0,
            persisted: false
        }
    );
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    clock.set(T0 + 60 * MINUTE_MS);
    let decision = monitor.handle_transition(AppLifecycleState::Active).await;

    // Failed read is "no prior timestamp", not a lock
    assert_eq!(decision, LockDecision::FreshSession);
    assert!(navigator.routes().is_empty());
    assert_eq!(monitor.current_state(), AppLifecycleState::Active);
}

#[tokio::test]
async fn repeated_backgrounding_keeps_only_latest_timestamp() {
    let harness = Harness::web();

    harness
        .monitor
        .handle_transition(AppLifecycleState::Background)
        .await;

    // Foreground briefly, then background again later
    harness.clock.set(T0 + MINUTE_MS);
    harness
        .monitor
        .handle_transition(AppLifecycleState::Active)
        .await;
    harness.clock.set(T0 + 30 * MINUTE_MS);
    harness
        .monitor
        .handle_transition(AppLifecycleState::Background)
        .await;

    assert_eq!(
        harness.store.get("lastActiveTimestamp").await.unwrap(),
        Some((T0 + 30 * MINUTE_MS).to_string())
    );

    // 35 minutes after the first write, 5 after the latest
    harness.clock.set(T0 + 35 * MINUTE_MS);
    let decision = harness
        .monitor
        .handle_transition(AppLifecycleState::Active)
        .await;

    assert_eq!(
        decision,
        LockDecision::WithinWindow {
            elapsed_ms: 5 * MINUTE_MS
        }
    );
    assert!(harness.navigator.routes().is_empty());
}

#[tokio::test]
async fn inactive_then_background_does_not_rewrite_timestamp() {
    let harness = Harness::web();

    harness
        .monitor
        .handle_transition(AppLifecycleState::Inactive)
        .await;
    harness.clock.set(T0 + 5 * MINUTE_MS);
    let decision = harness
        .monitor
        .handle_transition(AppLifecycleState::Background)
        .await;

    assert_eq!(decision, LockDecision::Ignored);
    assert_eq!(
        harness.store.get("lastActiveTimestamp").await.unwrap(),
        Some(T0.to_string())
    );
}

// Single-flight guard

struct GatedAuthenticator {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl BiometricAuthenticator for GatedAuthenticator {
    async fn has_hardware(&self) -> bool {
        true
    }

    async fn is_enrolled(&self) -> bool {
        true
    }

    async fn authenticate(&self, _prompt: &BiometricPrompt) -> Result<(), BiometricError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn overlapping_transitions_are_serialised() {
    let store = Arc::new(MemoryKeyValueStore::new());
    store.set("biometricEnabled", "true").await.unwrap();
    let authenticator = Arc::new(GatedAuthenticator {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let clock = Arc::new(ManualClock::new(T0));
    let monitor = Arc::new(InactivityMonitor::new(
        Arc::new(NativePlatform::new(store.clone(), authenticator.clone())),
        Arc::new(RecordingNavigator::new()),
        clock.clone(),
        InactivityConfig::default(),
    ));

    monitor
        .handle_transition(AppLifecycleState::Background)
        .await;
    clock.set(T0 + 20 * MINUTE_MS);

    let foreground = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.handle_transition(AppLifecycleState::Active).await }
    });
    authenticator.entered.notified().await;
    assert!(monitor.is_busy());

    let background = tokio::spawn({
        let monitor = monitor.clone();
        async move {
            monitor
                .handle_transition(AppLifecycleState::Background)
                .await
        }
    });

    // The second handler must not write while the prompt is pending
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        store.get("lastActiveTimestamp").await.unwrap(),
        Some(T0.to_string())
    );
    assert_eq!(monitor.current_state(), AppLifecycleState::Background);

    authenticator.release.notify_one();

    let first = foreground.await.unwrap();
    let second = background.await.unwrap();

    assert!(matches!(first, LockDecision::Reauthenticated { .. }));
    assert_eq!(
        second,
        LockDecision::Recorded {
            at_ms: T0 + 20 * MINUTE_MS,
            persisted: true
        }
    );
    assert_eq!(monitor.current_state(), AppLifecycleState::Background);
    assert!(!monitor.is_busy());
}

// Notifier subscription

#[tokio::test]
async fn attached_monitor_handles_notifier_events() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let (navigator, mut nav_rx) = ChannelNavigator::new();
    let clock = Arc::new(ManualClock::new(T0));
    let monitor = Arc::new(InactivityMonitor::new(
        Arc::new(WebPlatform::new(store.clone())),
        Arc::new(navigator),
        clock.clone(),
        InactivityConfig::default(),
    ));
    let notifier = LifecycleNotifier::new();

    let subscription = monitor.attach(&notifier);
    assert!(subscription.is_active());
    assert_eq!(notifier.subscriber_count(), 1);

    notifier.publish(AppLifecycleState::Background);
    // Let the task record the timestamp before moving the clock
    tokio::time::timeout(Duration::from_secs(1), async {
        while store.get("lastActiveTimestamp").await.unwrap().is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    clock.set(T0 + 16 * MINUTE_MS);
    notifier.publish(AppLifecycleState::Active);

    let command = tokio::time::timeout(Duration::from_secs(1), nav_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(command, NavigationCommand::Replace("/login".to_string()));

    subscription.remove();
}

#[tokio::test]
async fn removed_subscription_stops_handling_events() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let monitor = Arc::new(InactivityMonitor::new(
        Arc::new(WebPlatform::new(store.clone())),
        Arc::new(RecordingNavigator::new()),
        Arc::new(ManualClock::new(T0)),
        InactivityConfig::default(),
    ));
    let notifier = LifecycleNotifier::new();

    let subscription = monitor.attach(&notifier);
    subscription.remove();

    // Give the aborted task a chance to drop its receiver
    tokio::time::timeout(Duration::from_secs(1), async {
        while notifier.subscriber_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    notifier.publish(AppLifecycleState::Background);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.get("lastActiveTimestamp").await.unwrap(), None);
    assert_eq!(monitor.current_state(), AppLifecycleState::Active);
}

// Properties

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

const WINDOW_MS: i64 = 15 * MINUTE_MS;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn gap_within_window_never_navigates_or_prompts(gap in 0i64..=WINDOW_MS, enabled in any::<bool>()) {
        let outcome = runtime().block_on(async {
            let harness = Harness::native(ScriptedAuthenticator::new(true, true, Err(BiometricError::Cancelled)));
            harness.set_biometrics(enabled).await;
            let decision = harness.away_for(gap).await;
            (decision, harness.navigator.routes().len(), harness.prompt_count())
        });

        prop_assert_eq!(outcome.0, LockDecision::WithinWindow { elapsed_ms: gap });
        prop_assert_eq!(outcome.1, 0);
        prop_assert_eq!(outcome.2, 0);
    }

    #[test]
    fn gap_past_window_on_web_always_logs_out(gap in (WINDOW_MS + 1)..(30 * 24 * 60 * MINUTE_MS)) {
        let routes = runtime().block_on(async {
            let harness = Harness::web();
            harness.set_biometrics(false).await;
            harness.away_for(gap).await;
            harness.navigator.routes()
        });

        prop_assert_eq!(routes, vec!["/login".to_string()]);
    }

    #[test]
    fn gap_past_window_with_successful_biometrics_never_navigates(gap in (WINDOW_MS + 1)..(30 * 24 * 60 * MINUTE_MS)) {
        let (decision, routes) = runtime().block_on(async {
            let harness = Harness::native(ScriptedAuthenticator::new(true, true, Ok(())));
            harness.set_biometrics(true).await;
            let decision = harness.away_for(gap).await;
            (decision, harness.navigator.routes())
        });

        prop_assert_eq!(decision, LockDecision::Reauthenticated { elapsed_ms: gap });
        prop_assert!(routes.is_empty());
    }

    #[test]
    fn gap_past_window_with_failed_biometrics_navigates_exactly_once(
        gap in (WINDOW_MS + 1)..(30 * 24 * 60 * MINUTE_MS),
        cancelled in any::<bool>(),
    ) {
        let error = if cancelled {
            BiometricError::Cancelled
        } else {
            BiometricError::Failed("not recognised".to_string())
        };

        let routes = runtime().block_on(async {
            let harness = Harness::native(ScriptedAuthenticator::new(true, true, Err(error)));
            harness.set_biometrics(true).await;
            harness.away_for(gap).await;
            harness.navigator.routes()
        });

        prop_assert_eq!(routes, vec!["/login".to_string()]);
    }

    #[test]
    fn latest_background_timestamp_wins(offsets in proptest::collection::vec(1i64..MINUTE_MS, 1..8)) {
        let (stored, last_background) = runtime().block_on(async {
            let harness = Harness::web();
            let mut now = T0;
            let mut last_background = now;
            for offset in &offsets {
                now += offset;
                harness.clock.set(now);
                harness.monitor.handle_transition(AppLifecycleState::Background).await;
                last_background = now;

                // Short foreground, well inside the lock window
                now += 1;
                harness.clock.set(now);
                harness.monitor.handle_transition(AppLifecycleState::Active).await;
            }
            harness.monitor.handle_transition(AppLifecycleState::Background).await;
            last_background = last_background.max(now);

            let stored = harness.store.get("lastActiveTimestamp").await.unwrap();
            (stored, last_background)
        });

        prop_assert_eq!(stored, Some(last_background.to_string()));
    }
}
