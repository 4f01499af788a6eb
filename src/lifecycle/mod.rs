// Session lifecycle module
// Inactivity lock driven by app foreground/background transitions

pub mod clock;
pub mod monitor;
pub mod notifier;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::InactivityMonitor;
pub use notifier::{LifecycleNotifier, MonitorSubscription};
pub use types::{
    AppLifecycleState, InactivityConfig, LockDecision, LogoutReason, UnlockedReason,
};
