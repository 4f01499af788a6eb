// Navigation primitive used to force the user back to the login screen

use tokio::sync::mpsc;
use tracing::debug;

/// Replace-the-stack navigation
pub trait Navigator: Send + Sync {
    /// Replace the current navigation stack with `route`
    fn replace(&self, route: &str) -> Result<(), String>;
}

/// Command delivered to the host shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationCommand {
    Replace(String),
}

/// Navigator that forwards commands over a channel to whoever owns the UI
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<NavigationCommand>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavigationCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn replace(&self, route: &str) -> Result<(), String> {
        debug!("Navigation: replace stack with {}", route);
        self.tx
            .send(NavigationCommand::Replace(route.to_string()))
            .map_err(|_| "Navigation receiver dropped".to_string())
    }
}
