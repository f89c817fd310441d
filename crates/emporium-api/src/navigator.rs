//! Navigation seam
//!
//! The console core never renders. When it needs the user somewhere else
//! (the login page after logout or an expired session) it asks the shell.

use tokio::sync::mpsc;

pub trait Navigator: Send + Sync {
    /// Full-page redirect to `destination`
    fn redirect(&self, destination: &str);
}

/// Forwards redirect destinations to the shell over a channel.
#[derive(Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn redirect(&self, destination: &str) {
        tracing::info!(destination = %destination, "Redirecting");
        if self.tx.send(destination.to_string()).is_err() {
            tracing::warn!(destination = %destination, "Navigation receiver dropped");
        }
    }
}
