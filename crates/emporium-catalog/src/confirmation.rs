//! Confirmation gate for destructive actions

use serde::Serialize;

/// Variant deletion waiting for the user to confirm
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDeletion {
    pub product_id: String,
    pub variant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing was sent; `confirm_deletion` fires the request
    AwaitingConfirmation(PendingDeletion),
    Deleted(PendingDeletion),
}

/// Holds at most one target. A new request replaces the previous one.
#[derive(Debug, Default)]
pub(crate) struct ConfirmationGate {
    pending: Option<PendingDeletion>,
}

impl ConfirmationGate {
    pub fn request(&mut self, target: PendingDeletion) -> PendingDeletion {
        if let Some(previous) = self.pending.replace(target.clone()) {
            tracing::debug!(
                variant_id = %previous.variant_id,
                "Replaced deletion awaiting confirmation"
            );
        }
        target
    }

    pub fn pending(&self) -> Option<&PendingDeletion> {
        self.pending.as_ref()
    }

    /// Take the target for confirmation; the gate is empty afterwards.
    pub fn take(&mut self) -> Option<PendingDeletion> {
        self.pending.take()
    }

    pub fn cancel(&mut self) -> Option<PendingDeletion> {
        self.pending.take()
    }
}
