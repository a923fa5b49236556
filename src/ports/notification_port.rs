//! Notification delivery port trait.

use crate::domain::alert::Alert;

/// Receives alert events raised by the core. Formatting, identity assignment
/// and delivery are entirely the collaborator's concern; delivery failures
/// never bounce back into the ledger.
pub trait NotificationPort {
    fn deliver(&mut self, alert: Alert);
}
