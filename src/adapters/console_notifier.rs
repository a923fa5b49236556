//! Console notification adapter.
//!
//! Prints each alert to stdout and assigns delivery ids. Real delivery
//! channels (email, push) live behind the same port.

use crate::domain::alert::Alert;
use crate::ports::notification_port::NotificationPort;

#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    next_id: u64,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered_count(&self) -> u64 {
        self.next_id
    }
}

impl NotificationPort for ConsoleNotifier {
    fn deliver(&mut self, mut alert: Alert) {
        self.next_id += 1;
        alert.id = self.next_id;
        println!(
            "[alert #{id} {priority}] user {user}: {title}: {body}",
            id = alert.id,
            priority = alert.priority,
            user = alert.user_id,
            title = alert.title,
            body = alert.body,
        );
    }
}
