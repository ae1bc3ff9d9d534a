use std::fmt;

use serde::{Deserialize, Serialize};

/// Emitted whenever the observable value of a property changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub property_name: String,
    pub old_value: f64,
    pub new_value: f64,
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&ChangeRecord)>;

/// Explicit subscriber list for change records.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback)>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeRecord) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, record: &ChangeRecord) {
        for (_, callback) in &mut self.subscribers {
            callback(record);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
