use std::collections::VecDeque;
use std::time::Duration;

const DEFAULT_TTL: Duration = Duration::from_secs(4);
const MAX_VISIBLE: usize = 4;

#[derive(Debug, Clone)]
struct Notification {
    text: String,
    remaining: Duration,
}

/// Short-lived HUD messages, aged by the fixed step.
#[derive(Debug, Clone)]
pub(crate) struct Notifications {
    items: VecDeque<Notification>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl Notifications {
    pub(crate) fn with_ttl(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub(crate) fn push(&mut self, text: impl Into<String>) {
        if self.items.len() == MAX_VISIBLE {
            self.items.pop_front();
        }
        self.items.push_back(Notification {
            text: text.into(),
            remaining: self.ttl,
        });
    }

    pub(crate) fn tick(&mut self, delta: Duration) {
        for item in &mut self.items {
            item.remaining = item.remaining.saturating_sub(delta);
        }
        self.items.retain(|item| !item.remaining.is_zero());
    }

    pub(crate) fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.text.as_str())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_expire_after_ttl() {
        let mut notifications = Notifications::with_ttl(Duration::from_millis(100));
        notifications.push("first");
        notifications.tick(Duration::from_millis(60));
        notifications.push("second");
        notifications.tick(Duration::from_millis(60));

        assert_eq!(notifications.texts().collect::<Vec<_>>(), vec!["second"]);
        notifications.tick(Duration::from_millis(40));
        assert!(notifications.is_empty());
    }

    #[test]
    fn oldest_is_dropped_when_full() {
        let mut notifications = Notifications::default();
        for index in 0..=MAX_VISIBLE {
            notifications.push(format!("n{index}"));
        }

        let texts: Vec<&str> = notifications.texts().collect();
        assert_eq!(texts.len(), MAX_VISIBLE);
        assert_eq!(texts[0], "n1");
    }
}
