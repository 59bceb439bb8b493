use std::collections::HashMap;
use std::hash::Hash;

/// Handle returned by [`EventBus::on`], used to drop a single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<P> {
    pub event: &'static str,
    pub payload: P,
}

#[derive(Debug, Clone)]
struct Subscription<O> {
    id: SubscriptionId,
    event: &'static str,
    owner: O,
}

/// In-process publish/subscribe keyed by event name.
///
/// Subscribers are identified by an owner key. Emitting clones the payload
/// into the mailbox of every owner subscribed to that name, in subscription
/// order; owners pull their deliveries with [`EventBus::drain`] when they run.
/// Removing an owner with [`EventBus::unsubscribe`] drops all of its
/// subscriptions and anything still undelivered.
#[derive(Debug)]
pub struct EventBus<O, P> {
    next_id: u64,
    subscriptions: Vec<Subscription<O>>,
    mailboxes: HashMap<O, Vec<Delivery<P>>>,
}

impl<O, P> Default for EventBus<O, P> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscriptions: Vec::new(),
            mailboxes: HashMap::new(),
        }
    }
}

impl<O, P> EventBus<O, P>
where
    O: Copy + Eq + Hash,
    P: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: &'static str, owner: O) -> SubscriptionId {
        self.next_id = self.next_id.saturating_add(1);
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription { id, event, owner });
        self.mailboxes.entry(owner).or_default();
        id
    }

    /// Returns how many subscribers received the payload.
    pub fn emit(&mut self, event: &'static str, payload: P) -> usize {
        let mut delivered = 0usize;
        for subscription in self.subscriptions.iter().filter(|sub| sub.event == event) {
            self.mailboxes
                .entry(subscription.owner)
                .or_default()
                .push(Delivery {
                    event,
                    payload: payload.clone(),
                });
            delivered += 1;
        }
        delivered
    }

    pub fn drain(&mut self, owner: O) -> Vec<Delivery<P>> {
        self.mailboxes
            .get_mut(&owner)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn off(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|sub| sub.id != id);
    }

    pub fn unsubscribe(&mut self, owner: O) {
        self.subscriptions.retain(|sub| sub.owner != owner);
        self.mailboxes.remove(&owner);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}
