//! State-change broadcast.
//!
//! Listeners are passive: they receive the renderable snapshot after every
//! state-changing call and cannot mutate the industry. Delivery is
//! synchronous and in subscription order.

use crate::id::ListenerId;
use crate::query::IndustryData;
use std::fmt;

/// A passive listener. Receives a snapshot; cannot mutate the industry.
pub type Listener = Box<dyn FnMut(&IndustryData)>;

#[derive(Default)]
pub struct Broadcaster {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, data: &IndustryData) {
        for (_, listener) in &mut self.listeners {
            listener(data);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = Broadcaster::new();
        for tag in ["a", "b"] {
            let log = Rc::clone(&log);
            bus.subscribe(Box::new(move |_| log.borrow_mut().push(tag)));
        }
        bus.emit(&IndustryData::default());
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = Broadcaster::new();
        let c = Rc::clone(&count);
        let id = bus.subscribe(Box::new(move |_| *c.borrow_mut() += 1));
        bus.emit(&IndustryData::default());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&IndustryData::default());
        assert_eq!(*count.borrow(), 1);
        assert!(bus.is_empty());
    }
}
