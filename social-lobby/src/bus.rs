//! Fan-out of a single upstream callback to any number of subscribers.
//!
//! The upstream collaborator gets one [`Publisher`]. Published events sit in
//! the ingress queue until [`EventBus::pump`] copies each of them, in delivery
//! order, into every subscriber's queue. Subscribers drain on their own
//! schedule, so nobody is invoked re-entrantly from inside the callback.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

pub struct Publisher<E> {
    sender: Sender<E>,
}

impl<E> Publisher<E> {
    /// Returns false once the bus is gone.
    pub fn publish(&self, event: E) -> bool {
        self.sender.send(event).is_ok()
    }
}

impl<E> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

pub struct Subscription<E> {
    name: String,
    receiver: Receiver<E>,
}

impl<E> Subscription<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

struct Subscriber<E> {
    name: String,
    sender: Sender<E>,
}

pub struct EventBus<E> {
    ingress_sender: Sender<E>,
    ingress: Receiver<E>,
    subscribers: Vec<Subscriber<E>>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        let (ingress_sender, ingress) = unbounded();
        Self {
            ingress_sender,
            ingress,
            subscribers: Vec::new(),
        }
    }

    pub fn publisher(&self) -> Publisher<E> {
        Publisher {
            sender: self.ingress_sender.clone(),
        }
    }

    pub fn subscribe(&mut self, name: &str) -> Subscription<E> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(Subscriber {
            name: name.to_owned(),
            sender,
        });
        Subscription {
            name: name.to_owned(),
            receiver,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver everything published so far. Subscribers whose
    /// [`Subscription`] was dropped are removed. Returns the number of
    /// events moved out of the ingress queue.
    pub fn pump(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.ingress.try_recv() {
            count += 1;
            self.subscribers.retain(|subscriber| {
                let alive = subscriber.sender.send(event.clone()).is_ok();
                if !alive {
                    debug!("Subscriber {} went away, removing.", subscriber.name);
                }
                alive
            });
        }
        count
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
