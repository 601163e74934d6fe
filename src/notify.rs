//! Change notification for network registry subscribers.
//!
//! Delivery is synchronous and in subscription order. Each subscriber is
//! isolated: an `Err` or a panic from one callback is logged and the
//! remaining subscribers still receive the event.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use log::warn;

/// Receiver of registry change events. Both callbacks default to no-ops.
pub trait RegistryObserver: Send + Sync {
    /// A network was added, renamed or deleted, or a quarter calendar changed.
    fn on_networks_changed(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// The vendor set of `network` changed.
    fn on_vendors_changed(&self, _network: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    NetworksChanged,
    VendorsChanged(String),
}

impl RegistryEvent {
    fn name(&self) -> &'static str {
        match self {
            RegistryEvent::NetworksChanged => "networks changed",
            RegistryEvent::VendorsChanged(_) => "vendors changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct SubscriberList {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<dyn RegistryObserver>)>,
}

#[derive(Default)]
pub struct Subscribers {
    inner: Mutex<SubscriberList>,
}

impl Subscribers {
    pub fn subscribe(&self, observer: Arc<dyn RegistryObserver>) -> SubscriptionId {
        let mut list = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = SubscriptionId(list.next_id);
        list.next_id += 1;
        list.entries.push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut list = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = list.entries.len();
        list.entries.retain(|(entry_id, _)| *entry_id != id);
        list.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    /// Deliver `event` to everyone subscribed right now.
    ///
    /// The list is snapshotted first so callbacks may subscribe, unsubscribe
    /// or query the registry without deadlocking.
    pub fn deliver(&self, event: &RegistryEvent) {
        let snapshot: Vec<Arc<dyn RegistryObserver>> = {
            let list = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            list.entries.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for observer in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
                RegistryEvent::NetworksChanged => observer.on_networks_changed(),
                RegistryEvent::VendorsChanged(network) => observer.on_vendors_changed(network),
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Subscriber failed handling '{}': {e:#}", event.name()),
                Err(_) => warn!("Subscriber panicked handling '{}'", event.name()),
            }
        }
    }
}

#[cfg(test)]
pub mod recording {
    use super::*;

    /// Observer that records every event it sees.
    #[derive(Default)]
    pub struct Recorder {
        pub events: Mutex<Vec<RegistryEvent>>,
    }

    impl Recorder {
        pub fn events(&self) -> Vec<RegistryEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl RegistryObserver for Recorder {
        fn on_networks_changed(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(RegistryEvent::NetworksChanged);
            Ok(())
        }

        fn on_vendors_changed(&self, network: &str) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(RegistryEvent::VendorsChanged(network.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::Recorder;
    use super::*;

    struct Failing;

    impl RegistryObserver for Failing {
        fn on_networks_changed(&self) -> anyhow::Result<()> {
            anyhow::bail!("panel closed")
        }
    }

    struct Panicking;

    impl RegistryObserver for Panicking {
        fn on_vendors_changed(&self, _network: &str) -> anyhow::Result<()> {
            panic!("boom")
        }
    }

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let subs = Subscribers::default();
        let recorder = Arc::new(Recorder::default());
        subs.subscribe(Arc::new(Failing));
        subs.subscribe(Arc::new(Panicking));
        subs.subscribe(recorder.clone());

        subs.deliver(&RegistryEvent::NetworksChanged);
        subs.deliver(&RegistryEvent::VendorsChanged("P2P".to_string()));

        assert_eq!(
            recorder.events(),
            vec![
                RegistryEvent::NetworksChanged,
                RegistryEvent::VendorsChanged("P2P".to_string())
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let subs = Subscribers::default();
        let recorder = Arc::new(Recorder::default());
        let id = subs.subscribe(recorder.clone());
        assert!(subs.unsubscribe(id));
        assert!(!subs.unsubscribe(id));
        subs.deliver(&RegistryEvent::NetworksChanged);
        assert!(recorder.events().is_empty());
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        struct Tagged(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl RegistryObserver for Tagged {
            fn on_networks_changed(&self) -> anyhow::Result<()> {
                self.1.lock().unwrap().push(self.0);
                Ok(())
            }
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subs = Subscribers::default();
        for tag in ["first", "second", "third"] {
            subs.subscribe(Arc::new(Tagged(tag, seen.clone())));
        }
        subs.deliver(&RegistryEvent::NetworksChanged);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
