//! Networks, their vendor sets and their quarter calendars.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notify::{RegistryEvent, RegistryObserver, SubscriptionId, Subscribers};
use crate::quarters::{QuarterConfig, QuarterDefinition, QuarterSeed, SeedPattern};
use crate::storage::ConfigStorage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub vendors: BTreeSet<String>,
    pub quarters: QuarterConfig,
}

impl NetworkConfig {
    pub fn new<I, S>(name: &str, vendors: I, quarters: QuarterConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.trim().to_string(),
            vendors: clean_vendors(vendors),
            quarters,
        }
    }
}

fn clean_vendors<I, S>(vendors: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    vendors
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

// (name, vendors, quarter layout)
const DEFAULT_NETWORKS: &[(&str, &[&str], SeedPattern)] = &[
    (
        "BSNL",
        &["RAITEL INFRA PRIVATE LIMITED", "ALSTONIA ENERGY SOLUTIONS PVT LTD", "VODAFONE INDIA LTD"],
        SeedPattern::FiscalHalves,
    ),
    (
        "P2P",
        &["POWER GRID CORPORATION OF INDIA LTD", "VELOCIS SYSTEMS PRIVATE LIMITED", "TATA COMMUNICATIONS LTD"],
        SeedPattern::FiscalQuarters,
    ),
    (
        "ILL",
        &["BHARTI AIRTEL LIMITED", "RELIANCE JIO INFOCOMM LIMITED", "VODAFONE IDEA LIMITED"],
        SeedPattern::FiscalQuarters,
    ),
    (
        "AWS",
        &["AMAZON WEB SERVICES", "MICROSOFT AZURE", "GOOGLE CLOUD PLATFORM"],
        SeedPattern::FiscalQuarters,
    ),
    (
        "Switches",
        &["CISCO SYSTEMS", "JUNIPER NETWORKS", "HUAWEI TECHNOLOGIES"],
        SeedPattern::FiscalQuarters,
    ),
    (
        "F5",
        &["F5 NETWORKS INC", "CITRIX SYSTEMS", "A10 NETWORKS"],
        SeedPattern::FiscalQuarters,
    ),
];

type NetworkMap = BTreeMap<String, NetworkConfig>;

/// Shared registry of networks.
///
/// Every mutation runs on a copy of the state under the lock, is persisted,
/// and only then replaces the live state; a failed save leaves the registry
/// exactly as it was and fires no event. Events go out after the lock is
/// released, so subscribers may call back into the registry.
pub struct NetworkRegistry {
    networks: Mutex<NetworkMap>,
    storage: Box<dyn ConfigStorage>,
    subscribers: Subscribers,
}

impl NetworkRegistry {
    pub fn open(storage: impl ConfigStorage + 'static) -> Result<Self> {
        let networks: NetworkMap = storage
            .load_config()?
            .unwrap_or_default()
            .into_iter()
            .map(|n| (n.name.clone(), n))
            .collect();
        info!("Loaded {} networks", networks.len());
        Ok(Self {
            networks: Mutex::new(networks),
            storage: Box::new(storage),
            subscribers: Subscribers::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, NetworkMap> {
        // State is only replaced after a successful save, so a poisoned
        // guard still holds a consistent map.
        self.networks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `change` to a copy of the state. `None` from `change` means the
    /// call was rejected: nothing is saved or announced.
    fn commit<F>(&self, change: F) -> Result<bool>
    where
        F: FnOnce(&mut NetworkMap) -> Option<RegistryEvent>,
    {
        let event = {
            let mut live = self.lock();
            let mut next = live.clone();
            let Some(event) = change(&mut next) else {
                return Ok(false);
            };
            let snapshot: Vec<NetworkConfig> = next.values().cloned().collect();
            self.storage.save_config(&snapshot)?;
            *live = next;
            event
        };
        debug!("Registry committed: {event:?}");
        self.subscribers.deliver(&event);
        Ok(true)
    }

    pub fn subscribe(&self, observer: Arc<dyn RegistryObserver>) -> SubscriptionId {
        self.subscribers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Register `name` with `vendors`. The calendar comes from `seed`: a
    /// named layout or an explicit configuration.
    pub fn add_network<I, S>(&self, name: &str, vendors: I, seed: impl Into<QuarterSeed>) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let network = NetworkConfig::new(name, vendors, seed.into().into_config());
        self.commit(|map| {
            if map.contains_key(name) {
                return None;
            }
            map.insert(name.to_string(), network);
            Some(RegistryEvent::NetworksChanged)
        })
    }

    /// Move a network, with its vendors and calendar, to a new name.
    /// Existing bill records keep the old name.
    pub fn rename_network(&self, old_name: &str, new_name: &str) -> Result<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == old_name {
            return Ok(false);
        }
        self.commit(|map| {
            if map.contains_key(new_name) {
                return None;
            }
            let mut network = map.remove(old_name)?;
            network.name = new_name.to_string();
            map.insert(new_name.to_string(), network);
            Some(RegistryEvent::NetworksChanged)
        })
    }

    /// Drop a network. Bill records referring to it are left untouched.
    pub fn delete_network(&self, name: &str) -> Result<bool> {
        self.commit(|map| {
            map.remove(name)?;
            Some(RegistryEvent::NetworksChanged)
        })
    }

    pub fn add_vendor(&self, network: &str, vendor: &str) -> Result<bool> {
        let vendor = vendor.trim();
        if vendor.is_empty() {
            return Ok(false);
        }
        self.commit(|map| {
            let entry = map.get_mut(network)?;
            entry
                .vendors
                .insert(vendor.to_string())
                .then(|| RegistryEvent::VendorsChanged(network.to_string()))
        })
    }

    pub fn rename_vendor(&self, network: &str, old_vendor: &str, new_vendor: &str) -> Result<bool> {
        let new_vendor = new_vendor.trim();
        if new_vendor.is_empty() || new_vendor == old_vendor {
            return Ok(false);
        }
        self.commit(|map| {
            let entry = map.get_mut(network)?;
            if entry.vendors.contains(new_vendor) || !entry.vendors.remove(old_vendor) {
                return None;
            }
            entry.vendors.insert(new_vendor.to_string());
            Some(RegistryEvent::VendorsChanged(network.to_string()))
        })
    }

    pub fn delete_vendor(&self, network: &str, vendor: &str) -> Result<bool> {
        self.commit(|map| {
            map.get_mut(network)?
                .vendors
                .remove(vendor)
                .then(|| RegistryEvent::VendorsChanged(network.to_string()))
        })
    }

    /// Replace the calendar of an existing network.
    pub fn set_quarter_configuration(&self, network: &str, quarters: QuarterConfig) -> Result<bool> {
        self.commit(|map| {
            map.get_mut(network)?.quarters = quarters;
            Some(RegistryEvent::NetworksChanged)
        })
    }

    /// Install the default network set. Only runs against an empty registry.
    pub fn seed_defaults(&self) -> Result<bool> {
        self.commit(|map| {
            if !map.is_empty() {
                return None;
            }
            for (name, vendors, pattern) in DEFAULT_NETWORKS {
                map.insert(
                    name.to_string(),
                    NetworkConfig::new(name, vendors.iter(), pattern.config()),
                );
            }
            Some(RegistryEvent::NetworksChanged)
        })
    }

    pub fn get_quarter_configuration(&self, network: &str) -> Option<QuarterConfig> {
        self.lock().get(network).map(|n| n.quarters.clone())
    }

    pub fn get_quarter_period(&self, network: &str, quarter_number: u32) -> Option<QuarterDefinition> {
        self.lock()
            .get(network)
            .and_then(|n| n.quarters.get(quarter_number).cloned())
    }

    pub fn quarter_labels(&self, network: &str) -> Vec<String> {
        self.lock()
            .get(network)
            .map(|n| n.quarters.labels())
            .unwrap_or_default()
    }

    /// Network names in ascending order.
    pub fn get_all_networks(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn get_network(&self, name: &str) -> Option<NetworkConfig> {
        self.lock().get(name).cloned()
    }

    /// Vendors of `network`, sorted; empty for an unknown network.
    pub fn get_vendors(&self, network: &str) -> Vec<String> {
        self.lock()
            .get(network)
            .map(|n| n.vendors.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_vendors(&self) -> Vec<String> {
        let all: BTreeSet<String> = self
            .lock()
            .values()
            .flat_map(|n| n.vendors.iter().cloned())
            .collect();
        all.into_iter().collect()
    }

    pub fn network_exists(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn vendor_exists_in_network(&self, network: &str, vendor: &str) -> bool {
        self.lock()
            .get(network)
            .is_some_and(|n| n.vendors.contains(vendor))
    }

    /// First network, by name, whose vendor set holds `vendor`.
    pub fn network_for_vendor(&self, vendor: &str) -> Option<String> {
        self.lock()
            .values()
            .find(|n| n.vendors.contains(vendor))
            .map(|n| n.name.clone())
    }
}
