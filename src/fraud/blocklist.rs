// src/fraud/blocklist.rs - Known-fraud address list

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::info;

/// Addresses with confirmed fraud involvement. Any transaction touching a
/// listed address short-circuits analysis to a critical block.
#[derive(Debug, Default)]
pub struct Blocklist {
    addresses: Mutex<HashSet<String>>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addresses(addresses: impl IntoIterator<Item = String>) -> Self {
        Self {
            addresses: Mutex::new(addresses.into_iter().collect()),
        }
    }

    pub fn block(&self, address: &str) {
        let mut addresses = self.addresses.lock().expect("blocklist mutex poisoned");
        if addresses.insert(address.to_string()) {
            info!(address = %address, "Address added to blocklist");
        }
    }

    pub fn unblock(&self, address: &str) {
        let mut addresses = self.addresses.lock().expect("blocklist mutex poisoned");
        if addresses.remove(address) {
            info!(address = %address, "Address removed from blocklist");
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        let addresses = self.addresses.lock().expect("blocklist mutex poisoned");
        addresses.contains(address)
    }

    pub fn blocked_addresses(&self) -> Vec<String> {
        let addresses = self.addresses.lock().expect("blocklist mutex poisoned");
        addresses.iter().cloned().collect()
    }
}
