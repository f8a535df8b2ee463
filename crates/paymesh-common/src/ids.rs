// Collision-resistant id generation

use uuid::Uuid;

/// Generator for prefixed identifiers (`pay_…`, `task_…`, `tx_…`).
/// Backed by UUID v4, so ids are collision-resistant for the process
/// lifetime without any shared counter.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator;

impl IdGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn new_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_carry_prefix() {
        let ids = IdGenerator::new();
        let id = ids.new_id("task");
        assert!(id.starts_with("task_"));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids = IdGenerator::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.new_id("tx")).collect();
        assert_eq!(generated.len(), 1000);
    }
}
