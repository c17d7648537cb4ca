use serde::{Deserialize, Serialize};

/// Ordered item counts. Keys keep their first-insertion order; a count that
/// reaches zero removes the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<(String, i32)>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `delta` to `key` and returns the new count. Counts never go
    /// below zero.
    pub fn add(&mut self, key: &str, delta: i32) -> i32 {
        let Some(index) = self.items.iter().position(|(item, _)| item == key) else {
            if delta <= 0 {
                return 0;
            }
            self.items.push((key.to_string(), delta));
            return delta;
        };

        let count = (self.items[index].1 + delta).max(0);
        if count == 0 {
            self.items.remove(index);
        } else {
            self.items[index].1 = count;
        }
        count
    }

    pub fn count(&self, key: &str) -> i32 {
        self.items
            .iter()
            .find(|(item, _)| item == key)
            .map_or(0, |(_, count)| *count)
    }

    pub fn has(&self, key: &str, amount: i32) -> bool {
        self.count(key) >= amount
    }

    pub fn entries(&self) -> &[(String, i32)] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl FromIterator<(String, i32)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (String, i32)>>(iter: T) -> Self {
        let mut inventory = Inventory::new();
        for (key, amount) in iter {
            inventory.add(&key, amount);
        }
        inventory
    }
}
