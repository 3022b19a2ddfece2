//! Keyed store for objects that outlive a single solve.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Typed `exists / get / put` store with explicit removal.
#[derive(Debug)]
pub struct Registry<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for Registry<K, V> {
    fn default() -> Self {
        Registry { entries: HashMap::new() }
    }
}

impl<K: Eq + Hash, V> Registry<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get_mut(key)
    }

    /// Store `value`, returning the entry it replaced.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key)
    }

    /// Drop every entry whose key matches `pred`.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !pred(k));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let mut reg: Registry<String, u32> = Registry::new();
        assert!(!reg.exists("p"));
        assert_eq!(reg.put("p".to_string(), 1), None);
        assert_eq!(reg.put("p".to_string(), 2), Some(1));
        assert_eq!(reg.get("p"), Some(&2));
        *reg.get_mut("p").unwrap() += 1;
        assert_eq!(reg.remove("p"), Some(3));
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_where_filters_keys() {
        let mut reg: Registry<(String, usize), f64> = Registry::new();
        for c in 0..3 {
            reg.put(("U".to_string(), c), c as f64);
        }
        reg.put(("p".to_string(), 0), 0.0);
        assert_eq!(reg.remove_where(|(f, _)| f == "U"), 3);
        assert_eq!(reg.len(), 1);
    }
}
