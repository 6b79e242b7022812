use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::object::ObjectKey;
use crate::traits::StoreResult;

/// Derives the index values of an object. An object may map to any number of
/// values, including none (it is then absent from the index).
pub type IndexFn<K> = Arc<dyn Fn(&K) -> Vec<String> + Send + Sync>;

/// Named index extractors registered against a store. Each key can be
/// registered once for the lifetime of the store.
pub struct IndexRegistry<K> {
    extractors: RwLock<HashMap<String, IndexFn<K>>>,
}

impl<K> Default for IndexRegistry<K> {
    fn default() -> Self {
        Self {
            extractors: RwLock::new(HashMap::new()),
        }
    }
}

impl<K> IndexRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        key: &str,
        extractor: IndexFn<K>,
    ) -> StoreResult<()> {
        let mut w = self.extractors.write().await;
        if w.contains_key(key) {
            return Err(StoreError::IndexConflict(key.to_string()));
        }
        debug!(index = key, "index registered");
        w.insert(key.to_string(), extractor);
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Option<IndexFn<K>> {
        self.extractors.read().await.get(key).cloned()
    }

    pub async fn snapshot(&self) -> Vec<(String, IndexFn<K>)> {
        self.extractors
            .read()
            .await
            .iter()
            .map(|(k, f)| (k.clone(), f.clone()))
            .collect()
    }
}

/// Materialised `index key -> value -> objects` relation.
#[derive(Debug, Default, Clone)]
pub struct IndexedRelation {
    entries: HashMap<String, HashMap<String, BTreeSet<ObjectKey>>>,
}

impl IndexedRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever `obj` was indexed under for `index` with `values`.
    pub fn upsert(&mut self, index: &str, obj: &ObjectKey, values: Vec<String>) {
        self.remove_from(index, obj);
        let table = self.entries.entry(index.to_string()).or_default();
        for v in values {
            table.entry(v).or_default().insert(obj.clone());
        }
    }

    /// Drop `obj` from every index.
    pub fn remove(&mut self, obj: &ObjectKey) {
        let indexes: Vec<String> = self.entries.keys().cloned().collect();
        for index in indexes {
            self.remove_from(&index, obj);
        }
    }

    pub fn lookup(&self, index: &str, value: &str) -> BTreeSet<ObjectKey> {
        self.entries
            .get(index)
            .and_then(|t| t.get(value))
            .cloned()
            .unwrap_or_default()
    }

    fn remove_from(&mut self, index: &str, obj: &ObjectKey) {
        if let Some(table) = self.entries.get_mut(index) {
            table.retain(|_, objs| {
                objs.remove(obj);
                !objs.is_empty()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn registering_the_same_key_twice_is_rejected() {
        let reg: IndexRegistry<String> = IndexRegistry::new();
        reg.register("by-len", Arc::new(|s: &String| vec![s.len().to_string()]))
            .await
            .unwrap();
        let err = reg
            .register("by-len", Arc::new(|_: &String| vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexConflict(k) if k == "by-len"));
        assert!(logs_contain("index registered"));

        let f = reg.get("by-len").await.expect("registered");
        assert_eq!(f(&"abc".to_string()), vec!["3".to_string()]);
        assert!(reg.get("missing").await.is_none());
    }

    #[test]
    fn relation_moves_object_between_values() {
        let mut rel = IndexedRelation::new();
        let a = ObjectKey::new("ns", "a");
        let b = ObjectKey::new("ns", "b");
        rel.upsert("owner", &a, vec!["u1".into()]);
        rel.upsert("owner", &b, vec!["u1".into()]);
        assert_eq!(rel.lookup("owner", "u1").len(), 2);

        rel.upsert("owner", &a, vec!["u2".into()]);
        assert_eq!(rel.lookup("owner", "u1"), BTreeSet::from([b.clone()]));
        assert_eq!(rel.lookup("owner", "u2"), BTreeSet::from([a.clone()]));

        rel.remove(&b);
        assert!(rel.lookup("owner", "u1").is_empty());
        assert!(rel.lookup("other", "u1").is_empty());
    }
}
