use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::StoreError;
use crate::index::{IndexFn, IndexRegistry, IndexedRelation};
use crate::object::{ObjectKey, StoreObject};
use crate::traits::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl OpKind {
    pub fn is_write(&self) -> bool {
        matches!(self, OpKind::Create | OpKind::Update | OpKind::Delete)
    }
}

/// A successfully completed store call. List calls carry an empty name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOp {
    pub kind: OpKind,
    pub key: ObjectKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    Unavailable,
    Conflict,
    Rejected,
}

/// Makes matching calls fail instead of touching the store.
#[derive(Debug, Clone)]
pub struct Fault {
    op: OpKind,
    name: Option<String>,
    remaining: usize,
    error: FaultError,
}

impl Fault {
    pub fn on(op: OpKind) -> Self {
        Self {
            op,
            name: None,
            remaining: 1,
            error: FaultError::Unavailable,
        }
    }

    /// Only fail calls addressing this object name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.remaining = n;
        self
    }

    pub fn error(mut self, error: FaultError) -> Self {
        self.error = error;
        self
    }

    fn matches(&self, op: OpKind, key: &ObjectKey) -> bool {
        self.remaining > 0
            && self.op == op
            && self.name.as_deref().map_or(true, |n| n == key.name)
    }

    fn to_error(&self, key: &ObjectKey) -> StoreError {
        let msg = format!("injected {:?} failure on {}", self.op, key);
        match self.error {
            FaultError::Unavailable => StoreError::Unavailable(msg),
            FaultError::Conflict => StoreError::Conflict(msg),
            FaultError::Rejected => StoreError::Rejected(msg),
        }
    }
}

struct State<K> {
    objects: BTreeMap<ObjectKey, K>,
    relation: IndexedRelation,
    ops: Vec<StoreOp>,
    faults: Vec<Fault>,
    version: u64,
}

impl<K> State<K> {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn check_fault(&mut self, op: OpKind, key: &ObjectKey) -> StoreResult<()> {
        if let Some(f) = self.faults.iter_mut().find(|f| f.matches(op, key)) {
            f.remaining -= 1;
            let err = f.to_error(key);
            self.faults.retain(|f| f.remaining > 0);
            return Err(err);
        }
        Ok(())
    }

    fn record(&mut self, kind: OpKind, key: ObjectKey) {
        self.ops.push(StoreOp { kind, key });
    }
}

/// In-process object store. Assigns UIDs and resource versions like an API
/// server would, keeps registered indexes materialised on every write, and
/// records each completed call so tests can assert on write traffic.
#[derive(Clone)]
pub struct MemoryStore<K> {
    state: Arc<RwLock<State<K>>>,
    indexes: Arc<IndexRegistry<K>>,
}

impl<K: StoreObject> Default for MemoryStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StoreObject> MemoryStore<K> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                objects: BTreeMap::new(),
                relation: IndexedRelation::new(),
                ops: Vec::new(),
                faults: Vec::new(),
                version: 0,
            })),
            indexes: Arc::new(IndexRegistry::new()),
        }
    }

    /// Insert or replace an object as-is, bypassing UID assignment, faults and
    /// the op log. Stands in for writes made by other actors.
    pub async fn seed(&self, obj: K) -> K {
        let key = ObjectKey::of(&obj);
        let indexes = self.indexes.snapshot().await;
        let mut st = self.state.write().await;
        let mut obj = obj;
        if obj.meta().resource_version.is_none() {
            obj.meta_mut().resource_version = Some(st.next_version());
        }
        for (name, f) in &indexes {
            st.relation.upsert(name, &key, f(&obj));
        }
        st.objects.insert(key, obj.clone());
        obj
    }

    pub async fn inject(&self, fault: Fault) {
        self.state.write().await.faults.push(fault);
    }

    pub async fn ops(&self) -> Vec<StoreOp> {
        self.state.read().await.ops.clone()
    }

    pub async fn writes(&self) -> Vec<StoreOp> {
        self.state
            .read()
            .await
            .ops
            .iter()
            .filter(|op| op.kind.is_write())
            .cloned()
            .collect()
    }

    pub async fn clear_ops(&self) {
        self.state.write().await.ops.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn require_name(key: &ObjectKey) -> StoreResult<()> {
    if key.name.is_empty() {
        return Err(StoreError::InvalidObject(format!(
            "object in namespace '{}' has no name",
            key.namespace
        )));
    }
    Ok(())
}

#[async_trait]
impl<K: StoreObject> ObjectStore<K> for MemoryStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>> {
        let key = ObjectKey::new(namespace, name);
        let mut st = self.state.write().await;
        st.check_fault(OpKind::Get, &key)?;
        let found = st.objects.get(&key).cloned();
        st.record(OpKind::Get, key);
        Ok(found)
    }

    async fn list(&self, namespace: &str) -> StoreResult<Vec<K>> {
        let key = ObjectKey::new(namespace, "");
        let mut st = self.state.write().await;
        st.check_fault(OpKind::List, &key)?;
        let items = st
            .objects
            .iter()
            .filter(|(k, _)| k.namespace == namespace)
            .map(|(_, v)| v.clone())
            .collect();
        st.record(OpKind::List, key);
        Ok(items)
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        require_name(&key)?;
        let indexes = self.indexes.snapshot().await;
        let mut st = self.state.write().await;
        st.check_fault(OpKind::Create, &key)?;
        if st.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        let mut stored = obj.clone();
        let version = st.next_version();
        let meta = stored.meta_mut();
        if meta.uid.is_none() {
            meta.uid = Some(uuid::Uuid::new_v4().to_string());
        }
        meta.resource_version = Some(version);
        for (name, f) in &indexes {
            st.relation.upsert(name, &key, f(&stored));
        }
        trace!(%key, "memory store: create");
        st.objects.insert(key.clone(), stored.clone());
        st.record(OpKind::Create, key);
        Ok(stored)
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        require_name(&key)?;
        let indexes = self.indexes.snapshot().await;
        let mut st = self.state.write().await;
        st.check_fault(OpKind::Update, &key)?;
        let current = st
            .objects
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let current_meta = current.meta();
        if let Some(rv) = obj.meta().resource_version.as_deref() {
            if current_meta.resource_version.as_deref() != Some(rv) {
                return Err(StoreError::Conflict(format!(
                    "{} was modified (have version {}, stored {})",
                    key,
                    rv,
                    current_meta.resource_version.as_deref().unwrap_or("")
                )));
            }
        }
        let uid = current_meta.uid.clone();
        let mut stored = obj.clone();
        let version = st.next_version();
        let meta = stored.meta_mut();
        meta.uid = uid;
        meta.resource_version = Some(version);
        for (name, f) in &indexes {
            st.relation.upsert(name, &key, f(&stored));
        }
        trace!(%key, "memory store: update");
        st.objects.insert(key.clone(), stored.clone());
        st.record(OpKind::Update, key);
        Ok(stored)
    }

    async fn delete(&self, obj: &K) -> StoreResult<()> {
        let key = ObjectKey::of(obj);
        let mut st = self.state.write().await;
        st.check_fault(OpKind::Delete, &key)?;
        if st.objects.remove(&key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        st.relation.remove(&key);
        trace!(%key, "memory store: delete");
        st.record(OpKind::Delete, key);
        Ok(())
    }

    async fn register_index(
        &self,
        key: &str,
        extractor: IndexFn<K>,
    ) -> StoreResult<()> {
        self.indexes.register(key, extractor.clone()).await?;
        let mut st = self.state.write().await;
        let entries: Vec<(ObjectKey, Vec<String>)> = st
            .objects
            .iter()
            .map(|(k, obj)| (k.clone(), extractor(obj)))
            .collect();
        for (obj_key, values) in entries {
            st.relation.upsert(key, &obj_key, values);
        }
        Ok(())
    }

    async fn index_extractor(&self, key: &str) -> Option<IndexFn<K>> {
        self.indexes.get(key).await
    }

    async fn list_by_index(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> StoreResult<Vec<K>> {
        if self.indexes.get(key).await.is_none() {
            return Err(StoreError::IndexNotFound(key.to_string()));
        }
        let list_key = ObjectKey::new(namespace, "");
        let mut st = self.state.write().await;
        st.check_fault(OpKind::List, &list_key)?;
        let items = st
            .relation
            .lookup(key, value)
            .into_iter()
            .filter(|k| k.namespace == namespace)
            .filter_map(|k| st.objects.get(&k).cloned())
            .collect();
        st.record(OpKind::List, list_key);
        Ok(items)
    }
}
