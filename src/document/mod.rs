use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Key-value data persisted for a single entity
///
/// Values are arbitrary JSON (scalars, nested objects, arrays); nothing about
/// their shape is enforced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    entries: HashMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Set a key, returning the previous value if there was one
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the entries out as a plain map
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.entries.clone()
    }

    pub fn into_map(self) -> HashMap<String, Value> {
        self.entries
    }
}

impl From<HashMap<String, Value>> for Document {
    fn from(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Live, shared view of an active entity's document.
///
/// Cloning yields another handle to the same document; any holder may read or
/// mutate it while the entity is active.
#[derive(Clone, Debug, Default)]
pub struct WorkingCopy {
    inner: Arc<RwLock<Document>>,
}

impl WorkingCopy {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(RwLock::new(document)),
        }
    }

    /// Point-in-time copy of the current contents
    pub fn snapshot(&self) -> Document {
        self.read(|doc| doc.clone())
    }

    /// Run `f` with shared access to the document
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        // A panicking writer leaves the map itself intact, so keep serving it.
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Run `f` with exclusive access to the document
    pub fn write<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read(|doc| doc.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.write(|doc| doc.set(key, value))
    }

    /// True when both handles point at the same underlying document
    pub fn same_as(&self, other: &WorkingCopy) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
