use rustc_hash::FxHashMap;

use crate::val::Value;

/// Insertion-ordered string-keyed map.
///
/// Backs computed-value attributes and function parameter scopes. Iteration
/// yields entries in insertion order, which keeps debug output reproducible.
/// Replacing an existing key keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
    index: FxHashMap<String, usize>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn put<S: Into<String>>(&mut self, name: S, value: Value) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&slot| &self.entries[slot].1)
    }

    pub fn delete(&mut self, name: &str) -> Option<Value> {
        let slot = self.index.remove(name)?;
        let (_, value) = self.entries.remove(slot);
        for entry in self.index.values_mut() {
            if *entry > slot {
                *entry -= 1;
            }
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (S, Value)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.put(k, v);
        }
        map
    }
}
