use std::collections::HashMap;
use std::hash::Hash;

struct Scope<K, V> {
    undo_map: HashMap<K, Option<V>>,
}

/// Nested scopes of bindings; popping a scope restores whatever its insertions shadowed
pub(crate) struct ScopeMap<K, V> {
    map: HashMap<K, V>,
    scopes: Vec<Scope<K, V>>,
}

impl<K: Eq + Hash + Clone, V> ScopeMap<K, V> {
    pub fn new() -> Self {
        ScopeMap { map: HashMap::new(), scopes: Vec::new() }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope { undo_map: HashMap::new() });
    }

    pub fn pop_scope(&mut self) {
        let scope = self.scopes.pop().expect("internal error: popped empty stack from ScopeMap");
        for (key, value) in scope.undo_map {
            self.map.remove(&key);
            if let Some(value) = value {
                self.map.insert(key, value);
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Err if key was already bound, in this scope or an enclosing one
    pub fn insert(&mut self, key: K, value: V) -> Result<(), ()> {
        let scope = self
            .scopes
            .last_mut()
            .expect("internal error: must push at least one scope in ScopeMap");
        let prev = self.map.insert(key.clone(), value);
        let was_bound = prev.is_some();
        if !scope.undo_map.contains_key(&key) {
            scope.undo_map.insert(key, prev);
        }
        if was_bound { Err(()) } else { Ok(()) }
    }
}
