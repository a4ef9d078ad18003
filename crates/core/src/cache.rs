use std::collections::HashMap;

/// Name-keyed cache of last-known remote entities, scoped by owner (a
/// project for knowledge bases, a knowledge base for documents).
///
/// Not authoritative: every full listing replaces its scope wholesale via
/// [`EntityCache::refresh_scope`], and every mutating adapter call updates
/// it synchronously. There is no TTL.
#[derive(Debug)]
pub struct EntityCache<V> {
    entries: HashMap<(String, String), V>,
}

impl<V> Default for EntityCache<V> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<V: Clone> EntityCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, scope: &str, name: &str, value: V) {
        self.entries.insert((scope.to_owned(), name.to_owned()), value);
    }

    pub fn get(&self, scope: &str, name: &str) -> Option<V> {
        self.entries.get(&(scope.to_owned(), name.to_owned())).cloned()
    }

    pub fn remove(&mut self, scope: &str, name: &str) -> Option<V> {
        self.entries.remove(&(scope.to_owned(), name.to_owned()))
    }

    /// Replaces every entry under `scope` with a fresh listing.
    pub fn refresh_scope(&mut self, scope: &str, fresh: impl IntoIterator<Item = (String, V)>) {
        self.entries.retain(|(entry_scope, _), _| entry_scope != scope);
        for (name, value) in fresh {
            self.entries.insert((scope.to_owned(), name), value);
        }
    }

    pub fn scope_len(&self, scope: &str) -> usize {
        self.entries.keys().filter(|(entry_scope, _)| entry_scope == scope).count()
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
    use super::EntityCache;

    #[test]
    fn put_get_remove_round_trip() {
        let mut cache = EntityCache::new();
        cache.put("kb-1", "notes.pdf", 7u32);

        assert_eq!(cache.get("kb-1", "notes.pdf"), Some(7));
        assert_eq!(cache.get("kb-2", "notes.pdf"), None);
        assert_eq!(cache.remove("kb-1", "notes.pdf"), Some(7));
        assert!(cache.is_empty());
    }

    #[test]
    fn refresh_scope_replaces_only_that_scope() {
        let mut cache = EntityCache::new();
        cache.put("kb-1", "stale.pdf", 1u32);
        cache.put("kb-2", "other.pdf", 2);

        cache.refresh_scope("kb-1", vec![("fresh-a.pdf".to_owned(), 3), ("fresh-b.pdf".to_owned(), 4)]);

        assert_eq!(cache.get("kb-1", "stale.pdf"), None);
        assert_eq!(cache.get("kb-1", "fresh-a.pdf"), Some(3));
        assert_eq!(cache.get("kb-2", "other.pdf"), Some(2));
        assert_eq!(cache.scope_len("kb-1"), 2);
    }

    #[test]
    fn refresh_scope_with_empty_listing_clears_scope() {
        let mut cache = EntityCache::new();
        cache.put("kb-1", "doc.csv", 1u32);

        cache.refresh_scope("kb-1", Vec::new());

        assert_eq!(cache.scope_len("kb-1"), 0);
    }
}
