// Case-insensitive name bookkeeping for tracked lists.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Lookup key for a name. Character names compare without regard to case.
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Case-insensitive index over a list: folded name -> (position, spelling)
/// of its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct CaseIndex {
    entries: HashMap<String, (usize, String)>,
}

impl CaseIndex {
    pub fn build(names: &[String]) -> Self {
        let mut entries = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            entries
                .entry(fold(name))
                .or_insert_with(|| (idx, name.clone()));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<(usize, &str)> {
        self.entries
            .get(&fold(name))
            .map(|(idx, stored)| (*idx, stored.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    /// Record `name` at `idx`, replacing any previous entry for its key.
    pub fn set(&mut self, idx: usize, name: &str) {
        self.entries.insert(fold(name), (idx, name.to_string()));
    }

    /// Forget the entry stored under `name`'s key.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&fold(name));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Set of folded names, for membership-only checks.
pub fn folded_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|n| fold(n)).collect()
}

/// Groups of spellings sharing a folded key, keeping only groups with more
/// than one entry. Variants appear in list order.
pub fn find_duplicates(names: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        groups.entry(fold(name)).or_default().push(name.clone());
    }
    groups.retain(|_, variants| variants.len() > 1);
    groups
}

/// First occurrence of each folded key, in original order.
pub fn dedup_first(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .iter()
        .filter(|name| seen.insert(fold(name)))
        .cloned()
        .collect()
}
