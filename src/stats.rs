//! The statistics sink protocol (§6.2).
use ahash::AHashMap;

/// Abstract collaborator that increments hierarchical counters. Any
/// implementation satisfying this trait suffices (§1).
pub trait Stats {
    /// Increments the counter at the hierarchical key formed by joining
    /// `path` with `.`, by `delta`.
    fn add_stat(&mut self, delta: i64, path: &[&str]);
}

/// An `AHashMap`-backed [`Stats`] sink keyed by the dotted path joined from
/// each `add_stat` call, e.g. `"types.object"`, `"keys.kind"`.
#[derive(Debug, Default, Clone)]
pub struct TreeStats {
    counters: AHashMap<String, i64>,
}

impl TreeStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> i64 {
        self.counters.get(path).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn counters(&self) -> &AHashMap<String, i64> {
        &self.counters
    }
}

impl Stats for TreeStats {
    fn add_stat(&mut self, delta: i64, path: &[&str]) {
        let key = path.join(".");
        *self.counters.entry(key).or_insert(0) += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_stat_builds_dotted_key() {
        let mut stats = TreeStats::new();
        stats.add_stat(1, &["types", "object"]);
        stats.add_stat(1, &["types", "object"]);
        assert_eq!(stats.get("types.object"), 2);
    }
}
