use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

/// Normalized identity of a union: the emitted names of its options as a set
pub type OptionSet = BTreeSet<SmolStr>;

/// Information about a single registered union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionInfo {
    /// Registry key of the union
    pub key: SmolStr,
    /// Options with array wrapping stripped and renames applied
    pub options: OptionSet,
}

/// Index of every union by its normalized option set
///
/// Two unions with set-equal options are the same union, so the first union
/// registered for a set owns it.
#[derive(Debug, Clone, Default)]
pub struct UnionRegistry {
    /// Map from union key to union info
    unions: BTreeMap<SmolStr, UnionInfo>,
    /// Map from option set to the key that owns it
    by_options: BTreeMap<OptionSet, SmolStr>,
}

impl UnionRegistry {
    /// Register a union. Returns the key of an earlier union with the same
    /// options, if one exists, in which case nothing is recorded.
    pub fn register(&mut self, key: SmolStr, options: OptionSet) -> Option<SmolStr> {
        if let Some(existing) = self.by_options.get(&options) {
            return Some(existing.clone());
        }
        self.by_options.insert(options.clone(), key.clone());
        self.unions.insert(key.clone(), UnionInfo { key, options });
        None
    }

    /// Find the union whose options equal the candidate set
    pub fn find(&self, candidates: &OptionSet) -> Option<&UnionInfo> {
        let key = self.by_options.get(candidates)?;
        self.unions.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> OptionSet {
        names.iter().map(|n| SmolStr::new(n)).collect()
    }

    #[test]
    fn test_set_equal_options_share_a_union() {
        let mut registry = UnionRegistry::default();
        assert_eq!(registry.register("Animal".into(), set(&["Cat", "Dog"])), None);

        let existing = registry.register("EitherDogCat".into(), set(&["Dog", "Cat"]));
        assert_eq!(existing.as_deref(), Some("Animal"));
        assert_eq!(registry.register("DogCat".into(), set(&["Cat", "Dog"])).as_deref(), Some("Animal"));

        let found = registry.find(&set(&["Dog", "Cat"])).expect("find by set");
        assert_eq!(found.key, "Animal");
        assert!(registry.find(&set(&["Cat"])).is_none());
    }
}
