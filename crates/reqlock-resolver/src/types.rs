use std::collections::{BTreeMap, BTreeSet};

use reqlock_core::Requirement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequirement {
    pub requirement: Requirement,
    pub hashes: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionResult {
    pub requirements: BTreeMap<String, ResolvedRequirement>,
}

impl ResolutionResult {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.requirements.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedRequirement> {
        self.requirements.get(name)
    }
}
