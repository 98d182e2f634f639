use std::collections::{BTreeMap, BTreeSet};

use reqlock_core::{Requirement, ResolveError};
use reqlock_resolver::Repository;
use semver::Version;

#[derive(Debug)]
pub struct LocalPinsRepository<R> {
    existing_pins: BTreeMap<String, Requirement>,
    fallback: R,
}

impl<R> LocalPinsRepository<R> {
    pub fn new(existing_pins: impl IntoIterator<Item = Requirement>, fallback: R) -> Self {
        let existing_pins = existing_pins
            .into_iter()
            .filter(|pin| pin.source.is_none() && pin.pinned_version().is_some())
            .map(|pin| (pin.key().to_string(), pin))
            .collect();
        Self {
            existing_pins,
            fallback,
        }
    }

    pub fn existing_pin(&self, name: &str) -> Option<&Requirement> {
        self.existing_pins.get(name)
    }
}

impl<R: Repository> Repository for LocalPinsRepository<R> {
    fn find_best_match(&self, requirement: &Requirement) -> Result<Version, ResolveError> {
        if let Some(pin) = self.existing_pins.get(requirement.key()) {
            if let Some(version) = pin.pinned_version() {
                if requirement.specifiers.matches(&version) {
                    return Ok(version);
                }
            }
        }
        self.fallback.find_best_match(requirement)
    }

    fn get_dependencies(
        &self,
        requirement: &Requirement,
    ) -> Result<Vec<Requirement>, ResolveError> {
        self.fallback.get_dependencies(requirement)
    }

    fn get_hashes(&self, requirement: &Requirement) -> Result<BTreeSet<String>, ResolveError> {
        self.fallback.get_hashes(requirement)
    }

    fn clear_caches(&self) {
        self.fallback.clear_caches()
    }

    fn freshen_build_caches(&self) {
        self.fallback.freshen_build_caches()
    }
}
