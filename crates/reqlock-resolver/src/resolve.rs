use std::collections::{BTreeMap, BTreeSet};

use reqlock_core::{Requirement, ResolveError};

use crate::merge::merge;
use crate::repository::Repository;
use crate::types::{ResolutionResult, ResolvedRequirement};

pub const DEFAULT_MAX_ROUNDS: usize = 10;

pub struct Resolver<'r, R: Repository> {
    repository: &'r R,
    max_rounds: usize,
}

pub fn compile<R: Repository>(
    roots: &[Requirement],
    repository: &R,
) -> Result<ResolutionResult, ResolveError> {
    Resolver::new(repository).compile(roots)
}

impl<'r, R: Repository> Resolver<'r, R> {
    pub fn new(repository: &'r R) -> Self {
        Self {
            repository,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn compile(&self, roots: &[Requirement]) -> Result<ResolutionResult, ResolveError> {
        let pinned = self.resolve(roots)?;
        self.attach_hashes(pinned)
    }

    pub fn resolve(
        &self,
        roots: &[Requirement],
    ) -> Result<BTreeMap<String, Requirement>, ResolveError> {
        let mut working: BTreeMap<String, Requirement> = BTreeMap::new();
        for root in roots {
            insert_merged(&mut working, root.clone())?;
        }

        let mut expanded: BTreeSet<String> = BTreeSet::new();
        for _ in 0..self.max_rounds {
            let snapshot = working.clone();
            let batch: Vec<String> = working.keys().cloned().collect();

            for name in &batch {
                let Some(entry) = working.get_mut(name) else {
                    continue;
                };
                if entry.editable || entry.source.is_some() {
                    continue;
                }
                if expanded.contains(&entry.dependency_key()) {
                    continue;
                }
                let version = self.repository.find_best_match(entry)?;
                entry.pin_to(version);
            }

            for name in &batch {
                let Some(entry) = working.get(name).cloned() else {
                    continue;
                };
                if !entry.is_pinned() {
                    continue;
                }
                let marker = entry.dependency_key();
                if expanded.contains(&marker) {
                    continue;
                }
                let dependencies = self.repository.get_dependencies(&entry)?;
                expanded.insert(marker);
                for dependency in dependencies {
                    insert_merged(&mut working, dependency.with_via(name))?;
                }
            }

            if working == snapshot {
                return Ok(working);
            }
        }

        Err(ResolveError::RoundLimitExceeded {
            rounds: self.max_rounds,
        })
    }

    pub fn attach_hashes(
        &self,
        pinned: BTreeMap<String, Requirement>,
    ) -> Result<ResolutionResult, ResolveError> {
        let mut requirements = BTreeMap::new();
        for (name, requirement) in pinned {
            let hashes = if requirement.editable || requirement.source.is_some() {
                BTreeSet::new()
            } else {
                self.repository.get_hashes(&requirement)?
            };
            requirements.insert(name, ResolvedRequirement {
                requirement,
                hashes,
            });
        }
        Ok(ResolutionResult { requirements })
    }
}

fn insert_merged(
    working: &mut BTreeMap<String, Requirement>,
    incoming: Requirement,
) -> Result<(), ResolveError> {
    let key = incoming.key().to_string();
    match working.remove(&key) {
        None => {
            working.insert(key, incoming);
        }
        Some(existing) => {
            let merged = merge(&existing, &incoming)?;
            working.insert(key, merged);
        }
    }
    Ok(())
}
