use std::collections::BTreeSet;

use reqlock_core::{Requirement, ResolveError};
use semver::Version;

pub trait Repository {
    fn find_best_match(&self, requirement: &Requirement) -> Result<Version, ResolveError>;

    fn get_dependencies(&self, requirement: &Requirement)
        -> Result<Vec<Requirement>, ResolveError>;

    fn get_hashes(&self, requirement: &Requirement) -> Result<BTreeSet<String>, ResolveError>;

    fn clear_caches(&self) {}

    fn freshen_build_caches(&self) {}
}

impl<R: Repository + ?Sized> Repository for &R {
    fn find_best_match(&self, requirement: &Requirement) -> Result<Version, ResolveError> {
        (**self).find_best_match(requirement)
    }

    fn get_dependencies(
        &self,
        requirement: &Requirement,
    ) -> Result<Vec<Requirement>, ResolveError> {
        (**self).get_dependencies(requirement)
    }

    fn get_hashes(&self, requirement: &Requirement) -> Result<BTreeSet<String>, ResolveError> {
        (**self).get_hashes(requirement)
    }

    fn clear_caches(&self) {
        (**self).clear_caches()
    }

    fn freshen_build_caches(&self) {
        (**self).freshen_build_caches()
    }
}

pub fn require_expandable(requirement: &Requirement) -> Result<(), ResolveError> {
    if requirement.editable || requirement.is_pinned() {
        return Ok(());
    }
    Err(ResolveError::PreconditionViolated(format!(
        "expected a pinned or editable requirement, got '{requirement}'"
    )))
}

pub fn require_hashable(requirement: &Requirement) -> Result<(), ResolveError> {
    if requirement.editable || requirement.source.is_some() {
        return Err(ResolveError::PreconditionViolated(format!(
            "cannot hash editable or source requirement '{requirement}'"
        )));
    }
    if requirement.pinned_version().is_none() {
        return Err(ResolveError::PreconditionViolated(format!(
            "cannot hash unpinned requirement '{requirement}'"
        )));
    }
    Ok(())
}
