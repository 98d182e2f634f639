use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use reqlock_core::{Requirement, ResolveError, SourceLocator};
use reqlock_resolver::{require_expandable, require_hashable, Repository};
use semver::Version;
use sha2::{Digest, Sha256};

use crate::metadata::{ReleaseMetadata, SourceMap};

const HASH_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Default)]
pub struct DirectoryRepository {
    root: PathBuf,
    candidates: RefCell<HashMap<String, Vec<ReleaseMetadata>>>,
    dependencies: RefCell<HashMap<String, Vec<Requirement>>>,
}

impl DirectoryRepository {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            candidates: RefCell::new(HashMap::new()),
            dependencies: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_versions(&self, name: &str) -> Result<Vec<ReleaseMetadata>, ResolveError> {
        if let Some(cached) = self.candidates.borrow().get(name) {
            return Ok(cached.clone());
        }

        let releases = self.load_package_versions(name)?;
        self.candidates
            .borrow_mut()
            .insert(name.to_string(), releases.clone());
        Ok(releases)
    }

    fn load_package_versions(&self, name: &str) -> Result<Vec<ReleaseMetadata>, ResolveError> {
        let package_dir = self.root.join(name);
        if !package_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&package_dir)
            .with_context(|| format!("failed to read package directory: {name}"))
            .map_err(repository_error)?;

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read package directory: {name}"))
                .map_err(repository_error)?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }

            let release = read_metadata_file(&path)?;
            if release.name != name {
                return Err(ResolveError::repository(format!(
                    "release metadata for '{}' found under '{name}': {}",
                    release.name,
                    path.display()
                )));
            }
            releases.push(release);
        }

        releases.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(releases)
    }

    fn release_for(&self, name: &str, version: &Version) -> Result<ReleaseMetadata, ResolveError> {
        self.package_versions(name)?
            .into_iter()
            .find(|release| release.version == *version)
            .ok_or_else(|| {
                ResolveError::repository(format!("no release metadata for '{name}=={version}'"))
            })
    }

    fn source_metadata(&self, locator: &SourceLocator) -> Result<ReleaseMetadata, ResolveError> {
        let map_path = self.root.join("sources.toml");
        let content = fs::read_to_string(&map_path)
            .with_context(|| format!("failed to read source map: {}", map_path.display()))
            .map_err(repository_error)?;
        let map = SourceMap::from_toml_str(&content).map_err(repository_error)?;

        let relative = map.sources.get(&locator.location).ok_or_else(|| {
            ResolveError::repository(format!("unknown source '{locator}' in source map"))
        })?;
        read_metadata_file(&self.root.join(relative))
    }

    fn source_release(&self, requirement: &Requirement) -> Result<ReleaseMetadata, ResolveError> {
        let Some(locator) = &requirement.source else {
            return Err(ResolveError::PreconditionViolated(format!(
                "expected a source requirement, got '{requirement}'"
            )));
        };
        let release = self.source_metadata(locator)?;
        if !requirement.specifiers.is_empty() && !requirement.specifiers.matches(&release.version) {
            return Err(ResolveError::Conflict {
                name: requirement.name.clone(),
                left: requirement.to_string(),
                right: format!("{}=={}", release.name, release.version),
                left_via: requirement.via.iter().cloned().collect(),
                right_via: Vec::new(),
            });
        }
        Ok(release)
    }
}

impl Repository for DirectoryRepository {
    fn find_best_match(&self, requirement: &Requirement) -> Result<Version, ResolveError> {
        if requirement.source.is_some() {
            return Ok(self.source_release(requirement)?.version);
        }

        let releases = self.package_versions(&requirement.name)?;
        let best = releases
            .iter()
            .filter(|release| requirement.specifiers.matches(&release.version))
            .max_by(|a, b| a.version.cmp(&b.version))
            .map(|release| release.version.clone());

        match best {
            Some(version) => Ok(version),
            None => {
                let mut tried: Vec<Version> =
                    releases.into_iter().map(|release| release.version).collect();
                tried.sort();
                Err(ResolveError::NoMatchingVersion {
                    name: requirement.name.clone(),
                    requirement: requirement.to_string(),
                    tried,
                    via: requirement.via.iter().cloned().collect(),
                })
            }
        }
    }

    fn get_dependencies(
        &self,
        requirement: &Requirement,
    ) -> Result<Vec<Requirement>, ResolveError> {
        require_expandable(requirement)?;

        let cache_key = requirement.dependency_key();
        if let Some(cached) = self.dependencies.borrow().get(&cache_key) {
            return Ok(cached.clone());
        }

        let (release, extras) = if requirement.source.is_some() {
            (self.source_release(requirement)?, requirement.extras.clone())
        } else {
            let version = requirement.pinned_version().ok_or_else(|| {
                ResolveError::PreconditionViolated(format!(
                    "expected a pinned requirement, got '{requirement}'"
                ))
            })?;
            (
                self.release_for(&requirement.name, &version)?,
                requirement.extras.clone(),
            )
        };

        let dependencies = release
            .requirement_lines(&extras)
            .iter()
            .map(|line| Requirement::parse(line))
            .collect::<Result<Vec<_>, _>>()?;

        self.dependencies
            .borrow_mut()
            .insert(cache_key, dependencies.clone());
        Ok(dependencies)
    }

    fn get_hashes(&self, requirement: &Requirement) -> Result<BTreeSet<String>, ResolveError> {
        require_hashable(requirement)?;

        let version = requirement.pinned_version().ok_or_else(|| {
            ResolveError::PreconditionViolated(format!(
                "expected a pinned requirement, got '{requirement}'"
            ))
        })?;
        let release = self.release_for(&requirement.name, &version)?;

        let Some(artifact) = &release.artifact else {
            return Err(ResolveError::HashUnavailable {
                name: requirement.name.clone(),
                reason: format!("no artifact recorded for {}=={version}", requirement.name),
            });
        };

        let artifact_path = self.root.join(&requirement.name).join(artifact);
        let digest = hash_file(&artifact_path).map_err(|err| ResolveError::HashUnavailable {
            name: requirement.name.clone(),
            reason: format!("{err:#}"),
        })?;
        Ok(BTreeSet::from([digest]))
    }

    fn clear_caches(&self) {
        self.candidates.borrow_mut().clear();
        self.dependencies.borrow_mut().clear();
    }
}

fn read_metadata_file(path: &Path) -> Result<ReleaseMetadata, ResolveError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read release metadata: {}", path.display()))
        .map_err(repository_error)?;
    ReleaseMetadata::from_toml_str(&content)
        .with_context(|| format!("failed parsing release metadata: {}", path.display()))
        .map_err(repository_error)
}

fn hash_file(path: &Path) -> anyhow::Result<String> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open artifact: {}", path.display()))?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_CHUNK_SIZE];
    loop {
        let read = reader
            .read(&mut buffer)
            .with_context(|| format!("failed to read artifact: {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

fn repository_error(err: anyhow::Error) -> ResolveError {
    ResolveError::repository(format!("{err:#}"))
}
