use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Context};
use reqlock_core::{canonical_name, validate_package_name};
use semver::Version;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub name: String,
    pub version: Version,
    pub artifact: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub extras: BTreeMap<String, BTreeMap<String, String>>,
}

impl ReleaseMetadata {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let mut metadata: Self =
            toml::from_str(input).context("failed to parse release metadata")?;
        metadata.name = canonical_name(&metadata.name);
        validate_package_name(&metadata.name)
            .map_err(|err| anyhow!("bad package name in release metadata: {err}"))?;
        if metadata
            .dependencies
            .keys()
            .any(|dep| canonical_name(dep) == metadata.name)
        {
            return Err(anyhow!(
                "release metadata '{}' depends on itself",
                metadata.name
            ));
        }
        Ok(metadata)
    }

    pub fn requirement_lines(&self, extras: &BTreeSet<String>) -> Vec<String> {
        let mut lines: Vec<String> = self
            .dependencies
            .iter()
            .map(|(name, spec)| format!("{name}{spec}"))
            .collect();
        for extra in extras {
            if let Some(extra_deps) = self.extras.get(extra) {
                lines.extend(
                    extra_deps
                        .iter()
                        .map(|(name, spec)| format!("{name}{spec}")),
                );
            }
        }
        lines
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SourceMap {
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

impl SourceMap {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        toml::from_str(input).context("failed to parse source map")
    }
}
