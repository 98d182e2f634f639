use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqlock_core::{Requirement, ResolveError, SpecifierSet};
use reqlock_resolver::{Repository, Resolver};
use semver::Version;

use super::*;

fn test_registry_root() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let unique = format!(
        "reqlock-registry-test-{}-{stamp}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    );
    std::env::temp_dir().join(unique)
}

fn write_release(root: &PathBuf, name: &str, file_name: &str, content: &str) {
    let package_dir = root.join(name);
    fs::create_dir_all(&package_dir).expect("must create package directory");
    fs::write(package_dir.join(file_name), content).expect("must write metadata");
}

fn req(line: &str) -> Requirement {
    Requirement::parse(line).expect("requirement must parse")
}

fn small_registry() -> PathBuf {
    let root = test_registry_root();
    write_release(
        &root,
        "small-fake-a",
        "small-fake-a-0.1.0.toml",
        r#"
name = "small-fake-a"
version = "0.1.0"
artifact = "small-fake-a-0.1.0.tar.gz"
"#,
    );
    fs::write(
        root.join("small-fake-a").join("small-fake-a-0.1.0.tar.gz"),
        b"small-fake-a artifact bytes\n",
    )
    .expect("must write artifact");
    write_release(
        &root,
        "small-fake-a",
        "small-fake-a-0.2.0.toml",
        r#"
name = "small-fake-a"
version = "0.2.0"
"#,
    );
    root
}

#[test]
fn find_best_match_picks_highest_admitted_version() {
    let root = small_registry();
    let repository = DirectoryRepository::open(&root);

    let best = repository
        .find_best_match(&req("small-fake-a"))
        .expect("must match");
    assert_eq!(best, Version::new(0, 2, 0));

    let best = repository
        .find_best_match(&req("small-fake-a<0.2.0"))
        .expect("must match constrained");
    assert_eq!(best, Version::new(0, 1, 0));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn find_best_match_reports_tried_versions() {
    let root = small_registry();
    let repository = DirectoryRepository::open(&root);

    let err = repository
        .find_best_match(&req("small-fake-a>=9.0.0"))
        .expect_err("must fail");
    assert_eq!(
        err.to_string(),
        "Could not find a version that matches small-fake-a>=9.0.0\nTried: 0.1.0, 0.2.0"
    );

    let err = repository
        .find_best_match(&req("ghost"))
        .expect_err("must fail for unknown package");
    assert!(err.to_string().contains("Tried: (no version found at all)"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn dependencies_include_extras_only_when_requested() {
    let root = test_registry_root();
    write_release(
        &root,
        "server",
        "server-2.0.0.toml",
        r#"
name = "server"
version = "2.0.0"

[dependencies]
core = ">=1.0.0"

[extras.tls]
openssl-shim = ">=16.0.0"
"#,
    );
    let repository = DirectoryRepository::open(&root);

    let base = repository
        .get_dependencies(&req("server==2.0.0"))
        .expect("must list dependencies");
    assert_eq!(base.len(), 1);
    assert_eq!(base[0].name, "core");

    let with_extra = repository
        .get_dependencies(&req("server[tls]==2.0.0"))
        .expect("must list extra dependencies");
    let names: Vec<&str> = with_extra.iter().map(|dep| dep.key()).collect();
    assert_eq!(names, vec!["core", "openssl-shim"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn hashes_are_computed_from_the_artifact_file() {
    let root = small_registry();
    let repository = DirectoryRepository::open(&root);

    let hashes = repository
        .get_hashes(&req("small-fake-a==0.1.0"))
        .expect("must hash artifact");
    assert_eq!(
        hashes.iter().cloned().collect::<Vec<_>>(),
        vec![
            "sha256:3b85c18d126f22e185e5dd98ed5868ebb2e7206b6e33037581c577edd43863da"
                .to_string()
        ]
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_artifact_reports_hash_unavailable() {
    let root = small_registry();
    let repository = DirectoryRepository::open(&root);

    let err = repository
        .get_hashes(&req("small-fake-a==0.2.0"))
        .expect_err("must fail without artifact");
    let ResolveError::HashUnavailable { name, reason } = err else {
        panic!("expected HashUnavailable");
    };
    assert_eq!(name, "small-fake-a");
    assert!(reason.contains("no artifact recorded"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn unreadable_artifact_reports_hash_unavailable() {
    let root = small_registry();
    fs::remove_file(root.join("small-fake-a").join("small-fake-a-0.1.0.tar.gz"))
        .expect("must remove artifact");
    let repository = DirectoryRepository::open(&root);

    let err = repository
        .get_hashes(&req("small-fake-a==0.1.0"))
        .expect_err("must fail on unreadable artifact");
    assert!(matches!(err, ResolveError::HashUnavailable { .. }));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn unpinned_queries_violate_the_contract() {
    let root = small_registry();
    let repository = DirectoryRepository::open(&root);

    let err = repository
        .get_dependencies(&req("small-fake-a>=0.1.0"))
        .expect_err("must reject unpinned dependency query");
    assert!(matches!(err, ResolveError::PreconditionViolated(_)));

    let err = repository
        .get_hashes(&req("small-fake-a"))
        .expect_err("must reject unpinned hash query");
    assert!(matches!(err, ResolveError::PreconditionViolated(_)));

    let err = repository
        .get_hashes(&req("-e ./small-fake-a"))
        .expect_err("must reject editable hash query");
    assert!(matches!(err, ResolveError::PreconditionViolated(_)));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn candidate_listings_are_cached_until_cleared() {
    let root = small_registry();
    let repository = DirectoryRepository::open(&root);

    repository
        .find_best_match(&req("small-fake-a"))
        .expect("must match");

    fs::remove_dir_all(root.join("small-fake-a")).expect("must remove package directory");
    let best = repository
        .find_best_match(&req("small-fake-a"))
        .expect("cached listing must still answer");
    assert_eq!(best, Version::new(0, 2, 0));

    repository.clear_caches();
    let err = repository
        .find_best_match(&req("small-fake-a"))
        .expect_err("cleared cache must re-read the directory");
    assert!(matches!(err, ResolveError::NoMatchingVersion { .. }));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_requirements_resolve_through_the_source_map() {
    let root = test_registry_root();
    write_release(
        &root,
        "y",
        "y-1.0.0.toml",
        r#"
name = "y"
version = "1.0.0"

[dependencies]
small-fake-a = ">=0.1.0"
"#,
    );
    write_release(
        &root,
        "small-fake-a",
        "small-fake-a-0.1.0.toml",
        r#"
name = "small-fake-a"
version = "0.1.0"
"#,
    );
    fs::write(
        root.join("sources.toml"),
        r#"
[sources]
"git+https://fake.org/x/y.git#egg=y" = "y/y-1.0.0.toml"
"#,
    )
    .expect("must write source map");
    let repository = DirectoryRepository::open(&root);

    let editable = req("-e git+https://fake.org/x/y.git#egg=y");
    let version = repository
        .find_best_match(&editable)
        .expect("source metadata must satisfy");
    assert_eq!(version, Version::new(1, 0, 0));

    let dependencies = repository
        .get_dependencies(&editable)
        .expect("must list source dependencies");
    assert_eq!(dependencies.len(), 1);
    assert_eq!(dependencies[0].name, "small-fake-a");

    let err = repository
        .get_dependencies(&req("-e git+https://fake.org/other.git#egg=z"))
        .expect_err("must reject unmapped source");
    assert!(err.to_string().contains("unknown source"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_dependencies_include_requested_extras() {
    let root = test_registry_root();
    write_release(
        &root,
        "y",
        "y-1.0.0.toml",
        r#"
name = "y"
version = "1.0.0"

[dependencies]
base-dep = ">=1.0.0"

[extras.tls]
tls-dep = ">=1.0.0"
"#,
    );
    fs::write(
        root.join("sources.toml"),
        r#"
[sources]
"git+https://fake.org/x/y.git#egg=y" = "y/y-1.0.0.toml"
"#,
    )
    .expect("must write source map");
    let repository = DirectoryRepository::open(&root);

    let bare = req("-e git+https://fake.org/x/y.git#egg=y");
    let base = repository
        .get_dependencies(&bare)
        .expect("must list source dependencies");
    let names: Vec<&str> = base.iter().map(|dep| dep.key()).collect();
    assert_eq!(names, vec!["base-dep"]);

    let mut with_extra = bare.clone();
    with_extra.extras.insert("tls".to_string());
    let extended = repository
        .get_dependencies(&with_extra)
        .expect("must list extra dependencies");
    let names: Vec<&str> = extended.iter().map(|dep| dep.key()).collect();
    assert_eq!(names, vec!["base-dep", "tls-dep"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_entry_absorbing_extras_is_reexpanded() {
    let root = test_registry_root();
    write_release(
        &root,
        "y",
        "y-1.0.0.toml",
        r#"
name = "y"
version = "1.0.0"

[dependencies]
base-dep = ">=1.0.0"

[extras.tls]
tls-dep = ">=1.0.0"
"#,
    );
    write_release(
        &root,
        "base-dep",
        "base-dep-1.0.0.toml",
        r#"
name = "base-dep"
version = "1.0.0"
"#,
    );
    write_release(
        &root,
        "tls-dep",
        "tls-dep-1.0.0.toml",
        r#"
name = "tls-dep"
version = "1.0.0"
"#,
    );
    write_release(
        &root,
        "z-app",
        "z-app-1.0.0.toml",
        r#"
name = "z-app"
version = "1.0.0"

[dependencies]
"y[tls]" = ""
"#,
    );
    fs::write(
        root.join("sources.toml"),
        r#"
[sources]
"git+https://fake.org/x/y.git#egg=y" = "y/y-1.0.0.toml"
"#,
    )
    .expect("must write source map");
    let repository = DirectoryRepository::open(&root);

    // y expands before z-app merges the tls extra into it; the extra's
    // dependencies must still land in the final set.
    let roots = vec![req("-e git+https://fake.org/x/y.git#egg=y"), req("z-app")];
    let pinned = Resolver::new(&repository)
        .resolve(&roots)
        .expect("must resolve");

    assert!(pinned.contains_key("tls-dep"));
    let y = pinned.get("y").expect("y must be resolved");
    assert!(y.extras.contains("tls"));
    assert!(pinned.contains_key("base-dep"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn source_metadata_incompatible_with_pin_is_a_conflict() {
    let root = test_registry_root();
    write_release(
        &root,
        "y",
        "y-1.0.0.toml",
        r#"
name = "y"
version = "1.0.0"
"#,
    );
    fs::write(
        root.join("sources.toml"),
        r#"
[sources]
"git+https://fake.org/x/y.git#egg=y" = "y/y-1.0.0.toml"
"#,
    )
    .expect("must write source map");
    let repository = DirectoryRepository::open(&root);

    let mut pinned_source = req("git+https://fake.org/x/y.git#egg=y");
    pinned_source.specifiers = SpecifierSet::parse("==2.0.0").expect("must parse");

    let err = repository
        .get_dependencies(&pinned_source)
        .expect_err("must conflict with source metadata version");
    let message = err.to_string();
    assert!(message.contains("Incompatible requirements found"));
    assert!(message.contains("y==1.0.0"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn metadata_filed_under_the_wrong_package_is_rejected() {
    let root = test_registry_root();
    write_release(
        &root,
        "small-fake-a",
        "imposter.toml",
        r#"
name = "imposter"
version = "1.0.0"
"#,
    );
    let repository = DirectoryRepository::open(&root);

    let err = repository
        .find_best_match(&req("small-fake-a"))
        .expect_err("must reject misfiled metadata");
    assert!(err.to_string().contains("found under 'small-fake-a'"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn corrupt_metadata_is_a_repository_error() {
    let root = test_registry_root();
    write_release(&root, "broken", "broken-1.0.0.toml", "name = [not toml");
    let repository = DirectoryRepository::open(&root);

    let err = repository
        .find_best_match(&req("broken"))
        .expect_err("must fail on corrupt metadata");
    let ResolveError::Repository(message) = err else {
        panic!("expected Repository error");
    };
    assert!(message.contains("failed parsing release metadata"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn release_metadata_rejects_self_dependency() {
    let err = ReleaseMetadata::from_toml_str(
        r#"
name = "loop-pkg"
version = "1.0.0"

[dependencies]
loop-pkg = ">=1.0.0"
"#,
    )
    .expect_err("must reject self dependency");
    assert!(err.to_string().contains("depends on itself"));
}

#[test]
fn local_pins_repository_reuses_satisfying_pins() {
    let root = small_registry();
    let fallback = DirectoryRepository::open(&root);
    let repository = LocalPinsRepository::new(vec![req("small-fake-a==0.1.0")], fallback);

    let reused = repository
        .find_best_match(&req("small-fake-a>=0.1.0"))
        .expect("pin must be reused");
    assert_eq!(reused, Version::new(0, 1, 0));

    let fresh = repository
        .find_best_match(&req("small-fake-a>=0.2.0"))
        .expect("must fall back past a stale pin");
    assert_eq!(fresh, Version::new(0, 2, 0));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn local_pins_repository_keys_by_canonical_name() {
    let root = test_registry_root();
    write_release(
        &root,
        "foo-bar",
        "foo-bar-42.0.0.toml",
        r#"
name = "foo-bar"
version = "42.0.0"
"#,
    );
    let fallback = DirectoryRepository::open(&root);
    let repository = LocalPinsRepository::new(vec![req("foo.bar==42.0.0")], fallback);

    assert!(repository.existing_pin("foo-bar").is_some());
    let reused = repository
        .find_best_match(&req("Foo_Bar"))
        .expect("pin must be reused across name spellings");
    assert_eq!(reused, Version::new(42, 0, 0));

    let _ = fs::remove_dir_all(&root);
}
