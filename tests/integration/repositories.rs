//! Index caching and requirement resolution across simulated runs.
//!
//! Each "run" builds a fresh [`PackageRepositories`] from the same
//! declarations, the way separate `paddle` invocations do.

use paddle_cli::config::Requirement;
use paddle_cli::repository::{
    LoadOptions, PackageRepositories, RepositoryDescriptor, RepositorySource,
};
use paddle_cli::resolver::resolve_requirements;
use paddle_cli::test_utils::StaticIndexClient;
use paddle_cli::version::VersionSpecifier;
use tempfile::TempDir;

const PYPI: &str = "https://pypi.org/simple";
const MIRROR: &str = "https://mirror.example/simple";

fn repositories(local: &[RepositoryDescriptor]) -> PackageRepositories {
    PackageRepositories::resolve(
        RepositorySource {
            label: "paddle.toml",
            descriptors: local,
        },
        RepositorySource {
            label: "global configuration",
            descriptors: &[],
        },
    )
    .unwrap()
}

fn requirement(name: &str, specifier: &str) -> Requirement {
    Requirement {
        name: name.to_string(),
        specifier: if specifier.is_empty() {
            None
        } else {
            Some(VersionSpecifier::parse(specifier).unwrap())
        },
    }
}

fn client() -> StaticIndexClient {
    StaticIndexClient::new()
        .with_package(PYPI, "attrs", &["22.2.0", "23.1.0"])
        .with_package(PYPI, "Flask", &["2.3.3", "3.0.0"])
        .with_package(MIRROR, "attrs", &["23.1.0", "24.0.0rc1"])
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let temp = TempDir::new().unwrap();
    let index_dir = temp.path().join("index");
    let mirror = [RepositoryDescriptor::new("mirror", MIRROR).with_secondary(true)];
    let requirements = [requirement("attrs", ">=22"), requirement("flask", "<3")];

    let first_client = client();
    let first = repositories(&mirror);
    first.load(&first_client, &index_dir, LoadOptions::default()).await.unwrap();
    let resolution = resolve_requirements(&first, &first_client, &requirements).await;
    assert!(resolution.is_complete());
    first.save_all(&index_dir).await.unwrap();
    assert_eq!(first_client.listing_requests(), 2);

    let second_client = client();
    let second = repositories(&mirror);
    second.load(&second_client, &index_dir, LoadOptions::default()).await.unwrap();
    let again = resolve_requirements(&second, &second_client, &requirements).await;
    assert_eq!(second_client.listing_requests(), 0);
    assert_eq!(second_client.version_requests(), 0);

    let selected: Vec<String> = again.resolved.iter().map(ToString::to_string).collect();
    assert_eq!(selected, ["attrs==23.1.0 (pypi)", "Flask==2.3.3 (pypi)"]);
}

#[tokio::test]
async fn test_refresh_refetches_every_repository() {
    let temp = TempDir::new().unwrap();
    let index_dir = temp.path().join("index");
    let mirror = [RepositoryDescriptor::new("mirror", MIRROR).with_secondary(true)];

    repositories(&mirror).load(&client(), &index_dir, LoadOptions::default()).await.unwrap();

    let refreshing = client();
    repositories(&mirror)
        .load(
            &refreshing,
            &index_dir,
            LoadOptions {
                refresh: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(refreshing.listing_requests(), 2);
}

#[tokio::test]
async fn test_prerelease_only_chosen_when_nothing_stable_matches() {
    let temp = TempDir::new().unwrap();
    let index_dir = temp.path().join("index");
    let mirror = [RepositoryDescriptor::new("mirror", MIRROR).with_secondary(true)];
    let index = client();
    let repos = repositories(&mirror);
    repos.load(&index, &index_dir, LoadOptions::default()).await.unwrap();

    let resolution = resolve_requirements(
        &repos,
        &index,
        &[requirement("attrs", ""), requirement("attrs", ">=24.0.0rc1")],
    )
    .await;
    let selected: Vec<String> = resolution.resolved.iter().map(ToString::to_string).collect();
    assert_eq!(selected, ["attrs==23.1.0 (pypi)", "attrs==24.0.0rc1 (mirror)"]);
}

#[tokio::test]
async fn test_missing_package_is_unresolved() {
    let temp = TempDir::new().unwrap();
    let index = client();
    let repos = repositories(&[]);
    repos.load(&index, temp.path(), LoadOptions::default()).await.unwrap();

    let resolution = resolve_requirements(&repos, &index, &[requirement("numpy", "")]).await;
    assert!(!resolution.is_complete());
    assert_eq!(
        resolution.unresolved[0].to_string(),
        "numpy (package not found in any repository)"
    );
}

#[tokio::test]
async fn test_empty_repository_only_adds_an_extra_index() {
    const EMPTY: &str = "https://empty.example/simple";
    let temp = TempDir::new().unwrap();
    let index = client().with_index(EMPTY);
    let repos = repositories(&[RepositoryDescriptor::new("empty", EMPTY).with_secondary(true)]);
    repos.load(&index, temp.path(), LoadOptions::default()).await.unwrap();

    assert_eq!(repos.installer_args(), ["--index-url", PYPI, "--extra-index-url", EMPTY]);
    assert!(repos.all().iter().all(|repo| repo.is_loaded()));

    let resolution = resolve_requirements(&repos, &index, &[requirement("attrs", "")]).await;
    let selected: Vec<String> = resolution.resolved.iter().map(ToString::to_string).collect();
    assert_eq!(selected, ["attrs==23.1.0 (pypi)"]);
}
