//! Repository commands served entirely from seeded index caches.
//!
//! The caches are produced with the library and an in-memory index client;
//! the binary then finds them in its cache directory and never needs the
//! network.

use crate::common::{TestProject, project_file};
use paddle_cli::repository::{
    LoadOptions, PackageRepositories, RepositoryDescriptor, RepositorySource,
};
use paddle_cli::test_utils::StaticIndexClient;
use predicates::prelude::*;

const PYPI: &str = "https://pypi.org/simple";
const INTERNAL: &str = "https://pypi.internal.example/simple";

const PROJECT_EXTRA: &str = r#"
[[repositories]]
name = "internal"
url = "https://pypi.internal.example/simple"
secondary = true

[requirements]
requests = ">=2.0, <3"
six = ""
"#;

fn client() -> StaticIndexClient {
    StaticIndexClient::new()
        .with_package(PYPI, "requests", &["2.30.0", "2.31.0", "3.0.0"])
        .with_package(PYPI, "requests-toolbelt", &["1.0.0"])
        .with_package(PYPI, "six", &["1.16.0"])
        .with_package(INTERNAL, "six", &["1.16.0", "1.17.0b1"])
        .with_package(INTERNAL, "internal-tools", &["0.1.0"])
}

/// Loads both repositories with every version fetched and saves their caches.
async fn seed(project: &TestProject) {
    let local = [RepositoryDescriptor::new("internal", INTERNAL).with_secondary(true)];
    let repositories = PackageRepositories::resolve(
        RepositorySource {
            label: "paddle.toml",
            descriptors: &local,
        },
        RepositorySource {
            label: "global configuration",
            descriptors: &[],
        },
    )
    .unwrap();

    let client = client();
    let index_dir = project.index_path();
    repositories.load(&client, &index_dir, LoadOptions::default()).await.unwrap();
    for name in ["requests", "requests-toolbelt", "six", "internal-tools"] {
        repositories.ensure_distributions(&client, name).await;
    }
    repositories.save_all(&index_dir).await.unwrap();
}

#[tokio::test]
async fn test_index_args_from_cache() {
    let project = TestProject::new().unwrap();
    project.write_project(&project_file(PROJECT_EXTRA)).unwrap();
    seed(&project).await;

    project.paddle().arg("index-args").assert().success().stdout(format!(
        "--index-url\n{PYPI}\n--extra-index-url\n{INTERNAL}\n"
    ));
}

#[tokio::test]
async fn test_search_attributes_packages() {
    let project = TestProject::new().unwrap();
    project.write_project(&project_file(PROJECT_EXTRA)).unwrap();
    seed(&project).await;

    project
        .paddle()
        .args(["search", "Requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("requests (pypi)"))
        .stdout(predicate::str::contains("requests-toolbelt (pypi)"))
        .stdout(predicate::str::contains("six").not());

    project
        .paddle()
        .args(["search", "six"])
        .assert()
        .success()
        .stdout(predicate::str::contains("six (pypi)"));

    project
        .paddle()
        .args(["search", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages start with 'zzz'"));
}

#[tokio::test]
async fn test_resolve_requirements_from_cache() {
    let project = TestProject::new().unwrap();
    project.write_project(&project_file(PROJECT_EXTRA)).unwrap();
    seed(&project).await;

    project
        .paddle()
        .args(["run", "resolveRequirements"])
        .assert()
        .success()
        .stdout(predicate::str::contains("> Task :resolveRepositories"))
        .stdout(predicate::str::contains("requests==2.31.0 (pypi)"))
        .stdout(predicate::str::contains("six==1.16.0 (pypi)"))
        .stdout(predicate::str::contains("BUILD SUCCESSFUL"));

    project
        .paddle()
        .args(["run", "resolveRequirements"])
        .assert()
        .success()
        .stdout(predicate::str::contains("> Task :resolveRequirements UP-TO-DATE"));
}

#[tokio::test]
async fn test_unsatisfiable_requirement_fails() {
    let project = TestProject::new().unwrap();
    let extra = PROJECT_EXTRA.replace("requests = \">=2.0, <3\"", "requests = \">=4\"");
    project.write_project(&project_file(&extra)).unwrap();
    seed(&project).await;

    project
        .paddle()
        .args(["run", "resolveRequirements"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("> Task :resolveRequirements FAILED"))
        .stderr(predicate::str::contains("requests (no version matches '>=4')"));
}
