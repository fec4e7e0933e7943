//! End-to-end tests of the `paddle` binary that need no package index.

use crate::common::{TestProject, project_file};
use predicates::prelude::*;

#[test]
fn test_tasks_lists_builtin_and_declared_tasks() {
    let project = TestProject::new().unwrap();
    project
        .write_project(&project_file(
            r#"
[tasks.test]
command = ["pytest"]
depends_on = ["resolveRequirements"]
description = "Runs the test suite"
"#,
        ))
        .unwrap();

    project
        .paddle()
        .arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolveRepositories"))
        .stdout(predicate::str::contains("test - Runs the test suite"))
        .stdout(predicate::str::contains("depends on: resolveRepositories"))
        .stdout(predicate::str::contains("depends on: resolveRequirements"));
}

#[cfg(unix)]
#[test]
fn test_command_task_is_skipped_until_inputs_change() {
    let project = TestProject::new().unwrap();
    project.write_file("src/main.py", "print('v1')").unwrap();
    project
        .write_project(&project_file(
            r#"
[tasks.build]
command = ["sh", "-c", "echo built >> build.log && cp src/main.py dist.py"]
inputs = ["src"]
outputs = ["dist.py"]
"#,
        ))
        .unwrap();

    project
        .paddle()
        .args(["run", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("> Task :build"))
        .stdout(predicate::str::contains("BUILD SUCCESSFUL"));
    assert_eq!(project.read_file("dist.py").unwrap(), "print('v1')");

    project
        .paddle()
        .args(["run", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("> Task :build UP-TO-DATE"));
    assert_eq!(project.read_file("build.log").unwrap().lines().count(), 1);

    project.write_file("src/main.py", "print('v2')").unwrap();
    project.paddle().args(["run", "build"]).assert().success();
    assert_eq!(project.read_file("build.log").unwrap().lines().count(), 2);
    assert_eq!(project.read_file("dist.py").unwrap(), "print('v2')");
}

#[cfg(unix)]
#[test]
fn test_failed_dependency_stops_dependents() {
    let project = TestProject::new().unwrap();
    project
        .write_project(&project_file(
            r#"
[tasks.compile]
command = ["sh", "-c", "exit 2"]

[tasks.package]
command = ["touch", "packaged"]
depends_on = ["compile"]
"#,
        ))
        .unwrap();

    project
        .paddle()
        .args(["run", "package"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("> Task :compile FAILED"))
        .stderr(predicate::str::contains("'sh' exited with status 2"))
        .stderr(predicate::str::contains("1 of 1 tasks failed: package"));
    assert!(!project.project_path().join("packaged").exists());
}

#[cfg(unix)]
#[test]
fn test_requests_run_independently() {
    let project = TestProject::new().unwrap();
    project
        .write_project(&project_file(
            r#"
[tasks.broken]
command = ["false"]

[tasks.fine]
command = ["touch", "fine.txt"]
"#,
        ))
        .unwrap();

    project
        .paddle()
        .args(["run", "broken", "fine"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✓ fine"))
        .stderr(predicate::str::contains("✗ broken"));
    assert!(project.project_path().join("fine.txt").exists());
}

#[test]
fn test_unknown_task() {
    let project = TestProject::new().unwrap();
    project.write_project(&project_file("")).unwrap();

    project
        .paddle()
        .args(["run", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task 'nope' not found"));
}

#[test]
fn test_circular_dependency_is_reported_with_chain() {
    let project = TestProject::new().unwrap();
    project
        .write_project(&project_file(
            r#"
[tasks.a]
command = ["true"]
depends_on = ["b"]

[tasks.b]
command = ["true"]
depends_on = ["a"]
"#,
        ))
        .unwrap();

    project
        .paddle()
        .args(["run", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency detected: a -> b -> a"));
}

#[test]
fn test_missing_project_file() {
    let project = TestProject::new().unwrap();

    project
        .paddle()
        .arg("tasks")
        .assert()
        .failure()
        .stderr(predicate::str::contains("paddle.toml not found"));
}

#[test]
fn test_numeric_python_version_is_rejected() {
    let project = TestProject::new().unwrap();
    project.write_project(&project_file("[environment]\npython = 3.8\n")).unwrap();

    project
        .paddle()
        .arg("tasks")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid project file"));
}

#[test]
fn test_project_dir_flag() {
    let project = TestProject::new().unwrap();
    project.write_project(&project_file("")).unwrap();
    let elsewhere = tempfile::TempDir::new().unwrap();

    project
        .paddle()
        .current_dir(elsewhere.path())
        .arg("--project-dir")
        .arg(project.project_path())
        .arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolveRequirements"));
}

#[test]
fn test_conflicting_primary_repositories() {
    let project = TestProject::new().unwrap();
    project
        .write_project(&project_file(
            r#"
[[repositories]]
name = "internal"
url = "https://pypi.internal.example/simple"
"#,
        ))
        .unwrap();
    project
        .write_global_config(
            r#"
[[repositories]]
name = "mirror"
url = "https://mirror.example/simple"
secondary = false
"#,
        )
        .unwrap();

    project
        .paddle()
        .arg("index-args")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Found at least 2 repositories"))
        .stderr(predicate::str::contains("internal"))
        .stderr(predicate::str::contains("mirror"));
}
