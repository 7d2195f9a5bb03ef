use assert_fs::TempDir;
use predicates::prelude::predicate;

mod common;
use common::run_knot;

#[test]
fn new_repository_can_be_initialized_at_a_path() {
    let dir = TempDir::new().unwrap();

    run_knot(dir.path(), &["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized repository"));

    assert!(dir.path().join(".knot").is_dir());
    assert!(dir.path().join(".knot/saves").is_dir());
    assert!(dir.path().join(".knot/head").is_file());
    assert!(dir.path().join(".knot/refs").is_file());
}

#[test]
fn initializing_an_existing_repository_fails() {
    let dir = TempDir::new().unwrap();

    run_knot(dir.path(), &["init"]).assert().success();
    run_knot(dir.path(), &["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
