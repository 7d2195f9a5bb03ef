use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

mod common;
use common::{repository_dir, run_knot, write_file};

#[rstest]
fn save_then_restore_discards_local_edits(repository_dir: TempDir) {
    let dir = repository_dir.path();
    write_file(dir, "a.txt", "original");
    run_knot(dir, &["add", "a.txt"]).assert().success();
    run_knot(dir, &["save", "-m", "first save"]).assert().success();

    write_file(dir, "a.txt", "local edit");
    run_knot(dir, &["restore", "a.txt"]).assert().success();

    assert_eq!(std::fs::read_to_string(dir.join("a.txt")).unwrap(), "original");
}

#[rstest]
fn saving_with_nothing_staged_fails(repository_dir: TempDir) {
    let dir = repository_dir.path();

    run_knot(dir, &["save", "-m", "empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to save"));
}

#[rstest]
fn a_new_ref_can_be_created_and_listed(repository_dir: TempDir) {
    let dir = repository_dir.path();
    write_file(dir, "a.txt", "content");
    run_knot(dir, &["add", "a.txt"]).assert().success();
    run_knot(dir, &["save", "-m", "first save"]).assert().success();

    run_knot(dir, &["ref", "topic"]).assert().success();

    run_knot(dir, &["refs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("topic"))
        .stdout(predicate::str::contains("main"));
}

#[rstest]
fn loading_an_unknown_ref_fails(repository_dir: TempDir) {
    let dir = repository_dir.path();

    run_knot(dir, &["load", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid ref"));
}

#[rstest]
fn loading_a_ref_materializes_its_save_on_disk(repository_dir: TempDir) {
    let dir = repository_dir.path();
    write_file(dir, "a.txt", "v1");
    run_knot(dir, &["add", "a.txt"]).assert().success();
    run_knot(dir, &["save", "-m", "v1"]).assert().success();

    run_knot(dir, &["ref", "topic"]).assert().success();
    run_knot(dir, &["load", "topic"]).assert().success();

    write_file(dir, "a.txt", "v2 on topic");
    run_knot(dir, &["add", "a.txt"]).assert().success();
    run_knot(dir, &["save", "-m", "v2"]).assert().success();

    run_knot(dir, &["load", "main"]).assert().success();
    assert_eq!(std::fs::read_to_string(dir.join("a.txt")).unwrap(), "v1");

    run_knot(dir, &["load", "topic"]).assert().success();
    assert_eq!(std::fs::read_to_string(dir.join("a.txt")).unwrap(), "v2 on topic");
}
