use assert_fs::TempDir;
use predicates::prelude::predicate;
use rstest::rstest;

mod common;
use common::{repository_dir, run_knot, write_file};

#[rstest]
fn log_lists_saves_newest_first(repository_dir: TempDir) {
    let dir = repository_dir.path();
    write_file(dir, "a.txt", "v1");
    run_knot(dir, &["add", "a.txt"]).assert().success();
    run_knot(dir, &["save", "-m", "first save"]).assert().success();

    write_file(dir, "a.txt", "v2");
    run_knot(dir, &["add", "a.txt"]).assert().success();
    run_knot(dir, &["save", "-m", "second save"]).assert().success();

    let output = run_knot(dir, &["log"]).assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();

    let first_pos = text.find("first save").unwrap();
    let second_pos = text.find("second save").unwrap();
    assert!(second_pos < first_pos, "newest save should be listed first");
}

#[rstest]
fn log_on_an_unsaved_repository_says_so(repository_dir: TempDir) {
    run_knot(repository_dir.path(), &["log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing saved"));
}
