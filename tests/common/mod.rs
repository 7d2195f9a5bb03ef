use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

pub fn run_knot(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("knot").expect("failed to find knot binary");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn write_file(dir: &Path, rel_path: &str, content: &str) {
    let full = dir.join(rel_path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("failed to create parent directory");
    }
    std::fs::write(&full, content).expect("failed to write file");
}

#[fixture]
pub fn repository_dir() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    run_knot(dir.path(), &["init"]).assert().success();
    dir
}
