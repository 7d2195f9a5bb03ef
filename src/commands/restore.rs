use crate::areas::repository::Repository;
use std::io::Write;
use std::path::Path;

pub fn restore(repo: &Repository, paths: &[String]) -> anyhow::Result<()> {
    for path in paths {
        repo.restore(Path::new(path))?;
        writeln!(repo.writer(), "restored {path}")?;
    }
    Ok(())
}
