use crate::areas::repository::Repository;
use std::io::Write;
use std::path::Path;

pub fn remove(repo: &Repository, paths: &[String]) -> anyhow::Result<()> {
    for path in paths {
        repo.remove_file(Path::new(path))?;
    }
    repo.save_index()?;

    for path in paths {
        writeln!(repo.writer(), "removed {path}")?;
    }
    Ok(())
}
