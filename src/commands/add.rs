use crate::areas::repository::Repository;
use std::io::Write;
use std::path::Path;

pub fn add(repo: &Repository, paths: &[String]) -> anyhow::Result<()> {
    for path in paths {
        repo.index_file(Path::new(path))?;
    }
    repo.save_index()?;

    for path in paths {
        writeln!(repo.writer(), "added {path}")?;
    }
    Ok(())
}
