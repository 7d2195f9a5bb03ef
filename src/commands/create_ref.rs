use crate::areas::repository::Repository;
use std::io::Write;

pub fn create_ref(repo: &Repository, name: &str) -> anyhow::Result<()> {
    repo.create_ref(name)?;
    writeln!(repo.writer(), "created ref {name}")?;
    Ok(())
}
