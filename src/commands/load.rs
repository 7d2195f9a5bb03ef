use crate::areas::repository::Repository;
use std::io::Write;

pub fn load(repo: &Repository, target: &str) -> anyhow::Result<()> {
    repo.load(target)?;
    writeln!(repo.writer(), "now at {}", repo.head_description())?;
    Ok(())
}
