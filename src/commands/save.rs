use crate::areas::repository::Repository;
use std::io::Write;

pub fn save(repo: &Repository, message: &str) -> anyhow::Result<()> {
    let checkpoint = repo.create_save(message)?;
    writeln!(
        repo.writer(),
        "saved {} \"{}\"",
        &checkpoint.id().as_str()[..12],
        checkpoint.message()
    )?;
    Ok(())
}
