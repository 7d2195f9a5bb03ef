use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

pub fn log(repo: &Repository) -> anyhow::Result<()> {
    let save = repo.history()?;
    let mut writer = repo.writer();

    let Some(save) = save else {
        writeln!(writer, "nothing saved yet")?;
        return Ok(());
    };

    for checkpoint in save.checkpoints().iter().rev() {
        writeln!(writer, "{} {}", "save".yellow(), &checkpoint.id().as_str()[..12])?;
        writeln!(writer, "Date: {}", checkpoint.created_at().format("%m/%d %I:%M:%S%p '%y %z"))?;
        writeln!(writer, "\n    {}\n", checkpoint.message())?;
    }

    Ok(())
}
