use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

pub fn list_refs(repo: &Repository) -> anyhow::Result<()> {
    let refs = repo.list_refs();
    let head = repo.head_description();

    for (name, tip) in refs {
        let marker = if name == head { "*".green() } else { " ".normal() };
        let tip_display = match tip {
            Some(hash) => hash.as_str()[..12].to_string(),
            None => "unsaved".dimmed().to_string(),
        };
        writeln!(repo.writer(), "{marker} {name} {tip_display}")?;
    }
    Ok(())
}
