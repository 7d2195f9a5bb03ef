use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

pub fn status(repo: &Repository) -> anyhow::Result<()> {
    let status = repo.get_status()?;
    let mut writer = repo.writer();

    writeln!(writer, "on {}", repo.head_description())?;

    let staged = &status.staged;
    if !staged.created.is_empty() || !staged.modified.is_empty() || !staged.removed.is_empty() || !staged.conflicted.is_empty() {
        writeln!(writer, "\n{}", "Changes to be saved:".bold())?;
        for path in &staged.created {
            writeln!(writer, "  {}  {}", "created:".green(), path.display())?;
        }
        for path in &staged.modified {
            writeln!(writer, "  {}  {}", "modified:".green(), path.display())?;
        }
        for path in &staged.removed {
            writeln!(writer, "  {}  {}", "removed:".green(), path.display())?;
        }
        for (path, message) in &staged.conflicted {
            writeln!(writer, "  {}  {} ({message})", "conflicted:".red(), path.display())?;
        }
    }

    let working = &status.working_dir;
    if !working.modified.is_empty() || !working.removed.is_empty() {
        writeln!(writer, "\n{}", "Changes not staged:".bold())?;
        for path in &working.modified {
            writeln!(writer, "  {}  {}", "modified:".yellow(), path.display())?;
        }
        for path in &working.removed {
            writeln!(writer, "  {}  {}", "removed:".yellow(), path.display())?;
        }
    }

    if !working.untracked.is_empty() {
        writeln!(writer, "\n{}", "Untracked files:".bold())?;
        for path in &working.untracked {
            writeln!(writer, "  {}", path.display().to_string().red())?;
        }
    }

    let clean = staged.created.is_empty()
        && staged.modified.is_empty()
        && staged.removed.is_empty()
        && staged.conflicted.is_empty()
        && working.modified.is_empty()
        && working.removed.is_empty()
        && working.untracked.is_empty();
    if clean {
        writeln!(writer, "\nnothing to save, working tree clean")?;
    }

    Ok(())
}
