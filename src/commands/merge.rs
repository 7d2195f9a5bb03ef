use crate::areas::repository::{MergeOutcome, Repository};
use colored::Colorize;
use std::io::Write;

pub fn merge(repo: &Repository, ref_name: &str) -> anyhow::Result<()> {
    match repo.merge(ref_name)? {
        MergeOutcome::FastForward(tip) => {
            writeln!(
                repo.writer(),
                "fast-forwarded to {}",
                &tip.as_str()[..12]
            )?;
        }
        MergeOutcome::Merged(checkpoint) => {
            writeln!(
                repo.writer(),
                "{} {} \"{}\"",
                "merged".green(),
                &checkpoint.id().as_str()[..12],
                checkpoint.message()
            )?;
        }
        MergeOutcome::Conflicts(count) => {
            writeln!(
                repo.writer(),
                "{} {count} conflict(s), resolve and save.",
                "unresolved:".red().bold()
            )?;
        }
    }
    Ok(())
}
