use crate::domain::model::RepoDescriptor;
use crate::domain::ports::VersionControl;
use crate::utils::error::{LedgerError, Result};
use chrono::NaiveDate;
use regex::Regex;

/// Latest release tag of `repo` whose commit date is strictly before `date`.
///
/// Tags are scanned newest-first in creation order, so the answer for a later
/// date is never an older tag than the answer for an earlier one.
pub fn preceding_release_tag<V: VersionControl + ?Sized>(
    vcs: &V,
    repo: &RepoDescriptor,
    date: NaiveDate,
    pattern: Option<&Regex>,
) -> Result<String> {
    let tags = vcs.list_tags(repo)?;

    for tag in tags.iter().rev() {
        if pattern.is_some_and(|re| !re.is_match(tag)) {
            continue;
        }
        match vcs.commit_date(repo, tag)? {
            Some(tag_date) if tag_date < date => {
                tracing::debug!("{}: {} ({}) precedes {}", repo.name, tag, tag_date, date);
                return Ok(tag.clone());
            }
            Some(_) => {}
            None => tracing::warn!("{}: tag {} does not point at a commit", repo.name, tag),
        }
    }

    Err(LedgerError::NoPrecedingTag {
        repository: repo.name.clone(),
        date: date.to_string(),
    })
}
