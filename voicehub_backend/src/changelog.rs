use crate::database::models::{ChangelogRecord, ChangelogUpdateRecord, ReactionRecord};
use crate::database::repositories::{ChangelogRepository, ReactionRepository, SqliteRepositories};
use crate::database::Database;
use crate::error::ServiceError;
use crate::pipeline::{filter_changelogs, sort_changelogs_by_release, ChangelogFilter};
use crate::utils::{now_utc_iso, parse_utc};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const REACTION_KINDS: &[&str] = &["like", "love", "celebrate"];

#[derive(Clone)]
pub struct ChangelogService {
    database: Database,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub like: i64,
    pub love: i64,
    pub celebrate: i64,
}

impl ReactionCounts {
    fn from_map(map: HashMap<String, i64>) -> Self {
        Self {
            like: map.get("like").copied().unwrap_or(0),
            love: map.get("love").copied().unwrap_or(0),
            celebrate: map.get("celebrate").copied().unwrap_or(0),
        }
    }

    pub fn total(&self) -> i64 {
        self.like + self.love + self.celebrate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogUpdateView {
    pub category: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogView {
    pub id: i64,
    pub version: String,
    pub title: String,
    pub description: String,
    pub release_date: String,
    pub status: String,
    pub visibility: String,
    pub tags: Vec<String>,
    pub notify_subscribers: bool,
    pub updates: Vec<ChangelogUpdateView>,
    pub reactions: ReactionCounts,
    pub created_at: String,
    pub updated_at: String,
}

/// Published versions immediately before and after an entry, by release date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionNeighbors {
    pub newer: Option<String>,
    pub older: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionToggleView {
    pub kind: String,
    pub reacted: bool,
    pub reactions: ReactionCounts,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChangelogStats {
    pub total: i64,
    pub published: i64,
    pub scheduled: i64,
    pub drafts: i64,
    pub total_reactions: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangelogUpdateInput {
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChangelogInput {
    pub version: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default = "default_changelog_status")]
    pub status: String,
    #[serde(default = "default_changelog_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notify_subscribers: bool,
    #[serde(default)]
    pub updates: Vec<ChangelogUpdateInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChangelogInput {
    pub version: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<String>,
    pub status: Option<String>,
    pub visibility: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notify_subscribers: Option<bool>,
    pub updates: Option<Vec<ChangelogUpdateInput>>,
}

fn default_changelog_status() -> String {
    "draft".to_string()
}

fn default_changelog_visibility() -> String {
    "public".to_string()
}

/// Numeric segment-wise version comparison, so "1.10.0" sorts after "1.9.0".
/// Non-numeric segments count as zero.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |raw: &str| -> Vec<i64> {
        raw.trim_start_matches(['v', 'V'])
            .split('.')
            .map(|segment| segment.parse().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ordering = a.get(i).copied().unwrap_or(0).cmp(&b.get(i).copied().unwrap_or(0));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// URL slugs spell versions with dashes, e.g. `v1-2-0` for 1.2.0.
pub fn version_from_slug(slug: &str) -> String {
    slug.trim_start_matches(['v', 'V']).replace('-', ".")
}

fn assemble_view(
    repos: &SqliteRepositories<'_>,
    record: ChangelogRecord,
) -> Result<ChangelogView> {
    let updates = repos
        .changelogs()
        .updates_for(record.id)?
        .into_iter()
        .map(|update| ChangelogUpdateView {
            category: update.category,
            title: update.title,
            description: update.description,
        })
        .collect();
    let reactions = ReactionCounts::from_map(repos.reactions().counts_for(record.id)?);
    Ok(ChangelogView {
        id: record.id,
        version: record.version,
        title: record.title,
        description: record.description,
        release_date: record.release_date,
        status: record.status,
        visibility: record.visibility,
        tags: record.tags,
        notify_subscribers: record.notify_subscribers,
        updates,
        reactions,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn update_records(changelog_id: i64, updates: &[ChangelogUpdateInput]) -> Vec<ChangelogUpdateRecord> {
    updates
        .iter()
        .enumerate()
        .map(|(position, update)| ChangelogUpdateRecord {
            id: 0,
            changelog_id,
            category: update.category.clone(),
            title: update.title.clone(),
            description: update.description.clone(),
            position: position as i64,
        })
        .collect()
}

impl ChangelogService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list(&self, filter: &ChangelogFilter) -> Result<Vec<ChangelogView>> {
        let views = self.database.with_repositories(|repos| {
            let records = repos.changelogs().list()?;
            records
                .into_iter()
                .map(|record| assemble_view(&repos, record))
                .collect::<Result<Vec<_>>>()
        })?;
        let mut filtered = filter_changelogs(views, filter);
        sort_changelogs_by_release(&mut filtered);
        Ok(filtered)
    }

    /// The most recent published entries, newest release first.
    pub fn latest_published(&self, limit: usize) -> Result<Vec<ChangelogView>> {
        let filter = ChangelogFilter {
            status: Some("published".into()),
            ..Default::default()
        };
        let mut entries = self.list(&filter)?;
        entries.truncate(limit);
        Ok(entries)
    }

    pub fn get(&self, id: i64) -> Result<ChangelogView> {
        self.database.with_repositories(|repos| {
            let record = repos
                .changelogs()
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("changelog", id))?;
            assemble_view(&repos, record)
        })
    }

    /// Lookup by URL slug, with the published neighbors on either side for
    /// previous/next navigation.
    pub fn get_by_version(&self, slug: &str) -> Result<(ChangelogView, VersionNeighbors)> {
        let version = version_from_slug(slug);
        let entry = self.database.with_repositories(|repos| {
            let changelogs = repos.changelogs();
            // Versions can themselves contain dashes (duplicated drafts get a
            // "-copy" suffix), which makes decoding the slug ambiguous. When
            // the decoded form misses, match stored versions by their slug
            // form instead.
            let record = match changelogs.get_by_version(&version)? {
                Some(record) => record,
                None => {
                    let wanted = slug.trim_start_matches(['v', 'V']);
                    changelogs
                        .list()?
                        .into_iter()
                        .find(|record| record.version.replace('.', "-") == wanted)
                        .ok_or_else(|| {
                            ServiceError::not_found_by_key("changelog", version.clone())
                        })?
                }
            };
            assemble_view(&repos, record)
        })?;

        let published = self.list(&ChangelogFilter {
            status: Some("published".into()),
            ..Default::default()
        })?;
        let neighbors = published
            .iter()
            .position(|candidate| candidate.id == entry.id)
            .map(|index| VersionNeighbors {
                // The published list is newest first.
                newer: index
                    .checked_sub(1)
                    .and_then(|i| published.get(i))
                    .map(|c| c.version.clone()),
                older: published.get(index + 1).map(|c| c.version.clone()),
            })
            .unwrap_or_default();
        Ok((entry, neighbors))
    }

    /// Entries sharing update categories with the given one. Category overlap
    /// dominates; release-date proximity only orders entries with the same
    /// overlap, at one point per day of distance against a thousand per
    /// shared category.
    pub fn related(&self, id: i64, limit: usize) -> Result<Vec<ChangelogView>> {
        let anchor = self.get(id)?;
        let anchor_categories: Vec<&str> =
            anchor.updates.iter().map(|u| u.category.as_str()).collect();
        let anchor_release = parse_utc(&anchor.release_date);

        let mut candidates: Vec<(f64, ChangelogView)> = self
            .list(&ChangelogFilter::default())?
            .into_iter()
            .filter(|candidate| candidate.id != id)
            .map(|candidate| {
                let matching = candidate
                    .updates
                    .iter()
                    .filter(|update| anchor_categories.contains(&update.category.as_str()))
                    .count() as f64;
                let day_distance = match (anchor_release, parse_utc(&candidate.release_date)) {
                    (Some(a), Some(b)) => (a - b).num_days().abs() as f64,
                    _ => 0.0,
                };
                (matching * 1000.0 - day_distance, candidate)
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|(_, view)| view)
            .collect())
    }

    /// Suggests the next patch release after the highest published version,
    /// or 1.0.0 when nothing has shipped yet.
    pub fn next_version(&self) -> Result<String> {
        self.database.with_repositories(|repos| {
            let mut versions: Vec<String> = repos
                .changelogs()
                .list()?
                .into_iter()
                .filter(|record| record.status == "published")
                .map(|record| record.version)
                .collect();
            if versions.is_empty() {
                return Ok("1.0.0".to_string());
            }
            versions.sort_by(|a, b| compare_versions(b, a));
            let segments: Vec<i64> = versions[0]
                .trim_start_matches(['v', 'V'])
                .split('.')
                .map(|segment| segment.parse().unwrap_or(0))
                .collect();
            let major = segments.first().copied().unwrap_or(1);
            let minor = segments.get(1).copied().unwrap_or(0);
            let patch = segments.get(2).copied().unwrap_or(0) + 1;
            Ok(format!("{major}.{minor}.{patch}"))
        })
    }

    pub fn create(&self, input: CreateChangelogInput) -> Result<ChangelogView> {
        if input.version.trim().is_empty() {
            return Err(ServiceError::validation("changelog version may not be empty").into());
        }
        if input.title.trim().is_empty() {
            return Err(ServiceError::validation("changelog title may not be empty").into());
        }
        let now = now_utc_iso();
        let record = ChangelogRecord {
            id: 0,
            version: input.version,
            title: input.title,
            description: input.description,
            release_date: input.release_date.unwrap_or_else(|| now.clone()),
            status: input.status,
            visibility: input.visibility,
            tags: input.tags,
            notify_subscribers: input.notify_subscribers,
            created_at: now.clone(),
            updated_at: now,
        };
        self.database.with_repositories(|repos| {
            let changelogs = repos.changelogs();
            let id = changelogs.create(&record)?;
            changelogs.replace_updates(id, &update_records(id, &input.updates))?;
            assemble_view(&repos, ChangelogRecord { id, ..record })
        })
    }

    /// Partial update. Reactions and the creation timestamp survive edits.
    pub fn update(&self, id: i64, input: UpdateChangelogInput) -> Result<ChangelogView> {
        self.database.with_repositories(|repos| {
            let changelogs = repos.changelogs();
            let existing = changelogs
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("changelog", id))?;
            let record = ChangelogRecord {
                version: input.version.unwrap_or(existing.version),
                title: input.title.unwrap_or(existing.title),
                description: input.description.unwrap_or(existing.description),
                release_date: input.release_date.unwrap_or(existing.release_date),
                status: input.status.unwrap_or(existing.status),
                visibility: input.visibility.unwrap_or(existing.visibility),
                tags: input.tags.unwrap_or(existing.tags),
                notify_subscribers: input
                    .notify_subscribers
                    .unwrap_or(existing.notify_subscribers),
                updated_at: now_utc_iso(),
                ..existing
            };
            changelogs.update(&record)?;
            if let Some(updates) = input.updates.as_deref() {
                changelogs.replace_updates(id, &update_records(id, updates))?;
            }
            assemble_view(&repos, record)
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.database.with_repositories(|repos| {
            if !repos.changelogs().delete(id)? {
                return Err(ServiceError::not_found("changelog", id).into());
            }
            Ok(())
        })
    }

    /// Publishing stamps the release date with the moment of publication.
    pub fn publish(&self, id: i64) -> Result<ChangelogView> {
        self.update(
            id,
            UpdateChangelogInput {
                status: Some("published".into()),
                release_date: Some(now_utc_iso()),
                ..Default::default()
            },
        )
    }

    /// A draft copy of an existing entry, with its update list but none of
    /// its reactions.
    pub fn duplicate(&self, id: i64) -> Result<ChangelogView> {
        self.database.with_repositories(|repos| {
            let changelogs = repos.changelogs();
            let source = changelogs
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("changelog", id))?;
            let updates = changelogs.updates_for(id)?;
            let now = now_utc_iso();
            let record = ChangelogRecord {
                id: 0,
                version: format!("{}-copy", source.version),
                title: format!("{} (Copy)", source.title),
                status: "draft".to_string(),
                created_at: now.clone(),
                updated_at: now,
                ..source
            };
            let copy_id = changelogs.create(&record)?;
            let copied: Vec<ChangelogUpdateRecord> = updates
                .into_iter()
                .map(|update| ChangelogUpdateRecord {
                    id: 0,
                    changelog_id: copy_id,
                    ..update
                })
                .collect();
            changelogs.replace_updates(copy_id, &copied)?;
            assemble_view(
                &repos,
                ChangelogRecord {
                    id: copy_id,
                    ..record
                },
            )
        })
    }

    pub fn stats(&self) -> Result<ChangelogStats> {
        self.database.with_repositories(|repos| {
            let records = repos.changelogs().list()?;
            let mut stats = ChangelogStats {
                total: records.len() as i64,
                total_reactions: repos.reactions().total_count()?,
                ..Default::default()
            };
            for record in &records {
                match record.status.as_str() {
                    "published" => stats.published += 1,
                    "scheduled" => stats.scheduled += 1,
                    _ => stats.drafts += 1,
                }
            }
            Ok(stats)
        })
    }

    /// Flips one (user, entry, kind) reaction row. Each user holds at most
    /// one reaction of each kind per entry, so repeating the call undoes it.
    pub fn toggle_reaction(
        &self,
        id: i64,
        user_id: &str,
        kind: &str,
    ) -> Result<ReactionToggleView> {
        if !REACTION_KINDS.contains(&kind) {
            return Err(ServiceError::validation(format!("unknown reaction kind '{kind}'")).into());
        }
        self.database.with_repositories(|repos| {
            if repos.changelogs().get(id)?.is_none() {
                return Err(ServiceError::not_found("changelog", id).into());
            }
            let reactions = repos.reactions();
            let reacted = if reactions.exists(id, user_id, kind)? {
                reactions.remove(id, user_id, kind)?;
                false
            } else {
                reactions.add(&ReactionRecord {
                    changelog_id: id,
                    user_id: user_id.to_string(),
                    kind: kind.to_string(),
                    created_at: now_utc_iso(),
                })?;
                true
            };
            Ok(ReactionToggleView {
                kind: kind.to_string(),
                reacted,
                reactions: ReactionCounts::from_map(reactions.counts_for(id)?),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_in_memory;

    fn service() -> ChangelogService {
        ChangelogService::new(open_in_memory())
    }

    fn input(version: &str, title: &str) -> CreateChangelogInput {
        CreateChangelogInput {
            version: version.into(),
            title: title.into(),
            description: String::new(),
            release_date: None,
            status: default_changelog_status(),
            visibility: default_changelog_visibility(),
            tags: Vec::new(),
            notify_subscribers: false,
            updates: Vec::new(),
        }
    }

    fn published(version: &str, title: &str, release_date: &str) -> CreateChangelogInput {
        CreateChangelogInput {
            release_date: Some(release_date.into()),
            status: "published".into(),
            ..input(version, title)
        }
    }

    #[test]
    fn version_slugs_round_trip() {
        assert_eq!(version_from_slug("v1-2-0"), "1.2.0");
        assert_eq!(version_from_slug("2-0-1"), "2.0.1");
    }

    #[test]
    fn version_comparison_is_numeric_per_segment() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("v2.0.0", "2.0.0"), Ordering::Equal);
    }

    #[test]
    fn next_version_bumps_the_highest_published_patch() {
        let service = service();
        assert_eq!(service.next_version().unwrap(), "1.0.0");

        service
            .create(published("1.9.0", "old", "2024-01-01T00:00:00Z"))
            .unwrap();
        service
            .create(published("1.10.2", "new", "2024-02-01T00:00:00Z"))
            .unwrap();
        service.create(input("3.0.0", "draft, ignored")).unwrap();

        assert_eq!(service.next_version().unwrap(), "1.10.3");
    }

    #[test]
    fn reaction_toggle_is_per_user_and_per_kind() {
        let service = service();
        let entry = service.create(input("1.0.0", "Launch")).unwrap();

        let first = service.toggle_reaction(entry.id, "alice", "like").unwrap();
        assert!(first.reacted);
        assert_eq!(first.reactions.like, 1);

        let second = service.toggle_reaction(entry.id, "bob", "like").unwrap();
        assert_eq!(second.reactions.like, 2);

        let love = service.toggle_reaction(entry.id, "alice", "love").unwrap();
        assert_eq!(love.reactions.like, 2);
        assert_eq!(love.reactions.love, 1);

        let undone = service.toggle_reaction(entry.id, "alice", "like").unwrap();
        assert!(!undone.reacted);
        assert_eq!(undone.reactions.like, 1);
        assert_eq!(undone.reactions.love, 1);
    }

    #[test]
    fn unknown_reaction_kind_is_rejected() {
        let service = service();
        let entry = service.create(input("1.0.0", "Launch")).unwrap();
        let err = service
            .toggle_reaction(entry.id, "alice", "sparkle")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ServiceError>(),
            Some(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_copies_updates_but_not_reactions() {
        let service = service();
        let mut original = input("1.2.0", "Big release");
        original.updates = vec![ChangelogUpdateInput {
            category: "Features".into(),
            title: "New dashboard".into(),
            description: String::new(),
        }];
        let original = service.create(original).unwrap();
        service
            .toggle_reaction(original.id, "alice", "celebrate")
            .unwrap();

        let copy = service.duplicate(original.id).unwrap();
        assert_eq!(copy.version, "1.2.0-copy");
        assert_eq!(copy.title, "Big release (Copy)");
        assert_eq!(copy.status, "draft");
        assert_eq!(copy.updates.len(), 1);
        assert_eq!(copy.reactions.total(), 0);

        let original = service.get(original.id).unwrap();
        assert_eq!(original.reactions.celebrate, 1);
    }

    #[test]
    fn update_preserves_created_at_and_reactions() {
        let service = service();
        let entry = service.create(input("1.0.0", "Before")).unwrap();
        service.toggle_reaction(entry.id, "alice", "like").unwrap();

        let updated = service
            .update(
                entry.id,
                UpdateChangelogInput {
                    title: Some("After".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "After");
        assert_eq!(updated.created_at, entry.created_at);
        assert_eq!(updated.reactions.like, 1);
    }

    #[test]
    fn get_by_version_reports_published_neighbors() {
        let service = service();
        service
            .create(published("1.0.0", "first", "2024-01-01T00:00:00Z"))
            .unwrap();
        service
            .create(published("1.1.0", "second", "2024-02-01T00:00:00Z"))
            .unwrap();
        service
            .create(published("1.2.0", "third", "2024-03-01T00:00:00Z"))
            .unwrap();

        let (entry, neighbors) = service.get_by_version("v1-1-0").unwrap();
        assert_eq!(entry.version, "1.1.0");
        assert_eq!(neighbors.newer.as_deref(), Some("1.2.0"));
        assert_eq!(neighbors.older.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn dash_bearing_versions_stay_reachable_by_slug() {
        let service = service();
        let original = service.create(input("1.2.0", "Original")).unwrap();
        service.duplicate(original.id).unwrap();

        let (copy, _) = service.get_by_version("v1-2-0-copy").unwrap();
        assert_eq!(copy.version, "1.2.0-copy");
        assert_eq!(copy.title, "Original (Copy)");
    }

    #[test]
    fn related_prefers_category_overlap_over_date_proximity() {
        let service = service();
        let mut anchor = published("1.0.0", "anchor", "2024-01-01T00:00:00Z");
        anchor.updates = vec![ChangelogUpdateInput {
            category: "Features".into(),
            title: "a".into(),
            description: String::new(),
        }];
        let anchor = service.create(anchor).unwrap();

        // Far away in time but sharing a category.
        let mut matching = published("2.0.0", "matching", "2025-06-01T00:00:00Z");
        matching.updates = vec![ChangelogUpdateInput {
            category: "Features".into(),
            title: "b".into(),
            description: String::new(),
        }];
        let matching = service.create(matching).unwrap();

        // Released the next day but with nothing in common.
        let mut near = published("1.0.1", "near", "2024-01-02T00:00:00Z");
        near.updates = vec![ChangelogUpdateInput {
            category: "Fixes".into(),
            title: "c".into(),
            description: String::new(),
        }];
        service.create(near).unwrap();

        let related = service.related(anchor.id, 1).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, matching.id);
    }

    #[test]
    fn publish_stamps_the_release_date() {
        let service = service();
        let mut draft = input("1.0.0", "Pending");
        draft.release_date = Some("2020-01-01T00:00:00Z".into());
        let draft = service.create(draft).unwrap();

        let live = service.publish(draft.id).unwrap();
        assert_eq!(live.status, "published");
        assert_ne!(live.release_date, "2020-01-01T00:00:00Z");
    }

    #[test]
    fn stats_count_statuses_and_reactions() {
        let service = service();
        let a = service
            .create(published("1.0.0", "a", "2024-01-01T00:00:00Z"))
            .unwrap();
        service.create(input("1.1.0", "b")).unwrap();
        let mut scheduled = input("1.2.0", "c");
        scheduled.status = "scheduled".into();
        service.create(scheduled).unwrap();
        service.toggle_reaction(a.id, "alice", "like").unwrap();
        service.toggle_reaction(a.id, "bob", "love").unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.drafts, 1);
        assert_eq!(stats.total_reactions, 2);
    }
}
