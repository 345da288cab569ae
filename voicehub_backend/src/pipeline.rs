//! Pure filtering and sorting over already-fetched collections. Nothing in
//! here touches the database; services fetch rows, shape them into views, and
//! run them through these functions before returning them to the API layer.

use crate::changelog::ChangelogView;
use crate::feedback::PostView;
use crate::roadmap::RoadmapItemView;
use crate::utils::parse_utc;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub board_id: Option<i64>,
    /// `"all"` or absent passes every status.
    pub status: Option<String>,
    /// OR semantics: a post passes when it carries at least one selected tag.
    /// Empty set passes everything.
    pub tags: Vec<String>,
    pub search: Option<String>,
}

pub fn filter_posts(posts: Vec<PostView>, filter: &PostFilter) -> Vec<PostView> {
    posts
        .into_iter()
        .filter(|post| post_matches(post, filter))
        .collect()
}

fn post_matches(post: &PostView, filter: &PostFilter) -> bool {
    if let Some(board_id) = filter.board_id {
        if post.board_id != board_id {
            return false;
        }
    }
    if let Some(status) = filter.status.as_deref() {
        if status != "all" && post.status != status {
            return false;
        }
    }
    if !filter.tags.is_empty() && !filter.tags.iter().any(|tag| post.tags.contains(tag)) {
        return false;
    }
    if let Some(search) = filter.search.as_deref() {
        let needle = search.trim().to_lowercase();
        if !needle.is_empty() {
            let hit = post.title.to_lowercase().contains(&needle)
                || post.description.to_lowercase().contains(&needle)
                || post
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
    }
    true
}

/// Sorts posts in place by a named key. An unknown key leaves the input
/// untouched. All comparisons go through `sort_by`, which is stable, so ties
/// keep their input order.
pub fn sort_posts(posts: &mut [PostView], key: &str) {
    match key {
        "trending" => posts.sort_by(|a, b| trending_score(b).total_cmp(&trending_score(a))),
        "top" | "votes" => posts.sort_by(|a, b| b.votes.cmp(&a.votes)),
        "newest" => posts.sort_by(|a, b| timestamp_millis(&b.created_at).cmp(&timestamp_millis(&a.created_at))),
        "oldest" => posts.sort_by(|a, b| timestamp_millis(&a.created_at).cmp(&timestamp_millis(&b.created_at))),
        "most-discussed" => posts.sort_by(|a, b| b.comment_count.cmp(&a.comment_count)),
        _ => {}
    }
}

/// Engagement-weighted score with a freshness term. The update timestamp (in
/// milliseconds) is scaled by 1e-9 so recency only breaks near-ties between
/// posts with similar vote/comment engagement.
fn trending_score(post: &PostView) -> f64 {
    post.votes as f64
        + (post.comment_count * 2) as f64
        + timestamp_millis(&post.updated_at) as f64 * 1e-9
}

fn timestamp_millis(raw: &str) -> i64 {
    parse_utc(raw).map(|dt| dt.timestamp_millis()).unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct ChangelogFilter {
    pub status: Option<String>,
    /// Passes entries whose update sub-entries carry any selected category.
    pub categories: Vec<String>,
    pub search: Option<String>,
    /// Inclusive release-date range, applied only when both bounds are set.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub fn filter_changelogs(entries: Vec<ChangelogView>, filter: &ChangelogFilter) -> Vec<ChangelogView> {
    entries
        .into_iter()
        .filter(|entry| changelog_matches(entry, filter))
        .collect()
}

fn changelog_matches(entry: &ChangelogView, filter: &ChangelogFilter) -> bool {
    if let Some(status) = filter.status.as_deref() {
        if status != "all" && entry.status != status {
            return false;
        }
    }
    if !filter.categories.is_empty()
        && !entry
            .updates
            .iter()
            .any(|update| filter.categories.contains(&update.category))
    {
        return false;
    }
    if let (Some(start), Some(end)) = (filter.start_date.as_deref(), filter.end_date.as_deref()) {
        if let (Some(start), Some(end)) = (parse_utc(start), parse_utc(end)) {
            match parse_utc(&entry.release_date) {
                Some(released) if released >= start && released <= end => {}
                _ => return false,
            }
        }
    }
    if let Some(search) = filter.search.as_deref() {
        let needle = search.trim().to_lowercase();
        if !needle.is_empty() {
            let hit = entry.title.to_lowercase().contains(&needle)
                || entry.description.to_lowercase().contains(&needle)
                || entry.version.to_lowercase().contains(&needle)
                || entry.updates.iter().any(|update| {
                    update.title.to_lowercase().contains(&needle)
                        || update.description.to_lowercase().contains(&needle)
                });
            if !hit {
                return false;
            }
        }
    }
    true
}

/// Newest release first; entries with unparseable dates sink to the end.
pub fn sort_changelogs_by_release(entries: &mut [ChangelogView]) {
    entries.sort_by(|a, b| {
        timestamp_millis(&b.release_date).cmp(&timestamp_millis(&a.release_date))
    });
}

#[derive(Debug, Clone, Default)]
pub struct RoadmapFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

pub fn filter_roadmap_items(
    items: Vec<RoadmapItemView>,
    filter: &RoadmapFilter,
) -> Vec<RoadmapItemView> {
    items
        .into_iter()
        .filter(|item| roadmap_matches(item, filter))
        .collect()
}

fn roadmap_matches(item: &RoadmapItemView, filter: &RoadmapFilter) -> bool {
    if let Some(status) = filter.status.as_deref() {
        if status != "all" && item.status != status {
            return false;
        }
    }
    if let Some(priority) = filter.priority.as_deref() {
        if priority != "all" && item.priority != priority {
            return false;
        }
    }
    if let Some(category) = filter.category.as_deref() {
        if category != "all" && item.category != category {
            return false;
        }
    }
    if let Some(search) = filter.search.as_deref() {
        let needle = search.trim().to_lowercase();
        if !needle.is_empty() {
            let hit = item.title.to_lowercase().contains(&needle)
                || item.description.to_lowercase().contains(&needle)
                || item.assignee.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// Named roadmap list columns. A typed accessor map instead of stringly
/// `item[field]` indexing: each field yields a comparable value of a known
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadmapSortField {
    Title,
    Status,
    Priority,
    Category,
    DueDate,
    Progress,
    LinkedFeedback,
    CreatedAt,
}

impl RoadmapSortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "title" => Some(Self::Title),
            "status" => Some(Self::Status),
            "priority" => Some(Self::Priority),
            "category" => Some(Self::Category),
            "due_date" => Some(Self::DueDate),
            "progress" => Some(Self::Progress),
            "linked_feedback_count" => Some(Self::LinkedFeedback),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn value_of(self, item: &RoadmapItemView) -> FieldValue {
        match self {
            Self::Title => FieldValue::Text(item.title.to_lowercase()),
            Self::Status => FieldValue::Text(item.status.to_lowercase()),
            Self::Priority => FieldValue::Text(item.priority.to_lowercase()),
            Self::Category => FieldValue::Text(item.category.to_lowercase()),
            Self::DueDate => FieldValue::Date(
                item.due_date
                    .as_deref()
                    .and_then(|raw| parse_utc(raw).map(|dt| dt.timestamp_millis()))
                    .unwrap_or(0),
            ),
            Self::Progress => FieldValue::Number(item.progress as f64),
            Self::LinkedFeedback => FieldValue::Number(item.linked_feedback_count as f64),
            Self::CreatedAt => FieldValue::Date(timestamp_millis(&item.created_at)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Number(f64),
    Date(i64),
}

impl FieldValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            // Accessors always yield the same variant for a given field.
            _ => Ordering::Equal,
        }
    }
}

/// Generic single-field sort for the roadmap list view. An unrecognized field
/// name leaves the input untouched.
pub fn sort_roadmap_items(items: &mut [RoadmapItemView], field: &str, direction: SortDirection) {
    let Some(field) = RoadmapSortField::parse(field) else {
        return;
    };
    items.sort_by(|a, b| {
        let ordering = field.value_of(a).compare(&field.value_of(b));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: i64, title: &str, status: &str, votes: i64, comments: i64) -> PostView {
        PostView {
            id,
            board_id: 1,
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            status: status.into(),
            votes,
            has_voted: false,
            comment_count: comments,
            view_count: 0,
            author_id: None,
            author: None,
            created_at: format!("2024-01-0{}T00:00:00Z", (id % 9) + 1),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn status_filter_matches_exactly() {
        let posts = vec![
            post(1, "a", "planned", 0, 0),
            post(2, "b", "completed", 0, 0),
            post(3, "c", "completed", 0, 0),
            post(4, "d", "cancelled", 0, 0),
        ];
        let filter = PostFilter {
            status: Some("completed".into()),
            ..Default::default()
        };
        let filtered = filter_posts(posts, &filter);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|p| p.status == "completed"));
    }

    #[test]
    fn status_all_passes_everything() {
        let posts = vec![post(1, "a", "planned", 0, 0), post(2, "b", "completed", 0, 0)];
        let filter = PostFilter {
            status: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(filter_posts(posts, &filter).len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let posts = vec![post(1, "Bug fix", "planned", 0, 0), post(2, "Feature", "planned", 0, 0)];
        let filter = PostFilter {
            search: Some("bug".into()),
            ..Default::default()
        };
        let filtered = filter_posts(posts, &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Bug fix");
    }

    #[test]
    fn tag_filter_uses_or_semantics() {
        let mut a = post(1, "a", "planned", 0, 0);
        a.tags = vec!["ui".into()];
        let mut b = post(2, "b", "planned", 0, 0);
        b.tags = vec!["api".into(), "perf".into()];
        let c = post(3, "c", "planned", 0, 0);

        let filter = PostFilter {
            tags: vec!["ui".into(), "perf".into()],
            ..Default::default()
        };
        let filtered = filter_posts(vec![a, b, c], &filter);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let posts = vec![
            post(1, "alpha bug", "planned", 0, 0),
            post(2, "beta", "completed", 0, 0),
            post(3, "gamma bug", "completed", 0, 0),
        ];
        let filter = PostFilter {
            status: Some("completed".into()),
            search: Some("bug".into()),
            ..Default::default()
        };
        let once = filter_posts(posts, &filter);
        let twice = filter_posts(once.clone(), &filter);
        let ids: Vec<i64> = once.iter().map(|p| p.id).collect();
        let ids_twice: Vec<i64> = twice.iter().map(|p| p.id).collect();
        assert_eq!(ids, ids_twice);
    }

    #[test]
    fn top_sorts_by_votes_descending() {
        let mut posts = vec![
            post(1, "a", "planned", 5, 0),
            post(2, "b", "planned", 2, 0),
            post(3, "c", "planned", 8, 0),
        ];
        sort_posts(&mut posts, "top");
        let votes: Vec<i64> = posts.iter().map(|p| p.votes).collect();
        assert_eq!(votes, vec![8, 5, 2]);
    }

    #[test]
    fn trending_weights_comments_twice() {
        // Same votes; 3 comments (score +6) beats 2 votes worth of nothing.
        let mut posts = vec![post(1, "quiet", "planned", 4, 0), post(2, "busy", "planned", 1, 3)];
        sort_posts(&mut posts, "trending");
        assert_eq!(posts[0].title, "busy");
    }

    #[test]
    fn newest_and_oldest_invert_each_other() {
        let mut posts = vec![
            post(1, "first", "planned", 0, 0),
            post(3, "third", "planned", 0, 0),
            post(2, "second", "planned", 0, 0),
        ];
        sort_posts(&mut posts, "newest");
        let newest: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(newest, vec![3, 2, 1]);

        sort_posts(&mut posts, "oldest");
        let oldest: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(oldest, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_sort_key_is_identity() {
        let mut posts = vec![post(2, "b", "planned", 1, 0), post(1, "a", "planned", 9, 0)];
        sort_posts(&mut posts, "nonsense");
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn sorting_preserves_ties_and_multiset() {
        let mut posts = vec![
            post(1, "a", "planned", 3, 0),
            post(2, "b", "planned", 3, 0),
            post(3, "c", "planned", 7, 0),
        ];
        sort_posts(&mut posts, "top");
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(posts.len(), 3);

        // Re-sorting an already sorted list keeps the order.
        sort_posts(&mut posts, "top");
        let again: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(again, vec![3, 1, 2]);
    }

    fn roadmap_item(id: i64, title: &str, due: Option<&str>, progress: i64) -> RoadmapItemView {
        RoadmapItemView {
            id,
            title: title.into(),
            description: String::new(),
            status: "Planned".into(),
            priority: "Medium".into(),
            category: "Features".into(),
            start_date: None,
            due_date: due.map(str::to_string),
            progress,
            assignee: String::new(),
            tags: Vec::new(),
            linked_feedback_count: 0,
            visibility: "Public".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn roadmap_field_sort_handles_text_dates_and_numbers() {
        let mut items = vec![
            roadmap_item(1, "zeta", Some("2024-03-01T00:00:00Z"), 80),
            roadmap_item(2, "Alpha", Some("2024-01-01T00:00:00Z"), 20),
            roadmap_item(3, "midway", None, 50),
        ];

        sort_roadmap_items(&mut items, "title", SortDirection::Asc);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "midway", "zeta"]);

        sort_roadmap_items(&mut items, "due_date", SortDirection::Asc);
        // Missing due date coerces to 0 and sorts first.
        assert_eq!(items[0].id, 3);
        assert_eq!(items[1].id, 2);

        sort_roadmap_items(&mut items, "progress", SortDirection::Desc);
        let progress: Vec<i64> = items.iter().map(|i| i.progress).collect();
        assert_eq!(progress, vec![80, 50, 20]);

        let before: Vec<i64> = items.iter().map(|i| i.id).collect();
        sort_roadmap_items(&mut items, "unknown_field", SortDirection::Asc);
        let after: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(before, after);
    }

    fn changelog(id: i64, version: &str, title: &str, release: &str) -> ChangelogView {
        ChangelogView {
            id,
            version: version.into(),
            title: title.into(),
            description: String::new(),
            release_date: release.into(),
            status: "published".into(),
            visibility: "public".into(),
            tags: Vec::new(),
            notify_subscribers: false,
            updates: Vec::new(),
            reactions: Default::default(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    fn update(category: &str, title: &str, description: &str) -> crate::changelog::ChangelogUpdateView {
        crate::changelog::ChangelogUpdateView {
            category: category.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    #[test]
    fn changelog_category_filter_ors_across_updates() {
        let mut features = changelog(1, "1.0.0", "a", "2024-01-01T00:00:00Z");
        features.updates = vec![update("Features", "x", ""), update("Fixes", "y", "")];
        let mut fixes_only = changelog(2, "1.0.1", "b", "2024-01-02T00:00:00Z");
        fixes_only.updates = vec![update("Fixes", "z", "")];
        let bare = changelog(3, "1.0.2", "c", "2024-01-03T00:00:00Z");

        let filter = ChangelogFilter {
            categories: vec!["Features".into(), "Performance".into()],
            ..Default::default()
        };
        let filtered = filter_changelogs(vec![features, fixes_only, bare], &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn changelog_date_range_is_inclusive_and_needs_both_bounds() {
        let entries = vec![
            changelog(1, "1.0.0", "on the start", "2024-02-01T00:00:00Z"),
            changelog(2, "1.1.0", "inside", "2024-02-15T00:00:00Z"),
            changelog(3, "1.2.0", "on the end", "2024-03-01T00:00:00Z"),
            changelog(4, "1.3.0", "after", "2024-03-02T00:00:00Z"),
        ];

        let filter = ChangelogFilter {
            start_date: Some("2024-02-01T00:00:00Z".into()),
            end_date: Some("2024-03-01T00:00:00Z".into()),
            ..Default::default()
        };
        let filtered = filter_changelogs(entries.clone(), &filter);
        let ids: Vec<i64> = filtered.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // A lone bound is not a range and passes everything.
        let open_ended = ChangelogFilter {
            start_date: Some("2024-03-01T00:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(filter_changelogs(entries, &open_ended).len(), 4);
    }

    #[test]
    fn changelog_search_reaches_versions_and_update_descriptions() {
        let mut buried = changelog(1, "1.4.0", "plain", "2024-01-01T00:00:00Z");
        buried.updates = vec![update("Fixes", "tidy", "repairs the export pipeline")];
        let by_version = changelog(2, "2.0.0-beta", "also plain", "2024-01-02T00:00:00Z");
        let miss = changelog(3, "1.5.0", "nothing here", "2024-01-03T00:00:00Z");

        let filter = ChangelogFilter {
            search: Some("export".into()),
            ..Default::default()
        };
        let hits = filter_changelogs(vec![buried.clone(), miss.clone()], &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let filter = ChangelogFilter {
            search: Some("BETA".into()),
            ..Default::default()
        };
        let hits = filter_changelogs(vec![buried, by_version, miss], &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn roadmap_search_covers_assignee() {
        let mut item = roadmap_item(1, "Search revamp", None, 0);
        item.assignee = "Dana".into();
        let other = roadmap_item(2, "Other", None, 0);
        let filter = RoadmapFilter {
            search: Some("dana".into()),
            ..Default::default()
        };
        let filtered = filter_roadmap_items(vec![item, other], &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }
}
