use crate::database::models::RoadmapItemRecord;
use crate::database::repositories::RoadmapRepository;
use crate::database::Database;
use crate::error::ServiceError;
use crate::pipeline::{filter_roadmap_items, sort_roadmap_items, RoadmapFilter, SortDirection};
use crate::utils::{now_utc_iso, parse_utc};
use anyhow::Result;
use serde::{Deserialize, Serialize};

const STATUSES: &[&str] = &["Backlog", "Planned", "In Progress", "Shipped"];

#[derive(Clone)]
pub struct RoadmapService {
    database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapItemView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub category: String,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub progress: i64,
    pub assignee: String,
    pub tags: Vec<String>,
    pub linked_feedback_count: i64,
    pub visibility: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RoadmapItemView {
    fn from_record(record: RoadmapItemRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            status: record.status,
            priority: record.priority,
            category: record.category,
            start_date: record.start_date,
            due_date: record.due_date,
            progress: record.progress,
            assignee: record.assignee,
            tags: record.tags,
            linked_feedback_count: record.linked_feedback_count,
            visibility: record.visibility,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoadmapItemInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_item_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_item_visibility")]
    pub visibility: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoadmapItemInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub assignee: Option<String>,
    pub tags: Option<Vec<String>>,
    pub visibility: Option<String>,
}

fn default_item_status() -> String {
    "Planned".to_string()
}

fn default_priority() -> String {
    "Medium".to_string()
}

fn default_item_visibility() -> String {
    "Public".to_string()
}

fn clamp_progress(progress: i64) -> i64 {
    progress.clamp(0, 100)
}

impl RoadmapService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Filtered list, sorted by the requested column. With no explicit field
    /// the board reads earliest due date first.
    pub fn list(
        &self,
        filter: &RoadmapFilter,
        sort_field: Option<&str>,
        direction: SortDirection,
    ) -> Result<Vec<RoadmapItemView>> {
        let views = self.database.with_repositories(|repos| {
            let records = repos.roadmap().list()?;
            Ok(records
                .into_iter()
                .map(RoadmapItemView::from_record)
                .collect::<Vec<_>>())
        })?;
        let mut filtered = filter_roadmap_items(views, filter);
        match sort_field {
            Some(field) => sort_roadmap_items(&mut filtered, field, direction),
            None => sort_roadmap_items(&mut filtered, "due_date", SortDirection::Asc),
        }
        Ok(filtered)
    }

    pub fn get(&self, id: i64) -> Result<RoadmapItemView> {
        self.database.with_repositories(|repos| {
            let record = repos
                .roadmap()
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("roadmap item", id))?;
            Ok(RoadmapItemView::from_record(record))
        })
    }

    pub fn create(&self, input: CreateRoadmapItemInput) -> Result<RoadmapItemView> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::validation("roadmap item title may not be empty").into());
        }
        if !STATUSES.contains(&input.status.as_str()) {
            return Err(
                ServiceError::validation(format!("unknown roadmap status '{}'", input.status))
                    .into(),
            );
        }
        let now = now_utc_iso();
        let record = RoadmapItemRecord {
            id: 0,
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            category: input.category,
            start_date: input.start_date,
            due_date: input.due_date,
            progress: clamp_progress(input.progress),
            assignee: input.assignee,
            tags: input.tags,
            linked_feedback_count: 0,
            visibility: input.visibility,
            created_at: now.clone(),
            updated_at: now,
        };
        self.database.with_repositories(|repos| {
            let id = repos.roadmap().create(&record)?;
            Ok(RoadmapItemView::from_record(RoadmapItemRecord {
                id,
                ..record
            }))
        })
    }

    pub fn update(&self, id: i64, input: UpdateRoadmapItemInput) -> Result<RoadmapItemView> {
        self.database.with_repositories(|repos| {
            let roadmap = repos.roadmap();
            let existing = roadmap
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("roadmap item", id))?;
            let record = RoadmapItemRecord {
                title: input.title.unwrap_or(existing.title),
                description: input.description.unwrap_or(existing.description),
                priority: input.priority.unwrap_or(existing.priority),
                category: input.category.unwrap_or(existing.category),
                start_date: input.start_date.unwrap_or(existing.start_date),
                due_date: input.due_date.unwrap_or(existing.due_date),
                assignee: input.assignee.unwrap_or(existing.assignee),
                tags: input.tags.unwrap_or(existing.tags),
                visibility: input.visibility.unwrap_or(existing.visibility),
                updated_at: now_utc_iso(),
                ..existing
            };
            roadmap.update(&record)?;
            Ok(RoadmapItemView::from_record(record))
        })
    }

    /// Moving an item between columns drags its progress along: Shipped work
    /// is complete, Backlog work has not started, a freshly Planned item sits
    /// at 25%, and moving to In Progress lifts anything still below 25% to
    /// the halfway mark.
    pub fn update_status(&self, id: i64, status: &str) -> Result<RoadmapItemView> {
        if !STATUSES.contains(&status) {
            return Err(
                ServiceError::validation(format!("unknown roadmap status '{status}'")).into(),
            );
        }
        self.database.with_repositories(|repos| {
            let roadmap = repos.roadmap();
            let existing = roadmap
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("roadmap item", id))?;
            let progress = match status {
                "Shipped" => 100,
                "Backlog" => 0,
                "Planned" => 25,
                "In Progress" if existing.progress < 25 => 50,
                _ => existing.progress,
            };
            let record = RoadmapItemRecord {
                status: status.to_string(),
                progress,
                updated_at: now_utc_iso(),
                ..existing
            };
            roadmap.update(&record)?;
            Ok(RoadmapItemView::from_record(record))
        })
    }

    /// The inverse coupling: progress drags status. Complete means Shipped,
    /// past the halfway mark means In Progress, and any progress at all
    /// lifts an item out of the Backlog.
    pub fn update_progress(&self, id: i64, progress: i64) -> Result<RoadmapItemView> {
        self.database.with_repositories(|repos| {
            let roadmap = repos.roadmap();
            let existing = roadmap
                .get(id)?
                .ok_or_else(|| ServiceError::not_found("roadmap item", id))?;
            let progress = clamp_progress(progress);
            let status = if progress == 100 {
                "Shipped".to_string()
            } else if progress > 50 {
                "In Progress".to_string()
            } else if progress > 0 && existing.status == "Backlog" {
                "Planned".to_string()
            } else {
                existing.status.clone()
            };
            let record = RoadmapItemRecord {
                status,
                progress,
                updated_at: now_utc_iso(),
                ..existing
            };
            roadmap.update(&record)?;
            Ok(RoadmapItemView::from_record(record))
        })
    }

    /// Items whose scheduled window overlaps the given range. An item with
    /// either date missing or unparseable never matches.
    pub fn by_date_range(&self, start: &str, end: &str) -> Result<Vec<RoadmapItemView>> {
        let (Some(start), Some(end)) = (parse_utc(start), parse_utc(end)) else {
            return Err(ServiceError::validation("invalid date range").into());
        };
        self.database.with_repositories(|repos| {
            let records = repos.roadmap().list()?;
            Ok(records
                .into_iter()
                .filter(|item| {
                    let item_start = item.start_date.as_deref().and_then(parse_utc);
                    let item_end = item.due_date.as_deref().and_then(parse_utc);
                    match (item_start, item_end) {
                        (Some(s), Some(e)) => s <= end && e >= start,
                        _ => false,
                    }
                })
                .map(RoadmapItemView::from_record)
                .collect())
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.database.with_repositories(|repos| {
            if !repos.roadmap().delete(id)? {
                return Err(ServiceError::not_found("roadmap item", id).into());
            }
            Ok(())
        })
    }
}
