//! Task listing: turns untrusted query-string parameters into a validated
//! [`TaskQuery`] and evaluates it.
//!
//! The owner restriction is not part of the query itself. Every store receives the
//! owner id separately and must always apply it, so nothing a client sends can widen
//! a listing to another user's tasks.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{Task, TaskStatus};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 10_000;

/// Whitelisted sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Title,
    Status,
}

impl SortBy {
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::CreatedAt => "created_at",
            SortBy::Title => "title",
            SortBy::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw query parameters for `GET /tasks`, exactly as the client sent them.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub status: Option<TaskStatus>,
    #[validate(range(min = 1, max = 10000))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
    #[validate(length(min = 3))]
    pub search: Option<String>,
    /// Comma separated, e.g. `labels=work,urgent`.
    pub labels: Option<String>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

/// A validated, normalized listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
    /// `None` means "no label filter". Never `Some(empty)`.
    pub labels: Option<Vec<String>>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            labels: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl TryFrom<TaskQueryParams> for TaskQuery {
    type Error = AppError;

    fn try_from(params: TaskQueryParams) -> Result<Self, Self::Error> {
        params.validate()?;

        Ok(Self {
            labels: normalize_labels(params.labels.as_deref()),
            status: params.status,
            search: params.search,
            sort_by: params.sort_by.unwrap_or_default(),
            sort_order: params.sort_order.unwrap_or_default(),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: params.offset.unwrap_or(0).max(0),
        })
    }
}

/// Splits a comma separated label list, trimming each entry and dropping blanks.
/// Absent or effectively empty input yields `None`.
pub fn normalize_labels(raw: Option<&str>) -> Option<Vec<String>> {
    let labels: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        None
    } else {
        Some(labels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Number of matching rows before pagination.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl TaskQuery {
    /// Whether `task` belongs to `owner` and passes every filter of the query.
    pub fn matches(&self, owner: Uuid, task: &Task) -> bool {
        if task.owner_id != owner {
            return false;
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !task.title.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(labels) = &self.labels {
            if !task.labels.iter().any(|label| labels.contains(&label.name)) {
                return false;
            }
        }
        true
    }

    /// Orders two tasks by the requested column and direction.
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.sort_by {
            SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            SortBy::Title => a.title.cmp(&b.title),
            SortBy::Status => a.status.cmp(&b.status),
        };
        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Evaluates the query over tasks given in insertion order.
    ///
    /// The sort is stable, so ties keep insertion order.
    pub fn apply<'a, I>(&self, owner: Uuid, tasks: I) -> Page<Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut matching: Vec<&Task> = tasks
            .into_iter()
            .filter(|task| self.matches(owner, task))
            .collect();
        matching.sort_by(|a, b| self.compare(a, b));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect();

        Page {
            items,
            meta: self.meta(total),
        }
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta {
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskLabel;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn params(query: &str) -> Result<TaskQuery, AppError> {
        let params: TaskQueryParams = parse_query(query);
        TaskQuery::try_from(params)
    }

    fn parse_query(query: &str) -> TaskQueryParams {
        actix_web::web::Query::<TaskQueryParams>::from_query(query)
            .expect("query should deserialize")
            .into_inner()
    }

    fn task(owner: Uuid, title: &str, status: TaskStatus, minute: i64, labels: &[&str]) -> Task {
        let id = Uuid::new_v4();
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        Task {
            id,
            title: title.to_string(),
            description: format!("{} description", title),
            status,
            owner_id: owner,
            labels: labels
                .iter()
                .map(|name| TaskLabel {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    task_id: id,
                })
                .collect(),
            created_at,
            updated_at: created_at,
        }
    }

    fn titles(page: &Page<Task>) -> Vec<&str> {
        page.items.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_defaults() {
        let query = params("").unwrap();
        assert_eq!(query, TaskQuery::default());
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort_by, SortBy::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_parses_all_parameters() {
        let query = params(
            "status=IN_PROGRESS&limit=25&offset=5&search=report&labels=work,%20urgent&sortBy=title&sortOrder=ASC",
        )
        .unwrap();
        assert_eq!(query.status, Some(TaskStatus::InProgress));
        assert_eq!(query.limit, 25);
        assert_eq!(query.offset, 5);
        assert_eq!(query.search.as_deref(), Some("report"));
        assert_eq!(
            query.labels,
            Some(vec!["work".to_string(), "urgent".to_string()])
        );
        assert_eq!(query.sort_by, SortBy::Title);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        for query in ["limit=0", "limit=10001", "offset=-1", "search=ab"] {
            assert!(
                matches!(params(query), Err(AppError::ValidationError(_))),
                "{} should be rejected",
                query
            );
        }
        assert!(params("limit=10000").is_ok());
        assert!(params("search=abc").is_ok());
    }

    #[test]
    fn test_rejects_unknown_enum_values() {
        for query in ["status=ARCHIVED", "sortBy=description", "sortOrder=up", "limit=ten"] {
            assert!(
                actix_web::web::Query::<TaskQueryParams>::from_query(query).is_err(),
                "{} should not deserialize",
                query
            );
        }
    }

    #[test]
    fn test_normalize_labels() {
        assert_eq!(normalize_labels(None), None);
        assert_eq!(normalize_labels(Some("")), None);
        assert_eq!(normalize_labels(Some(" , ,")), None);
        assert_eq!(
            normalize_labels(Some(" a ,, b,c ")),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_apply_restricts_to_owner() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let tasks = vec![
            task(alice, "a1", TaskStatus::Open, 0, &[]),
            task(bob, "b1", TaskStatus::Open, 1, &[]),
            task(alice, "a2", TaskStatus::Done, 2, &[]),
        ];

        let page = TaskQuery::default().apply(alice, &tasks);
        assert_eq!(page.meta.total, 2);
        assert!(page.items.iter().all(|t| t.owner_id == alice));
    }

    #[test]
    fn test_apply_filters() {
        let owner = Uuid::new_v4();
        let tasks = vec![
            task(owner, "Write report", TaskStatus::Open, 0, &["work"]),
            task(owner, "Buy milk", TaskStatus::Done, 1, &["home"]),
            task(owner, "Review REPORT", TaskStatus::Done, 2, &["work", "urgent"]),
            task(owner, "Nap", TaskStatus::Open, 3, &[]),
        ];

        let by_status = TaskQuery {
            status: Some(TaskStatus::Done),
            ..TaskQuery::default()
        };
        assert_eq!(titles(&by_status.apply(owner, &tasks)), vec!["Review REPORT", "Buy milk"]);

        let by_search = TaskQuery {
            search: Some("report".into()),
            ..TaskQuery::default()
        };
        assert_eq!(by_search.apply(owner, &tasks).meta.total, 2);

        let by_labels = TaskQuery {
            labels: Some(vec!["urgent".into(), "home".into()]),
            ..TaskQuery::default()
        };
        assert_eq!(titles(&by_labels.apply(owner, &tasks)), vec!["Review REPORT", "Buy milk"]);
    }

    #[test]
    fn test_apply_sorts_and_paginates() {
        let owner = Uuid::new_v4();
        let tasks = vec![
            task(owner, "c", TaskStatus::Done, 0, &[]),
            task(owner, "a", TaskStatus::Open, 1, &[]),
            task(owner, "b", TaskStatus::InProgress, 2, &[]),
        ];

        let by_title = TaskQuery {
            sort_by: SortBy::Title,
            sort_order: SortOrder::Asc,
            ..TaskQuery::default()
        };
        assert_eq!(titles(&by_title.apply(owner, &tasks)), vec!["a", "b", "c"]);

        let newest_first = TaskQuery::default();
        assert_eq!(titles(&newest_first.apply(owner, &tasks)), vec!["b", "a", "c"]);

        let window = TaskQuery {
            limit: 1,
            offset: 1,
            sort_by: SortBy::Status,
            sort_order: SortOrder::Asc,
            ..TaskQuery::default()
        };
        let page = window.apply(owner, &tasks);
        assert_eq!(titles(&page), vec!["b"]);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 3,
                limit: 1,
                offset: 1
            }
        );
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let owner = Uuid::new_v4();
        let tasks = vec![
            task(owner, "first", TaskStatus::Open, 0, &[]),
            task(owner, "second", TaskStatus::Open, 0, &[]),
            task(owner, "third", TaskStatus::Open, 0, &[]),
        ];

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let query = TaskQuery {
                sort_order: order,
                ..TaskQuery::default()
            };
            assert_eq!(
                titles(&query.apply(owner, &tasks)),
                vec!["first", "second", "third"]
            );
        }
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let owner = Uuid::new_v4();
        let tasks = vec![task(owner, "only", TaskStatus::Open, 0, &[])];
        let query = TaskQuery {
            offset: 5,
            ..TaskQuery::default()
        };
        let page = query.apply(owner, &tasks);
        assert!(page.items.is_empty());
        assert_eq!(page.meta.total, 1);
    }
}
