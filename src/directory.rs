use std::collections::HashSet;

use reqwest::Url;

use crate::api::AdminBackend;
use crate::error::ClientError;
use crate::models::{ListKind, RowKey, UserKind, UserRecord};
use crate::notify::{Confirm, Notifier};

pub const LOAD_FAILED: &str = "Failed to load users";
const AVATAR_SERVICE: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ViewFilter {
    #[default]
    All,
    Candidates,
    Recruiters,
}

impl ViewFilter {
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Candidates,
            Self::Candidates => Self::Recruiters,
            Self::Recruiters => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Users",
            Self::Candidates => "Candidates",
            Self::Recruiters => "Recruiters",
        }
    }
}

/// A record as it appears in the list, tagged with its source collection.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub list: ListKind,
    pub record: &'a UserRecord,
}

impl Entry<'_> {
    pub fn key(&self) -> RowKey {
        RowKey::new(self.list, self.record.id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    AlreadyDeleting,
    Deleted,
    Failed,
}

/// Candidate and recruiter collections as loaded from the admin API.
#[derive(Debug)]
pub struct UserDirectory {
    candidates: Vec<UserRecord>,
    recruiters: Vec<UserRecord>,
    loading: bool,
    error: Option<String>,
    deleting: HashSet<RowKey>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches both collections concurrently; both settle before returning.
pub async fn fetch_all<B: AdminBackend>(
    backend: &B,
) -> Result<(Vec<UserRecord>, Vec<UserRecord>), ClientError> {
    let (candidates, recruiters) = tokio::join!(
        backend.list_users(ListKind::Candidate),
        backend.list_users(ListKind::Recruiter)
    );
    Ok((candidates?, recruiters?))
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            recruiters: Vec::new(),
            loading: true,
            error: None,
            deleting: HashSet::new(),
        }
    }

    pub async fn load<B: AdminBackend>(&mut self, backend: &B) {
        self.loading = true;
        self.error = None;
        let result = fetch_all(backend).await;
        self.apply_load(result);
    }

    pub fn apply_load(&mut self, result: Result<(Vec<UserRecord>, Vec<UserRecord>), ClientError>) {
        match result {
            Ok((candidates, recruiters)) => {
                tracing::info!(
                    "loaded {} candidates and {} recruiters",
                    candidates.len(),
                    recruiters.len()
                );
                self.candidates = candidates;
                self.recruiters = recruiters;
            }
            Err(e) => {
                tracing::error!("failed to load users: {}", e);
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn collection(&self, list: ListKind) -> &[UserRecord] {
        match list {
            ListKind::Candidate => &self.candidates,
            ListKind::Recruiter => &self.recruiters,
        }
    }

    fn collection_mut(&mut self, list: ListKind) -> &mut Vec<UserRecord> {
        match list {
            ListKind::Candidate => &mut self.candidates,
            ListKind::Recruiter => &mut self.recruiters,
        }
    }

    fn bucket(&self, list: ListKind) -> impl Iterator<Item = Entry<'_>> {
        self.collection(list)
            .iter()
            .filter(move |r| list.accepts(&r.kind))
            .map(move |record| Entry { list, record })
    }

    /// Records whose role matches the collection they came from. A record
    /// served by the candidates endpoint with role "recruiter" is dropped.
    pub fn visible(&self, view: ViewFilter) -> Vec<Entry<'_>> {
        match view {
            ViewFilter::Candidates => self.bucket(ListKind::Candidate).collect(),
            ViewFilter::Recruiters => self.bucket(ListKind::Recruiter).collect(),
            ViewFilter::All => self
                .bucket(ListKind::Candidate)
                .chain(self.bucket(ListKind::Recruiter))
                .collect(),
        }
    }

    /// `visible` narrowed by a case-insensitive match on name or email.
    pub fn search(&self, view: ViewFilter, query: &str) -> Vec<Entry<'_>> {
        let q = query.trim().to_lowercase();
        let visible = self.visible(view);
        if q.is_empty() {
            return visible;
        }
        visible
            .into_iter()
            .filter(|e| {
                e.record.display_name().to_lowercase().contains(&q)
                    || e.record.email.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Records hidden from every view because their role is unrecognized.
    pub fn unknown_count(&self) -> usize {
        self.candidates
            .iter()
            .chain(self.recruiters.iter())
            .filter(|r| matches!(r.kind, UserKind::Unknown(_)))
            .count()
    }

    pub fn is_empty_state(&self, view: ViewFilter, query: &str) -> bool {
        !self.loading && self.search(view, query).is_empty()
    }

    pub fn is_deleting(&self, key: &RowKey) -> bool {
        self.deleting.contains(key)
    }

    pub fn find(&self, key: &RowKey) -> Option<&UserRecord> {
        self.collection(key.list).iter().find(|r| r.id == key.id)
    }

    pub fn confirm_prompt(&self, key: &RowKey) -> Option<String> {
        let record = self.find(key)?;
        Some(format!(
            "Delete {} \"{}\"? This cannot be undone.",
            key.list.label(),
            record.display_name()
        ))
    }

    /// Marks the row as in flight. Returns false if it already is.
    pub fn begin_delete(&mut self, key: &RowKey) -> bool {
        self.deleting.insert(key.clone())
    }

    pub fn finish_delete(
        &mut self,
        key: &RowKey,
        result: Result<(), ClientError>,
        notifier: &dyn Notifier,
    ) -> DeleteOutcome {
        self.deleting.remove(key);
        let label = key.list.label();
        match result {
            Ok(()) => {
                let collection = self.collection_mut(key.list);
                if let Some(pos) = collection.iter().position(|r| r.id == key.id) {
                    collection.remove(pos);
                }
                tracing::info!("deleted {}", key);
                notifier.success(&format!("{} deleted successfully!", capitalize(label)));
                DeleteOutcome::Deleted
            }
            Err(e) => {
                tracing::error!("failed to delete {}: {}", key, e);
                notifier.error(&format!("Failed to delete {}.", label));
                DeleteOutcome::Failed
            }
        }
    }

    /// Confirm, delete, and reconcile the local collection in one go.
    pub async fn delete<B: AdminBackend>(
        &mut self,
        backend: &B,
        key: &RowKey,
        confirm: &dyn Confirm,
        notifier: &dyn Notifier,
    ) -> DeleteOutcome {
        let Some(prompt) = self.confirm_prompt(key) else {
            tracing::warn!("delete requested for unknown row {}", key);
            return DeleteOutcome::Cancelled;
        };
        if !confirm.confirm(&prompt) {
            return DeleteOutcome::Cancelled;
        }
        if !self.begin_delete(key) {
            return DeleteOutcome::AlreadyDeleting;
        }
        let result = backend.delete_user(key.list, &key.id).await;
        self.finish_delete(key, result, notifier)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Image URL for a record: absolute http(s) images as-is, relative paths
/// under the API base, otherwise a generated initials avatar.
pub fn avatar_url(record: &UserRecord, api_base: &str) -> String {
    if let Some(image) = record.image.as_deref().filter(|i| !i.trim().is_empty()) {
        let lower = image.to_ascii_lowercase();
        if lower.starts_with("http:") || lower.starts_with("https:") {
            return image.to_string();
        }
        let base = api_base.trim_end_matches('/');
        return if image.starts_with('/') {
            format!("{}{}", base, image)
        } else {
            format!("{}/{}", base, image)
        };
    }

    let name = record.display_name();
    let name = if name.is_empty() { "User".to_string() } else { name };
    Url::parse_with_params(
        AVATAR_SERVICE,
        &[
            ("name", name.as_str()),
            ("background", "1f2937"),
            ("color", "e5e7eb"),
            ("bold", "true"),
        ],
    )
    .map(String::from)
    .unwrap_or_else(|_| AVATAR_SERVICE.to_string())
}
