//! Item store: the in-memory list behind the main screen.
//!
//! The held list is replaced only when a fetch completes. Action methods talk to the backend and
//! never touch the list; callers re-fetch afterwards.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::{ItemTable, ProfileTable};
use crate::error::TodoError;
use crate::filter::{Counts, Filter};
use crate::models::{Item, ItemView, NewItem, Viewer, UNKNOWN_OWNER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    /// A later-issued fetch had already been applied; this result was dropped.
    Stale,
}

#[derive(Default)]
struct Snapshot {
    items: Vec<ItemView>,
    /// Token of the fetch currently reflected in `items`.
    applied: u64,
}

pub struct ItemStore {
    table: Arc<dyn ItemTable>,
    profiles: Arc<dyn ProfileTable>,
    snapshot: RwLock<Snapshot>,
    issued: AtomicU64,
}

impl ItemStore {
    pub fn new(table: Arc<dyn ItemTable>, profiles: Arc<dyn ProfileTable>) -> Self {
        Self {
            table,
            profiles,
            snapshot: RwLock::new(Snapshot::default()),
            issued: AtomicU64::new(0),
        }
    }

    /// Load the viewer's item set: own rows for users, every row (annotated) for admins.
    ///
    /// On error the held list is left as it was.
    pub async fn fetch(&self, viewer: &Viewer) -> Result<FetchOutcome, TodoError> {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(token, viewer = %viewer.id, role = %viewer.role, "fetching items");

        let views = if viewer.role.is_admin() {
            let items = self.table.list_all().await?;
            self.annotate(items).await?
        } else {
            self.table
                .list_owned(viewer.id)
                .await?
                .into_iter()
                .map(ItemView::own)
                .collect()
        };

        Ok(self.apply(token, views).await)
    }

    async fn annotate(&self, items: Vec<Item>) -> Result<Vec<ItemView>, TodoError> {
        let owners: Vec<Uuid> = items
            .iter()
            .map(|i| i.owner)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let labels: HashMap<Uuid, String> = if owners.is_empty() {
            HashMap::new()
        } else {
            self.profiles
                .find_profiles(&owners)
                .await?
                .into_iter()
                .filter_map(|p| p.display_label().map(|label| (p.id, label.to_string())))
                .collect()
        };

        Ok(items
            .into_iter()
            .map(|item| {
                let label = labels
                    .get(&item.owner)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
                ItemView::annotated(item, label)
            })
            .collect())
    }

    async fn apply(&self, token: u64, mut views: Vec<ItemView>) -> FetchOutcome {
        let mut snapshot = self.snapshot.write().await;
        if token <= snapshot.applied {
            tracing::warn!(token, applied = snapshot.applied, "discarding stale fetch result");
            return FetchOutcome::Stale;
        }

        // Newest first; stable so equal timestamps keep backend order.
        views.sort_by(|a, b| b.item.created_at.cmp(&a.item.created_at));
        let count = views.len();
        snapshot.items = views;
        snapshot.applied = token;
        FetchOutcome::Applied { count }
    }

    /// Create an item owned by the viewer. Blank titles are rejected before any request.
    pub async fn add(
        &self,
        viewer: &Viewer,
        title: &str,
        content: Option<&str>,
    ) -> Result<(), TodoError> {
        if !viewer.can_create() {
            return Err(TodoError::validation(
                "Item creation is not available to admin viewers",
            ));
        }
        let new_item = NewItem::new(viewer.id, title, content)?;
        self.table.insert(&new_item).await
    }

    /// Flip the completed flag of one held item.
    pub async fn toggle(&self, id: Uuid) -> Result<bool, TodoError> {
        let current = self
            .get(id)
            .await
            .ok_or_else(|| TodoError::validation(format!("No item with id {}", id)))?;
        let completed = !current.completed();
        self.table.set_completed(id, completed).await?;
        Ok(completed)
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), TodoError> {
        if self.get(id).await.is_none() {
            return Err(TodoError::validation(format!("No item with id {}", id)));
        }
        self.table.delete(id).await
    }

    pub async fn get(&self, id: Uuid) -> Option<ItemView> {
        self.snapshot
            .read()
            .await
            .items
            .iter()
            .find(|i| i.id() == id)
            .cloned()
    }

    pub async fn items(&self) -> Vec<ItemView> {
        self.snapshot.read().await.items.clone()
    }

    pub async fn visible(&self, filter: Filter) -> Vec<ItemView> {
        let snapshot = self.snapshot.read().await;
        filter.apply(&snapshot.items).into_iter().cloned().collect()
    }

    pub async fn counts(&self) -> Counts {
        Counts::of(&self.snapshot.read().await.items)
    }

    pub async fn clear(&self) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.items.clear();
        snapshot.applied = self.issued.load(Ordering::SeqCst);
    }
}
