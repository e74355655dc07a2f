use chrono::Utc;
use uuid::Uuid;

use crate::{
    models::child::{Child, CreateChildRequest, UpdateChildRequest},
    store::{ChildStore, StoreError, StoreResult},
};

pub struct ChildService;

impl ChildService {
    pub async fn list<S>(store: &S, family_id: Uuid) -> StoreResult<Vec<Child>>
    where
        S: ChildStore + ?Sized,
    {
        store.list_children(family_id).await
    }

    pub async fn create<S>(store: &S, family_id: Uuid, req: &CreateChildRequest) -> anyhow::Result<Child>
    where
        S: ChildStore + ?Sized,
    {
        anyhow::ensure!(!req.name.trim().is_empty(), "Name is required");
        let child = Child {
            id: Uuid::new_v4(),
            family_id,
            name: req.name.trim().to_string(),
            birth_date: req.birth_date,
            created_at: Utc::now(),
        };
        store.upsert_child(&child).await?;
        Ok(child)
    }

    /// Fetch a child, treating children of other families as missing.
    pub async fn get_in_family<S>(store: &S, family_id: Uuid, child_id: Uuid) -> StoreResult<Child>
    where
        S: ChildStore + ?Sized,
    {
        let child = store.get_child(child_id).await?;
        if child.family_id != family_id {
            return Err(StoreError::NotFound);
        }
        Ok(child)
    }

    pub async fn update<S>(store: &S, mut child: Child, req: &UpdateChildRequest) -> anyhow::Result<Child>
    where
        S: ChildStore + ?Sized,
    {
        if let Some(ref name) = req.name {
            anyhow::ensure!(!name.trim().is_empty(), "Name is required");
            child.name = name.trim().to_string();
        }
        if req.birth_date.is_some() {
            child.birth_date = req.birth_date;
        }
        store.upsert_child(&child).await?;
        Ok(child)
    }

    /// Hard-delete a child together with all of its records.
    pub async fn delete<S>(store: &S, child: &Child) -> StoreResult<()>
    where
        S: ChildStore + ?Sized,
    {
        store.delete_child(child.id).await?;
        tracing::info!(child_id = %child.id, family_id = %child.family_id, "child deleted");
        Ok(())
    }
}
