//! High-level client workflows: reconciled reads, attributed writes, the
//! breeding-info edit and the cached activity feed.

use chrono::Utc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::audit::{AuditCache, AuditEntry, Namespace};
use crate::error::ClientResult;
use shared::{
    breeding_edit_label, breeding_patch, ActivityAction, ActivityCategory, ActivityEntry,
    BreedingInfo, Cattle, CattleField, CattlePatch, CreateActivityInput, CreateCattleInput,
    CreateMilkRecordInput, MilkRecord,
};

/// How a breeding-info edit reaches the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BreedingEditMode {
    /// One partial update; the record keeps its id.
    #[default]
    InPlace,
    /// Create a copy, then delete the original. The record gets a new id
    /// and its cached audit entry follows it. If the original cannot be
    /// deleted the copy is removed again and the edit fails.
    Recreate,
}

/// Activity list plus whether it came from the local cache
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFeed {
    pub entries: Vec<ActivityEntry>,
    pub stale: bool,
}

pub struct HerdBook {
    api: ApiClient,
    cache: AuditCache,
    user: String,
    breeding_edit_mode: BreedingEditMode,
}

impl HerdBook {
    pub fn new(api: ApiClient, cache: AuditCache, user: impl Into<String>) -> Self {
        let user = user.into();
        Self {
            api: api.with_user(user.clone()),
            cache,
            user,
            breeding_edit_mode: BreedingEditMode::default(),
        }
    }

    pub fn with_breeding_edit_mode(mut self, mode: BreedingEditMode) -> Self {
        self.breeding_edit_mode = mode;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &AuditCache {
        &self.cache
    }

    pub async fn list_cattle(&self) -> ClientResult<Vec<Cattle>> {
        let cattle = self.api.list_cattle().await?;
        Ok(self.cache.reconcile_cattle(cattle).await)
    }

    pub async fn get_cattle(&self, id: &str) -> ClientResult<Cattle> {
        let cattle = self.api.get_cattle(id).await?;
        Ok(self
            .cache
            .reconcile_cattle(vec![cattle.clone()])
            .await
            .pop()
            .unwrap_or(cattle))
    }

    pub async fn add_cattle(&self, mut input: CreateCattleInput) -> ClientResult<Cattle> {
        if input.created_by.is_none() {
            input.created_by = Some(self.user.clone());
        }
        let cattle = self.api.create_cattle(&input).await?;
        self.cache
            .remember(
                Namespace::Cattle,
                &cattle.id,
                AuditEntry {
                    created_by: input.created_by,
                    ..Default::default()
                },
            )
            .await;
        Ok(cattle)
    }

    /// Partial update attributed to this book's user
    pub async fn edit_cattle(&self, id: &str, mut patch: CattlePatch) -> ClientResult<Cattle> {
        if patch.last_edited_by.is_none() {
            patch.last_edited_by = Some(self.user.clone());
        }
        if patch.last_edited_field.is_none() && !patch.content_labels().is_empty() {
            patch.last_edited_field = Some(patch.content_labels().join(", "));
        }
        let cattle = self.api.update_cattle(id, &patch).await?;
        self.remember_edit(&cattle.id, &patch).await;
        Ok(cattle)
    }

    async fn remember_edit(&self, id: &str, patch: &CattlePatch) {
        self.cache
            .remember(
                Namespace::Cattle,
                id,
                AuditEntry {
                    last_edited_by: patch.last_edited_by.clone(),
                    last_edited_at: Some(Utc::now()),
                    last_edited_field: patch.last_edited_field.clone(),
                    ..Default::default()
                },
            )
            .await;
    }

    /// Replace `prior`'s breeding info with `edited`, optionally changing
    /// the photo, using the configured edit mode.
    pub async fn edit_breeding_info(
        &self,
        prior: &Cattle,
        edited: BreedingInfo,
        image_url: Option<String>,
    ) -> ClientResult<Cattle> {
        let photo_changed = image_url.is_some() && image_url != prior.image_url;
        let label = breeding_edit_label(prior, &edited, photo_changed);

        let mut patch = breeding_patch(prior, &edited);
        if photo_changed {
            if let Some(url) = &image_url {
                patch.set_slot(CattleField::ImageUrl, url.as_str());
            }
        }
        patch.last_edited_by = Some(self.user.clone());
        patch.last_edited_field = Some(label);

        match self.breeding_edit_mode {
            BreedingEditMode::InPlace => {
                let cattle = self.api.update_cattle(&prior.id, &patch).await?;
                self.remember_edit(&cattle.id, &patch).await;
                Ok(cattle)
            }
            BreedingEditMode::Recreate => self.recreate(prior, edited, image_url, &patch).await,
        }
    }

    async fn recreate(
        &self,
        prior: &Cattle,
        edited: BreedingInfo,
        image_url: Option<String>,
        patch: &CattlePatch,
    ) -> ClientResult<Cattle> {
        let text = |field: CattleField| edited.field_text(field);
        let input = CreateCattleInput {
            name: Some(prior.name.clone()),
            breed: Some(prior.breed.clone()),
            date_of_birth: prior.field_text(CattleField::DateOfBirth),
            sex: Some(prior.sex.as_str().to_string()),
            image_url: image_url.or_else(|| prior.image_url.clone()),
            served_date: text(CattleField::ServedDate),
            mating_breed: text(CattleField::MatingBreed),
            expected_calf_birth_date: text(CattleField::ExpectedCalfBirthDate),
            calf_birth_date: text(CattleField::CalfBirthDate),
            calf_sex: text(CattleField::CalfSex),
            dried_date: text(CattleField::DriedDate),
            created_by: prior
                .audit
                .created_by
                .clone()
                .or_else(|| Some(self.user.clone())),
        };

        // Create first so a failure leaves the original in place.
        let created = self.api.create_cattle(&input).await?;
        if let Err(e) = self.api.delete_cattle(&prior.id).await {
            warn!("Failed to delete {} after recreating it as {}: {}", prior.id, created.id, e);
            if let Err(rollback) = self.api.delete_cattle(&created.id).await {
                warn!("Failed to remove recreated cattle {}: {}", created.id, rollback);
            }
            return Err(e);
        }
        info!("Recreated cattle {} as {}", prior.id, created.id);

        let label = patch.last_edited_field.as_deref().unwrap_or("Breeding Info");
        self.log_edit(&created.name, label).await;

        self.cache.migrate(Namespace::Cattle, &prior.id, &created.id).await;
        self.cache
            .remember(
                Namespace::Cattle,
                &created.id,
                AuditEntry {
                    created_by: input.created_by,
                    ..Default::default()
                },
            )
            .await;
        self.remember_edit(&created.id, patch).await;

        Ok(self
            .cache
            .reconcile_cattle(vec![created.clone()])
            .await
            .pop()
            .unwrap_or(created))
    }

    /// The server logs a recreate as an add and a delete; record the edit
    /// itself. A failure here does not undo the edit.
    async fn log_edit(&self, name: &str, label: &str) {
        let entry = CreateActivityInput {
            user: Some(self.user.clone()),
            action: Some(ActivityAction::Edit.as_str().to_string()),
            category: Some(ActivityCategory::Cattle.as_str().to_string()),
            target: Some(name.to_string()),
            details: Some(format!("Edited {} for \"{}\"", label, name)),
        };
        if let Err(e) = self.api.create_activity(&entry).await {
            warn!("Failed to log edit of {}: {}", name, e);
        }
    }

    pub async fn delete_cattle(&self, id: &str) -> ClientResult<()> {
        self.api.delete_cattle(id).await?;
        self.cache.forget(Namespace::Cattle, id).await;
        Ok(())
    }

    pub async fn list_milk(&self, cow_name: Option<&str>) -> ClientResult<Vec<MilkRecord>> {
        let records = self.api.list_milk(cow_name).await?;
        Ok(self.cache.reconcile_milk(records).await)
    }

    pub async fn add_milk(&self, mut input: CreateMilkRecordInput) -> ClientResult<MilkRecord> {
        if input.added_by.is_none() {
            input.added_by = Some(self.user.clone());
        }
        let record = self.api.create_milk(&input).await?;
        self.cache
            .remember(
                Namespace::Milk,
                &record.id,
                AuditEntry {
                    added_by: input.added_by,
                    ..Default::default()
                },
            )
            .await;
        Ok(record)
    }

    pub async fn delete_milk(&self, id: &str) -> ClientResult<()> {
        self.api.delete_milk(id).await?;
        self.cache.forget(Namespace::Milk, id).await;
        Ok(())
    }

    /// Activity list from the server, or the last cached one when the server
    /// is unavailable
    pub async fn activity_feed(&self) -> ClientResult<ActivityFeed> {
        match self.api.list_activities().await {
            Ok(entries) => {
                self.cache.store_activities(&entries).await;
                Ok(ActivityFeed {
                    entries,
                    stale: false,
                })
            }
            Err(e) if e.is_unavailable() => {
                warn!("Activity log unavailable, using cached copy: {}", e);
                Ok(ActivityFeed {
                    entries: self.cache.cached_activities().await,
                    stale: true,
                })
            }
            Err(e) => Err(e),
        }
    }
}
