use tracing::{info, warn};
use uuid::Uuid;

use shared::{
    ActivityAction, ActivityCategory, Cattle, CattlePatch, CreateCattleInput, NewActivity, Sex,
};

use super::activity_service::{actor_name, now, ActivityService};
use super::events::{image_filename, EventBus, StoreEvent};
use crate::error::{StoreError, StoreResult};
use crate::storage::{CattleStorage, Connection};

/// Narrowing for cattle lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CattleFilter {
    /// Case-insensitive substring of name or breed
    pub search: Option<String>,
    pub sex: Option<Sex>,
}

impl CattleFilter {
    fn matches(&self, cattle: &Cattle) -> bool {
        self.search.as_deref().map_or(true, |term| cattle.matches_search(term))
            && self.sex.map_or(true, |sex| cattle.sex == sex)
    }
}

/// Service for cattle profiles
#[derive(Clone)]
pub struct CattleService<C: Connection> {
    cattle_repository: C::CattleRepository,
    activity_service: ActivityService<C>,
    events: EventBus,
}

impl<C: Connection> CattleService<C> {
    pub fn new(connection: &C, activity_service: ActivityService<C>, events: EventBus) -> Self {
        Self {
            cattle_repository: connection.create_cattle_repository(),
            activity_service,
            events,
        }
    }

    /// Validate and store a new profile, recording an `add` activity
    pub async fn create_cattle(
        &self,
        input: CreateCattleInput,
        actor: Option<&str>,
    ) -> StoreResult<Cattle> {
        let mut new = input.validate()?;
        if new.created_by.is_none() {
            new.created_by = actor.map(str::to_string);
        }
        info!("Creating cattle: name={}, breed={}, sex={}", new.name, new.breed, new.sex);

        let cattle = Cattle::from_new(Uuid::new_v4().to_string(), new, now());
        self.cattle_repository.store_cattle(&cattle).await?;
        info!("Created cattle: {} with ID: {}", cattle.name, cattle.id);

        self.activity_service
            .record_after_commit(NewActivity::new(
                actor_name(actor, cattle.audit.created_by.as_deref()),
                ActivityAction::Add,
                ActivityCategory::Cattle,
                &cattle.name,
                format!("Added {} {} cattle \"{}\"", cattle.sex, cattle.breed, cattle.name),
            ))
            .await;

        Ok(cattle)
    }

    pub async fn get_cattle(&self, id: &str) -> StoreResult<Cattle> {
        info!("Getting cattle: {}", id);
        self.cattle_repository
            .get_cattle(id)
            .await?
            .ok_or(StoreError::NotFound("Cattle record"))
    }

    pub async fn list_cattle(&self, filter: &CattleFilter) -> StoreResult<Vec<Cattle>> {
        let cattle: Vec<Cattle> = self
            .cattle_repository
            .list_cattle()
            .await?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        info!("Found {} cattle", cattle.len());
        Ok(cattle)
    }

    /// Apply a partial update in place, recording an `edit` activity
    pub async fn update_cattle(
        &self,
        id: &str,
        patch: CattlePatch,
        actor: Option<&str>,
    ) -> StoreResult<Cattle> {
        info!("Updating cattle: {}", id);
        let cattle = self.cattle_repository.patch_cattle(id, &patch, now()).await?;
        info!("Updated cattle: {} with ID: {}", cattle.name, cattle.id);

        let changed = match patch.last_edited_field.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ if patch.content_labels().is_empty() => "details".to_string(),
            _ => patch.content_labels().join(", "),
        };
        self.activity_service
            .record_after_commit(NewActivity::new(
                actor_name(actor, patch.last_edited_by.as_deref()),
                ActivityAction::Edit,
                ActivityCategory::Cattle,
                &cattle.name,
                format!("Edited {} for \"{}\"", changed, cattle.name),
            ))
            .await;

        Ok(cattle)
    }

    /// Remove a profile. Its image is cleaned up after the commit.
    pub async fn delete_cattle(&self, id: &str, actor: Option<&str>) -> StoreResult<Cattle> {
        info!("Deleting cattle: {}", id);
        let cattle = self
            .cattle_repository
            .delete_cattle(id)
            .await?
            .ok_or_else(|| {
                warn!("Cattle not found: {}", id);
                StoreError::NotFound("Cattle record")
            })?;
        info!("Deleted cattle: {} with ID: {}", cattle.name, cattle.id);

        let image_url = match cattle.image_url.clone() {
            Some(url) if self.image_in_use(&url).await => {
                info!("Keeping image {} of deleted cattle {}: still referenced", url, cattle.id);
                None
            }
            other => other,
        };
        self.events.publish(StoreEvent::CattleDeleted {
            id: cattle.id.clone(),
            name: cattle.name.clone(),
            image_url,
        });
        self.activity_service
            .record_after_commit(NewActivity::new(
                actor_name(actor, None),
                ActivityAction::Delete,
                ActivityCategory::Cattle,
                &cattle.name,
                format!("Deleted cattle \"{}\" ({})", cattle.name, cattle.breed),
            ))
            .await;

        Ok(cattle)
    }

    /// Whether any stored profile points at the same image file. A failed
    /// lookup counts as in use so the file is kept.
    async fn image_in_use(&self, url: &str) -> bool {
        let Some(filename) = image_filename(url) else {
            return false;
        };
        match self.cattle_repository.list_cattle().await {
            Ok(cattle) => cattle.iter().any(|c| {
                c.image_url.as_deref().and_then(image_filename) == Some(filename)
            }),
            Err(e) => {
                warn!("Could not check image references for {}: {}", url, e);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DbConnection;
    use shared::ValidationError;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct TestContext {
        service: CattleService<DbConnection>,
        activities: ActivityService<DbConnection>,
        events: UnboundedReceiver<StoreEvent>,
    }

    async fn setup_test() -> TestContext {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let activities = ActivityService::new(&db);
        let (bus, events) = EventBus::new();
        TestContext {
            service: CattleService::new(&db, activities.clone(), bus),
            activities,
            events,
        }
    }

    fn bessie() -> CreateCattleInput {
        CreateCattleInput {
            name: Some("Bessie".to_string()),
            breed: Some("Jersey".to_string()),
            date_of_birth: Some("2020-01-01".to_string()),
            sex: Some("female".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_returns_full_record_and_logs_activity() {
        let ctx = setup_test().await;
        let cattle = ctx.service.create_cattle(bessie(), Some("Lazarus")).await.unwrap();

        assert!(!cattle.id.is_empty());
        assert!(cattle.breeding.is_empty());
        assert_eq!(cattle.audit.created_by.as_deref(), Some("Lazarus"));
        assert_eq!(ctx.service.get_cattle(&cattle.id).await.unwrap(), cattle);

        let log = ctx.activities.list_activities().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].user, "Lazarus");
        assert_eq!(log[0].action, ActivityAction::Add);
        assert_eq!(log[0].details.as_deref(), Some("Added female Jersey cattle \"Bessie\""));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_without_activity() {
        let ctx = setup_test().await;
        let mut input = bessie();
        input.sex = Some("bull".to_string());

        let result = ctx.service.create_cattle(input, None).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::InvalidSex { .. }))
        ));
        assert!(ctx.activities.list_activities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_only_update_leaves_everything_else() {
        let ctx = setup_test().await;
        let mut input = bessie();
        input.mating_breed = Some("Angus".to_string());
        input.image_url = Some("http://localhost:3000/uploads/a.jpg".to_string());
        let before = ctx.service.create_cattle(input, None).await.unwrap();

        let patch = CattlePatch {
            name: Some("X".to_string()),
            ..Default::default()
        };
        let after = ctx.service.update_cattle(&before.id, patch, None).await.unwrap();

        assert_eq!(after.name, "X");
        assert!(after.audit.last_edited_at.is_some());
        let mut expected = before.clone();
        expected.name = "X".to_string();
        expected.audit.last_edited_at = after.audit.last_edited_at;
        assert_eq!(after, expected);
        assert_eq!(ctx.service.get_cattle(&before.id).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_empty_update_is_noop_error() {
        let ctx = setup_test().await;
        let cattle = ctx.service.create_cattle(bessie(), None).await.unwrap();
        let result = ctx.service.update_cattle(&cattle.id, CattlePatch::default(), None).await;
        assert!(matches!(result, Err(StoreError::NoOp)));
    }

    #[tokio::test]
    async fn test_update_activity_uses_edited_field_label() {
        let ctx = setup_test().await;
        let cattle = ctx.service.create_cattle(bessie(), None).await.unwrap();
        let patch = CattlePatch {
            served_date: Some("2024-02-01".to_string()),
            last_edited_by: Some("Martha".to_string()),
            last_edited_field: Some("Served Date".to_string()),
            ..Default::default()
        };
        ctx.service.update_cattle(&cattle.id, patch, None).await.unwrap();

        let log = ctx.activities.list_activities().await.unwrap();
        let edit = log.iter().find(|e| e.action == ActivityAction::Edit).unwrap();
        assert_eq!(edit.user, "Martha");
        assert_eq!(edit.details.as_deref(), Some("Edited Served Date for \"Bessie\""));
    }

    #[tokio::test]
    async fn test_delete_emits_event_and_second_delete_is_not_found() {
        let mut ctx = setup_test().await;
        let mut input = bessie();
        input.image_url = Some("http://localhost:3000/uploads/a.jpg".to_string());
        let cattle = ctx.service.create_cattle(input, None).await.unwrap();

        ctx.service.delete_cattle(&cattle.id, Some("Lazarus")).await.unwrap();
        assert_eq!(
            ctx.events.recv().await,
            Some(StoreEvent::CattleDeleted {
                id: cattle.id.clone(),
                name: "Bessie".to_string(),
                image_url: cattle.image_url.clone(),
            })
        );

        assert!(matches!(
            ctx.service.get_cattle(&cattle.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            ctx.service.delete_cattle(&cattle.id, None).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_keeps_image_shared_with_another_profile() {
        let mut ctx = setup_test().await;
        let mut input = bessie();
        input.image_url = Some("http://localhost:3000/uploads/a.jpg".to_string());
        let original = ctx.service.create_cattle(input.clone(), None).await.unwrap();
        input.image_url = Some("http://farm.local/uploads/a.jpg".to_string());
        let copy = ctx.service.create_cattle(input, None).await.unwrap();

        ctx.service.delete_cattle(&original.id, None).await.unwrap();
        assert_eq!(
            ctx.events.recv().await,
            Some(StoreEvent::CattleDeleted {
                id: original.id.clone(),
                name: "Bessie".to_string(),
                image_url: None,
            })
        );

        ctx.service.delete_cattle(&copy.id, None).await.unwrap();
        assert_eq!(
            ctx.events.recv().await,
            Some(StoreEvent::CattleDeleted {
                id: copy.id.clone(),
                name: "Bessie".to_string(),
                image_url: copy.image_url.clone(),
            })
        );
    }

    #[tokio::test]
    async fn test_list_filters() {
        let ctx = setup_test().await;
        ctx.service.create_cattle(bessie(), None).await.unwrap();
        let mut bull = bessie();
        bull.name = Some("Ferdinand".to_string());
        bull.breed = Some("Angus".to_string());
        bull.sex = Some("male".to_string());
        ctx.service.create_cattle(bull, None).await.unwrap();

        let all = ctx.service.list_cattle(&CattleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let angus = CattleFilter {
            search: Some("ANG".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.service.list_cattle(&angus).await.unwrap()[0].name, "Ferdinand");

        let females = CattleFilter {
            sex: Some(Sex::Female),
            ..Default::default()
        };
        let names: Vec<_> = ctx
            .service
            .list_cattle(&females)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Bessie"]);
    }
}
