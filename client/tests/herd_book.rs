use std::net::SocketAddr;

use cattle_keeper_backend::{config::DEFAULT_API_KEY, create_router, initialize_backend, Config};
use cattle_keeper_client::{
    ApiClient, AuditCache, BreedingEditMode, ClientError, HerdBook, Namespace,
};
use chrono::NaiveDate;
use shared::{ActivityAction, BreedingInfo, CattlePatch, CreateCattleInput, CreateMilkRecordInput};

struct TestServer {
    addr: SocketAddr,
    _dir: tempfile::TempDir,
}

async fn spawn_server() -> TestServer {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let state = initialize_backend(Config::local(dir.path()))
        .await
        .expect("Failed to initialize backend");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    TestServer { addr, _dir: dir }
}

fn book(server: &TestServer, user: &str) -> HerdBook {
    let api = ApiClient::new(&format!("http://{}", server.addr), DEFAULT_API_KEY).unwrap();
    HerdBook::new(api, AuditCache::in_memory(), user)
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
async fn test_writes_are_attributed_to_the_book_user() {
    let server = spawn_server().await;
    let herd = book(&server, "Lazarus");

    let cattle = herd.add_cattle(bessie()).await.unwrap();
    assert_eq!(cattle.audit.created_by.as_deref(), Some("Lazarus"));

    let edited = herd
        .edit_cattle(
            &cattle.id,
            CattlePatch {
                breed: Some("Guernsey".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.audit.last_edited_by.as_deref(), Some("Lazarus"));
    assert_eq!(edited.audit.last_edited_field.as_deref(), Some("Breed"));

    let feed = herd.activity_feed().await.unwrap();
    assert!(!feed.stale);
    assert_eq!(feed.entries.len(), 2);
    assert!(feed.entries.iter().all(|e| e.user == "Lazarus"));
    assert_eq!(feed.entries[0].action, ActivityAction::Edit);
}

#[tokio::test]
async fn test_in_place_breeding_edit_keeps_id() {
    let server = spawn_server().await;
    let herd = book(&server, "Martha");
    let prior = herd.add_cattle(bessie()).await.unwrap();

    let edited = BreedingInfo {
        served_date: NaiveDate::from_ymd_opt(2024, 2, 1),
        mating_breed: Some("Angus".to_string()),
        ..Default::default()
    };
    let updated = herd.edit_breeding_info(&prior, edited.clone(), None).await.unwrap();

    assert_eq!(updated.id, prior.id);
    assert_eq!(updated.breeding, edited);
    assert_eq!(updated.created_at, prior.created_at);
    assert_eq!(
        updated.audit.last_edited_field.as_deref(),
        Some("Served Date, Mating Breed")
    );
}

#[tokio::test]
async fn test_recreate_breeding_edit_migrates_cache() {
    let server = spawn_server().await;
    let herd = book(&server, "Martha").with_breeding_edit_mode(BreedingEditMode::Recreate);
    let prior = herd.add_cattle(bessie()).await.unwrap();

    let edited = BreedingInfo {
        dried_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        ..Default::default()
    };
    let recreated = herd.edit_breeding_info(&prior, edited, None).await.unwrap();

    assert_ne!(recreated.id, prior.id);
    assert_eq!(recreated.audit.last_edited_field.as_deref(), Some("Dried Date"));
    assert_eq!(recreated.audit.created_by.as_deref(), Some("Martha"));
    assert!(herd.cache().get(Namespace::Cattle, &prior.id).await.is_none());
    assert!(herd.cache().get(Namespace::Cattle, &recreated.id).await.is_some());

    let err = herd.get_cattle(&prior.id).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));

    let listed = herd.list_cattle().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].audit.last_edited_by.as_deref(), Some("Martha"));

    let feed = herd.activity_feed().await.unwrap();
    let edit = feed
        .entries
        .iter()
        .find(|e| e.action == ActivityAction::Edit)
        .expect("recreate should log an edit");
    assert_eq!(edit.user, "Martha");
    assert_eq!(edit.target, "Bessie");
    assert_eq!(edit.details.as_deref(), Some("Edited Dried Date for \"Bessie\""));
}

#[tokio::test]
async fn test_recreate_keeps_the_photo() {
    let server = spawn_server().await;
    let herd = book(&server, "Martha").with_breeding_edit_mode(BreedingEditMode::Recreate);
    let upload = herd
        .api()
        .upload_image("bessie.PNG", "image/png", b"\x89PNG fake".to_vec())
        .await
        .unwrap();

    let mut input = bessie();
    input.image_url = Some(upload.url.clone());
    let prior = herd.add_cattle(input).await.unwrap();

    let edited = BreedingInfo {
        dried_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        ..Default::default()
    };
    let recreated = herd.edit_breeding_info(&prior, edited, None).await.unwrap();
    assert_eq!(recreated.image_url.as_deref(), Some(upload.url.as_str()));

    // Give the cleanup task a chance to run.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let info = herd.api().image_info(&upload.filename).await.unwrap();
    assert_eq!(info.filename, upload.filename);
}

#[tokio::test]
async fn test_recreate_rolls_back_when_original_cannot_be_deleted() {
    let server = spawn_server().await;
    let herd = book(&server, "Martha").with_breeding_edit_mode(BreedingEditMode::Recreate);
    let prior = herd.add_cattle(bessie()).await.unwrap();
    herd.api().delete_cattle(&prior.id).await.unwrap();

    let edited = BreedingInfo {
        dried_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        ..Default::default()
    };
    let err = herd.edit_breeding_info(&prior, edited, None).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));

    assert!(herd.list_cattle().await.unwrap().is_empty());
    assert!(herd.cache().get(Namespace::Cattle, &prior.id).await.is_some());
    let feed = herd.activity_feed().await.unwrap();
    assert!(feed.entries.iter().all(|e| e.action != ActivityAction::Edit));
}

#[tokio::test]
async fn test_milk_survives_cattle_deletion() {
    let server = spawn_server().await;
    let herd = book(&server, "Lazarus");
    let cattle = herd.add_cattle(bessie()).await.unwrap();

    let record = herd
        .add_milk(CreateMilkRecordInput {
            cow_name: Some("Bessie".to_string()),
            date: Some("2024-05-01".to_string()),
            morning_amount: 3.5,
            evening_amount: 4.0,
            added_by: None,
        })
        .await
        .unwrap();
    assert_eq!(record.total_daily, 7.5);

    herd.delete_cattle(&cattle.id).await.unwrap();
    let history = herd.list_milk(Some("bessie")).await.unwrap();
    assert_eq!(history, vec![record]);

    let err = herd.delete_cattle(&cattle.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { .. }));
    assert!(!err.is_unavailable());
}

#[tokio::test]
async fn test_wrong_key_is_forbidden() {
    let server = spawn_server().await;
    let api = ApiClient::new(&format!("http://{}", server.addr), "wrong").unwrap();
    let err = api.list_cattle().await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));

    let health = api.health().await.unwrap();
    assert_eq!(health.status, shared::ServiceStatus::Ok);
}

#[tokio::test]
async fn test_activity_feed_falls_back_to_cache_when_server_is_gone() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("audit.json");

    let server = spawn_server().await;
    let api = ApiClient::new(&format!("http://{}", server.addr), DEFAULT_API_KEY).unwrap();
    let herd = HerdBook::new(api, AuditCache::open(&cache_path).await, "Lazarus");
    herd.add_cattle(bessie()).await.unwrap();
    let live = herd.activity_feed().await.unwrap();
    assert_eq!(live.entries.len(), 1);

    // Nothing listens on a freshly released port.
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let offline_api = ApiClient::new(&format!("http://{closed}"), DEFAULT_API_KEY).unwrap();
    let offline = HerdBook::new(offline_api, AuditCache::open(&cache_path).await, "Lazarus");

    let feed = offline.activity_feed().await.unwrap();
    assert!(feed.stale);
    assert_eq!(feed.entries, live.entries);
}
