mod support;

use podbay::db::{PoolState, RepositoryCreate, SwarmPatch};
use serde_json::json;
use std::fs;
use support::{OWNER, seed_workspace, temp_db_path};

#[tokio::test]
async fn swarm_patch_updates_only_set_columns() {
    let path = temp_db_path("db-patch");
    let db = podbay::db::spawn(&format!("sqlite:{}", path.display())).await;
    let (workspace_id, swarm_id) = seed_workspace(&db, "acme-pool").await;

    // Fresh swarms start UNSET.
    let swarm = db
        .get_swarm(workspace_id, swarm_id)
        .await
        .expect("get swarm")
        .expect("swarm exists");
    assert_eq!(swarm.pool_state, PoolState::Unset);
    assert!(swarm.pool_api_key.is_none());

    db.patch_swarm(
        swarm_id,
        SwarmPatch {
            pool_state: Some(PoolState::Failed),
            ..SwarmPatch::default()
        },
    )
    .await
    .expect("patch state");

    db.patch_swarm(
        swarm_id,
        SwarmPatch {
            container_files: Some(json!({ "Dockerfile": "FROM scratch" }).to_string()),
            ..SwarmPatch::default()
        },
    )
    .await
    .expect("patch files");

    let swarm = db
        .get_swarm(workspace_id, swarm_id)
        .await
        .expect("get swarm")
        .expect("swarm exists");
    // COALESCE semantics: the second patch kept the earlier state.
    assert_eq!(swarm.pool_state, PoolState::Failed);
    let files = swarm.container_files_map().expect("parse files");
    assert_eq!(files.get("Dockerfile").map(String::as_str), Some("FROM scratch"));

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn swarm_patch_on_missing_swarm_is_an_error() {
    let path = temp_db_path("db-patch-missing");
    let db = podbay::db::spawn(&format!("sqlite:{}", path.display())).await;

    let result = db
        .patch_swarm(
            999,
            SwarmPatch {
                pool_state: Some(PoolState::Complete),
                ..SwarmPatch::default()
            },
        )
        .await;
    assert!(result.is_err());

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn workspace_access_distinguishes_owner_member_and_stranger() {
    let path = temp_db_path("db-access");
    let db = podbay::db::spawn(&format!("sqlite:{}", path.display())).await;
    let (workspace_id, _swarm_id) = seed_workspace(&db, "acme-pool").await;
    db.add_workspace_member(workspace_id, "member-2")
        .await
        .expect("add member");

    let owner = db
        .get_workspace_access(workspace_id, OWNER)
        .await
        .expect("access");
    assert!(owner.is_owner);
    assert!(owner.allowed());

    let member = db
        .get_workspace_access(workspace_id, "member-2")
        .await
        .expect("access");
    assert!(!member.is_owner);
    assert!(member.is_member);
    assert!(member.allowed());

    let stranger = db
        .get_workspace_access(workspace_id, "stranger")
        .await
        .expect("access");
    assert!(!stranger.allowed());

    let _ = fs::remove_file(&path);
}

#[tokio::test]
async fn primary_repository_is_first_by_creation_order() {
    let path = temp_db_path("db-primary-repo");
    let db = podbay::db::spawn(&format!("sqlite:{}", path.display())).await;
    let (workspace_id, _swarm_id) = seed_workspace(&db, "acme-pool").await;

    assert!(
        db.get_primary_repository(workspace_id)
            .await
            .expect("primary")
            .is_none()
    );

    db.create_repository(RepositoryCreate {
        workspace_id,
        repository_url: "https://github.com/acme/first".to_string(),
        branch: "main".to_string(),
    })
    .await
    .expect("create repo");

    db.create_repository(RepositoryCreate {
        workspace_id,
        repository_url: "https://github.com/acme/second".to_string(),
        branch: "dev".to_string(),
    })
    .await
    .expect("create repo");

    let primary = db
        .get_primary_repository(workspace_id)
        .await
        .expect("primary")
        .expect("repository exists");
    assert_eq!(primary.repository_url, "https://github.com/acme/first");

    let all = db.list_repositories(workspace_id).await.expect("list");
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].branch, "dev");

    let _ = fs::remove_file(&path);
}
