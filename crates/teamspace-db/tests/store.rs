//! Integration tests for the SeaORM store
//!
//! Runs every query against a real SQLite in-memory database.

mod common;

use chrono::{Duration, Utc};
use common::{register, setup_store};
use sea_orm::{ConnectionTrait, DatabaseBackend};
use teamspace_core::{
    Membership, PasswordResetToken, ResetTokenStore, Session, SessionStore, Task, TaskStore, Team,
    TeamRole, TeamStore, UserStore, Workspace, WorkspaceStore,
};
use uuid::Uuid;

fn workspace(created_by: Uuid) -> Workspace {
    Workspace {
        id: Uuid::new_v4(),
        name: "Acme".to_string(),
        description: String::new(),
        created_by,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn team(workspace_id: Uuid) -> Team {
    Team {
        id: Uuid::new_v4(),
        name: "Platform".to_string(),
        workspace_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn task(workspace_id: Uuid, created_by: Uuid, offset_secs: i64) -> Task {
    let at = Utc::now() + Duration::seconds(offset_secs);
    Task {
        id: Uuid::new_v4(),
        title: format!("Task {}", offset_secs),
        description: None,
        progress: 0,
        is_done: false,
        workspace_id,
        assigned_to: Some(created_by),
        created_by,
        created_at: at,
        updated_at: at,
    }
}

fn leader(team_id: Uuid, user_id: Uuid) -> Membership {
    Membership {
        team_id,
        user_id,
        role: TeamRole::Leader,
        joined_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_database_backend_is_sqlite() {
    let store = setup_store().await;
    assert!(matches!(
        store.connection().get_database_backend(),
        DatabaseBackend::Sqlite
    ));
}

#[tokio::test]
async fn test_user_lookup_by_email() {
    let store = setup_store().await;
    let user = register(&store, "Ada", "ada@example.com", "secret1").await;

    let found = store
        .find_user_by_email("ada@example.com")
        .await
        .unwrap()
        .expect("user not found");

    assert_eq!(found.user.id, user.id);
    assert!(found.password_hash.starts_with("$argon2"));
    assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_team_created_with_leader() {
    let store = setup_store().await;
    let owner = register(&store, "Ada", "ada@example.com", "secret1").await;
    let ws = store.insert_workspace(workspace(owner.id)).await.unwrap();

    let t = team(ws.id);
    store
        .create_team_with_leader(t.clone(), leader(t.id, owner.id))
        .await
        .unwrap();

    assert_eq!(
        store.membership_role(t.id, owner.id).await.unwrap(),
        Some(TeamRole::Leader)
    );
    assert_eq!(store.leader_count(t.id).await.unwrap(), 1);
    assert!(store.is_leader_in_workspace(ws.id, owner.id).await.unwrap());
    assert!(store.is_member_in_workspace(ws.id, owner.id).await.unwrap());
    assert!(store.membership_exists(t.id, owner.id).await.unwrap());
}

#[tokio::test]
async fn test_team_with_missing_leader_user_is_not_created() {
    let store = setup_store().await;
    let owner = register(&store, "Ada", "ada@example.com", "secret1").await;
    let ws = store.insert_workspace(workspace(owner.id)).await.unwrap();

    let t = team(ws.id);
    let result = store
        .create_team_with_leader(t.clone(), leader(t.id, Uuid::new_v4()))
        .await;

    assert!(result.is_err());
    assert!(store.find_team(t.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_members_and_available_users() {
    let store = setup_store().await;
    let ada = register(&store, "Ada", "ada@example.com", "secret1").await;
    let bob = register(&store, "Bob", "bob@example.com", "secret1").await;
    let cy = register(&store, "Cy", "cy@example.com", "secret1").await;

    let ws = store.insert_workspace(workspace(ada.id)).await.unwrap();
    let t = team(ws.id);
    store
        .create_team_with_leader(t.clone(), leader(t.id, ada.id))
        .await
        .unwrap();
    store
        .insert_membership(Membership {
            team_id: t.id,
            user_id: bob.id,
            role: TeamRole::Member,
            joined_at: Utc::now() + Duration::seconds(1),
        })
        .await
        .unwrap();

    let members = store.list_members(t.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].user.id, ada.id);
    assert_eq!(members[1].role, TeamRole::Member);

    let outside = store.list_users_outside_team(t.id).await.unwrap();
    assert_eq!(outside.len(), 1);
    assert_eq!(outside[0].id, cy.id);

    let everyone = store.list_users().await.unwrap();
    let names: Vec<&str> = everyone.iter().map(|u| u.first_name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Bob", "Cy"]);

    // Membership in the workspace without leadership
    assert!(store.is_member_in_workspace(ws.id, bob.id).await.unwrap());
    assert!(!store.is_leader_in_workspace(ws.id, bob.id).await.unwrap());

    store.set_member_role(t.id, bob.id, TeamRole::Leader).await.unwrap();
    assert_eq!(store.leader_count(t.id).await.unwrap(), 2);

    store.delete_membership(t.id, bob.id).await.unwrap();
    assert!(store.membership_role(t.id, bob.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_workspace_tasks_newest_first() {
    let store = setup_store().await;
    let owner = register(&store, "Ada", "ada@example.com", "secret1").await;
    let ws = store.insert_workspace(workspace(owner.id)).await.unwrap();

    let older = store.insert_task(task(ws.id, owner.id, 0)).await.unwrap();
    let newer = store.insert_task(task(ws.id, owner.id, 10)).await.unwrap();

    let listed = store.list_tasks_in_workspace(ws.id).await.unwrap();
    assert_eq!(
        listed.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );

    let assigned = store.list_tasks_assigned_to(owner.id).await.unwrap();
    assert_eq!(assigned.len(), 2);
}

#[tokio::test]
async fn test_workspace_delete_cascades() {
    let store = setup_store().await;
    let owner = register(&store, "Ada", "ada@example.com", "secret1").await;
    let ws = store.insert_workspace(workspace(owner.id)).await.unwrap();
    let t = team(ws.id);
    store
        .create_team_with_leader(t.clone(), leader(t.id, owner.id))
        .await
        .unwrap();
    let tk = store.insert_task(task(ws.id, owner.id, 0)).await.unwrap();

    store.delete_workspace(ws.id).await.unwrap();

    assert!(store.find_workspace(ws.id).await.unwrap().is_none());
    assert!(store.find_team(t.id).await.unwrap().is_none());
    assert!(store.find_task(tk.id).await.unwrap().is_none());
    assert!(store.membership_role(t.id, owner.id).await.unwrap().is_none());
    assert!(store.find_user(owner.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_team_delete_keeps_workspace_tasks() {
    let store = setup_store().await;
    let owner = register(&store, "Ada", "ada@example.com", "secret1").await;
    let ws = store.insert_workspace(workspace(owner.id)).await.unwrap();
    let t = team(ws.id);
    store
        .create_team_with_leader(t.clone(), leader(t.id, owner.id))
        .await
        .unwrap();
    let tk = store.insert_task(task(ws.id, owner.id, 0)).await.unwrap();

    store.delete_team(t.id).await.unwrap();

    assert!(store.find_team(t.id).await.unwrap().is_none());
    assert_eq!(store.leader_count(t.id).await.unwrap(), 0);
    assert!(store.find_task(tk.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_reset_token_replace_and_compare_and_swap() {
    let store = setup_store().await;
    let user = register(&store, "Ada", "ada@example.com", "secret1").await;
    let now = Utc::now();

    store
        .replace_reset_token(PasswordResetToken {
            email: user.email.clone(),
            token_hash: "first".to_string(),
            created_at: now,
        })
        .await
        .unwrap();
    store
        .replace_reset_token(PasswordResetToken {
            email: user.email.clone(),
            token_hash: "second".to_string(),
            created_at: now,
        })
        .await
        .unwrap();

    let stored = store.find_reset_token(&user.email).await.unwrap().unwrap();
    assert_eq!(stored.token_hash, "second");

    // Stale hash: nothing changes
    let swapped = store
        .consume_reset_token(&user.email, "first", user.id, "new-hash", now)
        .await
        .unwrap();
    assert!(!swapped);
    assert!(store.find_reset_token(&user.email).await.unwrap().is_some());

    let swapped = store
        .consume_reset_token(&user.email, "second", user.id, "new-hash", now)
        .await
        .unwrap();
    assert!(swapped);
    assert!(store.find_reset_token(&user.email).await.unwrap().is_none());

    let record = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(record.password_hash, "new-hash");
}

#[tokio::test]
async fn test_reset_token_discard_only_matches_current_hash() {
    let store = setup_store().await;
    let user = register(&store, "Ada", "ada@example.com", "secret1").await;

    store
        .replace_reset_token(PasswordResetToken {
            email: user.email.clone(),
            token_hash: "current".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let deleted = store
        .delete_reset_token_if(&user.email, "superseded")
        .await
        .unwrap();
    assert!(!deleted);
    assert!(store.find_reset_token(&user.email).await.unwrap().is_some());

    let deleted = store
        .delete_reset_token_if(&user.email, "current")
        .await
        .unwrap();
    assert!(deleted);
    assert!(store.find_reset_token(&user.email).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sessions_revoked_per_user() {
    let store = setup_store().await;
    let user = register(&store, "Ada", "ada@example.com", "secret1").await;

    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: "a".repeat(64),
        expires_at: Utc::now() + Duration::hours(1),
        created_at: Utc::now(),
    };
    store.insert_session(session.clone()).await.unwrap();

    let found = store.find_session(session.id).await.unwrap().unwrap();
    assert_eq!(found.user_id, user.id);

    // One from registration plus the one above
    assert_eq!(store.delete_sessions_for_user(user.id).await.unwrap(), 2);
    assert!(store.find_session(session.id).await.unwrap().is_none());
}
