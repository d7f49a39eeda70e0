mod common;

use chorepoints_server::server::{AppConfig, AppState, UserConfig, auth::USER_HEADER, router};
use chorepoints_server::storage::Store;
use chorepoints_server::storage::goals::CreateGoal;
use chorepoints_server::storage::routines::{CreateRoutine, CreateRoutineTask};
use chorepoints_shared::api;
use chorepoints_shared::domain::{Child, GoalStatus, GoalType, Role};
use common::{CHILD, PARENT, test_store};

async fn spawn_server() -> (String, Store, tempfile::TempDir) {
    let (store, dir) = test_store().await;
    let config = AppConfig {
        children: vec![Child {
            id: CHILD.to_string(),
            display_name: "Mia".to_string(),
        }],
        users: vec![
            UserConfig {
                id: PARENT.to_string(),
                role: Role::MainParent,
                child_id: None,
                family_root: None,
            },
            UserConfig {
                id: CHILD.to_string(),
                role: Role::Child,
                child_id: Some(CHILD.to_string()),
                family_root: Some(PARENT.to_string()),
            },
        ],
        timezone: "UTC".to_string(),
        dev_cors_origin: None,
        listen_port: None,
    };
    let state = AppState::new(config, store.clone());
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), store, dir)
}

#[tokio::test]
async fn health_needs_no_identity() {
    let (base, _store, _dir) = spawn_server().await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn api_rejects_missing_or_unknown_identity() {
    let (base, _store, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/v1/children"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/api/v1/children"))
        .header(USER_HEADER, "nobody")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn task_flow_over_http() {
    let (base, _store, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    // Child users cannot create tasks
    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .header(USER_HEADER, CHILD)
        .json(&serde_json::json!({
            "child_id": CHILD,
            "title": "Water the plants",
            "points": 10,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .header(USER_HEADER, PARENT)
        .json(&serde_json::json!({
            "child_id": CHILD,
            "title": "Water the plants",
            "points": 10,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created: api::CreatedResp = resp.json().await.unwrap();

    let resp = client
        .post(format!("{base}/api/v1/tasks/{}/complete", created.id))
        .header(USER_HEADER, CHILD)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ack: api::AppliedResp = resp.json().await.unwrap();
    assert!(ack.applied);

    // Children cannot approve their own work
    let resp = client
        .post(format!("{base}/api/v1/tasks/{}/approve", created.id))
        .header(USER_HEADER, CHILD)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .post(format!("{base}/api/v1/tasks/{}/approve", created.id))
        .header(USER_HEADER, PARENT)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ack: api::AppliedResp = resp.json().await.unwrap();
    assert!(ack.applied);

    let resp = client
        .get(format!("{base}/api/v1/children/{CHILD}/balance"))
        .header(USER_HEADER, CHILD)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let balance: api::BalanceDto = resp.json().await.unwrap();
    assert_eq!(balance.total_points, 10);

    // A child cannot read a sibling's balance
    let resp = client
        .get(format!("{base}/api/v1/children/leo/balance"))
        .header(USER_HEADER, CHILD)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn routine_bonus_pushes_automatic_goal_over_target() {
    let (base, store, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let now = chrono::Utc::now();

    // Window straddling the current time so the bonus applies
    let routine_id = store
        .create_routine(CreateRoutine {
            parent_id: PARENT.to_string(),
            child_id: CHILD.to_string(),
            title: "Evening routine".to_string(),
            start_time: (now - chrono::Duration::hours(1)).time(),
            end_time: (now + chrono::Duration::hours(1)).time(),
            recurrence: None,
            bonus_points: 5,
        })
        .await
        .unwrap();
    let rt = store
        .create_routine_task(CreateRoutineTask {
            parent_id: Some(PARENT.to_string()),
            title: "Tidy room".to_string(),
            time_limit: None,
            points: 1,
            category: None,
        })
        .await
        .unwrap();
    store.link_routine_task(routine_id, rt, 1, None).await.unwrap();
    assert!(store.complete_routine_task(rt).await.unwrap());
    assert!(store.approve_routine_task(rt).await.unwrap());

    let today = now.date_naive();
    let goal_id = store
        .create_goal(CreateGoal {
            parent_id: PARENT.to_string(),
            child_id: CHILD.to_string(),
            title: "First five points".to_string(),
            target_points: 5,
            goal_type: GoalType::Automatic,
            start_date: today - chrono::Duration::days(7),
            end_date: today + chrono::Duration::days(7),
            requires_approval: false,
            reward_id: None,
        })
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/api/v1/routines/{routine_id}/complete"))
        .header(USER_HEADER, CHILD)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ack: api::RoutineCompletionResp = resp.json().await.unwrap();
    assert!(ack.applied);
    assert_eq!(ack.bonus_awarded, 5);

    // The bonus met the goal target; the live path completed it and awarded
    let goal = store.get_goal(goal_id).await.unwrap().unwrap();
    assert_eq!(goal.status, GoalStatus::Completed.as_str());
    assert_eq!(store.get_balance(CHILD).await.unwrap(), 10);
}

#[tokio::test]
async fn bad_requests_report_400() {
    let (base, _store, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/v1/tasks"))
        .header(USER_HEADER, PARENT)
        .json(&serde_json::json!({
            "child_id": CHILD,
            "title": "Freebie",
            "points": 0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{base}/api/v1/routines"))
        .header(USER_HEADER, PARENT)
        .json(&serde_json::json!({
            "child_id": CHILD,
            "title": "Morning",
            "start_time": "late-ish",
            "end_time": "08:00",
            "bonus_points": 5,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
