//! Request handlers for the API endpoints.

use std::sync::{Arc, MutexGuard};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, StateResponse, TelemetryQuery};
use crate::devices::IoConfig;
use crate::network::{ApplyReport, MemberConfig, NodePos};
use crate::sim::types::{NetworkSummary, NodeView, TickResult};
use crate::sim::world::{World, WorldError};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn lock(state: &AppState) -> Result<MutexGuard<'_, World>, ApiError> {
    state
        .world
        .lock()
        .map_err(|_| error(StatusCode::INTERNAL_SERVER_ERROR, "world state is poisoned"))
}

fn not_found(e: &WorldError) -> ApiError {
    error(StatusCode::NOT_FOUND, e.to_string())
}

/// Returns the next tick, the run report, and the latest tick record.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StateResponse>, ApiError> {
    let world = lock(&state)?;
    Ok(Json(StateResponse {
        tick: world.tick(),
        nodes: world.banks().len(),
        networks: world.graph().component_count(),
        report: state.report.clone(),
        latest_tick: state.results.last().cloned(),
    }))
}

/// Returns tick records, optionally filtered by tick range.
///
/// `GET /telemetry` → 200 + `Vec<TickResult>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(u64::MAX);

    if from > to {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("`from` ({from}) must be <= `to` ({to})"),
        ));
    }

    let records: Vec<TickResult> = state
        .results
        .iter()
        .filter(|r| r.tick >= from && r.tick <= to)
        .cloned()
        .collect();

    Ok(Json(records))
}

/// `GET /networks` → 200 + `Vec<NetworkSummary>` JSON, ordered by leader
pub async fn get_networks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NetworkSummary>>, ApiError> {
    Ok(Json(lock(&state)?.networks()))
}

/// `GET /nodes/{x}/{y}/{z}` → 200 + `NodeView`, or 404 if no bank sits there
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path((x, y, z)): Path<(i32, i32, i32)>,
) -> Result<Json<NodeView>, ApiError> {
    let pos = NodePos::new(x, y, z);
    lock(&state)?
        .node_view(pos)
        .map(Json)
        .ok_or_else(|| not_found(&WorldError::Vacant(pos)))
}

/// I/O configuration of every other member of the bank's network.
///
/// `GET /nodes/{x}/{y}/{z}/configurables` → 200 + `Vec<MemberConfig>`
pub async fn get_configurables(
    State(state): State<Arc<AppState>>,
    Path((x, y, z)): Path<(i32, i32, i32)>,
) -> Result<Json<Vec<MemberConfig<IoConfig>>>, ApiError> {
    lock(&state)?
        .member_configs(NodePos::new(x, y, z))
        .map(Json)
        .map_err(|e| not_found(&e))
}

/// Applies member I/O configuration on behalf of the bank at the path.
///
/// `PUT /nodes/{x}/{y}/{z}/configurables` → 200 + `ApplyReport`. Entries
/// for non-members are skipped and counted, not rejected.
pub async fn put_configurables(
    State(state): State<Arc<AppState>>,
    Path((x, y, z)): Path<(i32, i32, i32)>,
    Json(updates): Json<Vec<MemberConfig<IoConfig>>>,
) -> Result<Json<ApplyReport>, ApiError> {
    lock(&state)?
        .apply_member_configs(NodePos::new(x, y, z), updates)
        .map(Json)
        .map_err(|e| not_found(&e))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::{BankConfig, ScenarioConfig, WorkloadConfig};
    use crate::devices::IoMode;
    use crate::network::Tier;

    fn make_test_state() -> Arc<AppState> {
        let mut cfg = ScenarioConfig {
            banks: vec![
                BankConfig::new(NodePos::new(0, 0, 0), Tier::Basic, 900),
                BankConfig::new(NodePos::new(1, 0, 0), Tier::Basic, 0),
                BankConfig::new(NodePos::new(2, 0, 0), Tier::Advanced, 50),
            ],
            workload: WorkloadConfig {
                input_chance: 0.0,
                output_chance: 0.0,
                ..WorkloadConfig::default()
            },
            ..ScenarioConfig::default()
        };
        cfg.simulation.ticks = 24;
        let mut world = World::from_config(&cfg).unwrap();
        let results = world.run(cfg.simulation.ticks);
        Arc::new(AppState::new(world, results))
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn state_returns_200() {
        let app = router(make_test_state());

        let req = Request::builder()
            .uri("/state")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["tick"], 24);
        assert_eq!(json["networks"], 2);
        assert!(json.get("report").is_some());
        assert_eq!(json["latest_tick"]["tick"], 23);
    }

    #[tokio::test]
    async fn telemetry_range_query() {
        let app = router(make_test_state());

        let req = Request::builder()
            .uri("/telemetry?from=5&to=10")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let rows = json.as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 6); // ticks 5..=10
        assert_eq!(rows[0]["tick"], 5);
        assert_eq!(rows[5]["tick"], 10);
    }

    #[tokio::test]
    async fn telemetry_invalid_range_returns_400() {
        let app = router(make_test_state());

        let req = Request::builder()
            .uri("/telemetry?from=10&to=5")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn networks_lists_each_component() {
        let app = router(make_test_state());

        let req = Request::builder()
            .uri("/networks")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json[0]["members"].as_array().map(Vec::len), Some(2));
        assert_eq!(json[0]["tier"], "basic");
        assert_eq!(json[1]["tier"], "advanced");
    }

    #[tokio::test]
    async fn node_lookup_and_missing_node() {
        let state = make_test_state();

        let req = Request::builder()
            .uri("/nodes/1/0/0")
            .body(Body::empty())
            .unwrap();
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["leader"]["x"], 0);
        assert_eq!(json["capacity"], Tier::Basic.default_capacity());

        let req = Request::builder()
            .uri("/nodes/9/9/9")
            .body(Body::empty())
            .unwrap();
        let resp = router(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_configurables_applies_to_members_only() {
        let state = make_test_state();
        let push = IoConfig::uniform(IoMode::Push);
        let updates = vec![
            MemberConfig {
                pos: NodePos::new(1, 0, 0),
                config: push.clone(),
            },
            MemberConfig {
                pos: NodePos::new(2, 0, 0),
                config: push.clone(),
            },
        ];

        let req = Request::builder()
            .method("PUT")
            .uri("/nodes/0/0/0/configurables")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&updates).unwrap()))
            .unwrap();
        let resp = router(state.clone()).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["applied"], 1);
        assert_eq!(json["skipped"], 1);

        let world = state.world.lock().unwrap();
        assert_eq!(
            world.bank(NodePos::new(1, 0, 0)).map(|b| b.io_config().clone()),
            Some(push)
        );
        assert_eq!(
            world.bank(NodePos::new(2, 0, 0)).map(|b| b.io_config().clone()),
            Some(IoConfig::default())
        );
    }

    #[tokio::test]
    async fn get_configurables_excludes_owner() {
        let req = Request::builder()
            .uri("/nodes/0/0/0/configurables")
            .body(Body::empty())
            .unwrap();
        let resp = router(make_test_state()).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let entries = json.as_array().cloned().unwrap_or_default();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["pos"]["x"], 1);
    }
}
