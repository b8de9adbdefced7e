// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use lambda_http::run as lambda_run;
use rivals_common::{
    CandidateMember, ChannelId, CharacterPools, Lineup, MemberId, RoleAssignment, Slot, Summary,
    activity_listing, assign_roles, build_roster, expand_env_vars, member_listing,
    reroll_characters,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CONTROL_ID_PREFIX: &str = "rivals";
const CHANNEL_NOT_FOUND_MESSAGE: &str = "Voice channel not found.";

#[derive(Clone)]
struct AppState {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<InteractionState>>>>>,
    ignored: Arc<dyn IgnoreStore>,
    roster_source: Arc<dyn RosterSource>,
    pools: Arc<CharacterPools>,
}

/// Mutable state behind one displayed summary.
struct InteractionState {
    session_id: String,
    channel_id: ChannelId,
    lineup: Lineup,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
enum RosterError {
    #[error("voice channel {0} not found")]
    ChannelNotFound(ChannelId),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

#[async_trait]
trait RosterSource: Send + Sync {
    async fn list_channel_members(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<CandidateMember>, RosterError>;
}

#[async_trait]
trait IgnoreStore: Send + Sync {
    /// Returns false when the member was already ignored.
    async fn add(&self, member_id: MemberId) -> bool;
    /// Returns false when the member was not ignored.
    async fn remove(&self, member_id: MemberId) -> bool;
    async fn contains(&self, member_id: MemberId) -> bool;
    async fn snapshot(&self) -> HashSet<MemberId>;
}

#[derive(Default)]
struct InMemoryIgnoreStore {
    members: RwLock<HashSet<MemberId>>,
}

#[async_trait]
impl IgnoreStore for InMemoryIgnoreStore {
    async fn add(&self, member_id: MemberId) -> bool {
        self.members.write().await.insert(member_id)
    }

    async fn remove(&self, member_id: MemberId) -> bool {
        self.members.write().await.remove(&member_id)
    }

    async fn contains(&self, member_id: MemberId) -> bool {
        self.members.read().await.contains(&member_id)
    }

    async fn snapshot(&self) -> HashSet<MemberId> {
        self.members.read().await.clone()
    }
}

/// Reads voice channel rosters from the chat platform gateway.
#[derive(Clone)]
struct GatewayRosterSource {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayRosterSource {
    fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build platform gateway client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl RosterSource for GatewayRosterSource {
    async fn list_channel_members(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<CandidateMember>, RosterError> {
        let url = self.endpoint(&format!("channels/{channel_id}/members"));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call platform gateway")?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RosterError::ChannelNotFound(channel_id));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_string());
            return Err(anyhow::anyhow!("platform gateway returned {status}: {body}").into());
        }

        let members = response
            .json::<Vec<CandidateMember>>()
            .await
            .context("invalid platform gateway member payload")?;
        debug!(channel_id, member_count = members.len(), "fetched channel roster");
        Ok(members)
    }
}

#[derive(Debug, Clone)]
struct ServiceConfig {
    bind_addr: SocketAddr,
    gateway_base_url: String,
    gateway_timeout: Duration,
    /// `None` keeps summaries interactive until they are closed.
    session_idle_timeout: Option<Duration>,
    sweep_interval: Duration,
    pools_config_path: Option<String>,
}

impl ServiceConfig {
    fn from_env() -> anyhow::Result<Self> {
        let idle_seconds = parse_env_u64("SESSION_IDLE_TIMEOUT_SECONDS", 86_400);
        Ok(Self {
            bind_addr: parse_bind_addr("TEAM_SERVICE_BIND", "0.0.0.0:8095")?,
            gateway_base_url: std::env::var("PLATFORM_GATEWAY_BASE_URL")
                .ok()
                .unwrap_or_else(|| "http://platform-gateway:8090".to_string()),
            gateway_timeout: Duration::from_millis(
                parse_env_u64("PLATFORM_GATEWAY_TIMEOUT_MS", 5000).max(1),
            ),
            session_idle_timeout: (idle_seconds > 0).then(|| Duration::from_secs(idle_seconds)),
            sweep_interval: Duration::from_secs(
                parse_env_u64("SESSION_SWEEP_INTERVAL_SECONDS", 60).max(1),
            ),
            pools_config_path: normalize_optional_string(
                std::env::var("CHARACTER_POOLS_CONFIG_PATH").ok(),
            ),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CharacterPoolsFile {
    vanguard: Vec<String>,
    duelist: Vec<String>,
    strategist: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlAction {
    RerollRoles,
    RerollCharacters,
}

impl ControlAction {
    const ALL: [ControlAction; 2] = [ControlAction::RerollRoles, ControlAction::RerollCharacters];

    fn as_str(self) -> &'static str {
        match self {
            Self::RerollRoles => "reroll_roles",
            Self::RerollCharacters => "reroll_characters",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == value)
    }
}

impl Serialize for ControlAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ControlStyle {
    Primary,
    Secondary,
}

/// Button the platform glue attaches to a displayed summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Control {
    custom_id: String,
    label: String,
    style: ControlStyle,
    action: ControlAction,
}

#[derive(Debug, Deserialize)]
struct AssignRolesRequest {
    channel_id: ChannelId,
}

#[derive(Debug, Serialize)]
struct AssignmentView {
    session_id: String,
    channel_id: ChannelId,
    summary: Summary,
    slots: Vec<Slot>,
    assignment: RoleAssignment,
    controls: Vec<Control>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ComponentInteractionRequest {
    custom_id: String,
}

#[derive(Debug, Serialize)]
struct CloseSessionResponse {
    closed: bool,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct IgnoreRequest {
    member_id: MemberId,
    display_name: String,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Debug, Default, Deserialize)]
struct UnignoreQuery {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct IgnoreResponse {
    member_id: MemberId,
    ignored: bool,
    changed: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct IgnoredListResponse {
    member_ids: Vec<MemberId>,
}

#[derive(Debug, Serialize)]
struct ChannelDiagnosticsResponse {
    channel_id: ChannelId,
    lines: Vec<String>,
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "team_service=debug,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let pools = load_character_pools(config.pools_config_path.as_deref());

    let state = AppState {
        sessions: Arc::new(RwLock::new(HashMap::new())),
        ignored: Arc::new(InMemoryIgnoreStore::default()),
        roster_source: Arc::new(GatewayRosterSource::new(
            &config.gateway_base_url,
            config.gateway_timeout,
        )?),
        pools: Arc::new(pools),
    };

    if let Some(idle_timeout) = config.session_idle_timeout {
        info!(
            idle_timeout_seconds = idle_timeout.as_secs(),
            sweep_interval_seconds = config.sweep_interval.as_secs(),
            "session idle sweeper enabled"
        );
        spawn_session_sweeper(state.clone(), idle_timeout, config.sweep_interval);
    }

    let app = build_router(state);

    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        info!("AWS Lambda runtime detected; running team-service in lambda mode");
        lambda_run(app)
            .await
            .map_err(|e| anyhow::Error::msg(format!("lambda runtime error: {e}")))?;
        return Ok(());
    }

    info!(
        bind_addr = %config.bind_addr,
        gateway = %config.gateway_base_url,
        "team-service listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/assignments", post(assign_roles_handler))
        .route(
            "/v1/assignments/{session_id}",
            get(get_assignment_handler).delete(close_session_handler),
        )
        .route(
            "/v1/assignments/{session_id}/reroll-roles",
            post(reroll_roles_handler),
        )
        .route(
            "/v1/assignments/{session_id}/reroll-characters",
            post(reroll_characters_handler),
        )
        .route(
            "/v1/interactions/components",
            post(component_interaction_handler),
        )
        .route(
            "/v1/ignored",
            get(list_ignored_handler).post(ignore_handler),
        )
        .route("/v1/ignored/{member_id}", delete(unignore_handler))
        .route(
            "/v1/channels/{channel_id}/members",
            get(channel_members_handler),
        )
        .route(
            "/v1/channels/{channel_id}/activities",
            get(channel_activities_handler),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn parse_bind_addr(var_name: &str, default: &str) -> anyhow::Result<SocketAddr> {
    let value = std::env::var(var_name)
        .ok()
        .unwrap_or_else(|| default.to_string());
    value.parse().context(format!("invalid {var_name}"))
}

fn parse_env_u64(var_name: &str, default: u64) -> u64 {
    std::env::var(var_name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
}

/// Character pools from the YAML override file, or the built-in catalog when
/// no file is configured or the file cannot be used.
fn load_character_pools(path: Option<&str>) -> CharacterPools {
    let Some(path) = path.map(str::trim).filter(|value| !value.is_empty()) else {
        return CharacterPools::default();
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path = %path, error = %error, "failed to read character pools config; using built-in pools");
            return CharacterPools::default();
        }
    };

    let expanded = expand_env_vars(&raw);
    let parsed = match serde_yaml::from_str::<CharacterPoolsFile>(&expanded) {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!(path = %path, error = %error, "failed to parse character pools yaml; using built-in pools");
            return CharacterPools::default();
        }
    };

    match CharacterPools::new(parsed.vanguard, parsed.duelist, parsed.strategist) {
        Ok(pools) => {
            info!(path = %path, "loaded character pools from YAML config");
            pools
        }
        Err(error) => {
            warn!(path = %path, error = %error, "rejected character pools config; using built-in pools");
            CharacterPools::default()
        }
    }
}

fn control_id(action: ControlAction, session_id: &str) -> String {
    format!("{CONTROL_ID_PREFIX}:{}:{session_id}", action.as_str())
}

fn parse_control_id(custom_id: &str) -> Option<(ControlAction, String)> {
    let mut parts = custom_id.splitn(3, ':');
    if parts.next()? != CONTROL_ID_PREFIX {
        return None;
    }
    let action = ControlAction::parse(parts.next()?)?;
    let session_id = parts.next().filter(|id| !id.is_empty())?;
    Some((action, session_id.to_string()))
}

fn controls_for(session_id: &str) -> Vec<Control> {
    vec![
        Control {
            custom_id: control_id(ControlAction::RerollRoles, session_id),
            label: "Reroll".to_string(),
            style: ControlStyle::Primary,
            action: ControlAction::RerollRoles,
        },
        Control {
            custom_id: control_id(ControlAction::RerollCharacters, session_id),
            label: "Reroll Character".to_string(),
            style: ControlStyle::Secondary,
            action: ControlAction::RerollCharacters,
        },
    ]
}

fn to_view(session: &InteractionState) -> AssignmentView {
    AssignmentView {
        session_id: session.session_id.clone(),
        channel_id: session.channel_id,
        summary: session.lineup.summary(),
        slots: session.lineup.slots.clone(),
        assignment: session.lineup.assignment.clone(),
        controls: controls_for(&session.session_id),
        created_at: session.created_at,
        updated_at: session.updated_at,
    }
}

/// Query the channel, seat six players and roll their roles.
async fn roll_lineup(state: &AppState, channel_id: ChannelId) -> Result<Lineup, ApiError> {
    let members = state.roster_source.list_channel_members(channel_id).await?;
    let ignored = state.ignored.snapshot().await;
    let slots = build_roster(&members, &ignored);
    let real_players = slots.iter().filter(|slot| !slot.is_placeholder()).count();

    let lineup = assign_roles(slots, &state.pools, &mut rand::rng())
        .map_err(|error| ApiError::internal(error.to_string()))?;
    debug!(
        channel_id,
        member_count = members.len(),
        real_players,
        "rolled lineup"
    );
    Ok(lineup)
}

async fn find_session(
    state: &AppState,
    session_id: &str,
) -> Result<Arc<Mutex<InteractionState>>, ApiError> {
    let sessions = state.sessions.read().await;
    sessions
        .get(session_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("assignment session {session_id} not found")))
}

fn spawn_session_sweeper(
    state: AppState,
    idle_timeout: Duration,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = sweep_idle_sessions(&state, idle_timeout, Utc::now()).await;
            if removed > 0 {
                info!(removed, "expired idle assignment sessions");
            }
        }
    })
}

/// Drop sessions idle for at least `idle_timeout`. Sessions busy with a
/// reroll are left for the next sweep.
async fn sweep_idle_sessions(state: &AppState, idle_timeout: Duration, now: DateTime<Utc>) -> usize {
    let mut sessions = state.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, session| match session.try_lock() {
        Ok(guard) => (now - guard.updated_at)
            .to_std()
            .map(|idle| idle < idle_timeout)
            .unwrap_or(true),
        Err(_) => true,
    });
    before - sessions.len()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": "team-service"}))
}

async fn assign_roles_handler(
    State(state): State<AppState>,
    Json(request): Json<AssignRolesRequest>,
) -> Result<Json<AssignmentView>, ApiError> {
    let lineup = roll_lineup(&state, request.channel_id).await?;

    let now = Utc::now();
    let session = InteractionState {
        session_id: Uuid::new_v4().to_string(),
        channel_id: request.channel_id,
        lineup,
        created_at: now,
        updated_at: now,
    };
    let view = to_view(&session);

    state
        .sessions
        .write()
        .await
        .insert(session.session_id.clone(), Arc::new(Mutex::new(session)));

    info!(
        session_id = %view.session_id,
        channel_id = view.channel_id,
        "created role assignment session"
    );
    Ok(Json(view))
}

async fn get_assignment_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AssignmentView>, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let session = session.lock().await;
    Ok(Json(to_view(&session)))
}

async fn reroll_roles_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AssignmentView>, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let mut session = session.lock().await;

    let lineup = roll_lineup(&state, session.channel_id).await?;
    session.lineup = lineup;
    session.updated_at = Utc::now();

    info!(
        session_id = %session_id,
        channel_id = session.channel_id,
        "rerolled roles"
    );
    Ok(Json(to_view(&session)))
}

async fn reroll_characters_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AssignmentView>, ApiError> {
    let session = find_session(&state, &session_id).await?;
    let mut session = session.lock().await;

    let assignment = reroll_characters(&session.lineup.assignment, &state.pools, &mut rand::rng());
    session.lineup.assignment = assignment;
    session.updated_at = Utc::now();

    info!(session_id = %session_id, "rerolled character suggestions");
    Ok(Json(to_view(&session)))
}

async fn close_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<CloseSessionResponse> {
    let removed = state.sessions.write().await.remove(&session_id);
    if removed.is_some() {
        info!(session_id = %session_id, "closed role assignment session");
    }
    Json(CloseSessionResponse {
        closed: removed.is_some(),
        session_id,
    })
}

async fn component_interaction_handler(
    State(state): State<AppState>,
    Json(request): Json<ComponentInteractionRequest>,
) -> Result<Json<AssignmentView>, ApiError> {
    let (action, session_id) = parse_control_id(&request.custom_id).ok_or_else(|| {
        ApiError::bad_request(format!("unrecognized control id {}", request.custom_id))
    })?;

    match action {
        ControlAction::RerollRoles => reroll_roles_handler(State(state), Path(session_id)).await,
        ControlAction::RerollCharacters => {
            reroll_characters_handler(State(state), Path(session_id)).await
        }
    }
}

async fn ignore_handler(
    State(state): State<AppState>,
    Json(request): Json<IgnoreRequest>,
) -> Json<IgnoreResponse> {
    let name = request.display_name;
    if request.is_bot {
        return Json(IgnoreResponse {
            member_id: request.member_id,
            ignored: state.ignored.contains(request.member_id).await,
            changed: false,
            message: format!("{name} is a bot and won't be assigned anyway."),
        });
    }

    let changed = state.ignored.add(request.member_id).await;
    let message = if changed {
        info!(member_id = request.member_id, "member added to ignore list");
        format!("Ignoring {name} from random assignment.")
    } else {
        format!("{name} is already ignored.")
    };

    Json(IgnoreResponse {
        member_id: request.member_id,
        ignored: true,
        changed,
        message,
    })
}

async fn unignore_handler(
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
    Query(query): Query<UnignoreQuery>,
) -> Json<IgnoreResponse> {
    let name = normalize_optional_string(query.display_name)
        .unwrap_or_else(|| member_id.to_string());

    let changed = state.ignored.remove(member_id).await;
    let message = if changed {
        info!(member_id, "member removed from ignore list");
        format!("{name} is no longer ignored.")
    } else {
        format!("{name} is not in the ignore list.")
    };

    Json(IgnoreResponse {
        member_id,
        ignored: false,
        changed,
        message,
    })
}

async fn list_ignored_handler(State(state): State<AppState>) -> Json<IgnoredListResponse> {
    let mut member_ids: Vec<MemberId> = state.ignored.snapshot().await.into_iter().collect();
    member_ids.sort_unstable();
    Json(IgnoredListResponse { member_ids })
}

async fn channel_members_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<ChannelDiagnosticsResponse>, ApiError> {
    let members = state.roster_source.list_channel_members(channel_id).await?;
    let lines = member_listing(&members);
    let message = if lines.is_empty() {
        "No non-bot members found in this channel.".to_string()
    } else {
        format!("Members in this channel:\n{}", lines.join("\n"))
    };
    Ok(Json(ChannelDiagnosticsResponse {
        channel_id,
        lines,
        message,
    }))
}

async fn channel_activities_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<ChannelDiagnosticsResponse>, ApiError> {
    let members = state.roster_source.list_channel_members(channel_id).await?;
    let lines = activity_listing(&members);
    let message = if lines.is_empty() {
        "No members or activities to display.".to_string()
    } else {
        lines.join("\n")
    };
    Ok(Json(ChannelDiagnosticsResponse {
        channel_id,
        lines,
        message,
    }))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<RosterError> for ApiError {
    fn from(error: RosterError) -> Self {
        match error {
            RosterError::ChannelNotFound(channel_id) => {
                debug!(channel_id, "roster query for missing channel");
                Self::not_found(CHANNEL_NOT_FOUND_MESSAGE)
            }
            RosterError::Upstream(error) => {
                Self::bad_gateway(format!("failed to query channel roster: {error:#}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "team-service request failed");
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
