//! The negotiation mutation pipeline.
//!
//! Each mutation runs as one read-validate-append-persist-reload cycle while
//! holding the session's lock from [`SessionLocks`]. Failures leave no
//! partial transition behind, with one exception: the first ban or pick on
//! a `not_started` session persists the promotion to `in_progress` before
//! the turn check runs.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};
use veto_db::{ActionStore, MapPoolStore, SessionStore};
use veto_rules::{NextAction, current_step, current_team, side_selection_team};
use veto_types::{
    Action, ActionId, ActionKind, GameId, MAX_TIMER_SECONDS, MapId, MapPool, MapPoolId, Session,
    SessionId, SessionStatus, Side, Team, UserId, VetoFormat,
};

use crate::error::VetoError;
use crate::locks::SessionLocks;

/// Longest accepted team name, in characters.
pub const MAX_TEAM_NAME_CHARS: usize = 100;

/// Random bytes behind a share token (hex-encoded to twice this length).
const SHARE_TOKEN_BYTES: usize = 16;

/// The reloaded session after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Authoritative session state including its actions.
    pub session: Session,
    /// The action created or updated by the mutation, if any.
    pub action: Option<Action>,
    /// What the session waits for after the mutation.
    pub next_action: NextAction,
}

impl MutationOutcome {
    fn new(session: Session, action: Option<Action>, pool: &MapPool) -> Self {
        let next_action = veto_rules::next_action(&session, pool);
        Self {
            session,
            action,
            next_action,
        }
    }
}

/// Input for [`VetoService::create_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// Creating user, if known.
    pub owner_id: Option<UserId>,
    /// Pool to negotiate over.
    pub map_pool_id: MapPoolId,
    /// Match format.
    pub format: VetoFormat,
    /// Team A display name.
    pub team_a_name: String,
    /// Team B display name.
    pub team_b_name: String,
    /// Per-turn timer, at most [`MAX_TIMER_SECONDS`].
    pub timer_seconds: u16,
}

/// Parse a team value received from a transport.
///
/// # Errors
///
/// Returns [`VetoError::InvalidAction`] unless the value is `A` or `B`.
pub fn parse_team(value: &str) -> Result<Team, VetoError> {
    value
        .parse()
        .map_err(|e: veto_types::ParseEnumError| VetoError::InvalidAction(e.to_string()))
}

/// Parse a side value received from a transport.
///
/// # Errors
///
/// Returns [`VetoError::InvalidAction`] unless the value is `attack` or
/// `defence`.
pub fn parse_side(value: &str) -> Result<Side, VetoError> {
    value
        .parse()
        .map_err(|e: veto_types::ParseEnumError| VetoError::InvalidAction(e.to_string()))
}

type SharedRng = Mutex<Box<dyn RngCore + Send>>;

/// Applies negotiation mutations against the storage contracts.
pub struct VetoService {
    sessions: Arc<dyn SessionStore>,
    actions: Arc<dyn ActionStore>,
    pools: Arc<dyn MapPoolStore>,
    rng: SharedRng,
    locks: SessionLocks,
}

impl core::fmt::Debug for VetoService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VetoService")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl VetoService {
    /// Create a service with an OS-seeded random source.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        actions: Arc<dyn ActionStore>,
        pools: Arc<dyn MapPoolStore>,
    ) -> Self {
        Self {
            sessions,
            actions,
            pools,
            rng: Mutex::new(Box::new(StdRng::from_os_rng())),
            locks: SessionLocks::new(),
        }
    }

    /// Create a service whose three contracts are served by one store.
    pub fn from_store<S>(store: &Arc<S>) -> Self
    where
        S: SessionStore + ActionStore + MapPoolStore + 'static,
    {
        let sessions: Arc<dyn SessionStore> = Arc::clone(store) as Arc<dyn SessionStore>;
        let actions: Arc<dyn ActionStore> = Arc::clone(store) as Arc<dyn ActionStore>;
        let pools: Arc<dyn MapPoolStore> = Arc::clone(store) as Arc<dyn MapPoolStore>;
        Self::new(sessions, actions, pools)
    }

    /// Replace the random source used for decider draws and share tokens.
    #[must_use]
    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Load a session with its actions.
    pub async fn session(&self, session_id: SessionId) -> Result<Session, VetoError> {
        self.sessions
            .load(session_id)
            .await?
            .ok_or(VetoError::SessionNotFound)
    }

    /// Load a session by its public share token.
    pub async fn session_by_share_token(&self, token: &str) -> Result<Session, VetoError> {
        self.sessions
            .load_by_share_token(token)
            .await?
            .ok_or(VetoError::SessionNotFound)
    }

    /// Summarize what the session is waiting for.
    pub async fn next_action(&self, session_id: SessionId) -> Result<NextAction, VetoError> {
        let session = self.session(session_id).await?;
        let pool = self.pool(session.map_pool_id).await?;
        Ok(veto_rules::next_action(&session, &pool))
    }

    /// The session's map pool.
    pub async fn pool(&self, pool_id: MapPoolId) -> Result<MapPool, VetoError> {
        self.pools
            .load_pool(pool_id)
            .await?
            .ok_or(VetoError::MapPoolNotFound)
    }

    /// Every pool of a game, ordered by name. Unknown games have none.
    pub async fn pools_for_game(&self, game_id: GameId) -> Result<Vec<MapPool>, VetoError> {
        Ok(self.pools.list_pools(game_id).await?)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a `not_started` session with no actions.
    pub async fn create_session(&self, input: NewSession) -> Result<Session, VetoError> {
        let team_a_name = validate_team_name("team_a_name", &input.team_a_name)?;
        let team_b_name = validate_team_name("team_b_name", &input.team_b_name)?;
        if input.timer_seconds > MAX_TIMER_SECONDS {
            return Err(VetoError::Validation(format!(
                "timer_seconds must be between 0 and {MAX_TIMER_SECONDS}"
            )));
        }
        let pool = self.pool(input.map_pool_id).await?;
        let needed = input.format.min_pool_size();
        if pool.maps.len() < needed {
            return Err(VetoError::Validation(format!(
                "{} needs a pool of at least {needed} maps, this one has {}",
                input.format.as_str(),
                pool.maps.len()
            )));
        }

        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            owner_id: input.owner_id,
            map_pool_id: pool.id,
            format: input.format,
            status: SessionStatus::NotStarted,
            team_a_name,
            team_b_name,
            current_team: input.format.first_team(),
            decider_map_id: None,
            decider_side: None,
            timer_seconds: input.timer_seconds,
            share_token: self.share_token(),
            created_at: now,
            updated_at: now,
            finished_at: None,
            actions: Vec::new(),
        };
        self.sessions.save(&session).await?;
        info!(
            session_id = %session.id,
            format = session.format.as_str(),
            maps = pool.maps.len(),
            "Veto session created"
        );
        self.session(session.id).await
    }

    /// Move a `not_started` session to `in_progress`.
    pub async fn start(&self, session_id: SessionId) -> Result<MutationOutcome, VetoError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.start_locked(session_id).await;
        log_outcome("start", session_id, &result);
        result
    }

    /// Ban a map for `team`.
    pub async fn ban(
        &self,
        session_id: SessionId,
        map_id: MapId,
        team: Team,
    ) -> Result<MutationOutcome, VetoError> {
        self.act(ActionKind::Ban, session_id, map_id, team).await
    }

    /// Pick a map for `team`.
    pub async fn pick(
        &self,
        session_id: SessionId,
        map_id: MapId,
        team: Team,
    ) -> Result<MutationOutcome, VetoError> {
        self.act(ActionKind::Pick, session_id, map_id, team).await
    }

    /// Record the starting side chosen by `team` for the latest pick.
    pub async fn select_side(
        &self,
        session_id: SessionId,
        team: Team,
        side: Side,
    ) -> Result<MutationOutcome, VetoError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.select_side_locked(session_id, team, side).await;
        log_outcome("select_side", session_id, &result);
        result
    }

    /// Discard every action and return the session to `not_started`.
    pub async fn reset(&self, session_id: SessionId) -> Result<MutationOutcome, VetoError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.reset_locked(session_id).await;
        log_outcome("reset", session_id, &result);
        result
    }

    async fn act(
        &self,
        kind: ActionKind,
        session_id: SessionId,
        map_id: MapId,
        team: Team,
    ) -> Result<MutationOutcome, VetoError> {
        let _guard = self.locks.acquire(session_id).await;
        let result = self.act_locked(kind, session_id, map_id, team).await;
        log_outcome(kind.as_str(), session_id, &result);
        result
    }

    async fn start_locked(&self, session_id: SessionId) -> Result<MutationOutcome, VetoError> {
        let mut session = self.session(session_id).await?;
        if session.status != SessionStatus::NotStarted {
            return Err(VetoError::AlreadyStarted);
        }
        let pool = self.pool(session.map_pool_id).await?;
        session.status = SessionStatus::InProgress;
        session.updated_at = Utc::now();
        self.sessions.save(&session).await?;
        Ok(MutationOutcome::new(
            self.session(session_id).await?,
            None,
            &pool,
        ))
    }

    async fn act_locked(
        &self,
        kind: ActionKind,
        session_id: SessionId,
        map_id: MapId,
        team: Team,
    ) -> Result<MutationOutcome, VetoError> {
        let mut session = self.session(session_id).await?;
        if session.status.is_terminal() {
            return Err(VetoError::AlreadyFinished);
        }
        if kind == ActionKind::Pick && !session.format.allows_picks() {
            return Err(VetoError::InvalidAction(format!(
                "picks are not allowed in {}",
                session.format.as_str()
            )));
        }
        let pool = self.pool(session.map_pool_id).await?;
        if !pool.contains(map_id) {
            return Err(VetoError::MapNotFound);
        }

        if session.status == SessionStatus::NotStarted {
            session.status = SessionStatus::InProgress;
            session.updated_at = Utc::now();
            self.sessions.save(&session).await?;
        }

        if !veto_rules::is_available(&pool, &session.actions, map_id) {
            return Err(VetoError::MapUnavailable);
        }
        if !veto_rules::can_perform(
            session.status,
            session.format,
            &pool,
            &session.actions,
            kind,
            team,
        ) {
            return Err(VetoError::NotYourTurn);
        }

        let action = Action {
            id: ActionId::new(),
            session_id,
            map_id,
            team,
            kind,
            step: current_step(&session.actions),
            selected_side: None,
            created_at: Utc::now(),
        };
        self.actions
            .append(&action)
            .await
            .map_err(VetoError::from_append)?;

        session.actions.push(action.clone());
        session.current_team = current_team(&session.actions);
        if veto_rules::is_finished(session.format, &pool, &session.actions) {
            self.conclude(&mut session, &pool);
        }
        session.updated_at = Utc::now();

        if let Err(err) = self.sessions.save(&session).await {
            // Undo the append so the history never runs ahead of the session row.
            if let Err(undo) = self.actions.delete_action(action.id).await {
                tracing::error!(
                    %session_id,
                    action_id = %action.id,
                    error = %undo,
                    "Failed to roll back appended action"
                );
            }
            return Err(err.into());
        }

        info!(
            %session_id,
            step = action.step,
            team = team.as_str(),
            kind = kind.as_str(),
            %map_id,
            "Veto action recorded"
        );
        Ok(MutationOutcome::new(
            self.session(session_id).await?,
            Some(action),
            &pool,
        ))
    }

    async fn select_side_locked(
        &self,
        session_id: SessionId,
        team: Team,
        side: Side,
    ) -> Result<MutationOutcome, VetoError> {
        let session = self.session(session_id).await?;
        if session.status.is_terminal() {
            return Err(VetoError::AlreadyFinished);
        }
        let Some(pick) = session.last_action().filter(|a| a.awaits_side()) else {
            return Err(VetoError::InvalidAction(String::from(
                "the latest action is not a pick awaiting a side",
            )));
        };
        let Some(chooser) = side_selection_team(session.format, pick.step) else {
            return Err(VetoError::InvalidAction(format!(
                "no side selection follows the pick at step {}",
                pick.step
            )));
        };
        if team != chooser {
            return Err(VetoError::NotYourTurn);
        }

        let pick_id = pick.id;
        if !self.actions.update_side(pick_id, side).await? {
            return Err(VetoError::InvalidAction(String::from("pick no longer exists")));
        }

        let mut session = self.session(session_id).await?;
        let pool = self.pool(session.map_pool_id).await?;
        if veto_rules::is_finished(session.format, &pool, &session.actions) {
            self.conclude(&mut session, &pool);
            session.updated_at = Utc::now();
            self.sessions.save(&session).await?;
        }

        info!(%session_id, team = team.as_str(), side = side.as_str(), "Side selected");
        let session = self.session(session_id).await?;
        let action = session.actions.iter().find(|a| a.id == pick_id).cloned();
        Ok(MutationOutcome::new(session, action, &pool))
    }

    async fn reset_locked(&self, session_id: SessionId) -> Result<MutationOutcome, VetoError> {
        let mut session = self.session(session_id).await?;
        let pool = self.pool(session.map_pool_id).await?;
        let removed = self.actions.delete_all_for_session(session_id).await?;

        session.status = SessionStatus::NotStarted;
        session.current_team = session.format.first_team();
        session.decider_map_id = None;
        session.decider_side = None;
        session.finished_at = None;
        session.updated_at = Utc::now();
        session.actions.clear();
        self.sessions.save(&session).await?;

        info!(%session_id, removed, "Veto session reset");
        Ok(MutationOutcome::new(
            self.session(session_id).await?,
            None,
            &pool,
        ))
    }

    /// Resolve the decider and mark the session finished.
    fn conclude(&self, session: &mut Session, pool: &MapPool) {
        let survivors = veto_rules::survivors(pool, &session.actions);
        let decider = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            veto_rules::resolve_decider(session.format, &survivors, &mut **rng)
        };
        session.decider_map_id = decider.map_id;
        session.decider_side = decider.side;
        session.status = SessionStatus::Finished;
        session.finished_at = Some(Utc::now());
        info!(
            session_id = %session.id,
            decider = ?decider.map_id.map(|id| id.to_string()),
            side = ?decider.side.map(Side::as_str),
            "Veto finished"
        );
    }

    fn share_token(&self) -> String {
        let mut bytes = [0_u8; SHARE_TOKEN_BYTES];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn validate_team_name(field: &str, value: &str) -> Result<String, VetoError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_TEAM_NAME_CHARS {
        return Err(VetoError::Validation(format!(
            "{field} must be 1 to {MAX_TEAM_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

fn log_outcome<T>(operation: &str, session_id: SessionId, result: &Result<T, VetoError>) {
    if let Err(err) = result {
        debug!(%session_id, operation, code = err.code(), "Veto mutation rejected");
    }
}
