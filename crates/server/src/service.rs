//! Authoritative game service.
//!
//! Every mutating action for a player runs under that player's async mutex
//! and is written through to the store before the lock is released, so
//! persistence order always matches mutation order. Reads go through a
//! `watch` channel holding the last committed state and never take the lock.
//! A player stays in memory only while a session is open, a write is
//! outstanding or a call still holds its handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use grove_catalog::Catalog;
use grove_core::{scoped_rng, Cost, FamilyId, Millis, PlayerId, Resources};
use grove_engine::{
    premium_item, CollectOutcome, EngineError, GameState, OfflineReport, PremiumOutcome,
    PurchaseOutcome, ReferralGiftOutcome, Selection, TapOutcome,
};
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    Clock, IdentityResolver, Invoice, InvoiceRequest, PaymentError, PaymentGateway, PlayerRecord,
    PlayerStore, Profile, ServiceError, StoreError,
};

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_DOMAIN: u64 = 0x5245_4646;

/// Tunables of the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bound on each payment gateway round trip.
    pub payment_timeout: Duration,
    /// Save attempts per commit.
    pub persist_attempts: u32,
    /// Delay before the first retry; doubles each time.
    pub persist_backoff: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_secs(5),
            persist_attempts: 3,
            persist_backoff: Duration::from_millis(50),
        }
    }
}

/// Result of [`GameService::start_session`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    /// Resolved identity.
    pub profile: Profile,
    /// State after reconciliation.
    pub state: GameState,
    /// Account created by this call.
    pub is_new: bool,
    /// Offline catch-up outcome.
    pub offline: OfflineReport,
    /// Daily quests were redrawn.
    pub quests_refreshed: bool,
    /// Gift from a referral code given at sign-up.
    pub referral: Option<ReferralGiftOutcome>,
}

struct PlayerSlot {
    record: PlayerRecord,
    session_started: bool,
    selection: Selection,
    dirty: bool,
}

struct PlayerHandle {
    slot: tokio::sync::Mutex<PlayerSlot>,
    published: watch::Sender<Arc<GameState>>,
}

impl PlayerHandle {
    fn new(record: PlayerRecord) -> Self {
        let (published, _) = watch::channel(Arc::new(record.state.clone()));
        Self {
            slot: tokio::sync::Mutex::new(PlayerSlot {
                record,
                session_started: false,
                selection: Selection::Idle,
                dirty: false,
            }),
            published,
        }
    }
}

fn referral_code(player: PlayerId, attempt: u64) -> String {
    let mut rng = scoped_rng(player, REFERRAL_DOMAIN.wrapping_add(attempt));
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.gen_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect()
}

/// Server-side owner of every player's state.
pub struct GameService {
    catalog: Arc<Catalog>,
    store: Arc<dyn PlayerStore>,
    payments: Arc<dyn PaymentGateway>,
    identity: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    players: Mutex<HashMap<PlayerId, Arc<PlayerHandle>>>,
    admission: tokio::sync::Mutex<()>,
}

impl GameService {
    /// Wire the service to its collaborators.
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn PlayerStore>,
        payments: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityResolver>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            payments,
            identity,
            clock,
            config,
            players: Mutex::new(HashMap::new()),
            admission: tokio::sync::Mutex::new(()),
        }
    }

    /// Catalog in use.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn players(&self) -> MutexGuard<'_, HashMap<PlayerId, Arc<PlayerHandle>>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, player: PlayerId) -> Option<Arc<PlayerHandle>> {
        self.players().get(&player).cloned()
    }

    /// Drop a player's handle when it has no session, no pending write and
    /// no other holder. Runs under the map lock, so a concurrent lookup
    /// either keeps the handle alive or misses it and reloads the saved
    /// record.
    fn release_if_idle(&self, player: PlayerId) {
        let mut players = self.players();
        let idle = players.get(&player).is_some_and(|handle| {
            Arc::strong_count(handle) == 1
                && handle
                    .slot
                    .try_lock()
                    .is_ok_and(|slot| !slot.session_started && !slot.dirty)
        });
        if idle {
            players.remove(&player);
            debug!(player = %player, "player released from memory");
        }
    }

    /// Players currently held in memory.
    pub fn loaded_players(&self) -> usize {
        self.players().len()
    }

    /// Handle for an authenticated player, creating the account on first
    /// sight. The bool is true when the account was created here.
    async fn admit(&self, profile: &Profile, now: Millis) -> Result<(Arc<PlayerHandle>, bool), ServiceError> {
        let player = profile.player_id;
        if let Some(handle) = self.lookup(player) {
            return Ok((handle, false));
        }
        let _admission = self.admission.lock().await;
        if let Some(handle) = self.lookup(player) {
            return Ok((handle, false));
        }
        let (record, is_new) = match self.store.load(player).await? {
            Some(record) => (record, false),
            None => {
                let code = self.unique_referral_code(player).await?;
                let state = GameState::new_player(&self.catalog, player, code, now);
                info!(player = %player, code = %state.referral.code, "account created");
                let record = PlayerRecord {
                    profile: profile.clone(),
                    state,
                };
                (record, true)
            }
        };
        let handle = Arc::new(PlayerHandle::new(record));
        self.players().insert(player, Arc::clone(&handle));
        Ok((handle, is_new))
    }

    /// Handle for an existing player without starting a session.
    async fn admit_existing(&self, player: PlayerId) -> Result<Arc<PlayerHandle>, ServiceError> {
        if let Some(handle) = self.lookup(player) {
            return Ok(handle);
        }
        let _admission = self.admission.lock().await;
        if let Some(handle) = self.lookup(player) {
            return Ok(handle);
        }
        let record = self
            .store
            .load(player)
            .await?
            .ok_or(ServiceError::UnknownPlayer(player))?;
        let handle = Arc::new(PlayerHandle::new(record));
        self.players().insert(player, Arc::clone(&handle));
        Ok(handle)
    }

    async fn unique_referral_code(&self, player: PlayerId) -> Result<String, ServiceError> {
        let mut attempt = 0;
        loop {
            let code = referral_code(player, attempt);
            if self.store.find_by_referral_code(&code).await?.is_none() {
                return Ok(code);
            }
            attempt += 1;
        }
    }

    /// Publish the committed state and write it through with retries.
    async fn persist(&self, handle: &PlayerHandle, slot: &mut PlayerSlot) -> Result<(), ServiceError> {
        handle
            .published
            .send_replace(Arc::new(slot.record.state.clone()));
        slot.dirty = true;

        let player = slot.record.profile.player_id;
        let attempts = self.config.persist_attempts.max(1);
        let mut backoff = self.config.persist_backoff;
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.store.save(&slot.record).await {
                Ok(()) => {
                    slot.dirty = false;
                    return Ok(());
                }
                Err(err) => {
                    warn!(player = %player, attempt, %err, "save failed");
                    last_err = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = backoff.saturating_mul(2);
                    }
                }
            }
        }
        error!(player = %player, attempts, "save retries exhausted; player left dirty");
        Err(ServiceError::Persistence(last_err.unwrap_or_else(|| {
            StoreError::Unavailable("no save attempted".into())
        })))
    }

    /// Run one gameplay action under the player's lock and commit it.
    async fn act<T, F>(&self, player: PlayerId, action: &'static str, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Catalog, &mut PlayerSlot, Millis) -> Result<T, EngineError> + Send,
        T: Send,
    {
        let handle = self
            .lookup(player)
            .ok_or(ServiceError::SessionNotStarted(player))?;
        let mut slot = handle.slot.lock().await;
        if !slot.session_started {
            return Err(ServiceError::SessionNotStarted(player));
        }
        let now = self.clock.now();
        let outcome = match f(&self.catalog, &mut slot, now) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(player = %player, action, %err, "action rejected");
                return Err(err.into());
            }
        };
        slot.record.state.last_online_at = now;
        self.persist(&handle, &mut slot).await?;
        Ok(outcome)
    }

    /// Authenticate, load or create the account, refresh daily quests and
    /// reconcile offline production. Runs before any other action of the
    /// session is accepted.
    ///
    /// A failed durable write here does not fail the call: the player stays
    /// dirty and the next action or [`GameService::flush_dirty`] persists it.
    #[instrument(skip(self, token))]
    pub async fn start_session(
        &self,
        token: &str,
        referral_code: Option<&str>,
    ) -> Result<SessionStart, ServiceError> {
        let profile = self.identity.resolve(token).await?;
        let player = profile.player_id;
        let now = self.clock.now();
        let (handle, is_new) = self.admit(&profile, now).await?;

        let (offline, quests_refreshed) = {
            let mut slot = handle.slot.lock().await;
            slot.record.profile = profile.clone();
            let state = &mut slot.record.state;
            let quests_refreshed = !is_new && state.quests.refresh_if_due(&self.catalog, player, now);
            let offline = state.reconcile_offline(&self.catalog, now, is_new);
            slot.session_started = true;
            slot.selection = Selection::Idle;
            if let Err(err) = self.persist(&handle, &mut slot).await {
                warn!(player = %player, %err, "session started without a durable save");
            }
            (offline, quests_refreshed)
        };

        let referral = match referral_code {
            Some(code) if is_new => match self.apply_referral(player, code).await {
                Ok(gift) => Some(gift),
                Err(err) => {
                    warn!(player = %player, code, %err, "sign-up referral not applied");
                    None
                }
            },
            _ => None,
        };

        info!(player = %player, is_new, bonus = %offline.bonus, "session started");
        Ok(SessionStart {
            profile,
            state: self.snapshot(player)?,
            is_new,
            offline,
            quests_refreshed,
            referral,
        })
    }

    /// Close the session, stamping the last online instant. The player is
    /// released from memory once the final write is durable.
    #[instrument(skip(self))]
    pub async fn end_session(&self, player: PlayerId) -> Result<(), ServiceError> {
        let saved = {
            let handle = self
                .lookup(player)
                .ok_or(ServiceError::SessionNotStarted(player))?;
            let mut slot = handle.slot.lock().await;
            if !slot.session_started {
                return Err(ServiceError::SessionNotStarted(player));
            }
            slot.session_started = false;
            slot.selection = Selection::Idle;
            slot.record.state.last_online_at = self.clock.now();
            self.persist(&handle, &mut slot).await
        };
        self.release_if_idle(player);
        saved
    }

    /// Tap a grid cell.
    #[instrument(skip(self))]
    pub async fn select_cell(&self, player: PlayerId, index: usize) -> Result<TapOutcome, ServiceError> {
        self.act(player, "select_cell", move |catalog, slot, now| {
            slot.record
                .state
                .select_cell(catalog, &mut slot.selection, index, now)
        })
        .await
    }

    /// Collect a creature's finished ticks.
    #[instrument(skip(self))]
    pub async fn collect_creature(
        &self,
        player: PlayerId,
        index: usize,
    ) -> Result<CollectOutcome, ServiceError> {
        self.act(player, "collect_creature", move |catalog, slot, now| {
            slot.record.state.collect_creature(catalog, index, now)
        })
        .await
    }

    /// Buy a creature with resources at the catalog price.
    #[instrument(skip(self))]
    pub async fn buy_creature(
        &self,
        player: PlayerId,
        family: &FamilyId,
        level: u32,
        quoted: Option<Cost>,
    ) -> Result<PurchaseOutcome, ServiceError> {
        self.act(player, "buy_creature", move |catalog, slot, now| {
            slot.record
                .state
                .buy_creature(catalog, family, level, quoted, now)
        })
        .await
    }

    /// Ask the gateway for an invoice. Player state is never touched; a
    /// timeout leaves nothing behind locally.
    #[instrument(skip(self))]
    pub async fn buy_premium_item(&self, player: PlayerId, item_id: &str) -> Result<Invoice, ServiceError> {
        let handle = self
            .lookup(player)
            .ok_or(ServiceError::SessionNotStarted(player))?;
        if !handle.slot.lock().await.session_started {
            return Err(ServiceError::SessionNotStarted(player));
        }
        let item = premium_item(&self.catalog, item_id)?;
        let request = InvoiceRequest {
            player,
            item_id: item.id().to_string(),
            price_stars: item.price_stars(),
        };
        let timeout = self.config.payment_timeout;
        let invoice = tokio::time::timeout(timeout, self.payments.create_invoice(request))
            .await
            .map_err(|_| PaymentError::Timeout(timeout))??;
        info!(player = %player, item_id, handle = %invoice.handle, "invoice created");
        Ok(invoice)
    }

    /// Apply a premium purchase once the gateway confirms the charge.
    ///
    /// The gateway round trip runs without the player lock, so the player
    /// keeps playing while a confirmation is in flight. Duplicate
    /// confirmations for the same `charge_ref` are answered with
    /// [`PremiumOutcome::AlreadyApplied`]: before the round trip when the
    /// charge is already recorded, and again under the lock when a
    /// concurrent confirmation won the race. Works outside a session so that
    /// confirmations arriving late still land.
    #[instrument(skip(self))]
    pub async fn verify_purchase(
        &self,
        player: PlayerId,
        charge_ref: &str,
        item_id: &str,
    ) -> Result<PremiumOutcome, ServiceError> {
        let handle = self.admit_existing(player).await?;
        let outcome = self
            .confirm_and_apply(&handle, player, charge_ref, item_id)
            .await;
        drop(handle);
        self.release_if_idle(player);
        outcome
    }

    async fn confirm_and_apply(
        &self,
        handle: &PlayerHandle,
        player: PlayerId,
        charge_ref: &str,
        item_id: &str,
    ) -> Result<PremiumOutcome, ServiceError> {
        if handle
            .slot
            .lock()
            .await
            .record
            .state
            .processed_charges
            .contains(charge_ref)
        {
            debug!(player = %player, charge_ref, "charge already applied");
            return Ok(PremiumOutcome::AlreadyApplied);
        }
        premium_item(&self.catalog, item_id)?;
        let timeout = self.config.payment_timeout;
        tokio::time::timeout(timeout, self.payments.confirm_charge(player, charge_ref, item_id))
            .await
            .map_err(|_| PaymentError::Timeout(timeout))??;

        let mut slot = handle.slot.lock().await;
        if slot.record.state.processed_charges.contains(charge_ref) {
            debug!(player = %player, charge_ref, "charge applied during confirmation");
            return Ok(PremiumOutcome::AlreadyApplied);
        }
        let now = self.clock.now();
        let outcome = slot
            .record
            .state
            .apply_premium(&self.catalog, charge_ref, item_id, now)?;
        self.persist(handle, &mut slot).await?;
        Ok(outcome)
    }

    /// Claim a completed quest.
    #[instrument(skip(self))]
    pub async fn claim_quest(&self, player: PlayerId, quest_id: &str) -> Result<Resources, ServiceError> {
        self.act(player, "claim_quest", move |_, slot, now| {
            slot.record.state.claim_quest(quest_id, now)
        })
        .await
    }

    /// Clear the displayed catch-up bonus.
    #[instrument(skip(self))]
    pub async fn acknowledge_catchup(&self, player: PlayerId) -> Result<Resources, ServiceError> {
        self.act(player, "acknowledge_catchup", |_, slot, _| {
            Ok(slot.record.state.acknowledge_catchup())
        })
        .await
    }

    /// Link `player` to the owner of `code` and reward both.
    ///
    /// The referrer is loaded before the referred player is touched, so a
    /// referrer that cannot be loaded leaves both sides unchanged. The two
    /// players are locked one after the other, never together.
    #[instrument(skip(self))]
    pub async fn apply_referral(
        &self,
        player: PlayerId,
        code: &str,
    ) -> Result<ReferralGiftOutcome, ServiceError> {
        let code = code.trim().to_ascii_uppercase();
        let referrer = self
            .store
            .find_by_referral_code(&code)
            .await?
            .ok_or_else(|| ServiceError::UnknownReferralCode(code.clone()))?;

        let handle = self
            .lookup(player)
            .ok_or(ServiceError::SessionNotStarted(player))?;
        let referrer_handle = self.admit_existing(referrer).await?;
        let linked = self
            .link_referral(&handle, &referrer_handle, player, referrer, &code)
            .await;
        drop(referrer_handle);
        self.release_if_idle(referrer);
        linked
    }

    async fn link_referral(
        &self,
        handle: &PlayerHandle,
        referrer_handle: &PlayerHandle,
        player: PlayerId,
        referrer: PlayerId,
        code: &str,
    ) -> Result<ReferralGiftOutcome, ServiceError> {
        let (gift, referred_saved) = {
            let mut slot = handle.slot.lock().await;
            if !slot.session_started {
                return Err(ServiceError::SessionNotStarted(player));
            }
            let now = self.clock.now();
            let gift = slot
                .record
                .state
                .accept_referral(&self.catalog, referrer, code, now)?;
            slot.record.state.last_online_at = now;
            (gift, self.persist(handle, &mut slot).await)
        };

        let referrer_saved = {
            let mut slot = referrer_handle.slot.lock().await;
            let now = self.clock.now();
            slot.record.state.reward_referrer(&self.catalog, now);
            self.persist(referrer_handle, &mut slot).await
        };

        info!(player = %player, referrer = %referrer, "referral linked");
        referred_saved?;
        referrer_saved?;
        Ok(gift)
    }

    /// Last committed state of a loaded player, with ready flags computed
    /// for the current instant. Never waits on the player's lock.
    pub fn snapshot(&self, player: PlayerId) -> Result<GameState, ServiceError> {
        let handle = self
            .lookup(player)
            .ok_or(ServiceError::UnknownPlayer(player))?;
        let published: Arc<GameState> = handle.published.borrow().clone();
        let mut state = (*published).clone();
        state.refresh_ready_flags(&self.catalog, self.clock.now());
        Ok(state)
    }

    /// State of any player, loading from the store when not in memory.
    pub async fn load_state(&self, player: PlayerId) -> Result<GameState, ServiceError> {
        if self.lookup(player).is_some() {
            return self.snapshot(player);
        }
        let mut state = self
            .store
            .load(player)
            .await?
            .ok_or(ServiceError::UnknownPlayer(player))?
            .state;
        state.refresh_ready_flags(&self.catalog, self.clock.now());
        Ok(state)
    }

    /// Retry the durable write of every dirty player, then release players
    /// left without a session. Returns how many were written.
    pub async fn flush_dirty(&self) -> usize {
        let handles: Vec<(PlayerId, Arc<PlayerHandle>)> = self
            .players()
            .iter()
            .map(|(player, handle)| (*player, Arc::clone(handle)))
            .collect();
        let mut flushed = 0;
        for (player, handle) in handles {
            let mut slot = handle.slot.lock().await;
            if slot.dirty && self.persist(&handle, &mut slot).await.is_ok() {
                flushed += 1;
            }
            drop(slot);
            drop(handle);
            self.release_if_idle(player);
        }
        if flushed > 0 {
            info!(flushed, "dirty players written");
        }
        flushed
    }

    /// Whether a player has committed changes not yet durable.
    pub async fn is_dirty(&self, player: PlayerId) -> bool {
        match self.lookup(player) {
            Some(handle) => handle.slot.lock().await.dirty,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_are_uppercase_alphanumeric() {
        let code = referral_code(PlayerId(12), 0);
        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(code, referral_code(PlayerId(12), 0));
        assert_ne!(code, referral_code(PlayerId(12), 1));
    }
}
