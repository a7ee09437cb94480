//! Composition root
//!
//! Wires concrete adapters (backend clients, file stores, system clock,
//! navigator) into the application layer. Tests and embedders can hand in
//! their own `AppDeps` instead.

use std::sync::Arc;

use md_app::usecases::{
    BootstrapSession, CompleteOnboarding, CreateRoom, DeleteAccount, ExchangeAuthCode,
    ListRooms, LoadProfile, OnboardingStatusResolver, RefreshSession, RoomFeed, RouteGate,
    SaveProfile, SendMessage, SignIn, SignOut, UsernameAvailabilityChecker,
};
use md_app::{AppDeps, AuthContext, Outbox};
use md_backend::{AuthClient, BackendConfig, RealtimeClient, RestClient, TokenExchangeClient, TokenState};
use md_core::UserId;
use md_infra::{AppConfig, FileCookieStore, FileLocalStore, SystemClock, TracingNavigator};

pub struct App {
    config: AppConfig,
    ctx: Arc<AuthContext>,
    deps: AppDeps,
    outbox: Arc<Outbox>,
    resolver: Arc<OnboardingStatusResolver>,
}

impl App {
    /// Wire the default adapters from `config`.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let backend = BackendConfig::new(&config.backend.url, &config.backend.anon_key)
            .with_timeout(config.timeouts.request());
        let tokens = Arc::new(TokenState::default());
        let data_dir = config.resolve_data_dir();
        let clock = Arc::new(SystemClock);

        let deps = AppDeps {
            auth: Arc::new(AuthClient::new(backend.clone(), tokens.clone())?),
            query: Arc::new(RestClient::new(backend.clone(), tokens)?),
            realtime: Arc::new(RealtimeClient::new(backend)),
            exchange: Arc::new(TokenExchangeClient::new(
                &config.oauth.token_endpoint,
                &config.oauth.client_id,
                config.timeouts.request(),
            )?),
            cookies: Arc::new(FileCookieStore::with_clock(
                data_dir.join(md_infra::kv::DEFAULT_COOKIE_FILE),
                clock.clone(),
            )),
            local: Arc::new(FileLocalStore::with_base_dir(data_dir)),
            clock,
            navigator: Arc::new(TracingNavigator::default()),
        };
        Ok(Self::with_deps(config, deps))
    }

    /// Wire custom adapters, keeping the timing knobs from `config`.
    pub fn with_deps(config: AppConfig, deps: AppDeps) -> Self {
        let ctx = AuthContext::arc();
        let outbox = Arc::new(Outbox::with_op_deadline(
            deps.auth.clone(),
            deps.query.clone(),
            config.timeouts.submit(),
        ));
        let resolver = Arc::new(OnboardingStatusResolver::standard(
            deps.cookies.clone(),
            deps.local.clone(),
            deps.auth.clone(),
            deps.query.clone(),
        ));
        Self {
            config,
            ctx,
            deps,
            outbox,
            resolver,
        }
    }

    pub fn context(&self) -> Arc<AuthContext> {
        self.ctx.clone()
    }

    pub fn deps(&self) -> &AppDeps {
        &self.deps
    }

    pub fn outbox(&self) -> Arc<Outbox> {
        self.outbox.clone()
    }

    pub fn resolver(&self) -> Arc<OnboardingStatusResolver> {
        self.resolver.clone()
    }

    // === Use-case factories ===

    pub fn bootstrap(&self) -> BootstrapSession {
        BootstrapSession::with_timing(
            self.ctx.clone(),
            self.deps.auth.clone(),
            self.deps.query.clone(),
            self.resolver.clone(),
            self.config.timeouts.probe(),
            self.config.timeouts.bootstrap(),
        )
    }

    pub fn gate(&self) -> RouteGate {
        RouteGate::new(self.ctx.clone())
    }

    pub fn availability_checker(&self, own_user: Option<UserId>) -> UsernameAvailabilityChecker {
        UsernameAvailabilityChecker::with_timing(
            self.ctx.clone(),
            self.deps.query.clone(),
            own_user,
            self.config.timeouts.debounce(),
            self.config.timeouts.lookup(),
        )
    }

    pub fn complete_onboarding(&self) -> CompleteOnboarding {
        CompleteOnboarding::new(
            self.ctx.clone(),
            self.deps.cookies.clone(),
            self.deps.local.clone(),
            self.deps.navigator.clone(),
            self.outbox.clone(),
        )
    }

    pub fn sign_in(&self) -> SignIn {
        SignIn::new(self.ctx.clone(), self.deps.auth.clone())
    }

    pub fn sign_out(&self) -> SignOut {
        SignOut::new(
            self.ctx.clone(),
            self.deps.auth.clone(),
            self.deps.navigator.clone(),
        )
    }

    pub fn refresh_session(&self) -> RefreshSession {
        RefreshSession::new(self.ctx.clone(), self.deps.auth.clone())
    }

    pub fn exchange_auth_code(&self) -> ExchangeAuthCode {
        ExchangeAuthCode::new(
            self.ctx.clone(),
            self.deps.auth.clone(),
            self.deps.exchange.clone(),
            self.deps.cookies.clone(),
            self.config.oauth.redirect_uri.clone(),
        )
        .with_timeout(self.config.timeouts.request())
    }

    pub fn load_profile(&self) -> LoadProfile {
        LoadProfile::new(
            self.ctx.clone(),
            self.deps.query.clone(),
            self.deps.cookies.clone(),
            self.deps.local.clone(),
        )
    }

    pub fn save_profile(&self) -> SaveProfile {
        SaveProfile::new(
            self.ctx.clone(),
            self.deps.cookies.clone(),
            self.deps.local.clone(),
            self.outbox.clone(),
        )
    }

    pub fn delete_account(&self) -> DeleteAccount {
        DeleteAccount::new(
            self.ctx.clone(),
            self.deps.auth.clone(),
            self.deps.cookies.clone(),
            self.deps.local.clone(),
            self.deps.navigator.clone(),
            self.outbox.clone(),
        )
    }

    pub fn list_rooms(&self) -> ListRooms {
        ListRooms::new(self.deps.query.clone())
    }

    pub fn create_room(&self) -> CreateRoom {
        CreateRoom::new(self.ctx.clone(), self.deps.query.clone())
    }

    pub fn send_message(&self) -> SendMessage {
        SendMessage::new(self.ctx.clone(), self.deps.query.clone())
    }

    pub fn room_feed(&self) -> RoomFeed {
        RoomFeed::new(self.deps.query.clone(), self.deps.realtime.clone())
    }
}
