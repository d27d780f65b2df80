//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (remote store, image
//! storage, network monitor) into per-user [`Session`]s. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and only inject the remote store.
//!
//! ```ignore
//! let core = CoreService::new(config)?;
//! let mut events = core.events();
//!
//! let session = core.sign_in(User::new(uid, "Ada", "ada@example.com")).await?;
//! let page = session.library()?.get_book_list(&BookQuery::all_books(), None, false).await?;
//! session.sign_out().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::atomic::{AtomicBool, Ordering};

use core_library::{
    CategoryService, LibraryError, LibraryService, RecommendationService, ServiceContext, User,
    UserService,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{AccountEvent, CoreEvent, EventBus, EventStream};
use core_runtime::logging::short_id;
use tracing::{debug, info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    ctx: ServiceContext,
    events: EventBus,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_buffer_size);
        let ctx = ServiceContext::from_config(&config).with_event_bus(events.clone());
        Ok(Self { ctx, events })
    }

    /// Subscribe to library and account events.
    pub fn events(&self) -> EventStream {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Open a session for an authenticated user.
    ///
    /// The user record is created on first sign-in; later sign-ins return the
    /// stored record and work offline.
    #[instrument(skip(self, user), fields(user = %short_id(&user.user_id)))]
    pub async fn sign_in(&self, user: User) -> Result<Session> {
        if user.user_id.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "userId".to_string(),
                message: "cannot be empty".to_string(),
            }
            .into());
        }
        let user_id = user.user_id.clone();

        let users = UserService::new(self.ctx.clone(), user_id.as_str());
        let user = match users.find_user().await? {
            Some(existing) => existing,
            None => {
                debug!("First sign-in, creating user record");
                users.create_user(user).await?
            }
        };

        info!("User signed in");
        self.events
            .emit(CoreEvent::Account(AccountEvent::SignedIn {
                user_id: user_id.clone(),
            }))
            .ok();

        Ok(Session {
            library: LibraryService::new(self.ctx.clone(), user_id.as_str()),
            categories: CategoryService::new(self.ctx.clone(), user_id.as_str()),
            recommendations: RecommendationService::new(self.ctx.clone(), user_id.as_str()),
            users,
            user,
            events: self.events.clone(),
            closed: AtomicBool::new(false),
        })
    }
}

/// Convenience bootstrapper for desktop hosts: local image storage and the
/// desktop network monitor around the given remote store.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    store: std::sync::Arc<dyn bridge_traits::RemoteStore>,
) -> Result<CoreService> {
    let config = CoreConfig::builder()
        .remote_store(store)
        .image_storage(std::sync::Arc::new(bridge_desktop::LocalImageStorage::new()))
        .build()?;
    CoreService::new(config)
}

/// Services bound to one signed-in user.
pub struct Session {
    user: User,
    library: LibraryService,
    users: UserService,
    categories: CategoryService,
    recommendations: RecommendationService,
    events: EventBus,
    closed: AtomicBool,
}

impl Session {
    /// User record as of sign-in.
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    /// The user's books. Fails with [`CoreError::SessionClosed`] once the
    /// session is signed out or the account deleted; the same holds for the
    /// other service accessors.
    pub fn library(&self) -> Result<&LibraryService> {
        self.ensure_open().map(|_| &self.library)
    }

    pub fn users(&self) -> Result<&UserService> {
        self.ensure_open().map(|_| &self.users)
    }

    pub fn categories(&self) -> Result<&CategoryService> {
        self.ensure_open().map(|_| &self.categories)
    }

    pub fn recommendations(&self) -> Result<&RecommendationService> {
        self.ensure_open().map(|_| &self.recommendations)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(CoreError::SessionClosed(short_id(self.user_id())));
        }
        Ok(())
    }

    /// Release every live listener. Signing out twice is a no-op.
    pub async fn sign_out(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.library.remove_all_listeners().await;
        self.library.pagination().reset_all();

        info!(user = %short_id(self.user_id()), "User signed out");
        self.events
            .emit(CoreEvent::Account(AccountEvent::SignedOut {
                user_id: self.user.user_id.clone(),
            }))
            .ok();
    }

    /// Delete the user record and close the session. Books are kept.
    ///
    /// When the deletion fails the session stays open.
    pub async fn delete_account(&self) -> Result<()> {
        self.ensure_open()?;
        self.users.delete_user().await?;

        self.closed.store(true, Ordering::Release);
        self.library.remove_all_listeners().await;
        self.library.pagination().reset_all();

        info!(user = %short_id(self.user_id()), "Account deleted");
        self.events
            .emit(CoreEvent::Account(AccountEvent::AccountDeleted {
                user_id: self.user.user_id.clone(),
            }))
            .ok();
        Ok(())
    }
}
