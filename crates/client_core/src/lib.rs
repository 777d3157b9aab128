//! Session-gated client for the estate portal backend.
//!
//! [`SessionController`] turns UI actions into API calls, keeps the session
//! token in a [`SessionStore`] and reports every outcome back through a
//! [`UiSurface`] as a navigation, a notice or a render.

mod controller;
pub mod error;
pub mod session;
pub mod transport;
pub mod ui;
pub mod validation;
pub mod view_model;

pub use controller::{LogoutNotification, Outcome, SessionController};
pub use error::{ClientError, ErrorKind};
pub use session::{
    CookieSessionStore, MemorySessionStore, PersistentSessionStore, SessionState,
    SessionStorageKind, SessionStore,
};
pub use transport::{ApiClient, ApiConfig, CredentialTransport};
pub use ui::{Notice, NoticeLevel, UiSurface, View};
pub use view_model::{ProfileView, ResourceListView, ResourceRow};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
