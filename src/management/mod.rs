mod session;
mod store;

pub use session::RefreshOutcome;
pub use session::SessionError;
pub use session::SessionManager;
pub use store::JsonSessionStore;
pub use store::MemorySessionStore;
pub use store::SessionStore;
pub use store::StoreError;
