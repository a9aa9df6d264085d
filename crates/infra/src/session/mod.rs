//! Process session: the shared store and the manager that writes it.

mod manager;
mod store;

pub use manager::{AuthListener, SessionError, SessionManager};
pub use store::SessionStore;
