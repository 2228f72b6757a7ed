pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use sqlite::{SessionRow, SqliteSessions};
pub use store::SessionStore;
