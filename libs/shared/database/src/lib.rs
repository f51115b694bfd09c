pub mod error;
pub mod memory;
pub mod postgrest;
pub mod state;
pub mod store;
pub mod supabase;

pub use error::DbError;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use state::AppState;
pub use store::{SchedulingStore, UnitOfWork};
