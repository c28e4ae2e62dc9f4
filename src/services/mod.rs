// Service exports
pub mod cache;
pub mod postgres;
pub mod supabase;

pub use cache::ScoreCache;
pub use postgres::{PostgresError, PostgresSink};
pub use supabase::{SupabaseClient, SupabaseError};
