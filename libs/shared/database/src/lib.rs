pub mod supabase;

pub use supabase::{SupabaseClient, ApiStatus, error_status};
