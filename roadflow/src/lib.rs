// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{filter_authorities, handle_authorities, handle_flows, load_config};
