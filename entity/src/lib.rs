pub mod candidate;
pub mod job;
pub mod security_event;
pub mod stored_token;
pub mod vault_entry;
