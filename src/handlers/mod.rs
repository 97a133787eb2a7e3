pub mod admin;
pub mod oauth;
pub mod proxy;
pub mod records;
pub mod sync;
pub mod vault;
