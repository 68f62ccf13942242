//! Mutex-guarded entity stores, one per §3 entity, each with an optional
//! write-through/read-through backend. See `client.rs`, `session.rs`, `code.rs`,
//! `token.rs` for the per-entity APIs; the atomic primitives required by §5
//! (`ConsumeCode`, `Rotate`, session `Consume`) live on the store that owns the
//! entity they operate on, never composed from `Get`+`Delete`+`Put` by callers.

mod client;
mod code;
mod session;
mod token;

pub use client::ClientStore;
pub use code::CodeStore;
pub use session::SessionStore;
pub use token::TokenStore;
