//! Element Remover Core Library
//!
//! This crate holds the host-independent logic of the Element Remover extension:
//! per-site rules that name CSS selectors to strip from matching pages.
//!
//! # Architecture
//!
//! A navigation event is filtered down to a qualifying web URL, the rule list is
//! read once from the store, and the first enabled rule whose fragment occurs in
//! the URL is turned into an injection request. Inside the page, the removal pass
//! runs once and is re-run on every DOM mutation by the host binding.
//!
//! # Modules
//!
//! - `types`: Rule model and navigation/injection types
//! - `url`: Scheme and host extraction without allocations
//! - `selector`: Comma-separated selector splitting
//! - `matcher`: First-match rule selection
//! - `rules`: List editing operations and the popup edit session
//! - `store`: Store keys, record parsing and the read-modify-write repository
//! - `removal`: Removal pass over an abstract page document
//! - `coordinator`: Navigation event handling
//! - `messages`: Background/content-script message protocol

pub mod types;
pub mod url;
pub mod selector;
pub mod matcher;
pub mod rules;
pub mod store;
pub mod removal;
pub mod coordinator;
pub mod messages;

// Re-export commonly used types
pub use coordinator::{plan_injection, qualifying_url, Coordinator, Injector, InjectError, Outcome};
pub use matcher::Matcher;
pub use messages::ContentMessage;
pub use removal::{run_removal_pass, PageDocument, RemovalReport};
pub use rules::{EditSession, RuleError};
pub use store::{MemoryStore, RuleRepository, Store, StoreError};
pub use types::{InjectionRequest, NavigationEvent, Rule, RuleMatch, SchemeMask, TabStatus};
