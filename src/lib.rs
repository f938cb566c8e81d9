//! HAL Model - typed `_links` and `_embedded` sections for HAL resources
//!
//! Provides:
//! - Coercion of raw JSON fragments into links, link arrays, resources and collections
//! - Relation-keyed containers with change notification
//! - Serialization back to plain JSON (`application/json`) or full HAL (`application/hal+json`)
//! - Configurable handling of values that cannot be coerced (report or raise)
//!
//! ## Example
//!
//! ```rust,ignore
//! use hal_model::{JsonOptions, Links, SetOptions};
//! use serde_json::json;
//!
//! let mut links = Links::new();
//! links.set_json(json!({"self": {"href": "/orders/1"}}), &SetOptions::default())?;
//! assert!(links.has_self());
//! println!("{}", links.to_json(&JsonOptions::hal()));
//! ```

pub mod config;
pub mod embedded;
pub mod error;
pub mod link;
pub mod links;
pub mod member;
pub mod resource;
pub mod store;

pub use config::{ContentType, HalConfig, HalConfigBuilder, HalContext, JsonOptions, SetOptions};
pub use embedded::{Embedded, EmbeddedMember, EmbeddedResource};
pub use error::{CollectingReporter, Diagnostic, ErrorReporter, HalError, TracingReporter};
pub use link::{Link, LinkArray};
pub use links::{LinkMember, Links};
pub use member::{Classified, InvalidMemberPolicy, Member, classify};
pub use resource::{
    EMBEDDED_KEY, EmbeddedMut, LINKS_KEY, LinksMut, Resource, ResourceCollection, SectionMut,
};
pub use store::{AttributeStore, ChangeEvent, ChangeKind, ListenerId, Notifications};
