//! # tagbox core
//!
//! Owned, tagged elements and the rules for changing them.
//!
//! - [`model`]: elements, tags, users and the [`Ownership`] sum type
//! - [`transfer`]: per-operation request and response records
//! - [`storage`]: component traits and the transactional [`Store`]
//! - [`coordinator`]: ownership-gated create/update/delete over one unit of work
//! - [`policy`]: who may call which operation
//! - [`service`]: [`TagboxService`], the operations the HTTP layer calls
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tagbox_core::{AccessPolicy, Argon2Hasher, MemoryStore, TagboxService};
//!
//! let hasher = Arc::new(Argon2Hasher::new(Default::default())?);
//! let service = TagboxService::new(MemoryStore::new(), AccessPolicy::default(), hasher);
//! let tags = service.list_tags().await?;
//! ```

pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod model;
pub mod policy;
pub mod service;
pub mod storage;
pub mod transfer;

pub use credentials::{Argon2Hasher, Argon2Params, CredentialHasher};
pub use error::{CoreError, CoreResult};
pub use filter::{Combinator, ElementFilter};
pub use model::{
    Element, ElementId, ElementRecord, NewElement, NewUser, Ownership, Principal, Tag, TagId,
    TagName, Tagging, User, UserId,
};
pub use policy::AccessPolicy;
pub use service::TagboxService;
pub use storage::{MemoryStore, Store, UnitOfWork};
pub use transfer::{
    ElementCreate, ElementUpdate, ElementView, TagDirective, TagOp, TagView, UserCreate,
    UserUpdate, UserView,
};
