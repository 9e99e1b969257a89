//! Tenant scoping
//!
//! A [`Scope`] holds the current tenant. While set, every read of ability,
//! role, grant and assignment rows is narrowed to rows that are either
//! global (`scope IS NULL`) or belong to the current tenant, and every write
//! stamps the tenant on the new row. Cache keys carry the tenant suffix.
//!
//! # Examples
//!
//! ```
//! use cretoai_abilities::config::ScopeConfig;
//! use cretoai_abilities::scope::{Scope, ScopeFilter};
//!
//! let scope = Scope::new(ScopeConfig::default());
//! assert_eq!(scope.relation_filter(), ScopeFilter::Any);
//!
//! scope.to(7);
//! assert!(scope.relation_filter().admits(None));
//! assert!(scope.relation_filter().admits(Some(7)));
//! assert!(!scope.relation_filter().admits(Some(8)));
//!
//! let inside = scope.once_to(8, || scope.get());
//! assert_eq!(inside, Some(8));
//! assert_eq!(scope.get(), Some(7));
//! ```

mod tenant;
mod types;


pub use tenant::Scope;
pub use types::ScopeFilter;
