//! # RM-03 Middleware
//!
//! Method-call middleware for repositories.
//!
//! `apply_middleware(target, &[a, b])` returns a repository whose callable
//! members run `a`, which may call into `b`, which may call into the real
//! method. Replacement arguments passed to [`Next::proceed_with`] flow
//! forward to later links only. Property reads are never intercepted.
//!
//! ## Usage Example
//!
//! ```
//! use rm_03_middleware::{apply_middleware, middleware};
//! use serde_json::json;
//! use shared_types::{MethodTable, Repository};
//! use std::sync::Arc;
//!
//! let repo: Arc<dyn Repository> =
//!     Arc::new(MethodTable::new().method("greet", |args| Ok(json!(format!("hi {}", args[0])))));
//! let shout = middleware(|_, _, next| next.proceed_with(vec![json!("ALL")]));
//!
//! let wrapped = apply_middleware(repo, &[shout]);
//! assert_eq!(wrapped.call("greet", vec![json!("bob")]).unwrap(), json!("hi \"ALL\""));
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod chain;
pub mod stock;

pub use chain::{apply_middleware, middleware, Middleware, MiddlewareChain, Next, Wrapped};
pub use stock::call_logger;
