//! Ready-made middleware.

use crate::chain::{middleware, Middleware};
use std::time::Instant;
use tracing::{debug, warn};

/// Log every call on `repository_id` with its duration and outcome.
pub fn call_logger(repository_id: impl Into<String>) -> Middleware {
    let repository_id = repository_id.into();
    middleware(move |method, args, next| {
        let started = Instant::now();
        let result = next.proceed();
        let elapsed_us = started.elapsed().as_micros() as u64;
        match &result {
            Ok(_) => debug!(
                repository = %repository_id,
                method,
                args = args.len(),
                elapsed_us,
                "Method call completed"
            ),
            Err(e) => warn!(
                repository = %repository_id,
                method,
                elapsed_us,
                error = %e,
                "Method call failed"
            ),
        }
        result
    })
}
