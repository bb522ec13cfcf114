//! Request body validation middleware.
//!
//! [`validate_json`] decodes the JSON body into `T`, runs the `validator`
//! rules derived on it, and stores the value as a typed extension so the
//! handler can read it without decoding twice. Failures write `400` with
//! the error details and stop the chain.
//!
//! ```
//! use merlin_core::{ApiResponse, Context};
//! use merlin_middleware::stages::validate_json;
//! use merlin_middleware::Chain;
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct NewUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//! }
//!
//! let create = Chain::new()
//!     .with(validate_json::<NewUser>())
//!     .then(|ctx: &mut Context| match ctx.extension::<NewUser>() {
//!         Some(user) => ApiResponse::new(true, format!("created {}", user.name), 201),
//!         None => ctx.error_json("missing body", None, 500),
//!     });
//! # let _ = create;
//! ```

use std::fmt;
use std::marker::PhantomData;

use merlin_core::{ApiResponse, Context};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::middleware::{Middleware, Next};

/// Message written when the body does not decode.
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
/// Message written when validation rules fail.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Middleware that decodes and validates a JSON body as `T`.
pub struct ValidateJson<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValidateJson<T> {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ValidateJson<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ValidateJson<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateJson")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Middleware for ValidateJson<T>
where
    T: DeserializeOwned + Validate + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "validate_json"
    }

    fn process(&self, ctx: &mut Context, next: Next<'_>) -> ApiResponse {
        let value: T = match ctx.bind_json() {
            Ok(value) => value,
            Err(err) => {
                let code = err.status_code().as_u16();
                return ctx.error_json(INVALID_BODY_MESSAGE, Some(err.details()), code);
            }
        };
        if let Err(err) = ctx.validate(&value) {
            return ctx.error_json(VALIDATION_FAILED_MESSAGE, Some(err.details()), 400);
        }

        ctx.insert_extension(value);
        next.run(ctx)
    }
}

/// Validation middleware for JSON bodies of type `T`.
#[must_use]
pub const fn validate_json<T>() -> ValidateJson<T> {
    ValidateJson::new()
}
