//! ovhform convergence engine
//!
//! Drives OVH cloud resources from their observed state to a declared
//! desired state with the fewest mutating API calls. Every run is stateless:
//! current state is re-read from the API on each invocation.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ovhform_convergence::{CloudApi, Engine, WaitPolicy};
//! use ovhform_models::DesiredResource;
//!
//! # async fn example(api: Arc<dyn CloudApi>, manifest: Vec<DesiredResource>) -> ovhform_convergence::Result<()> {
//! let engine = Engine::builder()
//!     .client(api)
//!     .wait_policy(WaitPolicy::default())
//!     .build()?;
//!
//! for desired in &manifest {
//!     let outcome = engine.apply(desired).await?;
//!     println!("{}", outcome.message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod convergence;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod offer;
pub mod paths;
pub mod resolver;
pub mod waiter;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

// Re-export key types for convenience
pub use client::{get_as, list_as, CloudApi};
pub use convergence::Converge;
pub use engine::{Engine, EngineBuilder};
pub use error::{ConvergeError, RemoteError, Result};
pub use lookup::Lookup;
pub use offer::OfferMatcher;
pub use waiter::WaitPolicy;
