//! Standard action library
//!
//! Collection of built-in actions for common workflow steps

mod echo;
mod http;
mod time;
mod transform;

pub use echo::EchoAction;
pub use http::HttpRequestAction;
pub use time::DelayAction;
pub use transform::DataTransformAction;

use std::sync::Arc;
use stepruntime::ActionRegistry;

/// Register all standard actions with a registry
pub fn register_all(registry: &mut ActionRegistry) {
    registry.register(Arc::new(echo::EchoFactory));
    registry.register(Arc::new(http::HttpRequestFactory));
    registry.register(Arc::new(time::DelayFactory));
    registry.register(Arc::new(transform::DataTransformFactory));
}
