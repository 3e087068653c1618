//! Shared application state type.
//!
//! Defines the `AppState` type used across all handlers and routers.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// This is an Arc-wrapped `AxumContext` containing every service an API
/// handler needs: repositories, the event bus, the scheduler, the
/// pipeline executor, and the model registry.
pub type AppState = Arc<AxumContext>;
