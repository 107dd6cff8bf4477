//! Lifecycle Hooks Module
//!
//! Post-construction and pre-destruction hooks for providers and controllers,
//! and the application that drives them.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Module graph resolution
//!    ↓
//! 2. Container build (controllers and their dependencies)
//!    ↓
//! 3. Pipeline compilation and router mount
//!    ↓
//! 4. init(): every provider constructed, OnModuleInit in construction order
//!    ↓
//! [Serving...]
//!    ↓
//! 5. Shutdown Signal (SIGTERM/SIGINT)
//!    ↓
//! 6. destroy(): OnModuleDestroy in reverse construction order
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use keystone::lifecycle::{OnModuleInit, OnModuleDestroy, LifecycleError};
//! use async_trait::async_trait;
//!
//! #[derive(Injectable)]
//! #[lifecycle(init, destroy)]
//! pub struct DatabaseService {
//!     config: Arc<DatabaseConfig>,
//! }
//!
//! #[async_trait]
//! impl OnModuleInit for DatabaseService {
//!     async fn on_module_init(&self) -> Result<(), LifecycleError> {
//!         tracing::info!("Initializing database connection");
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl OnModuleDestroy for DatabaseService {
//!     async fn on_module_destroy(&self) -> Result<(), LifecycleError> {
//!         tracing::info!("Closing database connections");
//!         Ok(())
//!     }
//! }
//! ```

mod application;
mod error;
mod hooks;
mod manager;
mod shutdown;

pub use application::{Application, ApplicationBuilder, LifecycleState};
pub use error::{LifecycleError, Result};
pub use hooks::{ErasedHooks, LifecycleHooks, OnModuleDestroy, OnModuleInit};
pub use manager::LifecycleManager;
pub use shutdown::shutdown_signal;
