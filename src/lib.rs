//! Platform-aware loading of native libraries bundled with an application.
//!
//! A [`NamingScheme`](naming::NamingScheme) turns a logical library name into
//! platform-specific resource and file names. A
//! [`LoaderStrategy`](strategy::LoaderStrategy) describes how to make the
//! library available: from the system search path, from an explicit file, or
//! by extracting a bundled resource to disk. Strategies compose into fallback
//! chains. [`NativeInitializer`](initializer::NativeInitializer) runs the
//! chosen strategy exactly once, on first use, and caches a value built from
//! the loaded library.
//!
//! ```no_run
//! use native_init::factory::LoaderFactory;
//! use native_init::initializer::NativeInitializer;
//! use native_init::loader::NativeLoader;
//! use native_init::naming::NamingScheme;
//! use native_init::resources::EmbeddedResources;
//! use std::sync::Arc;
//!
//! let scheme = NamingScheme::new("thelib".try_into()?).with_relative_path("lib");
//! let resource = scheme.resolve(true, false)?;
//! let factory = LoaderFactory::new(scheme);
//! let strategy = factory
//!     .system_loader()
//!     .fallback_to(factory.resource_loader_temp_directory());
//!
//! let store = EmbeddedResources::new().with(&resource, b"...library bytes...");
//! let loader = NativeLoader::system(Arc::new(store));
//! let ready = NativeInitializer::new(loader, strategy, || true);
//! assert!(*ready.get()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cleanup;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod factory;
pub mod initializer;
pub mod linker;
pub mod loader;
pub mod naming;
pub mod platform;
pub mod resources;
pub mod strategy;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use config::LoaderConfig;
pub use error::{ConfigError, InitError, LinkError, LoadError, LoadStage, NamingError};
pub use factory::LoaderFactory;
pub use initializer::NativeInitializer;
pub use loader::NativeLoader;
pub use naming::NamingScheme;
pub use strategy::LoaderStrategy;
