//! CalendarProvider trait and implementations.
//!
//! - [`CalendarProvider`]: the trait every calendar backend implements
//! - [`FetchOptions`]: time bounds and limits for a fetch
//! - [`ProviderError`]: error type for provider operations
//! - [`google`]: the Google Calendar backend (feature `google`)
//! - [`StaticProvider`]: a fixed list of events
//!
//! Providers hand back [`nomorelateness_core::CalendarEvent`]s directly; link
//! resolution happens afterwards in the core crate.

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CalendarProvider, FetchOptions, StaticProvider};
