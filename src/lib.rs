//! A periodic metric sampling engine.
//!
//! The engine repeatedly samples a set of named, possibly multi-instance
//! metrics from a [`MetricSource`], converts monotonic counters into
//! per-second rates using the previous sample, and hands a filtered and
//! ranked [`SampledResult`] to a [`Renderer`] on every tick.

pub mod catalog;
pub mod config;
pub mod engine;
mod error;
pub mod filter;
pub mod instance;
pub mod render;
pub mod result;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod value;

pub use crate::catalog::{MetricCatalog, MetricDescriptor, MetricId, MetricKind};
pub use crate::config::Config;
pub use crate::engine::Engine;
pub use crate::error::{Error, Result};
pub use crate::filter::ResultFilter;
pub use crate::instance::{Instance, InstanceId, InstanceTracker};
pub use crate::render::Renderer;
pub use crate::result::{ResultEntry, SampledResult};
pub use crate::scheduler::{Scheduler, StopHandle, Summary};
pub use crate::source::{Fetch, FetchedValue, MetricSource};
pub use crate::store::{RateResult, SampleStore};
pub use crate::value::Value;
