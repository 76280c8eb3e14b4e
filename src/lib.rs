#![doc = include_str!("../README.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

pub mod util;

pub mod cancel;
pub mod config;
pub mod error;

pub mod model;
pub mod geo;
pub mod oracle;

pub mod pickup;
pub mod check;
pub mod candidate;
pub mod plan;
pub mod matching;

pub mod engine;

#[doc(inline)]
pub use cancel::Cancellation;
#[doc(inline)]
pub use config::MatcherConfig;
#[doc(inline)]
pub use engine::{MatchingEngine, RunReport};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
