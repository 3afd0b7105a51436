//! Core types, traits, and error handling.
//!
//! This module contains the fundamental building blocks used by all other
//! parts of the library.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{LoadError, LoadResult};
pub use traits::{
    ArcDocumentTree, ArcHandle, ArcProvider, ArcSignals, BehaviorSignals, DocumentTree,
    ElementHandle, EmbedProvider, StaticSignals,
};
pub use types::{
    EngineStatus, FailureRecord, GeometrySnapshot, LoadStatus, NetworkQuality, Rect, Resource,
    ResourceId, StatusCounts,
};
