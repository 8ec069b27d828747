//! One adapter per engine flavour, each behind its cargo feature.

#[cfg(feature = "graph")]
pub mod graph;
#[cfg(feature = "layers")]
pub mod layers;
#[cfg(feature = "tape")]
pub mod tape;
