//! Content types shared by the reader and the maker.

pub mod scene;
pub mod stats;
pub mod story;
