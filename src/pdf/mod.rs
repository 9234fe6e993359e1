//! Collaborators around detection: rendering pages to rasters and writing
//! the split documents.

pub mod render;
pub mod split;
