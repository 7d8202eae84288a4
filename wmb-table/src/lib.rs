//! Bulletin table model and renderers.
//!
//! [`builder::build_table`] turns computed blocks into a [`model::TableModel`]
//! of rows and cells carrying span, alignment and highlight directives; the
//! [`render`] module writes that model out as CSV, JSON or a text preview.

pub mod builder;
pub mod format;
pub mod model;
pub mod render;

pub use builder::build_table;
pub use model::TableModel;
pub use render::{render, Format};
