mod renderers;
mod summary;
mod view;

pub use renderers::{FieldRenderer, RendererTable};
pub use summary::{SUMMARY_WIDTH, summarize_value, truncate_to_width};
pub use view::FieldView;
