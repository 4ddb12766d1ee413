//! Chart reports for evaluation results.

pub mod html;

pub use html::{HtmlSink, render_html, write_html};
