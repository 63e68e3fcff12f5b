pub mod epub;

pub use epub::{BookMeta, write_epub};
