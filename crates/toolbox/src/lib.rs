#![forbid(unsafe_code)]

mod cache;
mod catalog;
mod config;
mod editor;
mod error;
mod list;

pub use cache::{CategoryCache, TiedCategory};
pub use catalog::Catalog;
pub use config::{Config, ConfigError};
pub use editor::{CategoryAction, CategoryEditor, EditorError, EditorRules};
pub use error::CacheError;
pub use list::{CategoryList, ListItem};
