pub mod app;
pub mod cli;
pub mod config;
pub mod model;
pub mod richtext;
pub mod storage;
pub mod store;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{Note, NoteId};
pub use richtext::{RichText, TextAttributes};
pub use store::{NoteStore, StoreError};
