pub mod audio;
pub mod columns;
pub mod error;
pub mod export;
pub mod item;
pub mod loader;
pub mod newline;
pub mod normalizer;
pub mod parser;
pub mod remote;
pub mod session;
pub mod settings;
pub mod spreadsheet;
