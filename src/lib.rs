//! Romscope Library
//!
//! Offline identification of ROM images, save files, icon files, music
//! rips and executables. Detection looks at file content first and the
//! extension second; a recognized file exposes typed fields grouped in
//! tabs, metadata properties, and decoded internal images.
//!
//! # Features
//!
//! - **Content-first Detection**: magic numbers, then generic headers, then footers
//! - **Typed Fields**: strings, bitfields, lists, dates, age ratings, dimensions
//! - **Internal Images**: icons and banners decoded to RGBA, cached per parser
//! - **Read-Only**: source files are never written
//!
//! # Example
//!
//! ```no_run
//! use romscope::{RomDataAttrs, RomDataFactory};
//!
//! fn main() -> anyhow::Result<()> {
//!     let Some(rom) = RomDataFactory::create_from_path("game.gba", RomDataAttrs::NONE)? else {
//!         println!("unsupported format");
//!         return Ok(());
//!     };
//!
//!     println!("{}", rom.class_name());
//!     for field in rom.fields().iter() {
//!         println!("{}: {:?}", field.name, field.as_str());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod file;
pub mod formats;
pub mod output;
pub mod preview;
pub mod romdata;
pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use factory::RomDataFactory;
pub use file::{MemFile, RpFile, RpFileStd, SharedFile};
pub use output::Report;
pub use preview::Thumbnailer;
pub use romdata::{FileType, ImageType, RomData, RomDataAttrs, RomFields, RomMetaData};
