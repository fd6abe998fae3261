//! Pipeline stages for one article.
//!
//! Each submodule implements exactly one step and is usable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ fetch ──▶ extract ──▶ download ──▶ assemble
//! (ids)    (JSON)    (page refs)  (TIFFs)      (DjVu)
//! ```
//!
//! 1. [`input`]: read the identifier list
//! 2. [`fetch`]: authenticated GET of an article's entity list
//! 3. [`extract`]: pick the TIFF variant of every page record
//! 4. [`download`]: write each page image into the article workspace
//! 5. [`assemble`]: run the encoder and merger over the sorted pages

pub mod assemble;
pub mod download;
pub mod extract;
pub mod fetch;
pub mod input;
