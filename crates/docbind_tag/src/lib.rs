//! # DocBind Tag
//!
//! Tokenizer for DocBind ODM annotation strings.
//!
//! An annotation string is a semicolon-separated list of definitions:
//!
//! ```text
//! definition (';' definition)*
//! definition := name '(' (param (',' param)*)? ')'
//! param      := key ('=' value)?
//! ```
//!
//! The tokenizer is whitespace-insensitive, definition names are
//! case-insensitive (normalized to lowercase), parameter keys are
//! preserved verbatim and values are case-sensitive. Parentheses may be
//! omitted for parameterless definitions.
//!
//! ## Usage
//!
//! ```
//! use docbind_tag::Parser;
//!
//! let defs = Parser::new("referenceMany(targetDocument=books, cascade=persist)")
//!     .parse()
//!     .unwrap();
//! assert_eq!(defs[0].name, "referencemany");
//! assert_eq!(defs[0].params[0].key, "targetDocument");
//! assert_eq!(defs[0].params[0].value, "books");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod parser;

pub use error::{TagError, TagResult};
pub use parser::{parse, Definition, Param, Parser};
