//! `interpol_core` is the engine behind the [interpol](https://github.com/interpol-rs/interpol) filter. It scans a character stream, recognises configurable delimiter pairs such as `${ }` or `@ @`, replaces each enclosed expression with a value from a layered set of value sources, and passes every other character through unchanged.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Raw text (any std::io::Read)
//!   → CharSource (UTF-8 decoding, mark/reset)
//!   → BoundedReader (caps speculative lookahead)
//!   → InterpolatingReader (escape, longest-match begin, end-token scan)
//!   → Interpolator (value-source chain, recursion interception, post processing)
//!   → Filtered text (std::io::Read / Iterator<Item = char>)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `interpol.toml`, including delimiters, properties, filter files and the project model.
//! - [`properties`]: `.properties` parsing and iterative `${key}` resolution with cycle detection.
//! - [`model`]: Project model documents (JSON, TOML, YAML) exposed through prefixed dotted paths.
//!
//! ## Key Types
//!
//! - [`InterpolatingReader`]: The streaming filter.
//! - [`FilterOptions`]: Delimiters, escape string and line handling.
//! - [`Interpolator`]: An ordered chain of [`ValueSource`]s plus post processors.
//! - [`DelimiterSet`]: Parsed delimiter specifications with longest-match selection.
//! - [`RecursionInterceptor`]: Detects expressions that expand into themselves.
//! - [`PropertyResolver`]: Resolves placeholders inside property tables.
//!
//! ## Quick Start
//!
//! ```rust
//! use interpol_core::FilterOptions;
//! use interpol_core::Interpolator;
//! use interpol_core::MapValueSource;
//! use interpol_core::filter_str;
//!
//! let source: MapValueSource = [("name", "world")].into_iter().collect();
//! let interpolator = Interpolator::new().with_value_source(source);
//! let output = filter_str("hello ${name}", &FilterOptions::default(), interpolator).unwrap();
//!
//! assert_eq!(output, "hello world");
//! ```

pub use bounded::*;
pub use config::*;
pub use delimiter::*;
pub use error::*;
pub use filter::*;
pub use interpolator::*;
pub use post_processor::*;
pub use properties::*;
pub use recursion::*;
pub use source::*;
pub use value_source::*;

mod bounded;
pub mod config;
mod delimiter;
#[allow(unused_assignments)]
mod error;
mod filter;
mod interpolator;
pub mod model;
mod post_processor;
pub mod properties;
mod recursion;
mod source;
mod value_source;

#[cfg(test)]
mod __fixtures;
