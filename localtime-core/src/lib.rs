//! # localtime-core
//!
//! Core library for localtime - renders server-supplied UTC timestamps as
//! local, human-readable text.
//!
//! This library provides:
//! - Pure formatting of instants as relative phrases or long calendar dates
//! - Bind passes over documents holding `<time data-local-time>` elements
//! - An HTML document model for running bind passes over raw markup
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Markup contract
//!
//! ```html
//! <time datetime="2024-01-01T00:00:00Z" data-local-time="relative">2024-01-01T00:00:00Z</time>
//! <time datetime="2024-01-01T00:00:00Z" data-local-time="absolute-date">2024-01-01T00:00:00Z</time>
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use localtime_core::{Binder, FixedClock, HtmlDocument, TimeFormatter, Trigger};
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 1, 1, 1).unwrap();
//! let binder = Binder::with_clock(TimeFormatter::default(), FixedClock(now));
//!
//! let mut doc = HtmlDocument::parse(
//!     r#"<time datetime="2024-01-01T00:00:00Z" data-local-time="relative">raw</time>"#,
//! );
//! let report = binder.handle(Trigger::DocumentLoaded, &mut doc);
//!
//! assert!(report.is_clean());
//! assert!(doc.to_html().contains(">1 hour ago<"));
//! ```

// Re-export commonly used items at the crate root
pub use binder::{
    BindReport, Binder, Clock, Diagnostic, DiagnosticKind, FixedClock, SystemClock, TimeDocument,
    TimeElement, Trigger,
};
pub use config::Config;
pub use error::{Error, Result};
pub use format::{format, parse_timestamp, DisplayZone, Mode, TimeFormatter};
pub use locale::LocaleTag;
pub use markup::HtmlDocument;

// Public modules
pub mod binder;
pub mod config;
pub mod error;
pub mod files;
pub mod format;
pub mod locale;
pub mod logging;
pub mod markup;
