//! Bind passes: find every opted-in `<time>` element and rewrite its text.
//!
//! A pass is a full re-scan of the document. It runs once when the document
//! is first loaded and again after every content swap; both triggers go
//! through [`Binder::bind_all`]. Failures are contained per element and
//! reported as [`Diagnostic`]s, never returned as errors.

use crate::format::{parse_timestamp, Mode, TimeFormatter, INVALID_DATE};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Tag name of eligible elements
pub const TIME_TAG: &str = "time";
/// Attribute carrying the machine-readable UTC timestamp
pub const DATETIME_ATTR: &str = "datetime";
/// Opt-in marker attribute; its value selects the [`Mode`]
pub const MODE_ATTR: &str = "data-local-time";

/// An element a bind pass can read from and write to.
pub trait TimeElement {
    /// Attribute value by (lowercase) name, entity-decoded.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Current visible text.
    fn text(&self) -> &str;

    /// Replace the visible text.
    fn set_text(&mut self, text: &str);
}

/// A document holding `<time>` elements.
pub trait TimeDocument {
    type Element: TimeElement;

    /// Elements matching `time[data-local-time]`, in document order.
    fn time_elements(&mut self) -> &mut [Self::Element];
}

/// Source of "now" for a bind pass.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Why a pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Initial document load completed
    DocumentLoaded,
    /// New or updated markup was swapped into the document
    AfterSwap,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::DocumentLoaded => write!(f, "document loaded"),
            Trigger::AfterSwap => write!(f, "after swap"),
        }
    }
}

/// Per-element problem found during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No `datetime` attribute; text left untouched
    MissingTimestamp,
    /// `datetime` does not parse; text set to "Invalid Date"
    UnparseableTimestamp { value: String },
    /// `data-local-time` is not a known mode; text left untouched
    UnrecognizedMode { value: String },
}

/// A diagnostic tied to the element's position among matched elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub index: usize,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::MissingTimestamp => write!(
                f,
                "element #{}: missing datetime attribute on time[data-local-time] element",
                self.index
            ),
            DiagnosticKind::UnparseableTimestamp { value } => write!(
                f,
                "element #{}: datetime attribute {:?} is not a valid date",
                self.index, value
            ),
            DiagnosticKind::UnrecognizedMode { value } => write!(
                f,
                "element #{}: unrecognized data-local-time value {:?}, local time cannot be displayed",
                self.index, value
            ),
        }
    }
}

/// Outcome of one bind pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindReport {
    /// Elements matching the selector
    pub matched: usize,
    /// Elements whose text was written
    pub updated: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl BindReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Runs bind passes with one formatter and clock.
#[derive(Debug, Clone)]
pub struct Binder<C = SystemClock> {
    formatter: TimeFormatter,
    clock: C,
}

impl Binder<SystemClock> {
    /// Binder sampling the wall clock at the start of each pass
    pub fn new(formatter: TimeFormatter) -> Self {
        Self::with_clock(formatter, SystemClock)
    }
}

impl<C: Clock> Binder<C> {
    pub fn with_clock(formatter: TimeFormatter, clock: C) -> Self {
        Self { formatter, clock }
    }

    pub fn formatter(&self) -> &TimeFormatter {
        &self.formatter
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Entry point for both lifecycle triggers.
    pub fn handle<D: TimeDocument>(&self, trigger: Trigger, document: &mut D) -> BindReport {
        tracing::debug!(%trigger, "Bind pass triggered");
        self.bind_all(document)
    }

    /// Run a pass with `now` taken from the clock.
    pub fn bind_all<D: TimeDocument>(&self, document: &mut D) -> BindReport {
        self.bind_all_at(document, self.clock.now())
    }

    /// Run a pass against an explicit `now`.
    pub fn bind_all_at<D: TimeDocument>(&self, document: &mut D, now: DateTime<Utc>) -> BindReport {
        let elements = document.time_elements();
        let mut report = BindReport {
            matched: elements.len(),
            ..Default::default()
        };

        for (index, element) in elements.iter_mut().enumerate() {
            match self.bind_element(element, now) {
                ElementOutcome::Updated => report.updated += 1,
                ElementOutcome::Fallback(kind) => {
                    report.updated += 1;
                    let diagnostic = Diagnostic { index, kind };
                    tracing::warn!(index, "{}", diagnostic);
                    report.diagnostics.push(diagnostic);
                }
                ElementOutcome::Skipped(kind) => {
                    let diagnostic = Diagnostic { index, kind };
                    tracing::error!(index, "{}", diagnostic);
                    report.diagnostics.push(diagnostic);
                }
            }
        }

        tracing::debug!(
            matched = report.matched,
            updated = report.updated,
            diagnostics = report.diagnostics.len(),
            "Bind pass complete"
        );
        report
    }

    fn bind_element<E: TimeElement>(&self, element: &mut E, now: DateTime<Utc>) -> ElementOutcome {
        let Some(raw) = element.attribute(DATETIME_ATTR).map(str::to_string) else {
            return ElementOutcome::Skipped(DiagnosticKind::MissingTimestamp);
        };

        let mode_value = element.attribute(MODE_ATTR).unwrap_or_default();
        let mode = match mode_value.parse::<Mode>() {
            Ok(mode) => mode,
            Err(_) => {
                return ElementOutcome::Skipped(DiagnosticKind::UnrecognizedMode {
                    value: mode_value.to_string(),
                })
            }
        };

        match parse_timestamp(&raw) {
            Ok(target) => {
                element.set_text(&self.formatter.format(target, mode, now));
                ElementOutcome::Updated
            }
            Err(_) => {
                element.set_text(INVALID_DATE);
                ElementOutcome::Fallback(DiagnosticKind::UnparseableTimestamp { value: raw })
            }
        }
    }
}

/// What a pass did to one element.
enum ElementOutcome {
    /// Text replaced with the formatted time
    Updated,
    /// Text replaced with the fallback, with a diagnostic
    Fallback(DiagnosticKind),
    /// Text left untouched, with a diagnostic
    Skipped(DiagnosticKind),
}
