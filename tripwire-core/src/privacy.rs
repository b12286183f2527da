//! Privacy Labels and the Redaction Gate
//!
//! Every sensor carries a [`Privacy`] label. Before a value reaches a log
//! line, a print or any other display sink, it passes through the
//! [`PrivacyGate`]:
//!
//! - `Public` values are rendered unchanged.
//! - `Private` values are replaced by a fixed marker (`***` by default), and
//!   the first exposure attempt per source logs a warning. Later attempts on
//!   the same source stay silent.
//!
//! Derived sources (fusions) are private when any contributor is private.
//! That is decided once when the derived sensor is built, see
//! [`Privacy::any_private`].
//!
//! ```rust
//! use tripwire_core::privacy::{Privacy, PrivacyGate};
//!
//! let gate = PrivacyGate::default();
//! let shown = gate.format_for_display("presence", Privacy::Private, 1.0);
//! assert_eq!(shown.to_string(), "***");
//! assert!(gate.has_warned("presence"));
//! ```

use core::fmt;
use std::collections::HashSet;

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants::REDACTION_MARKER;
use crate::sensor::Sensor;

/// Disclosure label of a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    pub fn is_private(self) -> bool {
        self == Privacy::Private
    }

    /// `Private` if any label is private, `Public` otherwise (including empty)
    pub fn any_private<I: IntoIterator<Item = Privacy>>(labels: I) -> Privacy {
        if labels.into_iter().any(Privacy::is_private) {
            Privacy::Private
        } else {
            Privacy::Public
        }
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Privacy::Public => "public",
            Privacy::Private => "private",
        })
    }
}

/// A value ready for display, either raw or redacted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayValue<'a> {
    Value(f64),
    Redacted(&'a str),
}

impl DisplayValue<'_> {
    pub fn is_redacted(&self) -> bool {
        matches!(self, DisplayValue::Redacted(_))
    }
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Value(v) => fmt::Display::fmt(v, f),
            DisplayValue::Redacted(marker) => f.write_str(marker),
        }
    }
}

/// Redaction gate with a once-per-source warning set
#[derive(Debug)]
pub struct PrivacyGate {
    marker: String,
    warned: Mutex<HashSet<String>>,
}

impl Default for PrivacyGate {
    fn default() -> Self {
        Self::new(REDACTION_MARKER)
    }
}

impl PrivacyGate {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Renders `raw` for display according to `label`
    pub fn format_for_display(&self, source: &str, label: Privacy, raw: f64) -> DisplayValue<'_> {
        match label {
            Privacy::Public => DisplayValue::Value(raw),
            Privacy::Private => {
                if self.warned.lock().insert(source.to_string()) {
                    warn!("value of private source {source:?} redacted from display");
                }
                DisplayValue::Redacted(&self.marker)
            }
        }
    }

    /// [`format_for_display`](Self::format_for_display) keyed by a sensor
    pub fn format_sensor(&self, sensor: &Sensor, raw: f64) -> DisplayValue<'_> {
        self.format_for_display(sensor.name(), sensor.privacy(), raw)
    }

    pub fn has_warned(&self, source: &str) -> bool {
        self.warned.lock().contains(source)
    }

    /// Number of distinct sources that triggered a warning
    pub fn warned_count(&self) -> usize {
        self.warned.lock().len()
    }
}
