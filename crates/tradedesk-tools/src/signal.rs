//! Normalization of candlestick pattern signals.
//!
//! Pattern endpoints answer with `100` (bullish), `-100` (bearish) or `0`
//! (not found), either as a single `value` or, for multi-result queries, as
//! a list of values. These helpers turn that into readable labels while
//! keeping the raw numbers alongside.

use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSignal {
    Bullish,
    Bearish,
    Absent,
}

impl PatternSignal {
    pub fn from_raw(value: f64) -> Self {
        if value > 0.0 {
            PatternSignal::Bullish
        } else if value < 0.0 {
            PatternSignal::Bearish
        } else {
            PatternSignal::Absent
        }
    }
}

/// Human-readable wording for one pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternLabels {
    pub bullish: &'static str,
    pub bearish: &'static str,
    pub absent: &'static str,
}

impl PatternLabels {
    pub fn label(&self, signal: PatternSignal) -> &'static str {
        match signal {
            PatternSignal::Bullish => self.bullish,
            PatternSignal::Bearish => self.bearish,
            PatternSignal::Absent => self.absent,
        }
    }
}

pub const ENGULFING: PatternLabels = PatternLabels {
    bullish: "Bullish Engulfing",
    bearish: "Bearish Engulfing",
    absent: "No Engulfing Pattern detected",
};

pub const THREE_WHITE_SOLDIERS: PatternLabels = PatternLabels {
    bullish: "Three Advancing White Soldiers pattern found",
    bearish: "Bearish variation of Three White Soldiers found",
    absent: "No Three White Soldiers pattern detected",
};

pub const MORNING_STAR: PatternLabels = PatternLabels {
    bullish: "Morning Star pattern found",
    bearish: "Bearish variation of Morning Star found",
    absent: "No Morning Star pattern detected",
};

/// A classified pattern reading: label(s) plus the raw signal(s).
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub pattern_type: serde_json::Value,
    pub value: serde_json::Value,
}

/// Classify a pattern endpoint payload.
///
/// Accepted shapes: `{"value": 100}`, `{"value": [0, 100]}` and
/// `[{"value": 0}, {"value": -100}]`. The raw values come back untouched.
pub fn classify(
    endpoint: &str,
    payload: &serde_json::Value,
    labels: &PatternLabels,
) -> Result<Classified, ToolError> {
    let malformed = |reason: &str| ToolError::Payload {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let signal_of = |v: &serde_json::Value, reason: &str| {
        v.as_f64()
            .map(PatternSignal::from_raw)
            .ok_or_else(|| malformed(reason))
    };

    match payload {
        serde_json::Value::Object(obj) => match obj.get("value") {
            Some(serde_json::Value::Array(values)) => {
                let names = values
                    .iter()
                    .map(|v| Ok(labels.label(signal_of(v, "non-numeric signal")?)))
                    .collect::<Result<Vec<_>, ToolError>>()?;
                Ok(Classified {
                    pattern_type: serde_json::json!(names),
                    value: serde_json::Value::Array(values.clone()),
                })
            }
            Some(v) => {
                let signal = signal_of(v, "non-numeric signal")?;
                Ok(Classified {
                    pattern_type: serde_json::json!(labels.label(signal)),
                    value: v.clone(),
                })
            }
            None => Err(malformed("missing `value`")),
        },
        // Each entry keeps its own fields (timestamps included) and gains a label.
        serde_json::Value::Array(items) => {
            let mut pattern_types = Vec::with_capacity(items.len());
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                let signal = item
                    .get("value")
                    .ok_or_else(|| malformed("list entry without numeric `value`"))
                    .and_then(|v| signal_of(v, "list entry without numeric `value`"))?;
                let label = labels.label(signal);
                let mut entry = item.clone();
                if let Some(obj) = entry.as_object_mut() {
                    obj.insert("pattern_type".to_string(), serde_json::json!(label));
                }
                pattern_types.push(label);
                entries.push(entry);
            }
            Ok(Classified {
                pattern_type: serde_json::json!(pattern_types),
                value: serde_json::Value::Array(entries),
            })
        }
        _ => Err(malformed("expected object or list")),
    }
}
