//! Text trace loader.
//!
//! One point per line as `date value`, dates relative to the trace start and
//! non-decreasing. An optional `PERIODICITY p` line makes the trace repeat.
//! Blank lines and lines starting with `#` are ignored.
//!
//! ```text
//! PERIODICITY 12.0
//! 0.0 1.0
//! 11.0 0.5
//! ```

use crate::error::TraceError;
use crate::trace::Trace;
use std::str::FromStr;

fn number(token: &str, line: usize, what: &str) -> Result<f64, TraceError> {
    token.parse::<f64>().map_err(|_| TraceError::Parse {
        line,
        reason: format!("{what} `{token}` is not a number"),
    })
}

/// Parse the text encoding described in the [module docs](self).
pub fn parse_trace(text: &str) -> Result<Trace, TraceError> {
    let mut period = None;
    let mut pairs: Vec<(f64, f64)> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = content.split_whitespace().collect();
        match tokens.as_slice() {
            [keyword, value] if keyword.eq_ignore_ascii_case("PERIODICITY") => {
                if period.is_some() {
                    return Err(TraceError::Parse {
                        line,
                        reason: "duplicate PERIODICITY".to_string(),
                    });
                }
                period = Some(number(value, line, "period")?);
            }
            [date, value] => {
                let date = number(date, line, "date")?;
                let value = number(value, line, "value")?;
                if let Some(&(previous, _)) = pairs.last() {
                    if date < previous {
                        return Err(TraceError::Parse {
                            line,
                            reason: format!("date {date} precedes {previous}"),
                        });
                    }
                }
                pairs.push((date, value));
            }
            _ => {
                return Err(TraceError::Parse {
                    line,
                    reason: format!("expected `date value`, got `{content}`"),
                })
            }
        }
    }

    let trace = Trace::from_dates(&pairs)?;
    match period {
        Some(period) => trace.with_period(period),
        None => Ok(trace),
    }
}

impl FromStr for Trace {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_trace(s)
    }
}
