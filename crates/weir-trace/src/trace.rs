//! Ordered lists of timed value changes.

use crate::error::TraceError;

/// One value change, `delta` seconds after the previous point (or after the
/// trace start for the first point).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DatedValue {
    /// Offset from the previous point.
    pub delta: f64,
    /// Value taken from that moment on.
    pub value: f64,
}

impl DatedValue {
    /// Build a point.
    pub fn new(delta: f64, value: f64) -> Self {
        Self { delta, value }
    }
}

/// An ordered, optionally periodic sequence of value changes.
///
/// When periodic, occurrence `k` of a point lands at
/// `start + k × period + offset`, where `offset` is the point's cumulative
/// delta. Dates are computed from the start each time, never accumulated
/// across loops.
#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    points: Vec<DatedValue>,
    offsets: Vec<f64>,
    period: Option<f64>,
}

impl Trace {
    /// Build a one-shot trace from relative points.
    pub fn new(points: Vec<DatedValue>) -> Result<Self, TraceError> {
        let mut offsets = Vec::with_capacity(points.len());
        let mut at = 0.0;
        for (index, point) in points.iter().enumerate() {
            if !point.delta.is_finite() || point.delta < 0.0 {
                return Err(TraceError::InvalidDelta {
                    index,
                    delta: point.delta,
                });
            }
            at += point.delta;
            offsets.push(at);
        }
        Ok(Self {
            points,
            offsets,
            period: None,
        })
    }

    /// Build a one-shot trace from `(date, value)` pairs with dates relative
    /// to the trace start.
    pub fn from_dates(pairs: &[(f64, f64)]) -> Result<Self, TraceError> {
        let mut points = Vec::with_capacity(pairs.len());
        let mut previous = 0.0;
        for (index, &(date, value)) in pairs.iter().enumerate() {
            if !date.is_finite() || date < previous {
                return Err(TraceError::NonMonotonicDate {
                    index,
                    previous,
                    date,
                });
            }
            points.push(DatedValue::new(date - previous, value));
            previous = date;
        }
        let mut trace = Self::new(points)?;
        // Keep the caller's dates exactly rather than re-summing deltas.
        trace.offsets = pairs.iter().map(|&(date, _)| date).collect();
        Ok(trace)
    }

    /// A single change to `value` at the trace start.
    pub fn constant(value: f64) -> Self {
        Self {
            points: vec![DatedValue::new(0.0, value)],
            offsets: vec![0.0],
            period: None,
        }
    }

    /// Make the trace repeat every `period` seconds.
    pub fn with_period(mut self, period: f64) -> Result<Self, TraceError> {
        let span = self.span();
        if !period.is_finite() || period <= 0.0 || period < span {
            return Err(TraceError::InvalidPeriod { period, span });
        }
        self.period = Some(period);
        Ok(self)
    }

    /// The points, in order.
    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    /// Offset of point `index` from the trace start.
    pub fn offset(&self, index: usize) -> Option<f64> {
        self.offsets.get(index).copied()
    }

    /// Repetition period, if any.
    pub fn period(&self) -> Option<f64> {
        self.period
    }

    /// Offset of the last point from the trace start.
    pub fn span(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the trace has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_accumulate_deltas() {
        let trace = Trace::new(vec![
            DatedValue::new(1.0, 0.5),
            DatedValue::new(2.0, 1.0),
            DatedValue::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(trace.offset(0), Some(1.0));
        assert_eq!(trace.offset(1), Some(3.0));
        assert_eq!(trace.offset(2), Some(3.0));
        assert_eq!(trace.span(), 3.0);
        assert_eq!(trace.offset(3), None);
    }

    #[test]
    fn negative_delta_is_rejected() {
        let err = Trace::new(vec![DatedValue::new(-1.0, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            TraceError::InvalidDelta {
                index: 0,
                delta: -1.0
            }
        );
    }

    #[test]
    fn dates_must_not_go_backwards() {
        assert!(matches!(
            Trace::from_dates(&[(0.0, 1.0), (5.0, 0.0), (4.0, 1.0)]),
            Err(TraceError::NonMonotonicDate { index: 2, .. })
        ));
        let ok = Trace::from_dates(&[(0.0, 1.0), (0.1, 0.0), (0.3, 1.0)]).unwrap();
        assert_eq!(ok.offset(2), Some(0.3));
    }

    #[test]
    fn period_must_cover_span() {
        let trace = Trace::from_dates(&[(0.0, 1.0), (5.0, 0.0)]).unwrap();
        assert!(trace.clone().with_period(4.0).is_err());
        assert!(trace.clone().with_period(0.0).is_err());
        assert_eq!(trace.with_period(10.0).unwrap().period(), Some(10.0));
        assert!(Trace::constant(1.0).with_period(0.0).is_err());
    }
}
