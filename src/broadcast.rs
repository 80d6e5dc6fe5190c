//! Multichannel argument expansion.
//!
//! Every object constructor and setter accepts each parameter either as a
//! single value or as a sequence. Before anything reaches the engine the
//! parameters are normalized into parallel sequences of one common length,
//! and that length decides how many processing units (channels) the object
//! drives.

/*
Broadcast Rules
===============

  L = max(len(seq) for every sequence argument, upstream hint)
  L = 1 when every argument is a scalar and there is no hint

  scalar      → repeated L times
  seq, len L  → unchanged
  seq, len<L  → cyclic: expanded[i] = seq[i % len]

Example:

  freq  = [100, 200, 300]      → [100, 200, 300]
  phase = 0.0                  → [0.0, 0.0, 0.0]
  mul   = [0.5, 0.25]          → [0.5, 0.25, 0.5]
                                  L = 3

An upstream hint is the number of streams an input object carries. A filter
fed by a 4-channel oscillator gets L >= 4 even if all of its own parameters
are scalars.

An empty sequence has nothing to wrap around, so it is rejected.
*/

use std::fmt;

use crate::{Error, Result};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Str(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Bool(v) => Some(*v as i64),
            Value::Str(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::Float(v) => Some(*v != 0.0),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value or a `TypeMismatch` naming `param`.
    pub fn expect_f32(&self, param: &str) -> Result<f32> {
        self.as_f32().ok_or_else(|| Error::TypeMismatch {
            param: param.to_string(),
            expected: "a number",
        })
    }

    pub fn expect_int(&self, param: &str) -> Result<i64> {
        self.as_int().ok_or_else(|| Error::TypeMismatch {
            param: param.to_string(),
            expected: "an integer",
        })
    }

    pub fn expect_bool(&self, param: &str) -> Result<bool> {
        self.as_bool().ok_or_else(|| Error::TypeMismatch {
            param: param.to_string(),
            expected: "a boolean",
        })
    }

    pub fn expect_str(&self, param: &str) -> Result<&str> {
        self.as_str().ok_or_else(|| Error::TypeMismatch {
            param: param.to_string(),
            expected: "a string",
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// A parameter as given by the caller: one value or a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Scalar(Value),
    Seq(Vec<Value>),
}

impl Arg {
    /// Sequence length, `None` for scalars.
    pub fn seq_len(&self) -> Option<usize> {
        match self {
            Arg::Scalar(_) => None,
            Arg::Seq(values) => Some(values.len()),
        }
    }

    /// Value seen by channel `i`.
    ///
    /// Returns `None` only for an empty sequence.
    pub fn wrap(&self, i: usize) -> Option<&Value> {
        match self {
            Arg::Scalar(value) => Some(value),
            Arg::Seq(values) if values.is_empty() => None,
            Arg::Seq(values) => Some(&values[i % values.len()]),
        }
    }

    /// Like [`Arg::wrap`], failing with `EmptyBroadcastInput` for `param`.
    pub fn wrap_named(&self, param: &str, i: usize) -> Result<&Value> {
        self.wrap(i).ok_or_else(|| Error::EmptyBroadcastInput {
            param: param.to_string(),
        })
    }

    /// First value (scalar or head of the sequence).
    pub fn first(&self) -> Option<&Value> {
        self.wrap(0)
    }
}

/// Value seen by channel `i`, see [`Arg::wrap`].
pub fn wrap(arg: &Arg, i: usize) -> Option<&Value> {
    arg.wrap(i)
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v as $conv)
                }
            }

            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Scalar(Value::from(v))
                }
            }

            impl From<Vec<$ty>> for Arg {
                fn from(v: Vec<$ty>) -> Self {
                    Arg::Seq(v.into_iter().map(Value::from).collect())
                }
            }

            impl From<&[$ty]> for Arg {
                fn from(v: &[$ty]) -> Self {
                    Arg::Seq(v.iter().copied().map(Value::from).collect())
                }
            }

            impl<const N: usize> From<[$ty; N]> for Arg {
                fn from(v: [$ty; N]) -> Self {
                    Arg::Seq(v.into_iter().map(Value::from).collect())
                }
            }
        )*
    };
}

impl_value_from!(
    f64 => Float as f64,
    f32 => Float as f64,
    i64 => Int as i64,
    i32 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    usize => Int as i64,
);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Scalar(v)
    }
}

impl From<Vec<Value>> for Arg {
    fn from(v: Vec<Value>) -> Self {
        Arg::Seq(v)
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Scalar(Value::Bool(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Scalar(Value::from(v))
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Scalar(Value::Str(v))
    }
}

impl From<Vec<&str>> for Arg {
    fn from(v: Vec<&str>) -> Self {
        Arg::Seq(v.into_iter().map(Value::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Arg {
    fn from(v: [&str; N]) -> Self {
        Arg::Seq(v.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<bool>> for Arg {
    fn from(v: Vec<bool>) -> Self {
        Arg::Seq(v.into_iter().map(Value::Bool).collect())
    }
}

/// Parallel, equal-length parameter sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    len: usize,
}

/// Expand `params` to a common length.
///
/// `hint` is the stream count of an upstream object, if any. It takes part in
/// the length decision exactly like a sequence argument would.
pub fn broadcast(params: &[(&str, &Arg)], hint: Option<usize>) -> Result<Broadcast> {
    if hint == Some(0) {
        return Err(Error::EmptyBroadcastInput {
            param: "input".to_string(),
        });
    }

    let mut len = hint.unwrap_or(1);
    for (name, arg) in params {
        match arg.seq_len() {
            Some(0) => {
                return Err(Error::EmptyBroadcastInput {
                    param: (*name).to_string(),
                })
            }
            Some(n) => len = len.max(n),
            None => {}
        }
    }

    let columns = params
        .iter()
        .map(|(name, arg)| {
            (0..len)
                .map(|i| arg.wrap_named(name, i).cloned())
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Broadcast {
        names: params.iter().map(|(name, _)| (*name).to_string()).collect(),
        columns,
        len,
    })
}

impl Broadcast {
    /// Common length L (number of channels).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Expanded sequence for the parameter at `index` (declaration order).
    pub fn column(&self, index: usize) -> &[Value] {
        &self.columns[index]
    }

    /// Expanded sequence for `name`.
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| self.columns[index].as_slice())
    }

    /// Value of `name` for `channel`.
    pub fn value(&self, name: &str, channel: usize) -> Result<&Value> {
        self.get(name)
            .and_then(|column| column.get(channel))
            .ok_or_else(|| Error::UnknownParam(name.to_string()))
    }

    pub fn f32(&self, name: &str, channel: usize) -> Result<f32> {
        self.value(name, channel)?.expect_f32(name)
    }

    pub fn int(&self, name: &str, channel: usize) -> Result<i64> {
        self.value(name, channel)?.expect_int(name)
    }

    pub fn bool(&self, name: &str, channel: usize) -> Result<bool> {
        self.value(name, channel)?.expect_bool(name)
    }

    pub fn str(&self, name: &str, channel: usize) -> Result<&str> {
        self.value(name, channel)?.expect_str(name)
    }

    pub fn into_columns(self) -> Vec<Vec<Value>> {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[Value]) -> Vec<f64> {
        values.iter().filter_map(Value::as_f64).collect()
    }

    #[test]
    fn scalars_only_give_one_channel() {
        let freq = Arg::from(440.0);
        let phase = Arg::from(0.0);
        let b = broadcast(&[("freq", &freq), ("phase", &phase)], None).unwrap();

        assert_eq!(b.len(), 1);
        assert_eq!(floats(b.column(0)), vec![440.0]);
    }

    #[test]
    fn scalar_repeats_alongside_sequence() {
        let freq = Arg::from(vec![100, 200, 300]);
        let phase = Arg::from(0.0);
        let b = broadcast(&[("freq", &freq), ("phase", &phase)], None).unwrap();

        assert_eq!(b.len(), 3);
        assert_eq!(floats(b.get("freq").unwrap()), vec![100.0, 200.0, 300.0]);
        assert_eq!(floats(b.get("phase").unwrap()), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn carrier_pair_with_scalar_ratio() {
        let carrier = Arg::from(vec![250.5, 250.0]);
        let ratio = Arg::from(0.2499);
        let b = broadcast(&[("carrier", &carrier), ("ratio", &ratio)], None).unwrap();

        assert_eq!(b.len(), 2);
        assert_eq!(floats(b.get("carrier").unwrap()), vec![250.5, 250.0]);
        assert_eq!(floats(b.get("ratio").unwrap()), vec![0.2499, 0.2499]);
    }

    #[test]
    fn shorter_sequence_wraps_cyclically() {
        let a = Arg::from(vec![1, 2, 3]);
        let b_arg = Arg::from(vec![10, 20]);
        let b = broadcast(&[("a", &a), ("b", &b_arg)], None).unwrap();

        assert_eq!(b.len(), 3);
        assert_eq!(floats(b.get("b").unwrap()), vec![10.0, 20.0, 10.0]);
    }

    #[test]
    fn equal_lengths_pass_through_in_order() {
        let a = Arg::from([1.0, 2.0]);
        let b_arg = Arg::from([3.0, 4.0]);
        let b = broadcast(&[("a", &a), ("b", &b_arg)], None).unwrap();

        assert_eq!(floats(b.column(0)), vec![1.0, 2.0]);
        assert_eq!(floats(b.column(1)), vec![3.0, 4.0]);
    }

    #[test]
    fn hint_extends_length() {
        let freq = Arg::from(1000.0);
        let b = broadcast(&[("freq", &freq)], Some(4)).unwrap();
        assert_eq!(b.len(), 4);

        let freq = Arg::from(vec![100.0, 200.0, 300.0, 400.0, 500.0]);
        let b = broadcast(&[("freq", &freq)], Some(2)).unwrap();
        assert_eq!(b.len(), 5);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let freq = Arg::Seq(Vec::new());
        let err = broadcast(&[("freq", &freq)], None).unwrap_err();
        assert!(matches!(err, Error::EmptyBroadcastInput { ref param } if param == "freq"));
    }

    #[test]
    fn zero_hint_is_rejected() {
        let freq = Arg::from(1.0);
        assert!(matches!(
            broadcast(&[("freq", &freq)], Some(0)),
            Err(Error::EmptyBroadcastInput { .. })
        ));
    }

    #[test]
    fn typed_accessors_report_mismatch() {
        let address = Arg::from(["/a", "/b"]);
        let b = broadcast(&[("address", &address)], None).unwrap();

        assert_eq!(b.str("address", 1).unwrap(), "/b");
        assert!(matches!(
            b.f32("address", 0),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(b.f32("missing", 0), Err(Error::UnknownParam(_))));
    }

    #[test]
    fn wrap_indexes_modulo_length() {
        let arg = Arg::from(vec![1, 2]);
        assert_eq!(wrap(&arg, 5), Some(&Value::Int(2)));
        assert_eq!(wrap(&Arg::from(7), 99), Some(&Value::Int(7)));
        assert_eq!(wrap(&Arg::Seq(vec![]), 0), None);
    }
}
