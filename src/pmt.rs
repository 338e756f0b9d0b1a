//! Tagged values for the flowgraph message-handler API.
//!
//! The block-control REST API takes handler arguments as externally-tagged
//! JSON, e.g. `{"U32": 1}` or `{"VecPmt": [{"F64": 2450000000.0}, {"U32": 0}]}`.
//! Serde's default enum representation produces exactly that encoding, so this
//! type only needs to enumerate the variants the testbed actually uses.

use serde::{Deserialize, Serialize};

/// A polymorphic message value, encoded as externally-tagged JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pmt {
    /// Empty argument; used when only the handler's return value matters.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// 32-bit unsigned integer (selector indices, device channels).
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float (frequencies, gains, sample rates).
    F64(f64),
    /// String value.
    String(String),
    /// Nested values; used for handlers taking multiple arguments,
    /// e.g. `(frequency, device channel)`.
    VecPmt(Vec<Pmt>),
}

impl Pmt {
    /// Two-element `VecPmt` of `(F64 value, U32 channel)`, the argument shape
    /// of the Soapy center-frequency and frequency-offset handlers.
    pub fn f64_with_channel(value: f64, channel: u32) -> Self {
        Pmt::VecPmt(vec![Pmt::F64(value), Pmt::U32(channel)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_json_shape() {
        assert_eq!(serde_json::to_string(&Pmt::U32(1)).unwrap(), r#"{"U32":1}"#);
        assert_eq!(
            serde_json::to_string(&Pmt::F64(60.0)).unwrap(),
            r#"{"F64":60.0}"#
        );
        assert_eq!(serde_json::to_string(&Pmt::Null).unwrap(), r#""Null""#);
    }

    #[test]
    fn vec_pmt_json_shape() {
        let p = Pmt::f64_with_channel(2.45e9, 0);
        assert_eq!(
            serde_json::to_string(&p).unwrap(),
            r#"{"VecPmt":[{"F64":2450000000.0},{"U32":0}]}"#
        );
    }

    #[test]
    fn json_roundtrip() {
        let p = Pmt::VecPmt(vec![Pmt::F64(-4e6), Pmt::U32(1)]);
        let s = serde_json::to_string(&p).unwrap();
        let q: Pmt = serde_json::from_str(&s).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn parses_api_style_input() {
        let p: Pmt = serde_json::from_str(r#"{ "U32": 123 }"#).unwrap();
        assert_eq!(p, Pmt::U32(123));
    }
}
