use std::fmt;

use thiserror::Error;

/// A vehicle parameter value with its resolved wire type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

/// The wire type a parameter name resolves to, before parsing the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Int => f.write_str("int"),
            ParamType::Float => f.write_str("float"),
        }
    }
}

#[derive(Debug, Error)]
#[error("value '{raw}' for parameter '{name}' does not parse as {expected}")]
pub struct ParamParseError {
    pub name: String,
    pub raw: String,
    pub expected: ParamType,
}

/// Names with a known wire type. Anything else falls back to the syntactic
/// rule in [`classify`].
const PARAM_TYPES: &[(&str, ParamType)] = &[
    ("COM_RCL_EXCEPT", ParamType::Int),
    ("GF_ACTION", ParamType::Int),
    ("GF_MAX_HOR_DIST", ParamType::Float),
    ("GF_MAX_VER_DIST", ParamType::Float),
];

/// Resolves the wire type for a parameter.
///
/// Names in the fixed table always get the table's type. For unknown names
/// the raw value decides: a literal decimal point means float, anything
/// else means int. The rule is deliberately that naive — exponent forms
/// like `1e5` carry no dot and classify as int, which then fails to parse.
pub fn classify(name: &str, raw: &str) -> ParamType {
    for (known, ty) in PARAM_TYPES {
        if *known == name {
            return *ty;
        }
    }
    if raw.contains('.') {
        ParamType::Float
    } else {
        ParamType::Int
    }
}

/// Parses a raw parameter value into its resolved type.
pub fn parse_param_value(name: &str, raw: &str) -> Result<ParamValue, ParamParseError> {
    let expected = classify(name, raw);
    let parsed = match expected {
        ParamType::Int => raw.trim().parse::<i64>().map(ParamValue::Int).ok(),
        ParamType::Float => raw.trim().parse::<f64>().map(ParamValue::Float).ok(),
    };
    parsed.ok_or_else(|| ParamParseError {
        name: name.to_string(),
        raw: raw.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_wins_over_value_shape() {
        // GF_MAX_HOR_DIST is a float even when the raw value has no dot.
        assert_eq!(
            parse_param_value("GF_MAX_HOR_DIST", "3000").unwrap(),
            ParamValue::Float(3000.0)
        );
        assert_eq!(
            parse_param_value("COM_RCL_EXCEPT", "7").unwrap(),
            ParamValue::Int(7)
        );
    }

    #[test]
    fn unknown_name_classifies_by_decimal_point() {
        assert_eq!(
            parse_param_value("MPC_XY_CRUISE", "8.5").unwrap(),
            ParamValue::Float(8.5)
        );
        assert_eq!(
            parse_param_value("MAV_SYS_ID", "4").unwrap(),
            ParamValue::Int(4)
        );
    }

    #[test]
    fn classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify("GF_ACTION", "2.5"), ParamType::Int);
            assert_eq!(classify("SOME_NEW_PARAM", "2.5"), ParamType::Float);
            assert_eq!(classify("SOME_NEW_PARAM", "25"), ParamType::Int);
        }
    }

    #[test]
    fn exponent_without_dot_classifies_as_int_and_fails() {
        let err = parse_param_value("SOME_NEW_PARAM", "1e5").unwrap_err();
        assert_eq!(err.expected, ParamType::Int);
    }

    #[test]
    fn table_entry_with_garbage_value_fails_as_table_type() {
        let err = parse_param_value("GF_ACTION", "three").unwrap_err();
        assert_eq!(err.expected, ParamType::Int);
    }
}
