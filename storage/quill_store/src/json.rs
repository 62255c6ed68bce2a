//! JSON encodings for the signature and enumerator columns.
//!
//! Signatures are arrays of `{"n": name, "tn": typeName, "tr": traits?}`
//! objects; the `tr` member is omitted for traitless parameters. Enumerator
//! maps are objects of `{"name": "value"}` with `null` for enumerators
//! without an explicit value. Both encodings are compared byte-for-byte
//! during synchronization, so they must be deterministic: parameters keep
//! their declaration order, enumerators are keyed (and therefore sorted) by
//! name.

use serde::{Deserialize, Serialize};

use crate::package::{EnumeratorDeclaration, ParameterDeclaration};
use crate::traits::PropertyDeclarationTraits;

#[derive(Serialize, Deserialize)]
struct SignatureParameter {
    n: String,
    tn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tr: Option<u32>,
}

/// Encode a parameter list as a signature string.
pub(crate) fn create_signature(parameters: &[ParameterDeclaration]) -> String {
    let parameters: Vec<SignatureParameter> = parameters
        .iter()
        .map(|parameter| SignatureParameter {
            n: parameter.name.clone(),
            tn: parameter.type_name.clone(),
            tr: if parameter.traits.is_empty() {
                None
            } else {
                Some(parameter.traits.bits())
            },
        })
        .collect();

    serde_json::to_string(&parameters).unwrap_or_else(|_| "[]".to_owned())
}

/// Decode a signature string back into a parameter list.
pub(crate) fn parse_signature(signature: &str) -> Vec<ParameterDeclaration> {
    let parameters: Vec<SignatureParameter> = serde_json::from_str(signature).unwrap_or_default();

    parameters
        .into_iter()
        .map(|parameter| ParameterDeclaration {
            name: parameter.n,
            type_name: parameter.tn,
            traits: parameter
                .tr
                .map(PropertyDeclarationTraits::from_bits_truncate)
                .unwrap_or_default(),
        })
        .collect()
}

/// Encode enumerators as a `{"name": "value" | null}` object.
pub(crate) fn create_enumerators(enumerators: &[EnumeratorDeclaration]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = enumerators
        .iter()
        .map(|enumerator| {
            let value = match enumerator.value {
                Some(value) => serde_json::Value::String(value.to_string()),
                None => serde_json::Value::Null,
            };
            (enumerator.name.clone(), value)
        })
        .collect();

    serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_owned())
}

/// Decode an enumerator object back into declarations, sorted by name.
pub(crate) fn parse_enumerators(enumerators: &str) -> Vec<EnumeratorDeclaration> {
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(enumerators).unwrap_or_default();

    map.into_iter()
        .map(|(name, value)| EnumeratorDeclaration {
            name,
            value: match value {
                serde_json::Value::String(text) => text.parse().ok(),
                serde_json::Value::Number(number) => number.as_i64(),
                _ => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parameter(name: &str, type_name: &str) -> ParameterDeclaration {
        ParameterDeclaration {
            name: name.to_owned(),
            type_name: type_name.to_owned(),
            traits: PropertyDeclarationTraits::empty(),
        }
    }

    #[test]
    fn traitless_parameters_omit_the_traits_member() {
        let signature = create_signature(&[parameter("x", "double")]);

        assert_eq!(signature, r#"[{"n":"x","tn":"double"}]"#);
    }

    #[test]
    fn parameter_traits_are_encoded_as_raw_bits() {
        let parameters = [ParameterDeclaration {
            traits: PropertyDeclarationTraits::IS_LIST,
            ..parameter("items", "Item")
        }];

        let signature = create_signature(&parameters);

        assert_eq!(signature, r#"[{"n":"items","tn":"Item","tr":4}]"#);
        assert_eq!(parse_signature(&signature), parameters);
    }

    #[test]
    fn signatures_round_trip() {
        let parameters = [parameter("x", "double"), parameter("y", "double")];

        assert_eq!(parse_signature(&create_signature(&parameters)), parameters);
    }

    #[test]
    fn enumerators_encode_missing_values_as_null() {
        let enumerators = [
            EnumeratorDeclaration {
                name: "AlignLeft".to_owned(),
                value: Some(1),
            },
            EnumeratorDeclaration {
                name: "AlignRight".to_owned(),
                value: None,
            },
        ];

        let encoded = create_enumerators(&enumerators);

        assert_eq!(encoded, r#"{"AlignLeft":"1","AlignRight":null}"#);
        assert_eq!(parse_enumerators(&encoded), enumerators);
    }

    #[test]
    fn enumerators_are_keyed_by_name() {
        let out_of_order = [
            EnumeratorDeclaration {
                name: "B".to_owned(),
                value: Some(2),
            },
            EnumeratorDeclaration {
                name: "A".to_owned(),
                value: Some(1),
            },
        ];

        // The object encoding sorts by key, making comparison deterministic.
        assert_eq!(create_enumerators(&out_of_order), r#"{"A":"1","B":"2"}"#);
    }
}
