//! Health-check type validation
//!
//! A Consul health check selects its mechanism by which field is populated:
//! `http`, `tcp`, `ttl` and so on. Exactly one mechanism may be present, and
//! the mechanism decides whether `interval` is mandatory or not allowed.
//!
//! The rules live in two static tables. Adding a new check type is a
//! one-line edit to [`CHECK_TYPE_FIELDS`], or to [`COMPOSITE_CHECK_TYPES`]
//! for a type spelled by several fields together (the alias check).
//!
//! # Example
//!
//! ```rust
//! use consul_config_core::check::{self, CheckSpec};
//! use serde_json::json;
//!
//! let spec: CheckSpec = serde_json::from_value(json!({
//!     "http": "http://localhost/health",
//!     "interval": "10s",
//! })).unwrap();
//!
//! let validated = check::validate(spec.clone()).unwrap();
//! assert_eq!(validated, spec);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Attribute mapping for one health check
pub type CheckSpec = Map<String, Value>;

/// Field holding the polling interval
pub const INTERVAL_FIELD: &str = "interval";

/// Whether a check type needs an `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalRule {
    /// The check polls actively and must say how often
    Required,
    /// The check is passive; an interval makes no sense
    Forbidden,
}

impl fmt::Display for IntervalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalRule::Required => write!(f, "required"),
            IntervalRule::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// Type-indicating fields in reference order, with their interval rule.
pub const CHECK_TYPE_FIELDS: &[(&str, IntervalRule)] = &[
    ("args", IntervalRule::Required),
    ("http", IntervalRule::Required),
    ("tcp", IntervalRule::Required),
    ("udp", IntervalRule::Required),
    ("grpc", IntervalRule::Required),
    ("docker_container_id", IntervalRule::Required),
    ("os_service", IntervalRule::Required),
    ("ttl", IntervalRule::Forbidden),
    ("h2ping", IntervalRule::Required),
    ("alias_node", IntervalRule::Required),
    ("alias_service", IntervalRule::Required),
];

/// A logical check type spelled by several type-indicating fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeCheckType {
    /// Logical type name
    pub name: &'static str,
    /// Member fields, in reference order
    pub fields: &'static [&'static str],
    /// Interval rule for the logical type
    pub interval: IntervalRule,
}

/// Composite check types. Members must appear in [`CHECK_TYPE_FIELDS`].
pub const COMPOSITE_CHECK_TYPES: &[CompositeCheckType] = &[CompositeCheckType {
    name: "alias",
    fields: &["alias_node", "alias_service"],
    interval: IntervalRule::Forbidden,
}];

/// How to treat half of a composite type (a lone `alias_node`)
///
/// `Lenient` accepts the lone field as a single-field check type that
/// requires an interval. `Strict` rejects it as an incomplete composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasMode {
    #[default]
    Lenient,
    Strict,
}

/// The check type a check definition resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckType {
    name: &'static str,
    interval: IntervalRule,
}

impl CheckType {
    /// Logical type name (`http`, `ttl`, `alias`, ...)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Interval rule for this type
    pub fn interval(&self) -> IntervalRule {
        self.interval
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Ways a check can violate the check-type rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckValidationError {
    /// Zero, or more than one, check type present
    #[error(
        "wrong number of check-type fields: expected exactly one of [{}], found [{}]",
        .allowed.join(", "),
        .found.join(", ")
    )]
    WrongTypeCount {
        allowed: Vec<String>,
        found: Vec<String>,
    },

    /// `interval` missing for a polling type, or present for a passive one
    #[error("interval {requirement} for check type '{check_type}'")]
    Interval {
        check_type: String,
        requirement: IntervalRule,
    },

    /// Only part of a composite type was given (strict alias mode)
    #[error(
        "incomplete '{check_type}' check: [{}] given, [{}] missing",
        .present.join(", "),
        .missing.join(", ")
    )]
    IncompleteComposite {
        check_type: String,
        present: Vec<String>,
        missing: Vec<String>,
    },
}

/// All recognised type-indicating field names, in reference order
pub fn allowed_fields() -> Vec<&'static str> {
    CHECK_TYPE_FIELDS.iter().map(|(name, _)| *name).collect()
}

/// Type-indicating fields present in `check`, in reference order
pub fn type_fields_present(check: &CheckSpec) -> Vec<&'static str> {
    CHECK_TYPE_FIELDS
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| check.contains_key(*name))
        .collect()
}

/// Determine which single check type `check` represents
pub fn resolve_check_type(
    check: &CheckSpec,
    mode: AliasMode,
) -> Result<CheckType, CheckValidationError> {
    let present = type_fields_present(check);

    if let Some(composite) = COMPOSITE_CHECK_TYPES
        .iter()
        .find(|c| c.fields == present.as_slice())
    {
        return Ok(CheckType {
            name: composite.name,
            interval: composite.interval,
        });
    }

    match present.as_slice() {
        [field] => {
            if mode == AliasMode::Strict {
                if let Some(composite) = COMPOSITE_CHECK_TYPES
                    .iter()
                    .find(|c| c.fields.contains(field))
                {
                    return Err(CheckValidationError::IncompleteComposite {
                        check_type: composite.name.to_string(),
                        present: vec![field.to_string()],
                        missing: composite
                            .fields
                            .iter()
                            .filter(|f| *f != field)
                            .map(|f| f.to_string())
                            .collect(),
                    });
                }
            }

            let interval = CHECK_TYPE_FIELDS
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, rule)| *rule)
                .unwrap_or(IntervalRule::Required);

            Ok(CheckType {
                name: *field,
                interval,
            })
        }
        _ => Err(CheckValidationError::WrongTypeCount {
            allowed: allowed_fields().into_iter().map(String::from).collect(),
            found: present.iter().map(|f| f.to_string()).collect(),
        }),
    }
}

/// Validate a check with the default (lenient) alias handling
///
/// Returns the input unchanged on success.
pub fn validate(check: CheckSpec) -> Result<CheckSpec, CheckValidationError> {
    validate_with(check, AliasMode::default())
}

/// Validate a check, choosing how a lone alias field is treated
pub fn validate_with(check: CheckSpec, mode: AliasMode) -> Result<CheckSpec, CheckValidationError> {
    check_rules(&check, mode)?;
    Ok(check)
}

/// Validate every check of a list, stopping at the first failure
///
/// On failure returns the index of the offending entry with its error.
pub fn validate_checks(
    checks: &[CheckSpec],
    mode: AliasMode,
) -> Result<(), (usize, CheckValidationError)> {
    for (index, check) in checks.iter().enumerate() {
        check_rules(check, mode).map_err(|e| (index, e))?;
    }
    Ok(())
}

fn check_rules(check: &CheckSpec, mode: AliasMode) -> Result<CheckType, CheckValidationError> {
    let check_type = resolve_check_type(check, mode)?;
    let has_interval = check.contains_key(INTERVAL_FIELD);

    let violated = match check_type.interval {
        IntervalRule::Required => !has_interval,
        IntervalRule::Forbidden => has_interval,
    };

    if violated {
        return Err(CheckValidationError::Interval {
            check_type: check_type.name.to_string(),
            requirement: check_type.interval,
        });
    }

    Ok(check_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn spec(value: Value) -> CheckSpec {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_http_with_interval_is_valid() {
        let check = spec(json!({"http": "http://x/health", "interval": "10s"}));
        let resolved = resolve_check_type(&check, AliasMode::Lenient).unwrap();
        assert_eq!(resolved.name(), "http");
        assert_eq!(resolved.interval(), IntervalRule::Required);
        assert_eq!(validate(check.clone()).unwrap(), check);
    }

    #[test]
    fn test_http_without_interval_fails() {
        let err = validate(spec(json!({"http": "http://x/health"}))).unwrap_err();
        assert_eq!(
            err,
            CheckValidationError::Interval {
                check_type: "http".to_string(),
                requirement: IntervalRule::Required,
            }
        );
        assert_eq!(err.to_string(), "interval required for check type 'http'");
    }

    #[test]
    fn test_ttl_with_interval_fails() {
        let err = validate(spec(json!({"ttl": "30s", "interval": "10s"}))).unwrap_err();
        assert_eq!(err.to_string(), "interval forbidden for check type 'ttl'");
    }

    #[test]
    fn test_ttl_without_interval_is_valid() {
        assert!(validate(spec(json!({"ttl": "30s"}))).is_ok());
    }

    #[test]
    fn test_empty_check_lists_all_allowed_fields() {
        let err = validate(CheckSpec::new()).unwrap_err();
        match &err {
            CheckValidationError::WrongTypeCount { allowed, found } => {
                assert_eq!(allowed.len(), 11);
                assert!(found.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let message = err.to_string();
        for field in allowed_fields() {
            assert!(message.contains(field), "missing {} in {}", field, message);
        }
    }

    #[test]
    fn test_two_types_fail_in_reference_order() {
        let err = validate(spec(json!({"tcp": "x:1", "http": "http://x", "interval": "5s"})))
            .unwrap_err();
        match err {
            CheckValidationError::WrongTypeCount { found, .. } => {
                assert_eq!(found, vec!["http".to_string(), "tcp".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_alias_pair_forbids_interval() {
        let check = spec(json!({"alias_node": "n1", "alias_service": "web"}));
        assert_eq!(
            resolve_check_type(&check, AliasMode::Lenient).unwrap().name(),
            "alias"
        );
        assert!(validate(check.clone()).is_ok());

        let mut with_interval = check;
        with_interval.insert("interval".to_string(), json!("10s"));
        let err = validate(with_interval).unwrap_err();
        assert_eq!(err.to_string(), "interval forbidden for check type 'alias'");
    }

    #[test]
    fn test_alias_pair_plus_another_type_fails() {
        let check = spec(json!({"alias_node": "n1", "alias_service": "web", "ttl": "5s"}));
        assert!(matches!(
            validate(check),
            Err(CheckValidationError::WrongTypeCount { .. })
        ));
    }

    #[test]
    fn test_lone_alias_field_lenient_requires_interval() {
        let check = spec(json!({"alias_node": "n1", "interval": "10s"}));
        let resolved = resolve_check_type(&check, AliasMode::Lenient).unwrap();
        assert_eq!(resolved.name(), "alias_node");
        assert!(validate(check).is_ok());

        let err = validate(spec(json!({"alias_service": "web"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "interval required for check type 'alias_service'"
        );
    }

    #[test]
    fn test_lone_alias_field_strict_is_incomplete() {
        let check = spec(json!({"alias_service": "web"}));
        let err = validate_with(check, AliasMode::Strict).unwrap_err();
        assert_eq!(
            err,
            CheckValidationError::IncompleteComposite {
                check_type: "alias".to_string(),
                present: vec!["alias_service".to_string()],
                missing: vec!["alias_node".to_string()],
            }
        );
    }

    #[test]
    fn test_strict_mode_still_accepts_full_pair() {
        let check = spec(json!({"alias_node": "n1", "alias_service": "web"}));
        assert!(validate_with(check, AliasMode::Strict).is_ok());
    }

    #[test]
    fn test_composite_members_are_known_fields() {
        let known = allowed_fields();
        for composite in COMPOSITE_CHECK_TYPES {
            for field in composite.fields {
                assert!(known.contains(field));
            }
        }
    }

    #[test]
    fn test_validate_checks_reports_index() {
        let checks = vec![
            spec(json!({"tcp": "localhost:80", "interval": "10s"})),
            spec(json!({"ttl": "5s", "interval": "1s"})),
        ];
        let (index, err) = validate_checks(&checks, AliasMode::Lenient).unwrap_err();
        assert_eq!(index, 1);
        assert!(matches!(err, CheckValidationError::Interval { .. }));

        assert!(validate_checks(&checks[..1], AliasMode::Lenient).is_ok());
        assert!(validate_checks(&[], AliasMode::Lenient).is_ok());
    }

    fn polling_field() -> impl Strategy<Value = &'static str> {
        prop::sample::select(
            CHECK_TYPE_FIELDS
                .iter()
                .filter(|(name, rule)| {
                    *rule == IntervalRule::Required
                        && !name.starts_with("alias_")
                })
                .map(|(name, _)| *name)
                .collect::<Vec<_>>(),
        )
    }

    fn extras() -> impl Strategy<Value = Vec<(&'static str, String)>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["id", "name", "notes", "timeout", "service_id", "status"]),
                "[a-z0-9]{1,8}",
            ),
            0..4,
        )
    }

    proptest! {
        #[test]
        fn prop_single_polling_type_with_interval_is_valid(
            field in polling_field(),
            target in "[a-z]{1,10}",
            extra in extras(),
        ) {
            let mut check = CheckSpec::new();
            check.insert(field.to_string(), json!(target));
            check.insert("interval".to_string(), json!("10s"));
            for (key, value) in extra {
                check.insert(key.to_string(), json!(value));
            }

            let validated = validate(check.clone()).unwrap();
            prop_assert_eq!(&validated, &check);
            // Re-validation is the identity too.
            prop_assert_eq!(validate(validated).unwrap(), check);
        }

        #[test]
        fn prop_single_polling_type_without_interval_fails(field in polling_field()) {
            let mut check = CheckSpec::new();
            check.insert(field.to_string(), json!("x"));
            let is_interval_error = matches!(
                validate(check),
                Err(CheckValidationError::Interval { requirement: IntervalRule::Required, .. })
            );
            prop_assert!(is_interval_error);
        }

        #[test]
        fn prop_two_polling_types_fail_cardinality(
            first in polling_field(),
            second in polling_field(),
        ) {
            prop_assume!(first != second);
            let mut check = CheckSpec::new();
            check.insert(first.to_string(), json!("a"));
            check.insert(second.to_string(), json!("b"));
            check.insert("interval".to_string(), json!("10s"));
            let is_count_error = matches!(
                validate(check),
                Err(CheckValidationError::WrongTypeCount { .. })
            );
            prop_assert!(is_count_error);
        }

        #[test]
        fn prop_no_type_field_fails_cardinality(extra in extras()) {
            let mut check = CheckSpec::new();
            for (key, value) in extra {
                check.insert(key.to_string(), json!(value));
            }
            check.insert("interval".to_string(), json!("10s"));
            let is_count_error = matches!(
                validate(check),
                Err(CheckValidationError::WrongTypeCount { .. })
            );
            prop_assert!(is_count_error);
        }
    }
}
