//! Mapping classification.
//!
//! Decides a field's mapping type from its provider associations and
//! computation description, and for calculated fields whether the description
//! is a simple formula or a reference to a backend function. The formula test
//! is a keyword heuristic driven by [`FormulaRules`]; misclassifying unusual
//! prose is an accepted limitation.

use crate::config::FormulaRules;
use crate::error::Diagnostic;
use crate::types::{CalculationStyle, FieldRecord, MappingType};

/// Result of classifying one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub mapping_type: MappingType,
    /// Set only for calculated fields.
    pub calculation_style: Option<CalculationStyle>,
}

impl Classification {
    fn plain(mapping_type: MappingType) -> Self {
        Self {
            mapping_type,
            calculation_style: None,
        }
    }
}

/// Classify a record, or return the diagnostic explaining why it is skipped.
///
/// An explicit transformed or io_mapped type wins over the provider count.
pub fn classify(record: &FieldRecord, rules: &FormulaRules) -> Result<Classification, Diagnostic> {
    if let Some(explicit @ (MappingType::Transformed | MappingType::IoMapped)) = record.mapping_type
    {
        return Ok(Classification::plain(explicit));
    }

    match record.provider_refs.len() {
        0 => {
            let Some(description) = record.computation() else {
                return Err(Diagnostic::missing_computation(&record.name));
            };
            let style = calculation_style(description, rules);
            if style == CalculationStyle::FunctionReference
                && record.dependencies().next().is_none()
            {
                return Err(Diagnostic::missing_dependencies(&record.name));
            }
            Ok(Classification {
                mapping_type: MappingType::Calculated,
                calculation_style: Some(style),
            })
        }
        1 => Ok(Classification::plain(MappingType::Direct)),
        _ => Ok(Classification::plain(MappingType::Prioritized)),
    }
}

/// Decide whether a non-empty description is a formula.
pub fn calculation_style(description: &str, rules: &FormulaRules) -> CalculationStyle {
    if is_formula(description, rules) {
        CalculationStyle::Formula
    } else {
        CalculationStyle::FunctionReference
    }
}

fn is_formula_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || "_.+-*/()".contains(c)
}

fn is_formula(description: &str, rules: &FormulaRules) -> bool {
    let description = description.trim();
    if description.is_empty() || !description.chars().all(is_formula_char) {
        return false;
    }
    if description.split_whitespace().count() >= rules.max_tokens {
        return false;
    }
    // Words are split on operators too, so `speed*use` still finds `use`.
    let has_stopword = description
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .any(|word| {
            rules
                .stopwords
                .iter()
                .any(|stop| stop.eq_ignore_ascii_case(word))
        });
    !has_stopword
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticCode;

    fn rules() -> FormulaRules {
        FormulaRules::default()
    }

    fn with_refs(refs: &[&str]) -> FieldRecord {
        let mut record = FieldRecord::new("f", "f");
        record.provider_refs = refs.iter().map(|s| s.to_string()).collect();
        record
    }

    fn calculated(description: &str, deps: &[&str]) -> FieldRecord {
        let mut record = FieldRecord::new("f", "f");
        record.computation_description = Some(description.to_string());
        record.dependency_names = deps.iter().map(|s| s.to_string()).collect();
        record
    }

    #[test]
    fn test_provider_count_decides_type() {
        let direct = classify(&with_refs(&["lat"]), &rules()).unwrap();
        assert_eq!(direct.mapping_type, MappingType::Direct);
        assert_eq!(direct.calculation_style, None);

        let prioritized = classify(&with_refs(&["a", "b", "c"]), &rules()).unwrap();
        assert_eq!(prioritized.mapping_type, MappingType::Prioritized);
    }

    #[test]
    fn test_provider_refs_win_over_computation() {
        let mut record = with_refs(&["lat"]);
        record.computation_description = Some("Use GPS latitude".into());
        assert_eq!(
            classify(&record, &rules()).unwrap().mapping_type,
            MappingType::Direct
        );
    }

    #[test]
    fn test_missing_computation_rejected() {
        let err = classify(&FieldRecord::new("f", "f"), &rules()).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MissingComputationApproach);

        let err = classify(&calculated("   ", &[]), &rules()).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MissingComputationApproach);
    }

    #[test]
    fn test_formula_detection() {
        let r = rules();
        assert_eq!(calculation_style("a + b", &r), CalculationStyle::Formula);
        assert_eq!(
            calculation_style("(fuel.level * 0.01) / capacity", &r),
            CalculationStyle::Formula
        );
        assert_eq!(
            calculation_style("Use heading to derive cardinal", &r),
            CalculationStyle::FunctionReference
        );
        assert_eq!(calculation_style("x = a + b", &r), CalculationStyle::FunctionReference);
        assert_eq!(calculation_style("a > b", &r), CalculationStyle::FunctionReference);
        assert_eq!(
            calculation_style("a + b + c + d + e + f", &r),
            CalculationStyle::FunctionReference
        );
        assert_eq!(
            calculation_style("convert(speed)", &r),
            CalculationStyle::FunctionReference
        );
    }

    #[test]
    fn test_stopwords_match_whole_words() {
        // `diff` contains `if`, `fromage` contains `from`.
        let r = rules();
        assert_eq!(calculation_style("diff - fromage", &r), CalculationStyle::Formula);
        assert_eq!(calculation_style("a IF b", &r), CalculationStyle::FunctionReference);
    }

    #[test]
    fn test_function_reference_needs_dependencies() {
        let err = classify(&calculated("Geocode via API", &[]), &rules()).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MissingDependencies);

        let ok = classify(&calculated("Geocode via API", &["lat", "lng"]), &rules()).unwrap();
        assert_eq!(ok.mapping_type, MappingType::Calculated);
        assert_eq!(ok.calculation_style, Some(CalculationStyle::FunctionReference));
    }

    #[test]
    fn test_blank_dependencies_count_as_none() {
        let err = classify(&calculated("Use heading to pick a direction", &["  ", ""]), &rules())
            .unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MissingDependencies);

        let err = classify(&calculated("Geocode via API", &["provider:"]), &rules()).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MissingDependencies);
    }

    #[test]
    fn test_formula_without_dependencies_is_allowed() {
        let ok = classify(&calculated("a + b", &[]), &rules()).unwrap();
        assert_eq!(ok.calculation_style, Some(CalculationStyle::Formula));
    }

    #[test]
    fn test_explicit_type_honored() {
        let mut record = with_refs(&["a", "b"]);
        record.mapping_type = Some(MappingType::IoMapped);
        assert_eq!(
            classify(&record, &rules()).unwrap().mapping_type,
            MappingType::IoMapped
        );

        // Only transformed/io_mapped overrides are honored.
        record.mapping_type = Some(MappingType::Direct);
        assert_eq!(
            classify(&record, &rules()).unwrap().mapping_type,
            MappingType::Prioritized
        );
    }

    #[test]
    fn test_explicit_type_beats_single_provider_ref() {
        let mut record = with_refs(&["avl_io_1"]);
        assert_eq!(
            classify(&record, &rules()).unwrap().mapping_type,
            MappingType::Direct
        );
        record.mapping_type = Some(MappingType::Transformed);
        assert_eq!(
            classify(&record, &rules()).unwrap().mapping_type,
            MappingType::Transformed
        );
        record.mapping_type = Some(MappingType::Calculated);
        assert_eq!(
            classify(&record, &rules()).unwrap().mapping_type,
            MappingType::Direct
        );
    }

    #[test]
    fn test_custom_token_limit() {
        let rules = FormulaRules {
            max_tokens: 3,
            ..FormulaRules::default()
        };
        assert_eq!(calculation_style("a + b", &rules), CalculationStyle::FunctionReference);
        assert_eq!(calculation_style("a+b", &rules), CalculationStyle::Formula);
    }
}
