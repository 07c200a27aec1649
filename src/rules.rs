//! Canonical CER-series rule codes.
//!
//! Each rule represents a distinct verification invariant of error-handling
//! logic. The CER-series provides a stable numeric and textual identity for
//! every rule so violations can be reported, filtered, and traced
//! consistently across analysis phases.
//!
//! Rule numbering scheme:
//!
//! - 000–099: structural propagation and wrapping
//! - 100–149: message text and formatting rules
//! - 150–199: logging and reporting discipline
//!
//! Rule identifiers are stable; existing codes are never renumbered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A CER rule code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// CER000: an error must never be ignored.
    NoSilentDrop,
    /// CER010: wrap errors when crossing a semantic boundary.
    AnnotateExternal,
    /// CER020: bare return allowed only for single-path locals.
    SingleLocalPassthrough,
    /// CER030: multi-return functions must annotate propagated errors.
    MultiReturnMustAnnotate,
    /// CER040: annotation required for externals and multi-propagation locals.
    AnnotationRequiredForExternalAndMultiLocal,
    /// CER050: errors in non-error-returning funcs must be logged or panicked.
    HandleInNonErrorFunc,
    /// CER060: reassigning or aliasing tracked errors is forbidden.
    NoShadowingOrAliasing,
    /// CER065: fix an error expression into a variable before control use.
    FixBeforeUse,
    /// CER070: return is allowed only where the error state is defined.
    ReturnInDefinedErrorState,
    /// CER080: returning a callee's error without local interpretation.
    NoErrorDelegation,
    /// CER090: the error result must be the last return value.
    ErrorMustBeLastReturnValue,
    /// CER100: message formatting and check-hygiene rules.
    TextAndStyleRules,
    /// CER0101: annotation format must be a string literal.
    AnnotationFormatMustBeLiteral,
    /// CER102: annotation format must end with the ": %w" fragment.
    AnnotationFormatMustEndWithW,
    /// CER150: an error must be either logged or returned, never both.
    NoLogAndReturn,
    /// A numeric code outside the catalog. Renders as `rule-unknown(n)`.
    Unknown(u16),
}

impl Rule {
    /// All catalog rules in numeric order.
    pub const CATALOG: &'static [Rule] = &[
        Rule::NoSilentDrop,
        Rule::AnnotateExternal,
        Rule::SingleLocalPassthrough,
        Rule::MultiReturnMustAnnotate,
        Rule::AnnotationRequiredForExternalAndMultiLocal,
        Rule::HandleInNonErrorFunc,
        Rule::NoShadowingOrAliasing,
        Rule::FixBeforeUse,
        Rule::ReturnInDefinedErrorState,
        Rule::NoErrorDelegation,
        Rule::ErrorMustBeLastReturnValue,
        Rule::TextAndStyleRules,
        Rule::AnnotationFormatMustBeLiteral,
        Rule::AnnotationFormatMustEndWithW,
        Rule::NoLogAndReturn,
    ];

    /// The numeric identity of the rule.
    pub fn number(&self) -> u16 {
        match self {
            Rule::NoSilentDrop => 0,
            Rule::AnnotateExternal => 10,
            Rule::SingleLocalPassthrough => 20,
            Rule::MultiReturnMustAnnotate => 30,
            Rule::AnnotationRequiredForExternalAndMultiLocal => 40,
            Rule::HandleInNonErrorFunc => 50,
            Rule::NoShadowingOrAliasing => 60,
            Rule::FixBeforeUse => 65,
            Rule::ReturnInDefinedErrorState => 70,
            Rule::NoErrorDelegation => 80,
            Rule::ErrorMustBeLastReturnValue => 90,
            Rule::TextAndStyleRules => 100,
            Rule::AnnotationFormatMustBeLiteral => 101,
            Rule::AnnotationFormatMustEndWithW => 102,
            Rule::NoLogAndReturn => 150,
            Rule::Unknown(n) => *n,
        }
    }

    /// Resolve a raw numeric code to a catalog rule.
    pub fn from_number(n: u16) -> Rule {
        for rule in Self::CATALOG {
            if rule.number() == n {
                return *rule;
            }
        }
        Rule::Unknown(n)
    }

    /// The canonical code string, e.g. `"CER000: NoSilentDrop"`.
    pub fn code(&self) -> String {
        match self {
            Rule::NoSilentDrop => "CER000: NoSilentDrop".to_string(),
            Rule::AnnotateExternal => "CER010: AnnotateExternal".to_string(),
            Rule::SingleLocalPassthrough => "CER020: SingleLocalPassthrough".to_string(),
            Rule::MultiReturnMustAnnotate => "CER030: MultiReturnMustAnnotate".to_string(),
            Rule::AnnotationRequiredForExternalAndMultiLocal => {
                "CER040: AnnotationRequiredForExternalAndMultiLocal".to_string()
            }
            Rule::HandleInNonErrorFunc => "CER050: HandleInNonErrorFunc".to_string(),
            Rule::NoShadowingOrAliasing => "CER060: NoShadowingOrAliasing".to_string(),
            Rule::FixBeforeUse => "CER065: FixBeforeUse".to_string(),
            Rule::ReturnInDefinedErrorState => "CER070: ReturnInDefinedErrorState".to_string(),
            Rule::NoErrorDelegation => "CER080: NoErrorDelegation".to_string(),
            Rule::ErrorMustBeLastReturnValue => "CER090: ErrorMustBeLastReturnValue".to_string(),
            Rule::TextAndStyleRules => "CER100: TextAndStyleRules".to_string(),
            Rule::AnnotationFormatMustBeLiteral => {
                "CER0101: AnnotationFormatMustBeLiteral".to_string()
            }
            Rule::AnnotationFormatMustEndWithW => {
                "CER102: AnnotationFormatMustEndWithW".to_string()
            }
            Rule::NoLogAndReturn => "CER150: NoLogAndReturn".to_string(),
            Rule::Unknown(n) => format!("rule-unknown({n})"),
        }
    }

    /// Human-readable explanation of the rule.
    pub fn description(&self) -> String {
        match self {
            Rule::NoSilentDrop => "Error must never be ignored.".to_string(),
            Rule::AnnotateExternal => {
                "Wrap errors when crossing a semantic boundary.".to_string()
            }
            Rule::SingleLocalPassthrough => {
                "Bare return allowed only for single-path locals.".to_string()
            }
            Rule::MultiReturnMustAnnotate => {
                "Multi-return functions must annotate propagated errors.".to_string()
            }
            Rule::AnnotationRequiredForExternalAndMultiLocal => {
                "Enforce annotation for externals and multi-propagation locals.".to_string()
            }
            Rule::HandleInNonErrorFunc => {
                "Errors in non-error-returning funcs must be logged or panicked.".to_string()
            }
            Rule::NoShadowingOrAliasing => {
                "Reassigning or aliasing tracked errors is forbidden.".to_string()
            }
            Rule::FixBeforeUse => {
                "Fix error expression into a variable before control use.".to_string()
            }
            Rule::ReturnInDefinedErrorState => {
                "Return is allowed only in regions where the error state is explicitly defined."
                    .to_string()
            }
            Rule::NoErrorDelegation => {
                "Returning a callee's error without local interpretation is forbidden."
                    .to_string()
            }
            Rule::ErrorMustBeLastReturnValue => {
                "Returning functions must place the error result as the last return value."
                    .to_string()
            }
            Rule::TextAndStyleRules => {
                "Message formatting and error-check hygiene.".to_string()
            }
            Rule::AnnotationFormatMustBeLiteral => {
                "Annotation format must be a string literal.".to_string()
            }
            Rule::AnnotationFormatMustEndWithW => {
                "Annotation format must end with ': %w' fragment.".to_string()
            }
            Rule::NoLogAndReturn => {
                "Error must be either logged or returned, never both.".to_string()
            }
            Rule::Unknown(n) => format!("unknown-rule({n})"),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
