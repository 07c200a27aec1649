//! References to declared Go entities.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A triple `(package, receiver type?, name)` uniquely identifying a declared
/// function, method, sentinel, or type.
///
/// The textual form is `"package/path".Name` for free functions and
/// package-level values, or `"package/path".Type.Name` for methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub package: String,
    pub type_name: Option<String>,
    pub name: String,
}

/// Failure to parse the textual reference form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceParseError {
    #[error("empty reference")]
    Empty,
    #[error("reference must start with a quoted package: {0:?}")]
    MissingPackage(String),
    #[error("invalid identifier path after package: {0:?}")]
    BadIdentifiers(String),
}

static IDENT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z_0-9]*)(?:\.([A-Za-z_][A-Za-z_0-9]*))?$").unwrap()
});

impl Reference {
    /// A free function or package-level value.
    pub fn func(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            type_name: None,
            name: name.into(),
        }
    }

    /// A method on a receiver type.
    pub fn method(
        package: impl Into<String>,
        type_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            type_name: Some(type_name.into()),
            name: name.into(),
        }
    }

    /// The wildcard class used for checkers whose class comes from the call
    /// arguments (`errors.Is`, `errors.As`).
    pub fn any_class() -> Self {
        Self::func("errors", "Any")
    }

    pub fn is_any_class(&self) -> bool {
        self.package == "errors" && self.type_name.is_none() && self.name == "Any"
    }

    /// Short `pkg.Name` rendering used in CIR pretty output. The package is
    /// reduced to its last path segment.
    pub fn short(&self) -> String {
        let pkg = self.package.rsplit('/').next().unwrap_or(&self.package);
        match &self.type_name {
            Some(t) => format!("{pkg}.{t}.{}", self.name),
            None => format!("{pkg}.{}", self.name),
        }
    }
}

impl FromStr for Reference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ReferenceParseError::Empty);
        }
        let rest = s
            .strip_prefix('"')
            .ok_or_else(|| ReferenceParseError::MissingPackage(s.to_string()))?;
        let (package, tail) = rest
            .split_once('"')
            .ok_or_else(|| ReferenceParseError::MissingPackage(s.to_string()))?;
        if package.is_empty() {
            return Err(ReferenceParseError::MissingPackage(s.to_string()));
        }
        let tail = tail
            .strip_prefix('.')
            .ok_or_else(|| ReferenceParseError::BadIdentifiers(s.to_string()))?;
        let caps = IDENT_PATH
            .captures(tail)
            .ok_or_else(|| ReferenceParseError::BadIdentifiers(s.to_string()))?;
        let first = caps
            .get(1)
            .ok_or_else(|| ReferenceParseError::BadIdentifiers(s.to_string()))?
            .as_str()
            .to_string();
        let second = caps.get(2).map(|m| m.as_str().to_string());
        Ok(match second {
            Some(name) => Reference {
                package: package.to_string(),
                type_name: Some(first),
                name,
            },
            None => Reference {
                package: package.to_string(),
                type_name: None,
                name: first,
            },
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\".", self.package)?;
        if let Some(t) = &self.type_name {
            write!(f, "{t}.")?;
        }
        write!(f, "{}", self.name)
    }
}

impl TryFrom<String> for Reference {
    type Error = ReferenceParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_free_function() {
        let r: Reference = "\"os\".IsNotExist".parse().unwrap();
        assert_eq!(r, Reference::func("os", "IsNotExist"));
    }

    #[test]
    fn test_parse_method() {
        let r: Reference = "\"log/slog\".Logger.Error".parse().unwrap();
        assert_eq!(r, Reference::method("log/slog", "Logger", "Error"));
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["\"fmt\".Errorf", "\"github.com/pkg/errors\".Wrap", "\"a/b\".T.M"] {
            let r: Reference = text.parse().unwrap();
            assert_eq!(r.to_string(), text);
            let again: Reference = r.to_string().parse().unwrap();
            assert_eq!(again, r);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<Reference>().is_err());
        assert!("os.IsNotExist".parse::<Reference>().is_err());
        assert!("\"\".Name".parse::<Reference>().is_err());
        assert!("\"os\"".parse::<Reference>().is_err());
        assert!("\"os\".a.b.c".parse::<Reference>().is_err());
        assert!("\"os\".9bad".parse::<Reference>().is_err());
    }

    #[test]
    fn test_short_rendering() {
        let r = Reference::func("github.com/pkg/errors", "Wrap");
        assert_eq!(r.short(), "errors.Wrap");
        assert_eq!(Reference::func("os", "ErrNotExist").short(), "os.ErrNotExist");
    }
}
