use serde::{Deserialize, Serialize};

/// Attack families recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackCategory {
    SqlInjection,
    CommandInjection,
    Xss,
    PathTraversal,
    PromptInjection,
    Scan,
    Exploit,
}

impl AttackCategory {
    pub const ALL: [AttackCategory; 7] = [
        AttackCategory::SqlInjection,
        AttackCategory::CommandInjection,
        AttackCategory::Xss,
        AttackCategory::PathTraversal,
        AttackCategory::PromptInjection,
        AttackCategory::Scan,
        AttackCategory::Exploit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackCategory::SqlInjection => "sql_injection",
            AttackCategory::CommandInjection => "command_injection",
            AttackCategory::Xss => "xss",
            AttackCategory::PathTraversal => "path_traversal",
            AttackCategory::PromptInjection => "prompt_injection",
            AttackCategory::Scan => "scan",
            AttackCategory::Exploit => "exploit",
        }
    }

    /// Severity assigned to any hit within the category.
    pub fn base_severity(&self) -> Severity {
        match self {
            AttackCategory::SqlInjection => Severity::High,
            AttackCategory::CommandInjection => Severity::Critical,
            AttackCategory::Xss => Severity::Medium,
            AttackCategory::PathTraversal => Severity::High,
            AttackCategory::PromptInjection => Severity::Medium,
            AttackCategory::Scan => Severity::Low,
            AttackCategory::Exploit => Severity::Critical,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AttackCategory::SqlInjection => "SQL injection attempt",
            AttackCategory::CommandInjection => "Command injection attempt",
            AttackCategory::Xss => "Cross-site scripting attempt",
            AttackCategory::PathTraversal => "Path traversal attempt",
            AttackCategory::PromptInjection => "Prompt injection attempt",
            AttackCategory::Scan => "Scanner or enumeration probe",
            AttackCategory::Exploit => "Known exploit signature",
        }
    }
}

/// Severity scale; the derived ordering is the comparison order used to
/// compute an overall severity (Low < Medium < High < Critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// One category hit. `pattern` is the source of the first expression that
/// matched within the category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryMatch {
    pub category: AttackCategory,
    pub severity: Severity,
    pub pattern: &'static str,
}

/// The outcome of classifying one payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    pub matches: Vec<CategoryMatch>,
}

impl Classification {
    pub fn is_suspicious(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Maximum severity over all matched categories; None when clean.
    pub fn max_severity(&self) -> Option<Severity> {
        self.matches.iter().map(|m| m.severity).max()
    }

    pub fn has_category(&self, category: AttackCategory) -> bool {
        self.matches.iter().any(|m| m.category == category)
    }

    /// Human-readable reason list suitable for persisted rows.
    pub fn reasons(&self) -> Vec<String> {
        self.matches
            .iter()
            .map(|m| format!("{}: {}", m.category.as_str(), m.category.description()))
            .collect()
    }

    /// Behavioral flag: the source is probing with known tooling or paths.
    pub fn is_scanner(&self) -> bool {
        self.has_category(AttackCategory::Scan)
    }

    /// Behavioral flag: the source is attempting code or command execution.
    pub fn is_exploiter(&self) -> bool {
        self.has_category(AttackCategory::Exploit)
            || self.has_category(AttackCategory::CommandInjection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&AttackCategory::SqlInjection).unwrap();
        assert_eq!(json, "\"sql_injection\"");
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn test_max_severity_over_matches() {
        let classification = Classification {
            matches: vec![
                CategoryMatch {
                    category: AttackCategory::Scan,
                    severity: AttackCategory::Scan.base_severity(),
                    pattern: "x",
                },
                CategoryMatch {
                    category: AttackCategory::CommandInjection,
                    severity: AttackCategory::CommandInjection.base_severity(),
                    pattern: "y",
                },
            ],
        };
        assert_eq!(classification.max_severity(), Some(Severity::Critical));
        assert!(classification.is_exploiter());
        assert!(classification.is_scanner());
    }

    #[test]
    fn test_clean_classification() {
        let classification = Classification::default();
        assert!(!classification.is_suspicious());
        assert_eq!(classification.max_severity(), None);
        assert!(classification.reasons().is_empty());
    }
}
