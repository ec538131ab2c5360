// Error Classification - total mapping from raw failures to the taxonomy
// Ordered pattern rules, first match wins. This function never fails:
// anything unmatched classifies as unknown/non-recoverable.

use serde::Serialize;

/// Failure category in the taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Authentication,
    Network,
    ExternalSystem,
    Storage,
    Automation,
    Validation,
    Filesystem,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "AUTHENTICATION",
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::ExternalSystem => "EXTERNAL_SYSTEM",
            ErrorCategory::Storage => "STORAGE",
            ErrorCategory::Automation => "AUTOMATION",
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Filesystem => "FILESYSTEM",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One classified failure.
///
/// `is_item_scoped = true` means the caller skips the current item and
/// continues; `false` escalates to job-scoped handling (healing or fatal,
/// depending on `is_recoverable`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub error_type: &'static str,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub is_recoverable: bool,
    pub is_item_scoped: bool,
    /// Retry-count hint for the calling/retry layer
    pub max_retries: u32,
}

struct Rule {
    patterns: &'static [&'static str],
    classification: Classification,
}

// Rule order matters: authentication and network failures must win over
// the looser item-scoped patterns, and item-scoped patterns must win over
// filesystem ones ("profile not found" vs "file not found").
const RULES: &[Rule] = &[
    Rule {
        patterns: &[
            "credential",
            "login",
            "log in",
            "unauthorized",
            "authentication",
            "session expired",
            "password",
        ],
        classification: Classification {
            error_type: "AUTH_FAILURE",
            category: ErrorCategory::Authentication,
            severity: Severity::High,
            is_recoverable: true,
            is_item_scoped: false,
            max_retries: 2,
        },
    },
    Rule {
        patterns: &[
            "timeout",
            "timed out",
            "connection reset",
            "econnreset",
            "econnrefused",
            "dns",
            "socket hang up",
            "network",
            "connection closed",
        ],
        classification: Classification {
            error_type: "NETWORK_FAILURE",
            category: ErrorCategory::Network,
            severity: Severity::Medium,
            is_recoverable: true,
            is_item_scoped: false,
            max_retries: 5,
        },
    },
    Rule {
        patterns: &[
            "rate limit",
            "too many requests",
            "429",
            "temporarily blocked",
            "try again later",
            "verification required",
            "challenge",
            "action blocked",
        ],
        classification: Classification {
            error_type: "RATE_LIMITED",
            category: ErrorCategory::ExternalSystem,
            severity: Severity::High,
            is_recoverable: true,
            is_item_scoped: false,
            max_retries: 3,
        },
    },
    Rule {
        patterns: &[
            "upload failed",
            "object store",
            "bucket",
            "storage quota",
            "blob",
        ],
        classification: Classification {
            error_type: "STORAGE_FAILURE",
            category: ErrorCategory::Storage,
            severity: Severity::Critical,
            is_recoverable: false,
            is_item_scoped: false,
            max_retries: 0,
        },
    },
    Rule {
        patterns: &[
            "browser",
            "session closed",
            "target closed",
            "navigation",
            "detached",
            "crashed",
            "driver",
        ],
        classification: Classification {
            error_type: "DRIVER_FAILURE",
            category: ErrorCategory::Automation,
            severity: Severity::Medium,
            is_recoverable: true,
            is_item_scoped: false,
            max_retries: 3,
        },
    },
    Rule {
        patterns: &[
            "profile not found",
            "user not found",
            "account not found",
            "is private",
            "profile unavailable",
            "user unavailable",
            "no longer exists",
            "account suspended",
            "page unavailable",
        ],
        classification: Classification {
            error_type: "ITEM_UNAVAILABLE",
            category: ErrorCategory::ExternalSystem,
            severity: Severity::Low,
            is_recoverable: true,
            is_item_scoped: true,
            max_retries: 0,
        },
    },
    Rule {
        patterns: &[
            "invalid input",
            "malformed",
            "validation failed",
            "missing required",
            "invalid state",
        ],
        classification: Classification {
            error_type: "VALIDATION_FAILURE",
            category: ErrorCategory::Validation,
            severity: Severity::Critical,
            is_recoverable: false,
            is_item_scoped: false,
            max_retries: 0,
        },
    },
    Rule {
        patterns: &[
            "permission denied",
            "no such file",
            "enoent",
            "eacces",
            "read-only file system",
            "disk full",
            "no space left",
        ],
        classification: Classification {
            error_type: "FILESYSTEM_FAILURE",
            category: ErrorCategory::Filesystem,
            severity: Severity::Critical,
            is_recoverable: false,
            is_item_scoped: false,
            max_retries: 0,
        },
    },
];

const UNKNOWN: Classification = Classification {
    error_type: "UNKNOWN_FAILURE",
    category: ErrorCategory::Unknown,
    severity: Severity::Critical,
    is_recoverable: false,
    is_item_scoped: false,
    max_retries: 0,
};

/// Classify a raw failure message. Total: always returns a record.
pub fn classify(message: &str) -> Classification {
    let needle = message.to_lowercase();
    for rule in RULES {
        if rule.patterns.iter().any(|p| needle.contains(p)) {
            return rule.classification.clone();
        }
    }
    UNKNOWN
}
