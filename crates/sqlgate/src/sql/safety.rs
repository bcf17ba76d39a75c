use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lexer::{LexMode, Token, tokenize};

/// Keywords rejected wherever they appear as a bare word.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE", "EXEC",
    "EXECUTE", "MERGE", "UPSERT", "RENAME", "INTO", "OUTFILE", "DUMPFILE",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyViolation {
    #[error("SQL statement cannot be empty")]
    EmptyInput,

    #[error("multiple SQL statements are forbidden; submit exactly one read-only statement")]
    MultipleStatements,

    #[error(
        "forbidden operation: {keyword}; only SELECT, SHOW, DESCRIBE and EXPLAIN statements are allowed"
    )]
    ForbiddenOperation { keyword: String },
}

impl SafetyViolation {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::MultipleStatements => "multiple_statements",
            Self::ForbiddenOperation { .. } => "forbidden_operation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    With,
    Show,
    Describe,
    Explain,
}

impl StatementKind {
    fn from_verb(verb: &str) -> Option<Self> {
        match verb.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Self::Select),
            "WITH" => Some(Self::With),
            "SHOW" => Some(Self::Show),
            "DESCRIBE" | "DESC" => Some(Self::Describe),
            "EXPLAIN" => Some(Self::Explain),
            _ => None,
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::With => "with",
            Self::Show => "show",
            Self::Describe => "describe",
            Self::Explain => "explain",
        }
    }
}

/// Screens `sql` under every dialect reading of comments and quotes. A
/// statement passes only if it is a single read-only statement whichever
/// way the server lexes it.
pub fn screen(sql: &str) -> Result<StatementKind, SafetyViolation> {
    if sql.trim().is_empty() {
        return Err(SafetyViolation::EmptyInput);
    }

    let mut verdict: Option<StatementKind> = None;
    for mode in LexMode::readings() {
        let kind = screen_tokens(&tokenize(sql, mode)).inspect_err(|violation| {
            tracing::debug!(?mode, code = violation.code(), "sql rejected under lex reading");
        })?;
        match verdict {
            Some(first) if first != kind => {
                tracing::debug!(?mode, ?first, ?kind, "statement kind differs between lex readings");
            }
            Some(_) => {}
            None => verdict = Some(kind),
        }
    }
    verdict.ok_or(SafetyViolation::EmptyInput)
}

fn screen_tokens(tokens: &[Token]) -> Result<StatementKind, SafetyViolation> {
    let Some(last_content) = tokens.iter().rposition(|token| !token.is_punct(';')) else {
        return Err(SafetyViolation::EmptyInput);
    };
    let statement = &tokens[..=last_content];

    if statement.iter().any(|token| token.is_punct(';')) {
        return Err(SafetyViolation::MultipleStatements);
    }

    if let Some(keyword) = first_forbidden_keyword(statement) {
        return Err(SafetyViolation::ForbiddenOperation { keyword });
    }

    let leading = statement
        .iter()
        .find(|token| !token.is_punct('('))
        .ok_or(SafetyViolation::EmptyInput)?;
    leading
        .word()
        .and_then(StatementKind::from_verb)
        .ok_or_else(|| SafetyViolation::ForbiddenOperation {
            keyword: leading.text().to_ascii_uppercase(),
        })
}

fn first_forbidden_keyword(tokens: &[Token]) -> Option<String> {
    tokens.iter().find_map(|token| {
        let word = token.word()?;
        FORBIDDEN_KEYWORDS
            .iter()
            .find(|keyword| word.eq_ignore_ascii_case(keyword))
            .map(|keyword| (*keyword).to_string())
    })
}
