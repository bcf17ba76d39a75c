use std::collections::HashSet;
use std::sync::OnceLock;

use super::lexer::Token;

/// Token tree where every balanced `( ... )` pair becomes a `Group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(Token),
    Group(Vec<Node>),
}

impl Node {
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Leaf(token) => Some(token),
            Self::Group(_) => None,
        }
    }

    #[must_use]
    pub fn group(&self) -> Option<&[Node]> {
        match self {
            Self::Group(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }

    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token().is_some_and(|token| token.is_keyword(keyword))
    }

    #[must_use]
    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|keyword| self.is_keyword(keyword))
    }

    #[must_use]
    pub fn is_punct(&self, expected: char) -> bool {
        self.token().is_some_and(|token| token.is_punct(expected))
    }

    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.token().and_then(Token::identifier)
    }

    /// Identifier usable as a name: backtick identifiers always, bare words
    /// unless they are reserved.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self.token()? {
            Token::QuotedIdent(text) => Some(text),
            Token::Word(text) if !is_reserved(text) => Some(text),
            _ => None,
        }
    }
}

/// Splits on `;`, dropping statements that contain no tokens.
#[must_use]
pub fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|token| token.is_punct(';'))
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Groups nested deeper than this stay flat as `(` / `)` leaves.
pub const MAX_GROUP_DEPTH: usize = 128;

/// Builds the parenthesis tree. Stray `)` are dropped and unclosed groups are
/// closed at end of input.
#[must_use]
pub fn parse_nodes(tokens: &[Token]) -> Vec<Node> {
    let mut stack: Vec<Vec<Node>> = vec![Vec::new()];
    let mut flattened = 0usize;
    for token in tokens {
        let open = token.is_punct('(');
        let close = token.is_punct(')');
        if open && stack.len() > MAX_GROUP_DEPTH {
            flattened += 1;
        } else if close && flattened > 0 {
            flattened -= 1;
        } else if open {
            stack.push(Vec::new());
            continue;
        } else if close {
            if stack.len() > 1 {
                close_group(&mut stack);
            }
            continue;
        }
        if let Some(current) = stack.last_mut() {
            current.push(Node::Leaf(token.clone()));
        }
    }
    while stack.len() > 1 {
        close_group(&mut stack);
    }
    stack.pop().unwrap_or_default()
}

fn close_group(stack: &mut Vec<Vec<Node>>) {
    let children = stack.pop().unwrap_or_default();
    if let Some(parent) = stack.last_mut() {
        parent.push(Node::Group(children));
    }
}

/// Splits at top-level commas.
#[must_use]
pub fn split_commas(nodes: &[Node]) -> Vec<&[Node]> {
    nodes
        .split(|node| node.is_punct(','))
        .filter(|item| !item.is_empty())
        .collect()
}

/// True when the group body is a query (`SELECT ...`, `WITH ...`, or a
/// parenthesized query).
#[must_use]
pub fn is_query(nodes: &[Node]) -> bool {
    match nodes.first() {
        Some(Node::Group(inner)) => is_query(inner),
        Some(node) => node.is_any_keyword(&["SELECT", "WITH", "VALUES", "TABLE"]),
        None => false,
    }
}

/// Words that end a table factor or clause and so can never be aliases.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DESC", "DISTINCT", "ELSE",
    "END", "EXCEPT", "FETCH", "FOR", "FORCE", "FROM", "FULL", "GROUP", "HAVING", "IGNORE", "IN",
    "INNER", "INTERSECT", "INTO", "IS", "JOIN", "LATERAL", "LEFT", "LIKE", "LIMIT", "MINUS",
    "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PARTITION", "QUALIFY",
    "RIGHT", "SELECT", "SET", "STRAIGHT_JOIN", "TABLESAMPLE", "THEN", "UNION", "USE", "USING",
    "VALUES", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Words that appear inside expressions without naming a column.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "AGAINST", "ALL", "AND", "ANY", "ARRAY", "AS", "ASC", "AT", "BETWEEN", "BINARY", "BOTH",
    "BY", "CASE", "COLLATE", "CUBE", "CURRENT", "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DESC", "DISTINCT", "DIV", "ELSE", "END",
    "ESCAPE", "EXISTS", "FALSE", "FILTER", "FIRST", "FOLLOWING", "FOR", "FROM", "GLOB", "GROUP",
    "GROUPING", "GROUPS",
    "ILIKE", "IN", "INTERVAL", "IS", "ISNULL", "LAST", "LEADING", "LIKE", "LOCALTIME",
    "LOCALTIMESTAMP", "MATCH", "MOD", "NOT", "NOTNULL", "NULL", "NULLS", "OF", "OR", "ORDER",
    "OVER", "PARTITION", "PRECEDING", "RANGE", "REGEXP", "RLIKE", "ROLLUP", "ROW", "ROWS",
    "SEPARATOR", "SETS",
    "SESSION_USER", "SIMILAR", "SOME", "SYSTEM_USER", "THEN", "TIES", "TO", "TRAILING", "TRUE",
    "UNBOUNDED", "UNKNOWN", "USING", "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "WHEN", "WITH",
    "WITHIN", "XOR", "ZONE",
    // date and interval units
    "MICROSECOND", "SECOND", "MINUTE", "HOUR", "DAY", "WEEK", "MONTH", "QUARTER", "YEAR",
    "SECOND_MICROSECOND", "MINUTE_MICROSECOND", "MINUTE_SECOND", "HOUR_MICROSECOND",
    "HOUR_SECOND", "HOUR_MINUTE", "DAY_MICROSECOND", "DAY_SECOND", "DAY_MINUTE", "DAY_HOUR",
    "YEAR_MONTH", "EPOCH", "DOW", "DOY",
];

fn reserved_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| RESERVED_WORDS.iter().copied().collect())
}

fn expression_keyword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| EXPRESSION_KEYWORDS.iter().copied().collect())
}

#[must_use]
pub fn is_reserved(word: &str) -> bool {
    reserved_set().contains(word.to_ascii_uppercase().as_str())
}

#[must_use]
pub fn is_expression_keyword(word: &str) -> bool {
    expression_keyword_set().contains(word.to_ascii_uppercase().as_str())
}

/// Bare words that could name a column. The lexer already restricts words to
/// identifier shape, so only expression keywords are excluded here.
#[must_use]
pub fn looks_like_column(word: &str) -> bool {
    !is_expression_keyword(word)
}

#[cfg(test)]
mod tests {
    use super::{MAX_GROUP_DEPTH, Node, looks_like_column, parse_nodes, split_statements};
    use crate::sql::lexer::{LexMode, tokenize};

    #[test]
    fn groups_nested_parentheses() {
        let tokens = tokenize("SELECT COUNT(DISTINCT (a)) FROM t", LexMode::STANDARD);
        let nodes = parse_nodes(&tokens);
        assert_eq!(nodes.len(), 5);
        let Node::Group(args) = &nodes[2] else {
            panic!("expected argument group, got {:?}", nodes[2]);
        };
        assert!(matches!(args[1], Node::Group(_)));
    }

    #[test]
    fn tolerates_unbalanced_parentheses() {
        let closed = parse_nodes(&tokenize("SELECT (a", LexMode::STANDARD));
        assert_eq!(closed.len(), 2);
        let stray = parse_nodes(&tokenize("SELECT a)", LexMode::STANDARD));
        assert_eq!(stray.len(), 2);
    }

    #[test]
    fn deep_nesting_is_flattened_past_the_limit() {
        let depth = MAX_GROUP_DEPTH * 4;
        let sql = format!("SELECT {}1{}", "(".repeat(depth), ")".repeat(depth));
        let nodes = parse_nodes(&tokenize(&sql, LexMode::STANDARD));

        let mut levels = 0;
        let mut current = nodes.as_slice();
        while let Some(Node::Group(inner)) = current.iter().find(|node| node.group().is_some()) {
            levels += 1;
            current = inner;
        }
        assert_eq!(levels, MAX_GROUP_DEPTH);
    }

    #[test]
    fn drops_empty_statements() {
        let tokens = tokenize("SELECT 1;; ;", LexMode::STANDARD);
        assert_eq!(split_statements(&tokens).len(), 1);
    }

    #[test]
    fn keywords_do_not_look_like_columns() {
        assert!(looks_like_column("user_id"));
        assert!(looks_like_column("用户名"));
        assert!(!looks_like_column("NULL"));
        assert!(!looks_like_column("current_timestamp"));
    }
}
