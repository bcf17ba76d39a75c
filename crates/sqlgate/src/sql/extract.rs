//! Table, alias and column reference extraction.
//!
//! Each SELECT branch, subquery and CTE body becomes a [`Scope`]. A scope
//! records the sources its FROM clause introduces and every column reference
//! that has to resolve against them (or against an enclosing scope, for
//! correlated subqueries). Nothing here knows about the schema.

use super::lexer::{LexMode, Token, tokenize};
use crate::models::schema::names_match;
use super::syntax::{
    Node, is_expression_keyword, is_query, is_reserved, looks_like_column, parse_nodes,
    split_commas, split_statements,
};

/// Output columns of a derived source. `Open` means the names cannot be
/// known without a schema (`SELECT *`, unnamed expressions, table functions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Columns(Vec<String>),
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Table,
    Derived(Projection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub kind: SourceKind,
    pub name: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    /// Column name, or `*` for `qualifier.*`.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    pub parent: Option<usize>,
    pub sources: Vec<Source>,
    pub columns: Vec<ColumnRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryReferences {
    pub scopes: Vec<Scope>,
}

impl QueryReferences {
    /// The scope and its ancestors, innermost first.
    pub fn chain(&self, scope: usize) -> impl Iterator<Item = &Scope> {
        std::iter::successors(self.scopes.get(scope), |current| {
            current.parent.and_then(|parent| self.scopes.get(parent))
        })
    }
}

#[must_use]
pub fn extract_references(sql: &str) -> QueryReferences {
    let tokens = tokenize(sql, LexMode::SQLITE);
    let mut extractor = Extractor::default();
    for statement in split_statements(&tokens) {
        extractor.statement(&parse_nodes(statement));
    }
    QueryReferences {
        scopes: extractor.scopes,
    }
}

const SET_OPERATORS: &[&str] = &["UNION", "INTERSECT", "EXCEPT", "MINUS"];

const JOIN_WORDS: &[&str] = &[
    "JOIN",
    "INNER",
    "LEFT",
    "RIGHT",
    "FULL",
    "OUTER",
    "CROSS",
    "NATURAL",
    "STRAIGHT_JOIN",
    "LATERAL",
    "APPLY",
];

const SELECT_MODIFIERS: &[&str] = &[
    "ALL",
    "DISTINCT",
    "DISTINCTROW",
    "HIGH_PRIORITY",
    "STRAIGHT_JOIN",
    "SQL_SMALL_RESULT",
    "SQL_BIG_RESULT",
    "SQL_BUFFER_RESULT",
    "SQL_CACHE",
    "SQL_NO_CACHE",
    "SQL_CALC_FOUND_ROWS",
];

/// Clause keywords whose bodies hold no column references worth checking.
const TRAILING_CLAUSES: &[&str] = &[
    "LIMIT",
    "OFFSET",
    "FETCH",
    "WINDOW",
    "FOR",
    "LOCK",
    "INTO",
    "PROCEDURE",
];

#[derive(Default)]
struct Extractor {
    scopes: Vec<Scope>,
    /// CTE names visible at the current point, one frame per WITH clause.
    ctes: Vec<Vec<(String, Projection)>>,
}

impl Extractor {
    fn new_scope(&mut self, parent: Option<usize>) -> usize {
        self.scopes.push(Scope {
            parent,
            ..Scope::default()
        });
        self.scopes.len() - 1
    }

    fn push_column(&mut self, scope: usize, qualifier: Option<&str>, name: &str) {
        self.scopes[scope].columns.push(ColumnRef {
            qualifier: qualifier.map(str::to_string),
            name: name.to_string(),
        });
    }

    fn statement(&mut self, nodes: &[Node]) {
        let Some(first) = nodes.first() else {
            return;
        };
        if is_query(nodes) {
            self.query(nodes, None);
            return;
        }
        if first.is_any_keyword(&["DESCRIBE", "DESC", "EXPLAIN"]) {
            let rest = &nodes[1..];
            match rest
                .iter()
                .position(|node| is_query(std::slice::from_ref(node)))
            {
                Some(start) => {
                    self.query(&rest[start..], None);
                }
                None => self.describe(rest),
            }
        }
    }

    /// `DESCRIBE table [column]`.
    fn describe(&mut self, nodes: &[Node]) {
        let (parts, consumed) = dotted_name(nodes);
        let Some(table) = parts.last() else {
            return;
        };
        let scope = self.new_scope(None);
        self.add_table_source(scope, table, parts.len() == 1, None);
        if let Some(column) = nodes.get(consumed).and_then(Node::identifier) {
            self.push_column(scope, Some(table), column);
        }
    }

    fn query(&mut self, nodes: &[Node], parent: Option<usize>) -> Projection {
        if let [Node::Group(inner)] = nodes {
            return self.query(inner, parent);
        }

        let with_clause = nodes.first().is_some_and(|node| node.is_keyword("WITH"));
        let body = if with_clause {
            self.ctes.push(Vec::new());
            self.with_clause(&nodes[1..], parent)
        } else {
            nodes
        };

        let mut first = None;
        for branch in split_set_operations(body) {
            let projection = self.branch(branch, parent, first.as_ref());
            if first.is_none() {
                first = Some(projection);
            }
        }

        if with_clause {
            self.ctes.pop();
        }
        first.unwrap_or(Projection::Open)
    }

    fn with_clause<'a>(&mut self, nodes: &'a [Node], parent: Option<usize>) -> &'a [Node] {
        let mut index = usize::from(nodes.first().is_some_and(|node| node.is_keyword("RECURSIVE")));
        while let Some(name) = nodes.get(index).and_then(Node::identifier) {
            let name = name.to_string();
            index += 1;

            let declared = nodes.get(index).and_then(Node::group).map(identifiers_in);
            if declared.is_some() {
                index += 1;
            }
            if nodes.get(index).is_some_and(|node| node.is_keyword("AS")) {
                index += 1;
            }
            while nodes
                .get(index)
                .is_some_and(|node| node.is_any_keyword(&["NOT", "MATERIALIZED"]))
            {
                index += 1;
            }
            let Some(body) = nodes.get(index).and_then(Node::group) else {
                break;
            };
            index += 1;

            // Registered before the body so recursive CTEs can name themselves.
            let provisional = declared.clone().map_or(Projection::Open, Projection::Columns);
            self.register_cte(&name, provisional);
            let inferred = self.query(body, parent);
            self.register_cte(&name, declared.map_or(inferred, Projection::Columns));

            if nodes.get(index).is_some_and(|node| node.is_punct(',')) {
                index += 1;
            } else {
                break;
            }
        }
        &nodes[index.min(nodes.len())..]
    }

    fn register_cte(&mut self, name: &str, projection: Projection) {
        let Some(frame) = self.ctes.last_mut() else {
            return;
        };
        match frame
            .iter_mut()
            .find(|(existing, _)| names_match(existing, name))
        {
            Some(entry) => entry.1 = projection,
            None => frame.push((name.to_string(), projection)),
        }
    }

    fn lookup_cte(&self, name: &str) -> Option<Projection> {
        self.ctes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|(existing, _)| names_match(existing, name))
            .map(|(_, projection)| projection.clone())
    }

    /// `first` is the projection of the set operation's first branch, if this
    /// is not it.
    fn branch(
        &mut self,
        nodes: &[Node],
        parent: Option<usize>,
        first: Option<&Projection>,
    ) -> Projection {
        let union_names: &[String] = match first {
            Some(Projection::Columns(names)) => names.as_slice(),
            _ => &[],
        };
        match nodes.first() {
            Some(Node::Group(inner)) => {
                let projection = self.query(inner, parent);
                let output = match (first, &projection) {
                    (Some(Projection::Open), _) | (_, Projection::Open) => Projection::Open,
                    (Some(Projection::Columns(names)), Projection::Columns(own)) => {
                        Projection::Columns(names.iter().chain(own).cloned().collect())
                    }
                    (None, own) => own.clone(),
                };
                self.compound_tail(&nodes[1..], parent, output);
                projection
            }
            Some(keyword) if keyword.is_keyword("SELECT") => {
                self.select(nodes, parent, union_names)
            }
            Some(keyword) if keyword.is_keyword("TABLE") => {
                let scope = self.new_scope(parent);
                let (parts, _) = dotted_name(&nodes[1..]);
                if let Some(table) = parts.last() {
                    self.add_table_source(scope, table, parts.len() == 1, None);
                }
                Projection::Open
            }
            _ => Projection::Open,
        }
    }

    /// Clauses after a parenthesized branch apply to the whole set operation
    /// and only see its output columns.
    fn compound_tail(&mut self, nodes: &[Node], parent: Option<usize>, output: Projection) {
        let clauses = Clauses::segment(nodes);
        if clauses.order_by.is_empty() {
            return;
        }
        let scope = self.new_scope(parent);
        self.scopes[scope].sources.push(Source {
            kind: SourceKind::Derived(output),
            name: None,
            alias: None,
        });
        self.expression(clauses.order_by, scope, &[]);
    }

    fn select(
        &mut self,
        nodes: &[Node],
        parent: Option<usize>,
        union_names: &[String],
    ) -> Projection {
        let scope = self.new_scope(parent);
        let clauses = Clauses::segment(nodes);

        self.from_clause(clauses.from, scope);
        let (projection, mut visible) = self.select_list(clauses.select, scope);
        self.expression(clauses.filter, scope, &[]);
        self.expression(clauses.group_by, scope, &visible);
        self.expression(clauses.having, scope, &visible);
        visible.extend(union_names.iter().cloned());
        self.expression(clauses.order_by, scope, &visible);
        self.expression(clauses.qualify, scope, &visible);

        projection
    }

    /// Returns the branch projection and the aliases the select list defines.
    fn select_list(&mut self, nodes: &[Node], scope: usize) -> (Projection, Vec<String>) {
        let nodes = self.skip_select_modifiers(nodes, scope);
        let mut names = Vec::new();
        let mut aliases = Vec::new();
        let mut open = false;

        for item in split_commas(nodes) {
            let (expression, alias) = split_alias(item);
            self.expression(expression, scope, &[]);
            match alias {
                Some(alias) => {
                    names.push(alias.clone());
                    aliases.push(alias);
                }
                None => match output_name(expression) {
                    Some(name) => names.push(name),
                    None => open = true,
                },
            }
        }

        let projection = if open {
            Projection::Open
        } else {
            Projection::Columns(names)
        };
        (projection, aliases)
    }

    fn skip_select_modifiers<'a>(&mut self, nodes: &'a [Node], scope: usize) -> &'a [Node] {
        let mut index = 0;
        while let Some(node) = nodes.get(index) {
            if node.is_keyword("ON") && index > 0 && nodes[index - 1].is_keyword("DISTINCT") {
                // DISTINCT ON (expr, ...)
                if let Some(group) = nodes.get(index + 1).and_then(Node::group) {
                    self.expression(group, scope, &[]);
                    index += 1;
                }
                index += 1;
            } else if node.is_keyword("TOP") {
                index += 2;
                if nodes.get(index).is_some_and(|next| next.is_keyword("PERCENT")) {
                    index += 1;
                }
            } else if node.is_any_keyword(SELECT_MODIFIERS) {
                index += 1;
            } else {
                break;
            }
        }
        &nodes[index.min(nodes.len())..]
    }

    fn from_clause(&mut self, nodes: &[Node], scope: usize) {
        let mut index = 0;
        while index < nodes.len() {
            let node = &nodes[index];
            if node.is_punct(',') || is_join_word(nodes, index) {
                index += 1;
            } else if node.is_keyword("ON") {
                let end = join_boundary(nodes, index + 1);
                self.expression(&nodes[index + 1..end], scope, &[]);
                index = end;
            } else if node.is_keyword("USING") {
                if let Some(group) = nodes.get(index + 1).and_then(Node::group) {
                    for column in identifiers_in(group) {
                        self.push_column(scope, None, &column);
                    }
                    index += 1;
                }
                index += 1;
            } else {
                index = self.table_factor(nodes, index, scope);
            }
        }
    }

    /// Reads one table factor starting at `index` and returns the index after it.
    fn table_factor(&mut self, nodes: &[Node], index: usize, scope: usize) -> usize {
        if let Some(inner) = nodes[index].group() {
            if !is_query(inner) {
                // Parenthesized join: `FROM (a JOIN b ON ...)`.
                self.from_clause(inner, scope);
                return index + 1;
            }
            let lateral = index > 0 && nodes[index - 1].is_keyword("LATERAL");
            let parent = if lateral {
                Some(scope)
            } else {
                self.scopes[scope].parent
            };
            let projection = self.query(inner, parent);
            let (alias, columns, next) = read_alias(nodes, index + 1);
            self.scopes[scope].sources.push(Source {
                kind: SourceKind::Derived(columns.map_or(projection, Projection::Columns)),
                name: None,
                alias,
            });
            return next;
        }

        let (parts, consumed) = dotted_name(&nodes[index..]);
        let Some(table) = parts.last().cloned() else {
            return index + 1;
        };
        let mut next = index + consumed;

        if let Some(arguments) = nodes.get(next).and_then(Node::group) {
            // Table-valued function: `FROM generate_series(1, 10) AS g(n)`.
            self.expression(arguments, scope, &[]);
            let (alias, columns, after) = read_alias(nodes, next + 1);
            self.scopes[scope].sources.push(Source {
                kind: SourceKind::Derived(columns.map_or(Projection::Open, Projection::Columns)),
                name: Some(table),
                alias,
            });
            return after;
        }

        next = skip_partition_selection(nodes, next);
        let (alias, _, after) = read_alias(nodes, next);
        self.add_table_source(scope, &table, parts.len() == 1, alias);
        skip_index_hints(nodes, after)
    }

    fn add_table_source(
        &mut self,
        scope: usize,
        table: &str,
        unqualified: bool,
        alias: Option<String>,
    ) {
        let cte = if unqualified {
            self.lookup_cte(table)
        } else {
            None
        };
        let kind = cte.map_or(SourceKind::Table, SourceKind::Derived);
        self.scopes[scope].sources.push(Source {
            kind,
            name: Some(table.to_string()),
            alias,
        });
    }

    fn expression(&mut self, nodes: &[Node], scope: usize, aliases: &[String]) {
        let mut index = 0;
        while index < nodes.len() {
            index = self.expression_node(nodes, index, scope, aliases);
        }
    }

    /// Visits the node at `index` and returns the index of the next one.
    fn expression_node(
        &mut self,
        nodes: &[Node],
        index: usize,
        scope: usize,
        aliases: &[String],
    ) -> usize {
        let next = nodes.get(index + 1);
        let token = match &nodes[index] {
            Node::Group(inner) => {
                if is_query(inner) {
                    self.query(inner, Some(scope));
                } else {
                    self.expression(inner, scope, aliases);
                }
                return index + 1;
            }
            Node::Leaf(token) => token,
        };

        let followed_by_group = next.is_some_and(|node| node.group().is_some());
        match token {
            // `x::numeric(10, 2)`
            Token::Operator(op) if op == "::" => {
                if followed_by_group_at(nodes, index + 2) {
                    index + 3
                } else {
                    index + 2
                }
            }
            Token::Word(word) if word.eq_ignore_ascii_case("CONVERT") && followed_by_group => {
                // CONVERT(expr, type) and CONVERT(expr USING charset)
                let first_argument = next
                    .and_then(Node::group)
                    .and_then(|arguments| split_commas(arguments).first().copied());
                if let Some(first) = first_argument {
                    let value_end = first
                        .iter()
                        .position(|node| node.is_keyword("USING"))
                        .unwrap_or(first.len());
                    self.expression(&first[..value_end], scope, aliases);
                }
                index + 2
            }
            Token::Word(word) if followed_by_group && !is_expression_keyword(word) => {
                // Function call; the argument group is visited next.
                index + 1
            }
            // Everything after AS inside CAST(... AS type) is the type.
            Token::Word(word) if word.eq_ignore_ascii_case("AS") => nodes.len(),
            Token::Word(word)
                if word.eq_ignore_ascii_case("COLLATE") || word.eq_ignore_ascii_case("USING") =>
            {
                index + 2
            }
            Token::Word(word) if word.eq_ignore_ascii_case("OVER") && !followed_by_group => index + 2,
            Token::Word(word)
                if word.eq_ignore_ascii_case("AT") && next.is_some_and(|node| node.is_keyword("TIME")) =>
            {
                index + 3
            }
            // Typed literal: DATE '2024-01-01', INTERVAL '1' DAY, N'text'.
            Token::Word(_) if next.is_some_and(|node| matches!(node.token(), Some(Token::Str(_)))) => {
                index + 1
            }
            Token::Word(_) | Token::QuotedIdent(_) => {
                self.column_reference(nodes, index, scope, aliases)
            }
            _ => index + 1,
        }
    }

    fn column_reference(
        &mut self,
        nodes: &[Node],
        index: usize,
        scope: usize,
        aliases: &[String],
    ) -> usize {
        let Some(first) = nodes[index].identifier() else {
            return index + 1;
        };
        let mut parts = vec![first.to_string()];
        let mut wildcard = false;
        let mut end = index + 1;
        while nodes.get(end).is_some_and(|node| node.is_punct('.')) {
            match nodes.get(end + 1) {
                Some(node) if node.is_punct('*') => {
                    wildcard = true;
                    end += 2;
                    break;
                }
                Some(node) => match node.identifier() {
                    Some(part) => {
                        parts.push(part.to_string());
                        end += 2;
                    }
                    None => break,
                },
                None => break,
            }
        }

        if followed_by_group_at(nodes, end) {
            // Qualified function call such as `pg_catalog.lower(x)`.
            return end;
        }

        if wildcard {
            if let Some(qualifier) = parts.last() {
                self.push_column(scope, Some(qualifier), "*");
            }
            return end;
        }

        if let [.., qualifier, column] = parts.as_slice() {
            self.push_column(scope, Some(qualifier), column);
            return end;
        }

        let quoted = matches!(nodes[index].token(), Some(Token::QuotedIdent(_)));
        let is_alias = aliases.iter().any(|alias| names_match(alias, first));
        if !is_alias && (quoted || (looks_like_column(first) && !is_reserved(first))) {
            self.push_column(scope, None, first);
        }
        end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseKind {
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Qualify,
    Trailing,
}

#[derive(Debug, Default)]
struct Clauses<'a> {
    select: &'a [Node],
    from: &'a [Node],
    filter: &'a [Node],
    group_by: &'a [Node],
    having: &'a [Node],
    order_by: &'a [Node],
    qualify: &'a [Node],
}

impl<'a> Clauses<'a> {
    /// Splits one SELECT branch at its top-level clause keywords.
    fn segment(nodes: &'a [Node]) -> Self {
        let mut marks: Vec<(ClauseKind, usize, usize)> = Vec::new();
        let mut index = 0;
        while let Some(node) = nodes.get(index) {
            let followed_by_by = nodes.get(index + 1).is_some_and(|next| next.is_keyword("BY"));
            let after_distinct = index > 0 && nodes[index - 1].is_keyword("DISTINCT");
            let mark = if node.is_keyword("SELECT") && marks.is_empty() {
                Some((ClauseKind::Select, 1))
            } else if node.is_keyword("FROM") && !after_distinct {
                Some((ClauseKind::From, 1))
            } else if node.is_keyword("WHERE") {
                Some((ClauseKind::Where, 1))
            } else if node.is_keyword("GROUP") && followed_by_by {
                Some((ClauseKind::GroupBy, 2))
            } else if node.is_keyword("HAVING") {
                Some((ClauseKind::Having, 1))
            } else if node.is_keyword("ORDER") && followed_by_by {
                Some((ClauseKind::OrderBy, 2))
            } else if node.is_keyword("QUALIFY") {
                Some((ClauseKind::Qualify, 1))
            } else if node.is_any_keyword(TRAILING_CLAUSES) {
                Some((ClauseKind::Trailing, 1))
            } else {
                None
            };

            match mark {
                Some((kind, width)) => {
                    marks.push((kind, index, index + width));
                    index += width;
                }
                None => index += 1,
            }
        }

        let mut clauses = Self::default();
        for (position, (kind, _, start)) in marks.iter().enumerate() {
            let end = marks
                .get(position + 1)
                .map_or(nodes.len(), |(_, keyword, _)| *keyword);
            let body = &nodes[(*start).min(end)..end];
            match kind {
                ClauseKind::Select => clauses.select = body,
                ClauseKind::From => clauses.from = body,
                ClauseKind::Where => clauses.filter = body,
                ClauseKind::GroupBy => clauses.group_by = body,
                ClauseKind::Having => clauses.having = body,
                ClauseKind::OrderBy => clauses.order_by = body,
                ClauseKind::Qualify => clauses.qualify = body,
                ClauseKind::Trailing => {}
            }
        }
        clauses
    }
}

fn split_set_operations(nodes: &[Node]) -> Vec<&[Node]> {
    let mut branches = Vec::new();
    let mut start = 0;
    let mut index = 0;
    while index < nodes.len() {
        if nodes[index].is_any_keyword(SET_OPERATORS) {
            branches.push(&nodes[start..index]);
            index += 1;
            if nodes
                .get(index)
                .is_some_and(|node| node.is_any_keyword(&["ALL", "DISTINCT"]))
            {
                index += 1;
            }
            start = index;
        } else {
            index += 1;
        }
    }
    branches.push(&nodes[start.min(nodes.len())..]);
    branches.retain(|branch| !branch.is_empty());
    branches
}

/// Reads `name(.name)*` and returns the parts and the number of nodes used.
fn dotted_name(nodes: &[Node]) -> (Vec<String>, usize) {
    let Some(first) = nodes.first().and_then(Node::name) else {
        return (Vec::new(), 0);
    };
    let mut parts = vec![first.to_string()];
    let mut index = 1;
    while nodes.get(index).is_some_and(|node| node.is_punct('.')) {
        match nodes.get(index + 1).and_then(Node::identifier) {
            Some(part) => {
                parts.push(part.to_string());
                index += 2;
            }
            None => break,
        }
    }
    (parts, index)
}

/// Reads `[AS] alias [(col, ...)]` at `index`.
fn read_alias(nodes: &[Node], index: usize) -> (Option<String>, Option<Vec<String>>, usize) {
    let explicit = nodes.get(index).is_some_and(|node| node.is_keyword("AS"));
    let position = index + usize::from(explicit);
    let alias = nodes.get(position).and_then(|node| {
        if explicit {
            node.identifier()
        } else {
            node.name()
        }
    });
    let Some(alias) = alias else {
        return (None, None, position);
    };

    let columns = nodes.get(position + 1).and_then(Node::group).map(identifiers_in);
    let next = position + 1 + usize::from(columns.is_some());
    (Some(alias.to_string()), columns, next)
}

fn identifiers_in(nodes: &[Node]) -> Vec<String> {
    split_commas(nodes)
        .into_iter()
        .filter_map(|item| item.first().and_then(Node::identifier))
        .map(str::to_string)
        .collect()
}

/// Splits `expr [AS] alias` into the expression and the alias.
fn split_alias(item: &[Node]) -> (&[Node], Option<String>) {
    let len = item.len();
    if len >= 3 && item[len - 2].is_keyword("AS") {
        if let Some(alias) = alias_text(&item[len - 1]) {
            return (&item[..len - 2], Some(alias));
        }
    }

    if len >= 2 && can_precede_alias(&item[len - 2]) {
        let implicit = item[len - 1]
            .name()
            .filter(|alias| !is_expression_keyword(alias));
        if let Some(alias) = implicit {
            return (&item[..len - 1], Some(alias.to_string()));
        }
    }

    (item, None)
}

fn alias_text(node: &Node) -> Option<String> {
    match node.token()? {
        Token::Word(text) | Token::QuotedIdent(text) | Token::Str(text) => Some(text.clone()),
        _ => None,
    }
}

/// Whether an implicit alias may follow `node` (`COUNT(*) total`, `name label`).
fn can_precede_alias(node: &Node) -> bool {
    match node {
        Node::Group(_) => true,
        Node::Leaf(token) => match token {
            Token::Word(word) => {
                ["END", "NULL", "TRUE", "FALSE"]
                    .iter()
                    .any(|keyword| word.eq_ignore_ascii_case(keyword))
                    || (!is_expression_keyword(word) && !is_reserved(word))
            }
            Token::QuotedIdent(_) | Token::Str(_) | Token::Number(_) | Token::Param(_) => true,
            Token::Punct(_) | Token::Operator(_) => false,
        },
    }
}

/// Output column name of an unaliased select item; `None` for `*` and for
/// expressions the server names itself.
fn output_name(expression: &[Node]) -> Option<String> {
    let (parts, consumed) = dotted_name(expression);
    if consumed == expression.len() {
        return parts.last().cloned();
    }
    match expression {
        [Node::Leaf(Token::QuotedIdent(name))] => Some(name.clone()),
        _ => None,
    }
}

fn followed_by_group_at(nodes: &[Node], index: usize) -> bool {
    nodes.get(index).is_some_and(|node| node.group().is_some())
}

fn is_join_word(nodes: &[Node], index: usize) -> bool {
    let node = &nodes[index];
    // LEFT(...) and RIGHT(...) are string functions inside ON conditions.
    node.is_any_keyword(JOIN_WORDS) && !followed_by_group_at(nodes, index + 1)
        || (node.is_keyword("LATERAL") && followed_by_group_at(nodes, index + 1))
}

fn join_boundary(nodes: &[Node], start: usize) -> usize {
    (start..nodes.len())
        .find(|index| nodes[*index].is_punct(',') || is_join_word(nodes, *index))
        .unwrap_or(nodes.len())
}

/// MySQL `PARTITION (p0, p1)` after a table name.
fn skip_partition_selection(nodes: &[Node], index: usize) -> usize {
    if nodes.get(index).is_some_and(|node| node.is_keyword("PARTITION"))
        && followed_by_group_at(nodes, index + 1)
    {
        index + 2
    } else {
        index
    }
}

/// MySQL index hints: `USE INDEX (idx)`, `FORCE KEY FOR JOIN (idx)`, ...
fn skip_index_hints(nodes: &[Node], mut index: usize) -> usize {
    while nodes
        .get(index)
        .is_some_and(|node| node.is_any_keyword(&["USE", "FORCE", "IGNORE"]))
        && nodes
            .get(index + 1)
            .is_some_and(|node| node.is_any_keyword(&["INDEX", "KEY"]))
    {
        index += 2;
        while nodes
            .get(index)
            .is_some_and(|node| node.is_any_keyword(&["FOR", "JOIN", "ORDER", "GROUP", "BY"]))
        {
            index += 1;
        }
        if followed_by_group_at(nodes, index) {
            index += 1;
        }
    }
    index
}
