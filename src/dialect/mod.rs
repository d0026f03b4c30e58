//! SQL dialect normalization.
//!
//! Rewrites SQL produced by a language model into syntax PostgreSQL accepts.
//! This is a best-effort syntactic pass over a token tree, not a translator:
//! only the patterns in the rule table are touched and anything else is
//! left for the validator to reject.

mod rules;
mod tree;

pub use rules::{default_rules, CallRewrite, FunctionCall, QuoteIdentifiers, RewriteRule};
pub use tree::{parse, render, split_arguments, SqlNode};

use sqlparser::tokenizer::Token;
use tracing::debug;

/// Applies a table of rewrite rules to every level of a SQL token tree.
pub struct DialectNormalizer {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl Default for DialectNormalizer {
    fn default() -> Self {
        Self::postgres()
    }
}

impl DialectNormalizer {
    /// Creates a normalizer with the built-in PostgreSQL rules.
    pub fn postgres() -> Self {
        Self::with_rules(default_rules())
    }

    /// Creates a normalizer with a custom rule table.
    pub fn with_rules(rules: Vec<Box<dyn RewriteRule>>) -> Self {
        Self { rules }
    }

    /// Appends a rule to the table.
    pub fn with_rule(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Normalizes `sql`, returning the trimmed result.
    ///
    /// Input that cannot be tokenized (or has unbalanced parentheses) is
    /// returned trimmed but otherwise unchanged.
    pub fn normalize(&self, sql: &str) -> String {
        let Some(mut nodes) = parse(sql) else {
            debug!("SQL could not be tokenized, skipping normalization");
            return sql.trim().to_string();
        };

        self.rewrite_nodes(&mut nodes);
        render(&nodes).trim().to_string()
    }

    fn rewrite_nodes(&self, nodes: &mut Vec<SqlNode>) {
        for node in nodes.iter_mut() {
            match node {
                SqlNode::Group(children) => self.rewrite_nodes(children),
                SqlNode::Token(token) => {
                    if let Some(replacement) = self.rewrite_token(token) {
                        *token = replacement;
                    }
                }
            }
        }

        let mut i = 0;
        while i + 1 < nodes.len() {
            let replacement = function_call_at(nodes, i).and_then(|(call, end)| {
                let sql = self.rewrite_call(&call)?;
                Some((parse(&sql)?, end))
            });

            match replacement {
                Some((new_nodes, end)) => {
                    let len = new_nodes.len();
                    nodes.splice(i..end, new_nodes);
                    i += len.max(1);
                }
                None => i += 1,
            }
        }
    }

    fn rewrite_token(&self, token: &Token) -> Option<Token> {
        self.rules.iter().find_map(|rule| rule.rewrite_token(token))
    }

    fn rewrite_call(&self, call: &FunctionCall) -> Option<String> {
        self.rules.iter().find_map(|rule| {
            let rewritten = rule.rewrite_call(call)?;
            debug!(rule = rule.name(), function = %call.name, "Rewrote function call");
            Some(rewritten)
        })
    }
}

/// Recognizes `name(args)` starting at `nodes[i]`, returning the call and the
/// index just past its group.
///
/// The name must be an unquoted word followed by a group, optionally with
/// whitespace in between, and must not be qualified (`schema.name(...)`).
fn function_call_at(nodes: &[SqlNode], i: usize) -> Option<(FunctionCall, usize)> {
    let SqlNode::Token(Token::Word(word)) = &nodes[i] else {
        return None;
    };
    if word.quote_style.is_some() {
        return None;
    }
    let group_at = (i + 1..nodes.len()).find(|&j| !nodes[j].is_whitespace())?;
    let SqlNode::Group(children) = &nodes[group_at] else {
        return None;
    };

    let qualified = nodes[..i]
        .iter()
        .rev()
        .find(|node| !node.is_whitespace())
        .is_some_and(|node| matches!(node, SqlNode::Token(Token::Period)));
    if qualified {
        return None;
    }

    let call = FunctionCall {
        name: word.value.to_uppercase(),
        args: split_arguments(children),
    };
    Some((call, group_at + 1))
}

/// Normalizes `sql` with the built-in PostgreSQL rules.
pub fn normalize_postgres(sql: &str) -> String {
    DialectNormalizer::postgres().normalize(sql)
}
