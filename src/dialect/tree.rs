//! Token tree over sqlparser's tokenizer output.
//!
//! Parenthesized spans become nested groups so rewrites can reach
//! arguments at any depth without a full grammar.

use std::fmt;

use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// A node in the SQL token tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// A single lexical token (word, literal, operator, whitespace, ...).
    Token(Token),
    /// A balanced `( ... )` span. The parentheses themselves are implied.
    Group(Vec<SqlNode>),
}

impl SqlNode {
    /// Returns true for whitespace and comments.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, SqlNode::Token(Token::Whitespace(_)))
    }
}

impl fmt::Display for SqlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlNode::Token(token) => write!(f, "{token}"),
            SqlNode::Group(children) => write!(f, "({})", render(children)),
        }
    }
}

/// Tokenizes `sql` and folds it into a token tree.
///
/// The MySQL tokenizer is used because model output tends to follow MySQL
/// conventions (backtick identifiers). Literal unescaping is disabled so
/// rendering the tree reproduces the input byte for byte.
///
/// Returns `None` when the input does not tokenize or has unbalanced parentheses.
pub fn parse(sql: &str) -> Option<Vec<SqlNode>> {
    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .with_unescape(false)
        .tokenize()
        .ok()?;

    let mut stack: Vec<Vec<SqlNode>> = vec![Vec::new()];
    for token in tokens {
        match token {
            Token::EOF => {}
            Token::LParen => stack.push(Vec::new()),
            Token::RParen => {
                if stack.len() < 2 {
                    return None;
                }
                let children = stack.pop()?;
                stack.last_mut()?.push(SqlNode::Group(children));
            }
            other => stack.last_mut()?.push(SqlNode::Token(other)),
        }
    }

    if stack.len() == 1 {
        stack.pop()
    } else {
        None
    }
}

/// Renders a node sequence back into SQL text.
pub fn render(nodes: &[SqlNode]) -> String {
    nodes.iter().map(ToString::to_string).collect()
}

/// Splits a group's children into comma-separated arguments.
///
/// Each argument is rendered and trimmed. A group holding only whitespace has
/// no arguments.
pub fn split_arguments(children: &[SqlNode]) -> Vec<String> {
    if children.iter().all(SqlNode::is_whitespace) {
        return Vec::new();
    }

    children
        .split(|node| matches!(node, SqlNode::Token(Token::Comma)))
        .map(|arg| render(arg).trim().to_string())
        .collect()
}
