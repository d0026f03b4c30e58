//! Rewrite rules applied by the dialect normalizer.
//!
//! Each rule either maps a single token or replaces a whole function call.
//! Adding a pattern means adding an entry to [`default_rules`]; the tree
//! traversal in the parent module never changes.

use sqlparser::tokenizer::{Token, Word};

/// A function call found in the token tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    /// Function name, uppercased.
    pub name: String,
    /// Rendered, trimmed arguments (already normalized).
    pub args: Vec<String>,
}

/// A single syntactic rewrite.
pub trait RewriteRule: Send + Sync {
    /// Short identifier used in debug logs.
    fn name(&self) -> &'static str;

    /// Replaces a single token. Return `None` to leave it unchanged.
    fn rewrite_token(&self, _token: &Token) -> Option<Token> {
        None
    }

    /// Replaces a function call with new SQL text. Return `None` to leave it unchanged.
    fn rewrite_call(&self, _call: &FunctionCall) -> Option<String> {
        None
    }
}

/// `` `ident` `` -> `"ident"`.
#[derive(Debug, Default)]
pub struct QuoteIdentifiers;

impl RewriteRule for QuoteIdentifiers {
    fn name(&self) -> &'static str {
        "backtick-identifiers"
    }

    fn rewrite_token(&self, token: &Token) -> Option<Token> {
        match token {
            Token::Word(Word {
                value,
                quote_style: Some('`'),
                ..
            }) => Some(Token::make_word(value, Some('"'))),
            _ => None,
        }
    }
}

/// Rewrites calls to one function with a fixed arity.
pub struct CallRewrite {
    name: &'static str,
    function: &'static str,
    arity: usize,
    rewrite: fn(&[String]) -> Option<String>,
}

impl CallRewrite {
    /// Creates a rule for `function` called with exactly `arity` arguments.
    pub fn new(
        name: &'static str,
        function: &'static str,
        arity: usize,
        rewrite: fn(&[String]) -> Option<String>,
    ) -> Self {
        Self {
            name,
            function,
            arity,
            rewrite,
        }
    }
}

impl RewriteRule for CallRewrite {
    fn name(&self) -> &'static str {
        self.name
    }

    fn rewrite_call(&self, call: &FunctionCall) -> Option<String> {
        if call.name != self.function || call.args.len() != self.arity {
            return None;
        }
        (self.rewrite)(&call.args)
    }
}

/// Returns true if `expr` is already an explicit numeric cast.
fn is_numeric_cast(expr: &str) -> bool {
    let compact: String = expr
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    (compact.starts_with("CAST(")
        && (compact.ends_with("ASNUMERIC)") || compact.ends_with("ASDECIMAL)")))
        || compact.ends_with("::NUMERIC")
        || compact.ends_with("::DECIMAL")
}

/// The MySQL → PostgreSQL rewrites, in application order.
pub fn default_rules() -> Vec<Box<dyn RewriteRule>> {
    vec![
        Box::new(QuoteIdentifiers),
        Box::new(CallRewrite::new(
            "now-to-current-timestamp",
            "NOW",
            0,
            |_| Some("CURRENT_TIMESTAMP".to_string()),
        )),
        Box::new(CallRewrite::new(
            "ifnull-to-coalesce",
            "IFNULL",
            2,
            |args| Some(format!("COALESCE({}, {})", args[0], args[1])),
        )),
        Box::new(CallRewrite::new("date-to-cast", "DATE", 1, |args| {
            Some(format!("CAST({} AS DATE)", args[0]))
        })),
        Box::new(CallRewrite::new("round-numeric", "ROUND", 2, |args| {
            if is_numeric_cast(&args[0]) {
                return None;
            }
            Some(format!("ROUND(CAST({} AS NUMERIC), {})", args[0], args[1]))
        })),
        // Only the month-name pattern has a supported translation.
        Box::new(CallRewrite::new(
            "format-date-to-char",
            "FORMAT_DATE",
            2,
            |args| (args[0] == "'%B'").then(|| format!("TO_CHAR({}, 'Month')", args[1])),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[&str]) -> FunctionCall {
        FunctionCall {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn apply(call: &FunctionCall) -> Option<String> {
        default_rules().iter().find_map(|rule| rule.rewrite_call(call))
    }

    #[test]
    fn test_quote_identifiers() {
        let token = Token::make_word("col", Some('`'));
        let rewritten = QuoteIdentifiers.rewrite_token(&token).unwrap();
        assert_eq!(rewritten.to_string(), "\"col\"");

        let plain = Token::make_word("col", None);
        assert!(QuoteIdentifiers.rewrite_token(&plain).is_none());
    }

    #[test]
    fn test_arity_must_match() {
        assert_eq!(apply(&call("NOW", &[])), Some("CURRENT_TIMESTAMP".to_string()));
        assert_eq!(apply(&call("NOW", &["1"])), None);
        assert_eq!(apply(&call("IFNULL", &["a"])), None);
        assert_eq!(apply(&call("DATE", &["a", "b"])), None);
        assert_eq!(apply(&call("ROUND", &["x"])), None);
    }

    #[test]
    fn test_round_skips_existing_cast() {
        assert_eq!(apply(&call("ROUND", &["CAST(x AS NUMERIC)", "2"])), None);
        assert_eq!(apply(&call("ROUND", &["x::numeric", "2"])), None);
        assert_eq!(
            apply(&call("ROUND", &["x", "2"])),
            Some("ROUND(CAST(x AS NUMERIC), 2)".to_string())
        );
    }

    #[test]
    fn test_format_date_only_month_name() {
        assert_eq!(
            apply(&call("FORMAT_DATE", &["'%B'", "d"])),
            Some("TO_CHAR(d, 'Month')".to_string())
        );
        assert_eq!(apply(&call("FORMAT_DATE", &["'%Y'", "d"])), None);
    }

    #[test]
    fn test_unknown_function_untouched() {
        assert_eq!(apply(&call("SUM", &["x"])), None);
    }
}
