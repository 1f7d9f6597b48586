//! PEP 508 environment markers
//!
//! Handles marker expressions like:
//! - `extra == "ml"`
//! - `python_version >= "3.9" and sys_platform != "win32"`
//! - `(extra == "a" or extra == "b") and os_name == "posix"`
//! - `"arm" in platform_machine`

use super::canonicalize_name;
use crate::error::MarkerError;
use crate::version::{Specifier, Version};
use std::fmt;

const VARIABLES: &[&str] = &[
    "python_version",
    "python_full_version",
    "os_name",
    "sys_platform",
    "platform_release",
    "platform_system",
    "platform_version",
    "platform_machine",
    "platform_python_implementation",
    "implementation_name",
    "implementation_version",
    "extra",
];

/// Values markers are evaluated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerEnvironment {
    pub python_version: String,
    pub python_full_version: String,
    pub os_name: String,
    pub sys_platform: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

impl MarkerEnvironment {
    /// Environment of the current host with a CPython 3.12 interpreter
    ///
    /// `platform_release` and `platform_version` start empty; set them with
    /// [`MarkerEnvironment::set`] or the config file's `markers` table.
    pub fn host() -> Self {
        let (os_name, sys_platform, platform_system) = match std::env::consts::OS {
            "windows" => ("nt", "win32", "Windows"),
            "macos" => ("posix", "darwin", "Darwin"),
            "linux" => ("posix", "linux", "Linux"),
            "freebsd" => ("posix", "freebsd", "FreeBSD"),
            other => ("posix", other, other),
        };
        let platform_machine = match (std::env::consts::OS, std::env::consts::ARCH) {
            ("macos", "aarch64") => "arm64",
            ("windows", "x86_64") => "AMD64",
            (_, arch) => arch,
        };
        Self {
            python_version: "3.12".to_string(),
            python_full_version: "3.12.0".to_string(),
            os_name: os_name.to_string(),
            sys_platform: sys_platform.to_string(),
            platform_release: String::new(),
            platform_system: platform_system.to_string(),
            platform_version: String::new(),
            platform_machine: platform_machine.to_string(),
            platform_python_implementation: "CPython".to_string(),
            implementation_name: "cpython".to_string(),
            implementation_version: "3.12.0".to_string(),
        }
    }

    /// Sets the interpreter version, keeping the full version in sync
    pub fn with_python_version(mut self, version: &str) -> Self {
        let parts: Vec<&str> = version.split('.').collect();
        self.python_version = parts.iter().take(2).cloned().collect::<Vec<_>>().join(".");
        self.python_full_version = if parts.len() >= 3 {
            version.to_string()
        } else {
            format!("{}.0", self.python_version)
        };
        self.implementation_version = self.python_full_version.clone();
        self
    }

    /// Overrides one variable by its marker name.
    ///
    /// Returns false if the name is not a marker variable.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match name {
            "python_version" => {
                *self = self.clone().with_python_version(&value);
                return true;
            }
            "python_full_version" => &mut self.python_full_version,
            "os_name" => &mut self.os_name,
            "sys_platform" => &mut self.sys_platform,
            "platform_release" => &mut self.platform_release,
            "platform_system" => &mut self.platform_system,
            "platform_version" => &mut self.platform_version,
            "platform_machine" => &mut self.platform_machine,
            "platform_python_implementation" => &mut self.platform_python_implementation,
            "implementation_name" => &mut self.implementation_name,
            "implementation_version" => &mut self.implementation_version,
            _ => return false,
        };
        *slot = value;
        true
    }

    fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "python_version" => &self.python_version,
            "python_full_version" => &self.python_full_version,
            "os_name" => &self.os_name,
            "sys_platform" => &self.sys_platform,
            "platform_release" => &self.platform_release,
            "platform_system" => &self.platform_system,
            "platform_version" => &self.platform_version,
            "platform_machine" => &self.platform_machine,
            "platform_python_implementation" => &self.platform_python_implementation,
            "implementation_name" => &self.implementation_name,
            "implementation_version" => &self.implementation_version,
            _ => return None,
        };
        Some(value.as_str())
    }
}

impl Default for MarkerEnvironment {
    fn default() -> Self {
        Self::host()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Variable(String),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Version(&'static str),
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Or(Vec<Node>),
    And(Vec<Node>),
    Compare { lhs: Value, op: Op, rhs: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Str(String),
    Word(String),
    Op(&'static str),
}

/// A parsed environment marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    raw: String,
    tree: Node,
}

impl Marker {
    /// Parse a marker expression
    pub fn parse(input: &str) -> Result<Self, MarkerError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            input,
            tokens: &tokens,
            pos: 0,
        };
        let tree = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(MarkerError::syntax(input, "unexpected trailing input"));
        }
        Ok(Self {
            raw: input.trim().to_string(),
            tree,
        })
    }

    /// Evaluate the marker, with `extra` bound to the requested extra (or empty)
    pub fn evaluate(
        &self,
        env: &MarkerEnvironment,
        extra: Option<&str>,
    ) -> Result<bool, MarkerError> {
        eval(&self.tree, env, extra)
    }

    /// True if the expression refers to the `extra` variable
    pub fn mentions_extra(&self) -> bool {
        fn walk(node: &Node) -> bool {
            match node {
                Node::Or(children) | Node::And(children) => children.iter().any(walk),
                Node::Compare { lhs, rhs, .. } => [lhs, rhs]
                    .iter()
                    .any(|v| matches!(v, Value::Variable(name) if name == "extra")),
            }
        }
        walk(&self.tree)
    }

    /// The expression as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, MarkerError> {
    const OPERATORS: &[&str] = &["===", "==", "!=", "<=", ">=", "~=", "<", ">"];
    let mut tokens = Vec::new();
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
        } else if c == '(' {
            tokens.push(Token::Open);
            rest = &rest[1..];
        } else if c == ')' {
            tokens.push(Token::Close);
            rest = &rest[1..];
        } else if c == '"' || c == '\'' {
            let body = &rest[1..];
            let end = body
                .find(c)
                .ok_or_else(|| MarkerError::syntax(input, "unterminated string"))?;
            tokens.push(Token::Str(body[..end].to_string()));
            rest = &body[end + 1..];
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(Token::Op(*op));
            rest = &rest[op.len()..];
        } else if c.is_ascii_alphabetic() || c == '_' {
            let end = rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'))
                .unwrap_or(rest.len());
            tokens.push(Token::Word(rest[..end].to_string()));
            rest = &rest[end..];
        } else {
            return Err(MarkerError::syntax(
                input,
                format!("unexpected character '{}'", c),
            ));
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    fn parse_or(&mut self) -> Result<Node, MarkerError> {
        let mut nodes = vec![self.parse_and()?];
        while self.is_word("or") {
            self.pos += 1;
            nodes.push(self.parse_and()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Or(nodes)
        })
    }

    fn parse_and(&mut self) -> Result<Node, MarkerError> {
        let mut nodes = vec![self.parse_atom()?];
        while self.is_word("and") {
            self.pos += 1;
            nodes.push(self.parse_atom()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::And(nodes)
        })
    }

    fn parse_atom(&mut self) -> Result<Node, MarkerError> {
        if self.peek() == Some(&Token::Open) {
            self.pos += 1;
            let node = self.parse_or()?;
            if self.next() != Some(&Token::Close) {
                return Err(MarkerError::syntax(self.input, "expected ')'"));
            }
            return Ok(node);
        }
        let lhs = self.parse_value()?;
        let op = self.parse_op()?;
        let rhs = self.parse_value()?;
        Ok(Node::Compare { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<Value, MarkerError> {
        let input = self.input;
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::Literal(s.clone())),
            Some(Token::Word(w)) => {
                let name = legacy_alias(w);
                if VARIABLES.contains(&name) {
                    Ok(Value::Variable(name.to_string()))
                } else {
                    Err(MarkerError::syntax(
                        input,
                        format!("unknown marker variable '{}'", w),
                    ))
                }
            }
            _ => Err(MarkerError::syntax(input, "expected a variable or a string")),
        }
    }

    fn parse_op(&mut self) -> Result<Op, MarkerError> {
        let input = self.input;
        match self.next() {
            Some(Token::Op(op)) => Ok(Op::Version(op)),
            Some(Token::Word(w)) if w == "in" => Ok(Op::In),
            Some(Token::Word(w)) if w == "not" => match self.next() {
                Some(Token::Word(w)) if w == "in" => Ok(Op::NotIn),
                _ => Err(MarkerError::syntax(input, "expected 'in' after 'not'")),
            },
            _ => Err(MarkerError::syntax(input, "expected a comparison operator")),
        }
    }
}

fn legacy_alias(name: &str) -> &str {
    match name {
        "os.name" => "os_name",
        "sys.platform" => "sys_platform",
        "platform.version" => "platform_version",
        "platform.machine" => "platform_machine",
        "platform.python_implementation" | "python_implementation" => {
            "platform_python_implementation"
        }
        other => other,
    }
}

fn resolve(value: &Value, env: &MarkerEnvironment, extra: Option<&str>) -> String {
    match value {
        Value::Literal(s) => s.clone(),
        Value::Variable(name) if name == "extra" => extra.unwrap_or("").to_string(),
        Value::Variable(name) => env.get(name).unwrap_or("").to_string(),
    }
}

fn eval(node: &Node, env: &MarkerEnvironment, extra: Option<&str>) -> Result<bool, MarkerError> {
    match node {
        Node::Or(children) => {
            for child in children {
                if eval(child, env, extra)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Node::And(children) => {
            for child in children {
                if !eval(child, env, extra)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Node::Compare { lhs, op, rhs } => {
            let mut left = resolve(lhs, env, extra);
            let mut right = resolve(rhs, env, extra);
            let is_extra = |v: &Value| matches!(v, Value::Variable(n) if n == "extra");
            if is_extra(lhs) || is_extra(rhs) {
                left = canonicalize_name(&left);
                right = canonicalize_name(&right);
            }
            compare(&left, *op, &right)
        }
    }
}

fn compare(lhs: &str, op: Op, rhs: &str) -> Result<bool, MarkerError> {
    let symbol = match op {
        Op::In => return Ok(rhs.contains(lhs)),
        Op::NotIn => return Ok(!rhs.contains(lhs)),
        Op::Version(symbol) => symbol,
    };

    if symbol != "===" {
        if let (Ok(spec), Ok(version)) = (
            Specifier::parse(&format!("{}{}", symbol, rhs)),
            Version::parse(lhs),
        ) {
            return Ok(spec.contains(&version));
        }
    }

    match symbol {
        "==" | "===" => Ok(lhs == rhs),
        "!=" => Ok(lhs != rhs),
        // Unset variables such as platform_release never satisfy an ordering
        "<" | "<=" | ">" | ">=" if lhs.is_empty() => Ok(false),
        "<" => Ok(lhs < rhs),
        "<=" => Ok(lhs <= rhs),
        ">" => Ok(lhs > rhs),
        ">=" => Ok(lhs >= rhs),
        _ => Err(MarkerError::UndefinedComparison {
            lhs: lhs.to_string(),
            op: symbol.to_string(),
            rhs: rhs.to_string(),
        }),
    }
}
