//! Deterministic cache-key derivation for function calls
//!
//! A key is built from the function's identity, an optional namespace and
//! the positional call arguments:
//!
//! ```text
//! {module}:{qualname}|[{namespace}|]{arg1}:{arg2}:...
//! ```
//!
//! Keyword arguments are rejected, since two logically identical calls could
//! otherwise spell them in a different order. Methods must be declared as
//! such up front with [`KeyGenerator::method`]; the receiver is then dropped
//! from the key material. That is only sound when the cached result depends
//! on nothing but the explicit arguments.

use crate::error::{CacheError, CacheResult};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

/// Identity of a cached function: defining module plus qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnIdentity {
    /// Module path the function is defined in
    pub module: String,
    /// Qualified name (`Type::method` or `function`)
    pub qualname: String,
}

impl FnIdentity {
    /// Create an identity from its parts
    pub fn new(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            qualname: qualname.into(),
        }
    }
}

impl fmt::Display for FnIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.qualname)
    }
}

/// Build an [`FnIdentity`] for a function path at the call site
///
/// ```
/// use regioncache::fn_identity;
///
/// let id = fn_identity!(Repo::fetch);
/// assert_eq!(id.qualname, "Repo::fetch");
/// ```
#[macro_export]
macro_rules! fn_identity {
    ($($path:tt)+) => {
        $crate::cache::key::FnIdentity::new(
            module_path!(),
            stringify!($($path)+).replace(' ', ""),
        )
    };
}

/// A single positional argument used as key material
#[derive(Debug, Clone, PartialEq)]
pub enum CacheArg {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Unit,
}

impl CacheArg {
    /// Render the argument for inclusion in a key
    ///
    /// Strings are quoted with `'` and `\` escaped, so no string can render
    /// like a number, a boolean or a different argument list. Floats always
    /// keep a decimal point (`1.0`, never `1`).
    pub fn render(&self) -> String {
        match self {
            Self::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    if c == '\'' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('\'');
                out
            }
            Self::Int(n) => n.to_string(),
            Self::UInt(n) => n.to_string(),
            Self::Float(x) => format!("{:?}", x),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Unit => "None".to_string(),
        }
    }
}

impl From<&str> for CacheArg {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for CacheArg {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for CacheArg {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i32> for CacheArg {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for CacheArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for CacheArg {
    fn from(value: u32) -> Self {
        Self::UInt(u64::from(value))
    }
}

impl From<u64> for CacheArg {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<usize> for CacheArg {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

impl From<f64> for CacheArg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CacheArg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<()> for CacheArg {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl<T: Into<CacheArg>> From<Option<T>> for CacheArg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unit, Into::into)
    }
}

/// Arguments of a single invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional arguments in call order
    pub positional: Vec<CacheArg>,
    /// Keyword arguments; any entry here makes key generation fail
    pub keyword: Vec<(String, CacheArg)>,
}

impl CallArgs {
    /// Positional-only arguments
    pub fn positional<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<CacheArg>,
    {
        Self {
            positional: args.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }

    /// Add a keyword argument
    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<CacheArg>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }
}

/// How the first positional argument is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Plain function: all positional arguments are key material
    Function,
    /// Method: the first positional argument is the receiver and is skipped
    Method,
}

/// Derives cache keys for one function within one namespace
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: String,
    kind: CallKind,
    mangle: bool,
}

impl KeyGenerator {
    /// Key generator for a plain function
    pub fn function(namespace: Option<&str>, id: FnIdentity) -> Self {
        Self::new(namespace, id, CallKind::Function)
    }

    /// Key generator for a method whose first argument is the receiver
    ///
    /// The receiver never reaches the key, so two instances share cache
    /// entries. Only use this for methods that are pure with respect to
    /// their explicit arguments.
    pub fn method(namespace: Option<&str>, id: FnIdentity) -> Self {
        Self::new(namespace, id, CallKind::Method)
    }

    fn new(namespace: Option<&str>, id: FnIdentity, kind: CallKind) -> Self {
        let prefix = match namespace {
            Some(ns) => format!("{}|{}|", id, ns),
            None => format!("{}|", id),
        };
        Self {
            prefix,
            kind,
            mangle: false,
        }
    }

    /// Replace the argument portion of every key with its SHA-256 digest
    ///
    /// Keeps keys bounded in length for backends that limit them. The
    /// function and namespace prefix stays readable.
    pub fn mangled(mut self) -> Self {
        self.mangle = true;
        self
    }

    /// The `{module}:{qualname}|[{namespace}|]` prefix shared by all keys
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether the first argument is treated as a receiver
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    /// Derive the key for one invocation
    pub fn generate(&self, args: &CallArgs) -> CacheResult<String> {
        if !args.keyword.is_empty() {
            return Err(CacheError::UnsupportedArguments {
                keywords: args.keyword.iter().map(|(k, _)| k.clone()).collect(),
            });
        }

        let material = match self.kind {
            CallKind::Function => &args.positional[..],
            CallKind::Method => match args.positional.split_first() {
                Some((_receiver, rest)) => rest,
                None => {
                    return Err(CacheError::MissingReceiver {
                        function: self.prefix.trim_end_matches('|').to_string(),
                    })
                }
            },
        };

        let rendered = material
            .iter()
            .map(CacheArg::render)
            .collect::<Vec<_>>()
            .join(":");

        let key = if self.mangle {
            format!("{}{}", self.prefix, sha256_hex(&rendered))
        } else {
            format!("{}{}", self.prefix, rendered)
        };

        debug!("Derived cache key {}", key);
        Ok(key)
    }

    /// Derive the key for positional-only arguments
    pub fn key<I, A>(&self, args: I) -> CacheResult<String>
    where
        I: IntoIterator<Item = A>,
        A: Into<CacheArg>,
    {
        self.generate(&CallArgs::positional(args))
    }
}

fn sha256_hex(material: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}
