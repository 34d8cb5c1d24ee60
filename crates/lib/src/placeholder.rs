//! Placeholder parsing and substitution for cross-record references.
//!
//! Configuration strings (function environment values, role resource patterns)
//! may refer to resources declared elsewhere in the stack. The physical names
//! of those resources only exist once the Naming Engine has run, so references
//! are written as placeholders and substituted while the graph is built.
//!
//! # Placeholder Formats
//!
//! - `$${storage:<name>}` - physical name of a bucket or table
//! - `$${storage:<name>:arn}` - ARN of a bucket or table
//! - `$${function:<name>}` - physical name of a function
//! - `$${function:<name>:arn}` - ARN of a function
//! - `$${context:<key>}` - one of `application`, `environment`, `account`, `region`
//! - `$${ref:<node-id>:<attribute>}` - a provider-assigned value, left for the
//!   provisioning executor and never substituted by the compiler
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence. Single `$`
//! characters pass through unchanged.
//!
//! # Example
//!
//! ```
//! use stackc_lib::placeholder::{parse, Placeholder, RefAttr, Segment};
//!
//! let segments = parse("$${storage:video:arn}/*").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Placeholder(Placeholder::Storage { name: "video".to_string(), attr: RefAttr::Arn }),
//!     Segment::Literal("/*".to_string()),
//! ]);
//! ```

use std::fmt;

use thiserror::Error;

/// Which facet of a referenced resource a placeholder expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefAttr {
  Name,
  Arn,
}

/// Build-context values reachable through `$${context:<key>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKey {
  Application,
  Environment,
  Account,
  Region,
}

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${storage:<name>[:arn]}`
  Storage { name: String, attr: RefAttr },

  /// `$${function:<name>[:arn]}`
  Function { name: String, attr: RefAttr },

  /// `$${context:<key>}`
  Context(ContextKey),

  /// `$${ref:<node-id>:<attribute>}` - deferred to the provisioning executor
  Ref { node: String, attribute: String },
}

impl fmt::Display for Placeholder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let attr_suffix = |attr: &RefAttr| match attr {
      RefAttr::Name => "",
      RefAttr::Arn => ":arn",
    };
    match self {
      Placeholder::Storage { name, attr } => write!(f, "$${{storage:{}{}}}", name, attr_suffix(attr)),
      Placeholder::Function { name, attr } => write!(f, "$${{function:{}{}}}", name, attr_suffix(attr)),
      Placeholder::Context(key) => {
        let key = match key {
          ContextKey::Application => "application",
          ContextKey::Environment => "environment",
          ContextKey::Account => "account",
          ContextKey::Region => "region",
        };
        write!(f, "$${{context:{}}}", key)
      }
      Placeholder::Ref { node, attribute } => write!(f, "$${{ref:{}:{}}}", node, attribute),
    }
  }
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("unknown placeholder attribute '{attr}' in '{content}'")]
  UnknownAttribute { content: String, attr: String },

  #[error("unknown context key: {0}")]
  UnknownContextKey(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved storage reference: {0}")]
  UnresolvedStorage(String),

  #[error("unresolved function reference: {0}")]
  UnresolvedFunction(String),
}

/// Trait for resolving placeholder values during graph construction.
pub trait Resolver {
  /// Resolve a bucket or table reference by logical name.
  fn resolve_storage(&self, name: &str, attr: RefAttr) -> Result<String, PlaceholderError>;

  /// Resolve a function reference by logical name.
  fn resolve_function(&self, name: &str, attr: RefAttr) -> Result<String, PlaceholderError>;

  /// Resolve a build-context value.
  fn resolve_context(&self, key: ContextKey) -> String;
}

/// Format a deferred provider reference.
///
/// The compiler cannot know values such as an API id before the provisioning
/// executor creates the resource, so the document carries a reference instead.
pub fn reference(node: &str, attribute: &str) -> String {
  Placeholder::Ref {
    node: node.to_string(),
    attribute: attribute.to_string(),
  }
  .to_string()
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is malformed (unclosed, unknown type, etc.)
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();

        match chars.peek() {
          Some((_, '$')) => {
            chars.next();
            match chars.peek() {
              Some((_, '{')) => {
                // Escaped: $$${ -> $${ (literal)
                literal.push_str("$${");
                chars.next();
              }
              _ => literal.push_str("$$$"),
            }
          }
          Some((_, '{')) => {
            chars.next();

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut content = String::new();
            let mut found_close = false;
            for (_, c) in chars.by_ref() {
              if c == '}' {
                found_close = true;
                break;
              }
              content.push(c);
            }

            if !found_close {
              return Err(PlaceholderError::Unclosed(pos));
            }

            segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
          }
          _ => literal.push_str("$$"),
        }
      }
      // Lone $ passes through
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Collect every placeholder referenced by `input`.
pub fn references(input: &str) -> Result<Vec<Placeholder>, PlaceholderError> {
  Ok(
    parse(input)?
      .into_iter()
      .filter_map(|segment| match segment {
        Segment::Placeholder(p) => Some(p),
        Segment::Literal(_) => None,
      })
      .collect(),
  )
}

fn parse_ref_attr(content: &str, attr: Option<&str>) -> Result<RefAttr, PlaceholderError> {
  match attr {
    None | Some("name") => Ok(RefAttr::Name),
    Some("arn") => Ok(RefAttr::Arn),
    Some(other) => Err(PlaceholderError::UnknownAttribute {
      content: content.to_string(),
      attr: other.to_string(),
    }),
  }
}

/// Parse the content inside a placeholder (everything between ${ and }).
fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  let (kind, rest) = content
    .split_once(':')
    .ok_or_else(|| PlaceholderError::Malformed(format!("missing colon in '{content}'")))?;

  if rest.is_empty() {
    return Err(PlaceholderError::Malformed(format!("empty reference in '{content}'")));
  }

  match kind {
    "storage" | "function" => {
      let (name, attr) = match rest.split_once(':') {
        Some((name, attr)) => (name, Some(attr)),
        None => (rest, None),
      };
      if name.is_empty() {
        return Err(PlaceholderError::Malformed(format!("empty name in '{content}'")));
      }
      let attr = parse_ref_attr(content, attr)?;
      let name = name.to_string();
      Ok(if kind == "storage" {
        Placeholder::Storage { name, attr }
      } else {
        Placeholder::Function { name, attr }
      })
    }
    "context" => {
      let key = match rest {
        "application" => ContextKey::Application,
        "environment" => ContextKey::Environment,
        "account" => ContextKey::Account,
        "region" => ContextKey::Region,
        other => return Err(PlaceholderError::UnknownContextKey(other.to_string())),
      };
      Ok(Placeholder::Context(key))
    }
    "ref" => {
      let (node, attribute) = rest
        .rsplit_once(':')
        .ok_or_else(|| PlaceholderError::Malformed(format!("ref placeholder missing attribute: '{content}'")))?;
      Ok(Placeholder::Ref {
        node: node.to_string(),
        attribute: attribute.to_string(),
      })
    }
    _ => Err(PlaceholderError::UnknownType(kind.to_string())),
  }
}

/// Substitute all placeholders in a string using the provided resolver.
///
/// `ref` placeholders are re-emitted verbatim.
///
/// # Errors
///
/// Returns an error if parsing fails or if any placeholder cannot be resolved.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  let mut result = String::new();

  for segment in &segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => {
        let value = match p {
          Placeholder::Storage { name, attr } => resolver.resolve_storage(name, *attr)?,
          Placeholder::Function { name, attr } => resolver.resolve_function(name, *attr)?,
          Placeholder::Context(key) => resolver.resolve_context(*key),
          Placeholder::Ref { .. } => p.to_string(),
        };
        result.push_str(&value);
      }
    }
  }

  Ok(result)
}
