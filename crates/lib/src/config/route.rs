//! Endpoint path templates.

use std::fmt;

/// One `/`-separated piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
  Literal(String),
  /// `{name}` in the template.
  Parameter(String),
}

impl PathSegment {
  pub fn is_parameter(&self) -> bool {
    matches!(self, PathSegment::Parameter(_))
  }
}

impl fmt::Display for PathSegment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PathSegment::Literal(s) => f.write_str(s),
      PathSegment::Parameter(p) => write!(f, "{{{}}}", p),
    }
  }
}

/// Split a path template into segments.
///
/// The path must start with `/`, must not end with `/`, and must not contain
/// empty segments. Literal segments use `[A-Za-z0-9._-]`; parameters are
/// `{name}` with `name` in `[A-Za-z0-9_]`. A parameter name may appear only
/// once per path.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, String> {
  let rest = path
    .strip_prefix('/')
    .ok_or_else(|| format!("path '{}' must start with '/'", path))?;

  if rest.is_empty() {
    return Err("the root path cannot carry endpoints".to_string());
  }

  let mut segments = Vec::new();
  for raw in rest.split('/') {
    if raw.is_empty() {
      return Err(format!("path '{}' contains an empty segment", path));
    }

    let segment = if let Some(inner) = raw.strip_prefix('{') {
      let name = inner
        .strip_suffix('}')
        .ok_or_else(|| format!("unterminated parameter '{}'", raw))?;
      if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid parameter name '{}'", raw));
      }
      if segments.contains(&PathSegment::Parameter(name.to_string())) {
        return Err(format!("parameter '{{{}}}' appears more than once", name));
      }
      PathSegment::Parameter(name.to_string())
    } else {
      if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
      {
        return Err(format!("invalid path segment '{}'", raw));
      }
      PathSegment::Literal(raw.to_string())
    };

    segments.push(segment);
  }

  Ok(segments)
}

/// Render segments back into a path string.
pub fn join_path(segments: &[PathSegment]) -> String {
  let mut path = String::new();
  for segment in segments {
    path.push('/');
    path.push_str(&segment.to_string());
  }
  path
}
