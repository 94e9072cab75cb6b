use std::fmt;

use crate::animal::AnimalId;
use crate::graph::Direction;

/// Normalizes a comma-separated field selection: trimmed, empties dropped,
/// sorted, rejoined. `"sex, id"` and `"id,sex"` give the same signature.
pub fn normalize_fields(fields: &str) -> String {
    let mut parts: Vec<&str> = fields
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    parts.sort_unstable();
    parts.join(",")
}

/// Cache key for one tree request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub direction: Direction,
    pub root_id: AnimalId,
    pub depth: usize,
    fields: String,
}

impl CacheKey {
    pub fn new(direction: Direction, root_id: AnimalId, depth: usize, fields: &str) -> Self {
        Self {
            direction,
            root_id,
            depth,
            fields: normalize_fields(fields),
        }
    }

    /// Normalized field signature.
    pub fn fields(&self) -> &str {
        &self.fields
    }
}

/// Renders as `{direction}:{root}:d{depth}:f{fields}`.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:d{}:f{}",
            self.direction, self.root_id, self.depth, self.fields
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fields() {
        assert_eq!(normalize_fields("sex,id,record"), "id,record,sex");
        assert_eq!(normalize_fields(" sex , ,id,"), "id,sex");
        assert_eq!(normalize_fields(""), "");
    }

    #[test]
    fn test_key_collision() {
        let a = CacheKey::new(Direction::Ancestors, 7, 3, "sex,id");
        let b = CacheKey::new(Direction::Ancestors, 7, 3, "id,sex");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "ancestors:7:d3:fid,sex");
    }

    #[test]
    fn test_key_distinguishes_direction_and_depth() {
        let a = CacheKey::new(Direction::Ancestors, 7, 3, "id");
        assert_ne!(a, CacheKey::new(Direction::Descendants, 7, 3, "id"));
        assert_ne!(a, CacheKey::new(Direction::Ancestors, 7, 4, "id"));
    }
}
