//! Parent resolution across every field name the backend has used.
//!
//! This is the only place that knows about `idFather`, `father_id` and the
//! embedded `father` object. Everything downstream reads [`ParentIds`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AnimalId;

/// Father id fields, backend-preferred first.
pub const FATHER_ID_FIELDS: &[&str] = &["idFather", "father_id", "fatherId"];

/// Mother id fields, backend-preferred first.
pub const MOTHER_ID_FIELDS: &[&str] = &["idMother", "mother_id", "motherId"];

/// Field holding an embedded father record.
pub const FATHER_OBJECT_FIELD: &str = "father";

/// Field holding an embedded mother record.
pub const MOTHER_OBJECT_FIELD: &str = "mother";

/// Normalized parent references of one animal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentIds {
    pub father: Option<AnimalId>,
    pub mother: Option<AnimalId>,
}

impl ParentIds {
    pub fn new(father: Option<AnimalId>, mother: Option<AnimalId>) -> Self {
        Self { father, mother }
    }

    /// True when neither parent is known.
    pub fn is_empty(&self) -> bool {
        self.father.is_none() && self.mother.is_none()
    }

    pub fn is_father(&self, id: AnimalId) -> bool {
        self.father == Some(id)
    }

    pub fn is_mother(&self, id: AnimalId) -> bool {
        self.mother == Some(id)
    }

    /// Whether `id` is either parent.
    pub fn contains(&self, id: AnimalId) -> bool {
        self.is_father(id) || self.is_mother(id)
    }

    /// Known parent ids, father first.
    pub fn iter(&self) -> impl Iterator<Item = AnimalId> {
        self.father.into_iter().chain(self.mother)
    }
}

/// Coerces a raw JSON value into an animal id.
///
/// Accepts positive integers, integral floats and strings holding either.
/// Zero, negatives, fractions, `null` and non-numeric text yield `None`.
pub fn coerce_id(value: &Value) -> Option<AnimalId> {
    match value {
        Value::Number(n) => {
            if let Some(id) = n.as_u64() {
                return (id > 0).then_some(id);
            }
            if n.is_i64() {
                return None;
            }
            n.as_f64().and_then(integral_id)
        }
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<u64>() {
                Ok(id) => (id > 0).then_some(id),
                Err(_) => s.parse::<f64>().ok().and_then(integral_id),
            }
        }
        _ => None,
    }
}

fn integral_id(f: f64) -> Option<AnimalId> {
    if f.is_finite() && f.fract() == 0.0 && f >= 1.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Resolves one parent: id fields in order, then the embedded object's id.
fn resolve_parent(
    attributes: &Map<String, Value>,
    id_fields: &[&str],
    object_field: &str,
) -> Option<AnimalId> {
    id_fields
        .iter()
        .filter_map(|field| attributes.get(*field))
        .find_map(coerce_id)
        .or_else(|| {
            attributes
                .get(object_field)
                .and_then(Value::as_object)
                .and_then(|parent| parent.get("id"))
                .and_then(coerce_id)
        })
}

/// Extracts father and mother ids from any animal-like attribute map.
pub fn extract_parents(attributes: &Map<String, Value>) -> ParentIds {
    ParentIds {
        father: resolve_parent(attributes, FATHER_ID_FIELDS, FATHER_OBJECT_FIELD),
        mother: resolve_parent(attributes, MOTHER_ID_FIELDS, MOTHER_OBJECT_FIELD),
    }
}
