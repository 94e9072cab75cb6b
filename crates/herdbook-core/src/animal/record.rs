use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::relations::{
    coerce_id, extract_parents, ParentIds, FATHER_ID_FIELDS, FATHER_OBJECT_FIELD,
    MOTHER_ID_FIELDS, MOTHER_OBJECT_FIELD,
};
use super::{AnimalId, RecordError};

/// Record code fields, preferred first.
const CODE_FIELDS: &[&str] = &["record", "code"];

/// Birth date fields, preferred first.
const BIRTH_DATE_FIELDS: &[&str] = &["birth_date", "birthDate"];

/// Recorded sex of an animal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Sex {
    Macho,
    Hembra,
    #[default]
    Unknown,
}

impl Sex {
    /// Parses a sex label, case-insensitively.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "macho" | "m" | "male" => Sex::Macho,
            "hembra" | "h" | "f" | "female" => Sex::Hembra,
            _ => Sex::Unknown,
        }
    }

    /// Canonical label, as the backend writes it.
    pub fn label(&self) -> &'static str {
        match self {
            Sex::Macho => "Macho",
            Sex::Hembra => "Hembra",
            Sex::Unknown => "Desconocido",
        }
    }

    /// Display rank within a generation: males, then females, then unknown.
    pub fn display_rank(&self) -> u8 {
        match self {
            Sex::Macho => 0,
            Sex::Hembra => 1,
            Sex::Unknown => 2,
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_str)
            .map(Sex::parse)
            .unwrap_or_default()
    }
}

/// A single animal.
///
/// Built from the raw attribute map the backend sends. The fields the
/// genealogy core relies on are resolved once, at construction; the map
/// itself is kept untouched for display passthrough and is what gets
/// serialized back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct AnimalRecord {
    id: AnimalId,
    code: Option<String>,
    sex: Sex,
    birth_date: Option<String>,
    breed: Option<String>,
    parents: ParentIds,
    embedded_father: Option<Box<AnimalRecord>>,
    embedded_mother: Option<Box<AnimalRecord>>,
    attributes: Map<String, Value>,
}

impl AnimalRecord {
    /// Creates a bare record with only an id.
    pub fn new(id: AnimalId) -> Self {
        let mut attributes = Map::new();
        attributes.insert("id".to_string(), Value::from(id));
        Self {
            id,
            code: None,
            sex: Sex::Unknown,
            birth_date: None,
            breed: None,
            parents: ParentIds::default(),
            embedded_father: None,
            embedded_mother: None,
            attributes,
        }
    }

    /// Normalizes a raw attribute map.
    ///
    /// Fails only when `id` is missing or not a positive integer.
    pub fn from_attributes(attributes: Map<String, Value>) -> Result<Self, RecordError> {
        let id = match attributes.get("id") {
            Some(raw) => coerce_id(raw).ok_or_else(|| RecordError::InvalidId(raw.to_string()))?,
            None => return Err(RecordError::InvalidId("missing".to_string())),
        };
        let parents = extract_parents(&attributes);

        Ok(Self {
            id,
            code: first_string(&attributes, CODE_FIELDS),
            sex: Sex::from_value(attributes.get("sex")),
            birth_date: first_string(&attributes, BIRTH_DATE_FIELDS),
            breed: breed_name(&attributes),
            embedded_father: embedded(&attributes, FATHER_OBJECT_FIELD, parents.father),
            embedded_mother: embedded(&attributes, MOTHER_OBJECT_FIELD, parents.mother),
            parents,
            attributes,
        })
    }

    /// Sets a raw attribute and re-resolves the normalized fields.
    ///
    /// A change that would leave the record without a valid id is ignored.
    pub fn with_attribute(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.insert(key.into(), value.into());
        Self::from_attributes(attributes).unwrap_or(self)
    }

    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.with_attribute("record", code.into())
    }

    pub fn with_sex(self, sex: Sex) -> Self {
        match sex {
            Sex::Unknown => self.with_attribute("sex", Value::Null),
            known => self.with_attribute("sex", known.label()),
        }
    }

    pub fn with_father(self, father: AnimalId) -> Self {
        self.with_attribute(FATHER_ID_FIELDS[0], father)
    }

    pub fn with_mother(self, mother: AnimalId) -> Self {
        self.with_attribute(MOTHER_ID_FIELDS[0], mother)
    }

    pub fn id(&self) -> AnimalId {
        self.id
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Record code, or `#id` when the animal has none.
    pub fn display_label(&self) -> String {
        match &self.code {
            Some(code) => code.clone(),
            None => format!("#{}", self.id),
        }
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn birth_date(&self) -> Option<&str> {
        self.birth_date.as_deref()
    }

    pub fn breed(&self) -> Option<&str> {
        self.breed.as_deref()
    }

    pub fn parents(&self) -> ParentIds {
        self.parents
    }

    pub fn father_id(&self) -> Option<AnimalId> {
        self.parents.father
    }

    pub fn mother_id(&self) -> Option<AnimalId> {
        self.parents.mother
    }

    /// Embedded father record, when it matches the resolved father id.
    pub fn embedded_father(&self) -> Option<&AnimalRecord> {
        self.embedded_father.as_deref()
    }

    /// Embedded mother record, when it matches the resolved mother id.
    pub fn embedded_mother(&self) -> Option<&AnimalRecord> {
        self.embedded_mother.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

impl TryFrom<Map<String, Value>> for AnimalRecord {
    type Error = RecordError;

    fn try_from(attributes: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_attributes(attributes)
    }
}

impl From<AnimalRecord> for Map<String, Value> {
    fn from(record: AnimalRecord) -> Self {
        record.attributes
    }
}

fn first_string(attributes: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| attributes.get(*field))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Breed name from `breed_name`, a `breed` string, or a `breed` object.
fn breed_name(attributes: &Map<String, Value>) -> Option<String> {
    if let Some(Value::String(name)) = attributes.get("breed_name") {
        return Some(name.clone());
    }
    match attributes.get("breed") {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Object(breed)) => breed
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn embedded(
    attributes: &Map<String, Value>,
    field: &str,
    resolved: Option<AnimalId>,
) -> Option<Box<AnimalRecord>> {
    let object = attributes.get(field)?.as_object()?;
    let parent = AnimalRecord::from_attributes(object.clone()).ok()?;
    (Some(parent.id) == resolved).then(|| Box::new(parent))
}
