//! Nested documents produced by subgraph materialization.
//!
//! A [`Document`] is an entity with its declared types and, per predicate,
//! the list of values. A value is a literal, a nested document inlined from
//! the subgraph, or a reference-only placeholder for resources that were not
//! expanded (cycle back-edges, traversal cut-offs, resources with no
//! statements of their own).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Number, Value};

use crate::term::{Iri, Literal};
use crate::vocab::xsd;

/// One value of a document property.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Literal(Literal),
    Node(Document),
    Reference(Iri),
}

impl Field {
    /// Returns the IRI of a nested node or reference.
    pub fn iri(&self) -> Option<&Iri> {
        match self {
            Field::Node(doc) => Some(&doc.id),
            Field::Reference(iri) => Some(iri),
            Field::Literal(_) => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Field::Literal(lit) => literal_to_json(lit),
            Field::Node(doc) => doc.to_json(),
            Field::Reference(iri) => json!({ "@id": iri.as_str() }),
        }
    }
}

/// A materialized entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Iri,
    /// Classes declared through `rdf:type`.
    pub types: BTreeSet<Iri>,
    /// Values per predicate, in statement order.
    pub properties: BTreeMap<Iri, Vec<Field>>,
}

impl Document {
    /// Creates a document with no types or properties.
    pub fn new(id: Iri) -> Self {
        Document {
            id,
            types: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Appends a value to `predicate`.
    pub fn push(&mut self, predicate: Iri, field: Field) {
        self.properties.entry(predicate).or_default().push(field);
    }

    /// Returns every value of the predicate named by `predicate`.
    pub fn get(&self, predicate: &str) -> Option<&[Field]> {
        self.properties
            .iter()
            .find(|(p, _)| p.as_str() == predicate)
            .map(|(_, fields)| fields.as_slice())
    }

    /// Returns the first literal value of `predicate`.
    pub fn literal(&self, predicate: &str) -> Option<&Literal> {
        self.get(predicate)?.iter().find_map(|f| match f {
            Field::Literal(lit) => Some(lit),
            _ => None,
        })
    }

    /// Returns the first nested document under `predicate`.
    pub fn node(&self, predicate: &str) -> Option<&Document> {
        self.get(predicate)?.iter().find_map(|f| match f {
            Field::Node(doc) => Some(doc),
            _ => None,
        })
    }

    /// Returns true if the document has neither types nor properties.
    pub fn is_bare(&self) -> bool {
        self.types.is_empty() && self.properties.is_empty()
    }

    /// Renders the document as JSON.
    ///
    /// `@id` holds the IRI and `@type` the declared classes (a string when
    /// there is one, an array otherwise, omitted when there are none). Each
    /// predicate IRI becomes a key whose value is a scalar when it has one
    /// value and an array otherwise. Numeric and boolean XSD literals become
    /// JSON numbers and booleans; language-tagged strings become
    /// `{"@value", "@language"}` objects.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("@id".into(), Value::String(self.id.to_string()));
        match self.types.len() {
            0 => {}
            1 => {
                if let Some(ty) = self.types.iter().next() {
                    obj.insert("@type".into(), Value::String(ty.to_string()));
                }
            }
            _ => {
                let types = self
                    .types
                    .iter()
                    .map(|t| Value::String(t.to_string()))
                    .collect();
                obj.insert("@type".into(), Value::Array(types));
            }
        }
        for (predicate, fields) in &self.properties {
            let value = match fields.as_slice() {
                [single] => single.to_json(),
                many => Value::Array(many.iter().map(Field::to_json).collect()),
            };
            obj.insert(predicate.to_string(), value);
        }
        Value::Object(obj)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn literal_to_json(lit: &Literal) -> Value {
    if let Some(tag) = &lit.language {
        return json!({ "@value": lit.lexical, "@language": tag });
    }
    let lexical = lit.lexical.as_str();
    let converted = match lit.effective_datatype() {
        xsd::INTEGER | xsd::INT | xsd::LONG | xsd::SHORT | xsd::NON_NEGATIVE_INTEGER => {
            lexical.trim_start_matches('+').parse::<i64>().ok().map(Value::from)
        }
        xsd::DECIMAL | xsd::DOUBLE | xsd::FLOAT => lexical
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        xsd::BOOLEAN => match lexical {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };
    converted.unwrap_or_else(|| Value::String(lit.lexical.clone()))
}
