//! The criteria tree.
//!
//! A tree is a closed algebra: composite nodes combine children with AND/OR, leaves
//! filter on an attribute column, a typed property, any property, or a one-hop
//! relationship to entities matching nested criteria. Field references are not
//! checked here; unknown fields surface during validation or translation.

use crate::value::{
    DatePredicate, DateOperator, DateValue, FieldValue, NumberOperator, StringOperator,
    StringPredicate, ValueKind,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// SQL literal an empty composite with this operator evaluates to.
    pub fn identity_sql(self) -> &'static str {
        match self {
            Self::And => "TRUE",
            Self::Or => "FALSE",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompositeCriterion {
    #[serde(default)]
    pub operator: LogicalOperator,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub children: Vec<Criterion>,
}

impl CompositeCriterion {
    pub fn new(operator: LogicalOperator, children: Vec<Criterion>) -> Self {
        Self {
            operator,
            negated: false,
            children,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}

/// Comparison on a fixed column of the entity table (code, perm id, registration date...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCriterion {
    pub field: String,
    pub value: FieldValue,
}

/// Comparison on a schema-declared, dynamically typed property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCriterion {
    pub property_code: String,
    pub value: FieldValue,
}

impl PropertyCriterion {
    pub fn value_kind(&self) -> ValueKind {
        self.value.kind()
    }
}

/// Matches entities with any property value satisfying a string predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyPropertyCriterion {
    pub value: StringPredicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirection {
    /// The nested criteria describe parents of the searched entity.
    Parent,
    /// The nested criteria describe children of the searched entity.
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    ParentChild,
    ContainerComponent,
}

impl RelationType {
    /// Code stored in the relationship-types table.
    pub fn code(self) -> &'static str {
        match self {
            Self::ParentChild => "PARENT_CHILD",
            Self::ContainerComponent => "CONTAINER_COMPONENT",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipCriterion {
    pub direction: RelationDirection,
    pub relation_type: RelationType,
    pub nested: Box<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criterion {
    Composite(CompositeCriterion),
    Attribute(AttributeCriterion),
    Property(PropertyCriterion),
    AnyProperty(AnyPropertyCriterion),
    Relationship(RelationshipCriterion),
}

impl Criterion {
    pub fn and(children: Vec<Criterion>) -> Self {
        Self::Composite(CompositeCriterion::new(LogicalOperator::And, children))
    }

    pub fn or(children: Vec<Criterion>) -> Self {
        Self::Composite(CompositeCriterion::new(LogicalOperator::Or, children))
    }

    pub fn not(inner: Criterion) -> Self {
        match inner {
            Self::Composite(c) => Self::Composite(c.negate()),
            leaf => Self::Composite(CompositeCriterion::new(LogicalOperator::And, vec![leaf]).negate()),
        }
    }

    pub fn attribute(field: impl Into<String>, value: FieldValue) -> Self {
        Self::Attribute(AttributeCriterion {
            field: field.into(),
            value,
        })
    }

    pub fn attribute_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::attribute(field, FieldValue::string(StringOperator::Equals, value))
    }

    pub fn property(property_code: impl Into<String>, value: FieldValue) -> Self {
        Self::Property(PropertyCriterion {
            property_code: property_code.into(),
            value,
        })
    }

    pub fn string_property(
        property_code: impl Into<String>,
        operator: StringOperator,
        value: impl Into<String>,
    ) -> Self {
        Self::property(property_code, FieldValue::string(operator, value))
    }

    pub fn number_property(
        property_code: impl Into<String>,
        operator: NumberOperator,
        value: Decimal,
    ) -> Self {
        Self::property(property_code, FieldValue::number(operator, value))
    }

    pub fn date_property(
        property_code: impl Into<String>,
        operator: DateOperator,
        value: DateValue,
    ) -> Self {
        Self::property(
            property_code,
            FieldValue::Date(DatePredicate { operator, value }),
        )
    }

    pub fn boolean_property(property_code: impl Into<String>, value: bool) -> Self {
        Self::property(property_code, FieldValue::boolean(value))
    }

    pub fn any_property(operator: StringOperator, value: impl Into<String>) -> Self {
        Self::AnyProperty(AnyPropertyCriterion {
            value: StringPredicate {
                operator,
                value: value.into(),
            },
        })
    }

    pub fn with_parents(relation_type: RelationType, nested: Criterion) -> Self {
        Self::Relationship(RelationshipCriterion {
            direction: RelationDirection::Parent,
            relation_type,
            nested: Box::new(nested),
        })
    }

    pub fn with_children(relation_type: RelationType, nested: Criterion) -> Self {
        Self::Relationship(RelationshipCriterion {
            direction: RelationDirection::Child,
            relation_type,
            nested: Box::new(nested),
        })
    }

    /// Name of the criterion class, used in diagnostics.
    pub fn class_name(&self) -> String {
        match self {
            Self::Composite(_) => "CompositeCriterion".to_string(),
            Self::Attribute(_) => "AttributeCriterion".to_string(),
            Self::Property(p) => format!("{}PropertyCriterion", p.value_kind().as_str()),
            Self::AnyProperty(_) => "AnyPropertyCriterion".to_string(),
            Self::Relationship(r) => match r.direction {
                RelationDirection::Parent => "ParentsCriterion".to_string(),
                RelationDirection::Child => "ChildrenCriterion".to_string(),
            },
        }
    }

    /// Whether translating this tree needs the property-type map.
    pub fn references_properties(&self) -> bool {
        match self {
            Self::Composite(c) => c.children.iter().any(Criterion::references_properties),
            Self::Property(_) => true,
            Self::Relationship(r) => r.nested.references_properties(),
            Self::Attribute(_) | Self::AnyProperty(_) => false,
        }
    }
}

impl From<CompositeCriterion> for Criterion {
    fn from(value: CompositeCriterion) -> Self {
        Self::Composite(value)
    }
}
