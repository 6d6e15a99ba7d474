//! Type consistency between criteria and stored property data types

use crate::criterion::{Criterion, PropertyCriterion};
use crate::data_type::PropertyTypeMap;
use crate::error::{Error, Result};

/// Checks every property criterion in `criteria` against the live property-type map.
///
/// Fails with [`Error::UnknownField`] when a property code is not in the map, and
/// with [`Error::TypeMismatch`] when the criterion's value kind cannot be compared
/// against the property's stored data type. Attribute and any-property leaves are
/// not checked here; attribute columns are resolved by the schema during translation.
pub fn validate(criteria: &Criterion, types: &PropertyTypeMap) -> Result<()> {
    match criteria {
        Criterion::Composite(c) => c.children.iter().try_for_each(|child| validate(child, types)),
        Criterion::Property(p) => validate_property(criteria, p, types),
        Criterion::Relationship(r) => validate(&r.nested, types),
        Criterion::Attribute(_) | Criterion::AnyProperty(_) => Ok(()),
    }
}

fn validate_property(
    criterion: &Criterion,
    property: &PropertyCriterion,
    types: &PropertyTypeMap,
) -> Result<()> {
    let Some(data_type) = types.data_type(&property.property_code) else {
        return Err(Error::UnknownField {
            criterion: criterion.class_name(),
            field: property.property_code.clone(),
        });
    };

    if property.value_kind().accepts(data_type) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            criterion: criterion.class_name(),
            field: property.property_code.clone(),
            data_type: data_type.to_string(),
            data_types: types.describe(),
        })
    }
}
