//! 2.4.1 → 2.4.2

use super::step;
use crate::edit::RecordEdit;
use crate::rule::{RevisionRule, RuleError};
use modelver_document::Field;

/// Fixed fields of `OS:BuildingUnit`; feature triples follow
const BUILDING_UNIT_FIXED: usize = 3;

pub(super) fn rule() -> Result<RevisionRule, RuleError> {
    RevisionRule::builder(
        step((2, 4, 1), (2, 4, 2)),
        "building unit features move to additional properties; steam boiler end-use subcategory",
    )
    .handler("OS:BuildingUnit", split_building_unit_features)
    .handler("OS:Boiler:Steam", |edit| {
        edit.insert(15, "General")?;
        Ok(())
    })
    .build()
}

fn split_building_unit_features(edit: &mut RecordEdit<'_, '_>) -> Result<(), RuleError> {
    let features = edit.take_tail(BUILDING_UNIT_FIXED)?;
    let mut fields = Vec::with_capacity(features.len() + 1);
    fields.push(Field::Reference(edit.id()));
    fields.extend(features);
    edit.spawn("OS:AdditionalProperties", fields);
    Ok(())
}
