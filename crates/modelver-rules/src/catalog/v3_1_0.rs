//! 3.0.1 → 3.1.0
//!
//! Shading controls take over the link to their sub surfaces, and output
//! variable and meter names follow the fuel renames of 3.0.0.

use super::step;
use crate::edit::RecordEdit;
use crate::primitives::EnumRemap;
use crate::rule::{RevisionRule, RuleError};
use modelver_document::Field;
use regex::Regex;

/// `OS:SubSurface` field holding the shading control reference
const SUB_SURFACE_SHADING_CONTROL: usize = 6;
const VARIABLE_NAME: usize = 2;

pub(super) fn rule() -> Result<RevisionRule, RuleError> {
    let spaces = Regex::new(" {2,}")?;
    let variables = output_variable_renames();
    let meter_fuels = vec![
        (Regex::new(r"(?i)\bFuelOil_1\b")?, "FuelOilNo1"),
        (Regex::new(r"(?i)\bFuelOil_2\b")?, "FuelOilNo2"),
        (Regex::new(r"(?i)\bGas\b")?, "NaturalGas"),
    ];

    RevisionRule::builder(
        step((3, 0, 1), (3, 1, 0)),
        "shading controls list their sub surfaces; output names follow fuel renames",
    )
    .handler("OS:AirLoopHVAC", |edit| {
        // Design Return Air Flow Fraction of Supply Air Flow
        edit.insert(5, 1.0)?;
        Ok(())
    })
    .handler("OS:ShadingControl", collect_sub_surfaces)
    .handler("OS:SubSurface", |edit| {
        // relocated onto the shading control
        edit.drop_field_at(SUB_SURFACE_SHADING_CONTROL)?;
        Ok(())
    })
    .handler("OS:Output:Variable", move |edit| {
        let Some(name) = edit.field(VARIABLE_NAME).and_then(Field::as_text) else {
            return Ok(());
        };
        let collapsed = spaces.replace_all(name, " ").into_owned();
        if collapsed != name && variables.get(&collapsed).is_some() {
            edit.set(VARIABLE_NAME, collapsed)?;
        }
        edit.remap(VARIABLE_NAME, &variables)?;
        Ok(())
    })
    .handler("OS:Output:Meter", move |edit| {
        let Some(name) = edit.field(0).and_then(Field::as_text) else {
            return Ok(());
        };
        let renamed = meter_fuels
            .iter()
            .fold(name.to_string(), |acc, (pattern, to)| {
                pattern.replace_all(&acc, *to).into_owned()
            });
        if renamed != name {
            edit.set(0, renamed)?;
        }
        Ok(())
    })
    .build()
}

fn collect_sub_surfaces(edit: &mut RecordEdit<'_, '_>) -> Result<(), RuleError> {
    edit.insert(12, "Sequential")?;
    let control = Field::Reference(edit.id());
    let controlled: Vec<Field> = edit
        .source()
        .records_by_type("OS:SubSurface")
        .into_iter()
        .filter(|sub| sub.field(SUB_SURFACE_SHADING_CONTROL) == Some(&control))
        .map(|sub| Field::Reference(sub.id))
        .collect();
    edit.push(controlled);
    Ok(())
}

fn output_variable_renames() -> EnumRemap {
    EnumRemap::new([
        ("Boiler FuelOil#1 Rate", "Boiler FuelOilNo1 Rate"),
        ("Boiler FuelOil#1 Energy", "Boiler FuelOilNo1 Energy"),
        ("Boiler FuelOil#2 Rate", "Boiler FuelOilNo2 Rate"),
        ("Boiler FuelOil#2 Energy", "Boiler FuelOilNo2 Energy"),
        ("Chiller FuelOil#1 Rate", "Chiller FuelOilNo1 Rate"),
        ("Chiller FuelOil#1 Energy", "Chiller FuelOilNo1 Energy"),
        ("Exterior Equipment FuelOil#1 Energy", "Exterior Equipment FuelOilNo1 Energy"),
        ("Exterior Equipment FuelOil#2 Energy", "Exterior Equipment FuelOilNo2 Energy"),
        ("Other Equipment FuelOil#1 Rate", "Other Equipment FuelOilNo1 Rate"),
        ("Other Equipment FuelOil#2 Rate", "Other Equipment FuelOilNo2 Rate"),
        ("FuelOil#1:Facility", "FuelOilNo1:Facility"),
        ("FuelOil#2:Facility", "FuelOilNo2:Facility"),
        ("FuelOil#1:HVAC", "FuelOilNo1:HVAC"),
        ("FuelOil#2:HVAC", "FuelOilNo2:HVAC"),
        ("Heating:FuelOil#1", "Heating:FuelOilNo1"),
        ("Heating:FuelOil#2", "Heating:FuelOilNo2"),
        ("Gas:Facility", "NaturalGas:Facility"),
        ("Gas:Building", "NaturalGas:Building"),
        ("Gas:Plant", "NaturalGas:Plant"),
        ("Gas:HVAC", "NaturalGas:HVAC"),
        ("Fan Electric Power", "Fan Electricity Rate"),
        ("Fan Electric Energy", "Fan Electricity Energy"),
        ("Exterior Lights Electric Energy", "Exterior Lights Electricity Energy"),
        ("Facility Total Purchased Electric Power", "Facility Total Purchased Electricity Rate"),
        ("Facility Total Purchased Electric Energy", "Facility Total Purchased Electricity Energy"),
        ("Water Heater Gas Rate", "Water Heater NaturalGas Rate"),
        ("Water Heater Gas Energy", "Water Heater NaturalGas Energy"),
    ])
    .passthrough_unmapped()
}
