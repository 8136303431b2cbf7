//! 2.9.1 → 3.0.0

use super::{fuel_types, step};
use crate::edit::RecordEdit;
use crate::primitives::EnumRemap;
use crate::rule::{RevisionRule, RuleError};
use modelver_document::Field;

const SPECIFIC_HEAT: usize = 5;
const SPECIFIC_HEAT_DEFAULT: f64 = 1400.0;
const SPECIFIC_HEAT_MINIMUM: f64 = 100.0;
// Old default, replaced wholesale by the new one
const SPECIFIC_HEAT_LEGACY_DEFAULT: f64 = 0.1;

pub(super) fn rule() -> Result<RevisionRule, RuleError> {
    let boiler_fuels = fuel_types();
    let equipment_fuels = fuel_types();
    let update_method = EnumRemap::new([
        ("TimestepFrequency", "Timestep"),
        ("AverageOverDaysInFrequency", "Periodic"),
    ]);

    RevisionRule::builder(
        step((2, 9, 1), (3, 0, 0)),
        "fuel type renames, material specific heat floor, shadow calculation rewrite",
    )
    .handler("OS:Boiler:Steam", move |edit| {
        edit.remap(1, &boiler_fuels)?;
        Ok(())
    })
    .handler("OS:Exterior:FuelEquipment", move |edit| {
        edit.remap(3, &equipment_fuels)?;
        Ok(())
    })
    .handler("OS:Material", material_specific_heat)
    .handler("OS:Schedule:Rule", |edit| {
        // Apply Holiday
        edit.delete(11)?;
        Ok(())
    })
    .handler("OS:ShadowCalculation", move |edit| {
        edit.insert(0, "PolygonClipping")?;
        // Calculation Method becomes the update frequency method
        edit.move_range(5..6, 1)?;
        edit.remap(1, &update_method)?;
        // Pixel Counting Resolution
        edit.insert(5, 512.0)?;
        for index in 7..10 {
            edit.insert(index, "No")?;
        }
        Ok(())
    })
    .handler("OS:Sizing:Zone", |edit| {
        // Air distribution effectiveness moves behind the DOAS fields
        edit.move_range(21..23, 25)?;
        edit.insert(27, Field::Blank)?;
        edit.insert(28, Field::Blank)?;
        Ok(())
    })
    .build()
}

fn material_specific_heat(edit: &mut RecordEdit<'_, '_>) -> Result<(), RuleError> {
    let current = edit.field(SPECIFIC_HEAT).cloned().unwrap_or_default();
    match current.as_number() {
        Some(value) if (value - SPECIFIC_HEAT_LEGACY_DEFAULT).abs() < f64::EPSILON => {
            edit.set(SPECIFIC_HEAT, SPECIFIC_HEAT_DEFAULT)?;
            edit.warn(format!(
                "specific heat {value} replaced by the new default of {SPECIFIC_HEAT_DEFAULT}"
            ));
        }
        Some(value) if value < SPECIFIC_HEAT_MINIMUM => {
            edit.set(SPECIFIC_HEAT, SPECIFIC_HEAT_MINIMUM)?;
            edit.warn(format!(
                "specific heat {value} raised to the new minimum of {SPECIFIC_HEAT_MINIMUM}"
            ));
        }
        Some(_) => {}
        None => {
            if !current.is_blank() {
                edit.warn(format!(
                    "specific heat '{current}' is not numeric, replaced by {SPECIFIC_HEAT_DEFAULT}"
                ));
            }
            edit.set(SPECIFIC_HEAT, SPECIFIC_HEAT_DEFAULT)?;
        }
    }
    Ok(())
}
