//! 3.0.0 → 3.0.1

use super::step;
use crate::rule::{RevisionRule, RuleError};

const MINIMUM_OUTDOOR_DRY_BULB: f64 = -25.0;
const UNIT_INTERNAL_STATIC_PRESSURE: f64 = 773.3;

pub(super) fn rule() -> Result<RevisionRule, RuleError> {
    RevisionRule::builder(
        step((3, 0, 0), (3, 0, 1)),
        "DX cooling coils gain compressor cutoff and static pressure inputs",
    )
    .handler("OS:Coil:Cooling:DX:SingleSpeed", |edit| {
        edit.insert(14, MINIMUM_OUTDOOR_DRY_BULB)?;
        Ok(())
    })
    .handler("OS:Coil:Cooling:DX:TwoSpeed", |edit| {
        edit.insert(6, UNIT_INTERNAL_STATIC_PRESSURE)?;
        edit.insert(22, MINIMUM_OUTDOOR_DRY_BULB)?;
        Ok(())
    })
    .build()
}
