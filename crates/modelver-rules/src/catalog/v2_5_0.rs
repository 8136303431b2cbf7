//! 2.4.3 → 2.5.0

use super::step;
use crate::edit::RecordEdit;
use crate::rule::{RevisionRule, RuleError};
use modelver_document::{Document, Field};

pub(super) fn rule() -> Result<RevisionRule, RuleError> {
    RevisionRule::builder(step((2, 4, 3), (2, 5, 0)), "airflow network zones gain a name")
        .handler("OS:AirflowNetworkZone", name_airflow_zone)
        .build()
}

fn name_airflow_zone(edit: &mut RecordEdit<'_, '_>) -> Result<(), RuleError> {
    edit.insert(0, Field::Blank)?;
    let source = edit.source();
    edit.compute(0, |fields| zone_label(source, fields.get(1)))?;
    Ok(())
}

/// "Airflow Network Zone <zone name>", falling back to the reference text
fn zone_label(source: &Document, zone: Option<&Field>) -> Result<Field, String> {
    let label = match zone {
        Some(Field::Reference(id)) => source
            .get(*id)
            .and_then(|zone| zone.field(0))
            .filter(|name| !name.is_blank())
            .map_or_else(|| id.to_string(), ToString::to_string),
        Some(other) if !other.is_blank() => other.to_string(),
        _ => return Err("no thermal zone to name it after".to_string()),
    };
    Ok(Field::text(format!("Airflow Network Zone {label}")))
}
