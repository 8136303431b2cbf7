//! Testing utilities for the modelver workspace
//!
//! Shared fixtures: document builders sized from the built-in schema, field
//! shorthands, and a sample model touching every catalog revision.

#![allow(missing_docs)]

use modelver_document::{Document, Field, RecordId};
use modelver_rules::catalog;
use modelver_rules::{Diagnostics, StepContext, UpdateRule, VersionChain};
use modelver_schema::{SchemaAccessor, SchemaRegistry, Version};
use std::sync::Arc;

pub fn builtin_schema() -> Arc<SchemaRegistry> {
    catalog::builtin_schema().unwrap()
}

pub fn builtin_chain() -> VersionChain {
    catalog::builtin_chain().unwrap()
}

pub fn version(s: &str) -> Version {
    Version::parse(s).unwrap()
}

pub fn texts(values: &[&str]) -> Vec<Field> {
    values.iter().map(|v| Field::text(*v)).collect()
}

/// Blank fields for `object_type` at `version` in the built-in schema
pub fn blank_fields(object_type: &str, version: &Version) -> Vec<Field> {
    let count = builtin_schema().field_count(object_type, version).unwrap();
    vec![Field::Blank; count]
}

/// Apply one rule against the built-in schema
pub fn apply_rule(rule: &dyn UpdateRule, source: &Document) -> (Document, Diagnostics) {
    let schema = builtin_schema();
    let mut ctx = StepContext::new(schema.as_ref(), rule.revision());
    let output = rule.apply(source, &mut ctx).unwrap();
    let (diagnostics, _) = ctx.into_parts();
    (output, diagnostics)
}

/// Incremental document construction against the built-in schema
#[derive(Debug)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new(version: Version) -> Self {
        Self {
            document: Document::new(version),
        }
    }

    pub fn at(version: &str) -> Self {
        Self::new(self::version(version))
    }

    pub fn add(&mut self, object_type: &str, fields: Vec<Field>) -> RecordId {
        self.document.add_record(object_type, fields)
    }

    /// Record sized from the schema, blank except for `values`
    pub fn add_with(&mut self, object_type: &str, values: &[(usize, Field)]) -> RecordId {
        let mut fields = blank_fields(object_type, &self.document.version());
        for (index, value) in values {
            fields[*index] = value.clone();
        }
        self.add(object_type, fields)
    }

    pub fn add_blank(&mut self, object_type: &str) -> RecordId {
        self.add_with(object_type, &[])
    }

    pub fn thermal_zone(&mut self, name: &str) -> RecordId {
        self.add_with("OS:ThermalZone", &[(0, Field::text(name))])
    }

    pub fn build(self) -> Document {
        self.document
    }
}

/// Identities of the records in [`sample_model`]
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    pub zone: RecordId,
    pub airflow_zone: RecordId,
    pub building_unit: RecordId,
    pub boiler: RecordId,
    pub exterior_equipment: RecordId,
    pub material: RecordId,
    pub schedule_rule: RecordId,
    pub shadow_calculation: RecordId,
    pub sizing_zone: RecordId,
    pub single_speed_coil: RecordId,
    pub two_speed_coil: RecordId,
    pub air_loop: RecordId,
    pub shading_control: RecordId,
    pub sub_surface: RecordId,
    pub output_variable: RecordId,
    pub output_meter: RecordId,
}

/// A 2.4.1 model with one record of every type the catalog rewrites
pub fn sample_model() -> (Document, SampleIds) {
    let mut b = DocumentBuilder::at("2.4.1");

    let zone = b.thermal_zone("Core Zone");
    let airflow_zone = b.add_with(
        "OS:AirflowNetworkZone",
        &[(0, Field::Reference(zone)), (1, Field::text("NoVent"))],
    );
    let mut unit_fields = texts(&["Unit 1", "", "Residential"]);
    unit_fields.extend(texts(&["NumberOfBedrooms", "Integer", "3"]));
    let building_unit = b.add("OS:BuildingUnit", unit_fields);
    let boiler = b.add_with(
        "OS:Boiler:Steam",
        &[(0, Field::text("Steam Boiler")), (1, Field::text("FuelOil#1"))],
    );
    let exterior_equipment = b.add_with(
        "OS:Exterior:FuelEquipment",
        &[(0, Field::text("Generator")), (3, Field::text("Gas"))],
    );
    let material = b.add_with(
        "OS:Material",
        &[
            (0, Field::text("Brick")),
            (1, Field::text("Rough")),
            (5, Field::Number(0.1)),
        ],
    );
    let mut rule_fields = blank_fields("OS:Schedule:Rule", &version("2.4.1"));
    rule_fields[0] = Field::text("Weekdays");
    rule_fields[12] = Field::text("DateRange");
    let schedule_rule = b.add("OS:Schedule:Rule", rule_fields);
    let shadow_calculation = b.add(
        "OS:ShadowCalculation",
        vec![
            Field::Number(20.0),
            Field::Number(15000.0),
            Field::text("SutherlandHodgman"),
            Field::text("SimpleSkyDiffuseModeling"),
            Field::text("AverageOverDaysInFrequency"),
        ],
    );
    let sizing_zone = b.add_with(
        "OS:Sizing:Zone",
        &[
            (0, Field::Reference(zone)),
            (21, Field::Number(1.0)),
            (22, Field::Number(1.0)),
        ],
    );
    let single_speed_coil = b.add_with(
        "OS:Coil:Cooling:DX:SingleSpeed",
        &[(0, Field::text("DX Coil"))],
    );
    let two_speed_coil = b.add_with(
        "OS:Coil:Cooling:DX:TwoSpeed",
        &[(0, Field::text("DX Coil 2"))],
    );
    let air_loop = b.add_with("OS:AirLoopHVAC", &[(0, Field::text("Air Loop"))]);
    let shading_control = b.add_with(
        "OS:ShadingControl",
        &[(0, Field::text("Blinds")), (1, Field::text("InteriorBlind"))],
    );
    let mut sub_fields = blank_fields("OS:SubSurface", &version("2.4.1"));
    sub_fields[0] = Field::text("Window");
    sub_fields[6] = Field::Reference(shading_control);
    sub_fields.extend([Field::Number(0.0), Field::Number(0.0), Field::Number(1.0)]);
    let sub_surface = b.add("OS:SubSurface", sub_fields);
    let output_variable = b.add_with(
        "OS:Output:Variable",
        &[
            (1, Field::text("*")),
            (2, Field::text("Boiler  FuelOil#1 Energy")),
            (3, Field::text("Hourly")),
        ],
    );
    let output_meter = b.add_with(
        "OS:Output:Meter",
        &[(0, Field::text("Gas:Facility")), (1, Field::text("Hourly"))],
    );

    let ids = SampleIds {
        zone,
        airflow_zone,
        building_unit,
        boiler,
        exterior_equipment,
        material,
        schedule_rule,
        shadow_calculation,
        sizing_zone,
        single_speed_coil,
        two_speed_coil,
        air_loop,
        shading_control,
        sub_surface,
        output_variable,
        output_meter,
    };
    (b.build(), ids)
}
