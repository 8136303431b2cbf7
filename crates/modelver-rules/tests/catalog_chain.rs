//! Built-in catalog applied rule by rule to the shared sample model

use modelver_document::Field;
use modelver_rules::{ChainLookup, Severity, UpdateRule};
use modelver_schema::{SchemaAccessor, Version};
use modelver_test_utils::{apply_rule, builtin_chain, builtin_schema, sample_model, version};
use pretty_assertions::assert_eq;

#[test]
fn every_step_conforms_to_its_target_version() {
    let chain = builtin_chain();
    let schema = builtin_schema();
    let (mut doc, _) = sample_model();
    doc.validate(schema.as_ref()).unwrap();

    for rule in chain.rules() {
        let revision = rule.revision();
        assert_eq!(doc.version(), revision.from);

        let (next, _) = apply_rule(rule.as_ref(), &doc);
        assert_eq!(next.version(), revision.to);
        next.validate(schema.as_ref())
            .unwrap_or_else(|e| panic!("{revision}: {e}"));

        for record in next.records() {
            let layout = schema.object_schema(&record.object_type, &revision.to).unwrap();
            assert!(layout.conforms(record.len()), "{revision}: {}", record.object_type);
        }
        doc = next;
    }
    assert_eq!(doc.version(), chain.latest());
}

#[test]
fn sample_model_reaches_latest_with_expected_values() {
    let chain = builtin_chain();
    let (mut doc, ids) = sample_model();
    let mut warnings = Vec::new();

    while let ChainLookup::Rule(rule) = chain.lookup(&doc.version()).unwrap() {
        let (next, diagnostics) = apply_rule(rule.as_ref(), &doc);
        warnings.extend(diagnostics.with_severity(Severity::Warning).cloned());
        doc = next;
    }

    let field = |id, index: usize| doc.get(id).unwrap().fields[index].clone();
    assert_eq!(field(ids.boiler, 1), Field::text("FuelOilNo1"));
    assert_eq!(field(ids.boiler, 15), Field::text("General"));
    assert_eq!(field(ids.exterior_equipment, 3), Field::text("NaturalGas"));
    assert_eq!(field(ids.material, 5), Field::Number(1400.0));
    assert_eq!(field(ids.airflow_zone, 0), Field::text("Airflow Network Zone Core Zone"));
    assert_eq!(field(ids.shadow_calculation, 1), Field::text("Periodic"));
    assert_eq!(field(ids.output_variable, 2), Field::text("Boiler FuelOilNo1 Energy"));
    assert_eq!(field(ids.output_meter, 0), Field::text("NaturalGas:Facility"));
    assert_eq!(field(ids.shading_control, 13), Field::Reference(ids.sub_surface));

    let props = doc.records_by_type("OS:AdditionalProperties");
    assert_eq!(props.len(), 1);
    assert_eq!(props[0].fields[0], Field::Reference(ids.building_unit));

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].record, Some(ids.material));
    assert_eq!(warnings[0].revision.map(|r| r.to), Some(Version::new(3, 0, 0)));
}

#[test]
fn field_insertion_scenario() {
    // a five-field record gains a defaulted field at position 3
    let schema = modelver_schema::SchemaRegistry::from_yaml_str(
        r#"
releases:
  - version: "1.0.0"
    objects:
      OS:Five:
        fields: [A, B, C, D, E]
  - version: "1.1.0"
    objects:
      OS:Five:
        fields: [A, B, C, New, D, E]
"#,
    )
    .unwrap();
    let rule = modelver_rules::RevisionRule::builder(
        modelver_rules::Revision::new(version("1.0"), version("1.1")),
        "insert",
    )
    .handler("OS:Five", |edit| {
        edit.insert(3, "default")?;
        Ok(())
    })
    .build()
    .unwrap();

    let mut doc = modelver_document::Document::new(version("1.0"));
    let id = doc.add_record("OS:Five", modelver_test_utils::texts(&["A", "B", "C", "D", "E"]));
    let mut ctx = modelver_rules::StepContext::new(&schema, rule.revision());
    let out = rule.apply(&doc, &mut ctx).unwrap();
    out.validate(&schema).unwrap();

    assert_eq!(
        out.get(id).unwrap().fields,
        modelver_test_utils::texts(&["A", "B", "C", "default", "D", "E"])
    );
}
