//! End-to-end migration through the built-in catalog

use modelver_document::{Document, Field};
use modelver_engine::{EngineConfig, MigrationEngine, MigrationError};
use modelver_rules::{Revision, RevisionRule, Severity, UpdateRule, VersionChain};
use modelver_schema::Version;
use modelver_test_utils::{builtin_schema, sample_model, version, DocumentBuilder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn engine() -> MigrationEngine {
    MigrationEngine::with_builtin(EngineConfig::default()).unwrap()
}

#[test]
fn sample_model_reaches_latest() {
    let engine = engine();
    let (doc, ids) = sample_model();

    let outcome = engine.migrate(&doc).unwrap();
    assert!(outcome.did_migrate);
    assert_eq!(outcome.original_version, version("2.4.1"));
    assert_eq!(outcome.final_version, version("3.1.0"));
    assert_eq!(outcome.steps.len(), 18);
    assert_eq!(outcome.document.len(), doc.len() + 1);

    let material = outcome.diagnostics.for_record(ids.material);
    assert_eq!(material.len(), 1);
    assert_eq!(material[0].severity, Severity::Warning);
    assert_eq!(outcome.warnings().len(), 1);
    assert!(outcome.errors().is_empty());

    let summary = outcome.summary();
    assert_eq!(summary.records_created, 1);
    assert_eq!(summary.records_deprecated, 0);
}

#[test]
fn already_current_is_a_no_op() {
    let engine = engine();
    let (doc, _) = sample_model();
    let migrated = engine.migrate(&doc).unwrap().document;

    let again = engine.migrate(&migrated).unwrap();
    assert!(!again.did_migrate);
    assert!(again.diagnostics.is_empty());
    assert!(again.steps.is_empty());
    assert_eq!(again.document.fingerprint().unwrap(), migrated.fingerprint().unwrap());
}

#[test]
fn versions_advance_one_release_per_step() {
    let engine = engine();
    let (doc, _) = sample_model();
    let outcome = engine.migrate(&doc).unwrap();

    let releases = engine.chain().all_versions_in_order();
    for (step, pair) in outcome.steps.iter().zip(releases.windows(2)) {
        assert_eq!(step.revision, Revision::new(pair[0], pair[1]));
    }
}

#[test]
fn unsupported_versions_leave_input_untouched() {
    let engine = engine();
    for declared in ["2.3.0", "2.4.5", "3.3.0"] {
        let mut builder = DocumentBuilder::at("2.4.1");
        builder.thermal_zone("Core");
        let mut doc = builder.build();
        doc.set_version(version(declared));
        let before = doc.fingerprint().unwrap();

        let failure = engine.migrate(&doc).unwrap_err();
        assert!(
            matches!(failure.error, MigrationError::UnsupportedVersion { .. }),
            "{declared}: {}",
            failure.error
        );
        assert!(failure.diagnostics.is_empty());
        assert_eq!(doc.fingerprint().unwrap(), before);
    }
}

#[test]
fn one_release_ahead_is_accepted_with_warning() {
    let engine = engine();
    let doc = Document::new(version("3.1.1"));

    let outcome = engine.migrate(&doc).unwrap();
    assert!(!outcome.did_migrate);
    assert_eq!(outcome.final_version, version("3.1.1"));
    assert_eq!(outcome.warnings().len(), 1);
}

#[test]
fn unmapped_fuel_type_is_kept_with_one_warning() {
    let engine = engine();
    let mut builder = DocumentBuilder::at("2.9.1");
    let boiler = builder.add_with("OS:Boiler:Steam", &[(1, Field::text("Coal"))]);

    let outcome = engine.migrate(&builder.build()).unwrap();
    let migrated = outcome.document.get(boiler).unwrap();
    assert_eq!(migrated.fields[1], Field::text("Coal"));

    let flagged = outcome.diagnostics.for_record(boiler);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].severity, Severity::Warning);
    assert_eq!(
        flagged[0].revision,
        Some(Revision::new(version("2.9.1"), version("3.0.0")))
    );
}

#[test]
fn relocated_shading_control_reported_only_when_configured() {
    let (doc, ids) = sample_model();
    let relocation = Revision::new(version("3.0.1"), version("3.1.0"));

    let reporting = MigrationEngine::with_builtin(
        EngineConfig::default().with_report_acknowledged_drops(true),
    )
    .unwrap();
    let outcome = reporting.migrate(&doc).unwrap();
    let reported = outcome.diagnostics.for_record(ids.sub_surface);
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].severity, Severity::Info);
    assert_eq!(reported[0].revision, Some(relocation));
    assert_eq!(outcome.warnings().len(), 1);

    let quiet = engine().migrate(&doc).unwrap();
    assert!(quiet.diagnostics.for_record(ids.sub_surface).is_empty());
    assert_eq!(
        quiet.document.fingerprint().unwrap(),
        outcome.document.fingerprint().unwrap()
    );
}

#[test]
fn deleting_a_referenced_record_is_caught() {
    let schema = builtin_schema();
    let revision = Revision::new(version("3.0.1"), version("3.1.0"));
    let careless = RevisionRule::builder(revision, "removes zones")
        .handler("OS:ThermalZone", |edit| {
            edit.deprecate();
            Ok(())
        })
        .build()
        .unwrap();
    let chain = VersionChain::builder()
        .releases([revision.from, revision.to])
        .rule(careless)
        .build()
        .unwrap();
    let engine = MigrationEngine::new(chain, schema, EngineConfig::default()).unwrap();

    let mut builder = DocumentBuilder::at("3.0.1");
    let zone = builder.thermal_zone("Core");
    let airflow = builder.add_with("OS:AirflowNetworkZone", &[(1, Field::Reference(zone))]);
    let failure = engine.migrate(&builder.build()).unwrap_err();

    match &failure.error {
        MigrationError::DanglingReference {
            revision: Some(r),
            target,
            referrer: Some(location),
        } => {
            assert_eq!(*r, revision);
            assert_eq!(*target, zone);
            assert_eq!(location.record, airflow);
            assert_eq!(location.field_index, 1);
        }
        other => panic!("expected dangling reference, got {other}"),
    }
    assert_eq!(failure.reached, version("3.0.1"));
    // the deprecation warning raised before the failure is kept
    assert_eq!(failure.diagnostics.warnings().len(), 1);
}

#[test]
fn composed_rule_matches_engine() {
    let engine = engine();
    let (doc, _) = sample_model();
    let outcome = engine.migrate(&doc).unwrap();

    let composed = engine
        .chain()
        .compose(&version("2.4.1"), &version("3.1.0"))
        .unwrap();
    let (combined, diagnostics) = modelver_test_utils::apply_rule(&composed, &doc);

    assert_eq!(composed.revision(), Revision::new(version("2.4.1"), version("3.1.0")));
    assert_eq!(combined.fingerprint().unwrap(), outcome.document.fingerprint().unwrap());
    assert_eq!(diagnostics.len(), outcome.diagnostics.len());
}

#[test]
fn batch_of_samples_migrates_independently() {
    let engine = engine();
    let docs: Vec<Document> = (0..8).map(|_| sample_model().0).collect();

    let results = engine.migrate_batch(&docs);
    for (doc, result) in docs.iter().zip(&results) {
        let outcome = result.as_ref().unwrap();
        assert_eq!(outcome.document.len(), doc.len() + 1);
        assert_eq!(outcome.final_version, engine.latest_version());
    }
}

const STABLE_TYPES: [&str; 8] = [
    "OS:ThermalZone",
    "OS:Material",
    "OS:Boiler:Steam",
    "OS:AirLoopHVAC",
    "OS:Schedule:Rule",
    "OS:Sizing:Zone",
    "OS:Coil:Cooling:DX:SingleSpeed",
    "OS:Output:Variable",
];

fn generated_document() -> impl Strategy<Value = Document> {
    let releases = modelver_rules::catalog::RELEASES;
    (
        0..releases.len(),
        prop::collection::vec(0..STABLE_TYPES.len(), 0..12),
    )
        .prop_map(move |(start, types)| {
            let mut builder = DocumentBuilder::new(releases[start]);
            for index in types {
                builder.add_blank(STABLE_TYPES[index]);
            }
            builder.build()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_migration_is_monotonic_and_idempotent(doc in generated_document()) {
        let engine = engine();
        let start = doc.version();
        let outcome = engine.migrate(&doc).unwrap();

        let expected_steps = engine
            .chain()
            .all_versions_in_order()
            .iter()
            .filter(|v| **v > start)
            .count();
        prop_assert_eq!(outcome.steps.len(), expected_steps);
        prop_assert_eq!(outcome.did_migrate, expected_steps > 0);
        prop_assert_eq!(outcome.final_version, Version::new(3, 1, 0));
        prop_assert_eq!(outcome.document.len(), doc.len());

        let again = engine.migrate(&outcome.document).unwrap();
        prop_assert!(!again.did_migrate);
        prop_assert!(again.diagnostics.is_empty());
    }
}
