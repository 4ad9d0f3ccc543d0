//! End-to-end: create a project, edit a calculation through a session,
//! save, reopen from disk, and export.

use std::fs;

use cable_core::export;
use cable_core::project::info;
use cable_core::schema::field;
use cable_core::tables::free_air::MC_LADDER_TOUCHING;
use cable_core::{CalcRecord, CalcSession, ProjectInfo, ProjectLocator, ProjectStore};
use tempfile::TempDir;

fn edit_motor_feeder(session: &mut CalcSession) {
    let inputs = [
        (field::CABLE_TAG, "CB-101"),
        (field::SYSTEM_VOLTAGE_LL, "400"),
        (field::EQUIPMENT_RATING_KW, "75"),
        (field::POWER_FACTOR, "0.85"),
        (field::EFFICIENCY_PCT, "95"),
        (field::START_FACTOR, "6"),
        (field::START_PF, "0.3"),
        (field::PROTECTIVE_DEVICE_A, "160"),
        (field::CIRCUIT_LENGTH_M, "85"),
        (field::TYPE_OF_CABLE, "XLPE/SWA/LSZH"),
        (field::TYPE_OF_INSTALLATION, "In Air"),
        (field::CORE_TYPE, "Multicore"),
        (field::CABLE_MANAGEMENT, MC_LADDER_TOUCHING),
        (field::NUMBER_OF_TRAYS, "2"),
        (field::CABLES_PER_TRAY, "4"),
        (field::AMBIENT_TEMPERATURE_C, "40"),
        (field::PROTECTION_TYPE, "MCCB (IEC 60947-2)"),
        (field::IZ_SINGLE, "200"),
        (field::CABLES_IN_PARALLEL, "1"),
        (field::CABLE_R, "0.193"),
        (field::CABLE_X, "0.08"),
    ];
    for (name, value) in inputs {
        session.set_input(name, value).unwrap();
    }
}

#[test]
fn edit_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let locator = ProjectLocator::for_project_number(dir.path(), "24-017");

    {
        let mut store = ProjectStore::open_locked(&locator, "tester").unwrap();
        let project: ProjectInfo = [(info::PROJECT_NUMBER, "24-017"), (info::PROJECT_TITLE, "Pump House")]
            .into_iter()
            .collect();
        store.write_project_info(project).unwrap();

        let mut session = CalcSession::new(5.0, 15.0);
        session.attach(&mut store).unwrap();
        assert_eq!(session.key(), "0001");

        edit_motor_feeder(&mut session);
        assert!(session.is_dirty());
        assert_eq!(session.derived().overload.iz_total_a, 176.2);
        session.save(&mut store).unwrap();
        assert!(!session.is_dirty());

        assert_eq!(session.new_calculation(&store), "0002");
        session.set_input(field::CABLE_TAG, "CB-102").unwrap();
        session.save(&mut store).unwrap();
    }

    let store = ProjectStore::open_or_create(&locator).unwrap();
    assert!(store.migrated_columns().is_empty());
    assert_eq!(store.list_calculation_keys(), vec!["0001", "0002"]);
    assert_eq!(store.read_project_info().project_title(), "Pump House");

    let (index, record) = store.read_by_key("0001").unwrap();
    assert_eq!(index, 0);
    assert_eq!(record.number(field::FULL_LOAD_CURRENT), Some(134.06));
    assert_eq!(record.number(field::OVERALL_DERATING_FACTOR), Some(0.881));
    assert_eq!(record.text(field::I2_FACTOR), "1.30");
    assert_eq!(record.text(field::OVERLOAD_CHECK), "OK");
    assert_eq!(record.number(field::STEADY_VD_V), Some(4.07));
    assert_eq!(record.text(field::STEADY_VD_OK), "OK");
    assert!(!record.text(field::SAVED_AT).is_empty());

    let hits = store.search("cb-102");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 1);
    assert_eq!(hits[0].1.key(), "0002");
}

#[test]
fn navigation_follows_stored_order() {
    let dir = TempDir::new().unwrap();
    let locator = ProjectLocator::for_project_number(dir.path(), "nav");
    let mut store = ProjectStore::open_or_create(&locator).unwrap();
    for key in ["0003", "0001", "0002"] {
        store.upsert(&CalcRecord::new(key)).unwrap();
    }

    let mut session = CalcSession::new(5.0, 15.0);
    session.attach(&mut store).unwrap();
    assert_eq!(session.key(), "0001");
    assert_eq!(session.index(), 1);

    assert!(session.next(&store));
    assert_eq!(session.key(), "0002");
    assert!(!session.can_next());
    assert!(!session.next(&store));

    assert!(session.load_index(&store, 0));
    assert_eq!(session.key(), "0003");
    assert!(!session.can_previous());
}

#[test]
fn partial_upsert_keeps_other_columns() {
    let dir = TempDir::new().unwrap();
    let locator = ProjectLocator::for_project_number(dir.path(), "partial");
    let mut store = ProjectStore::open_or_create(&locator).unwrap();

    store
        .upsert(&CalcRecord::new("0001").with(field::CABLE_TAG, "CB-1").with(field::CIRCUIT_ID, "MCC-1"))
        .unwrap();
    store.upsert(&CalcRecord::new("0001").with(field::CABLE_TAG, "CB-1A")).unwrap();

    let reopened = ProjectStore::open_or_create(&locator).unwrap();
    let (_, record) = reopened.read_by_key("0001").unwrap();
    assert_eq!(record.text(field::CABLE_TAG), "CB-1A");
    assert_eq!(record.text(field::CIRCUIT_ID), "MCC-1");
    assert_eq!(reopened.len(), 1);
}

#[test]
fn old_workbook_is_migrated_and_exported() {
    let dir = TempDir::new().unwrap();
    let locator = ProjectLocator::for_project_number(dir.path(), "legacy");
    fs::write(
        locator.path(),
        r#"{"version":"0.1.0","project":[["Project Number","L-1"]],"calc":{"headers":["CalculationNumber","CableTag"],"rows":[["0001","CB-OLD"]]}}"#,
    )
    .unwrap();

    let store = ProjectStore::open_or_create(&locator).unwrap();
    assert!(store.migrated_columns().iter().any(|c| c == field::SAVED_AT));

    let (_, mut record) = store.read_by_key("0001").unwrap();
    cable_core::recompute(&mut record);
    let path = export::export_csv(&record, store.read_project_info(), dir.path()).unwrap();
    assert_eq!(path, dir.path().join("L-1_0001.csv"));

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("CalculationNumber,CableTag,"));
    assert!(lines.next().unwrap().starts_with("0001,CB-OLD,"));
}
