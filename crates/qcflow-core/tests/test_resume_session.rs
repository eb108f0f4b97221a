//! Integration tests for resuming an inspection from its snapshot.

use qcflow_core::tools::MockHandles;
use qcflow_core::{
    Answer, Category, Collaborators, InspectionEngine, QcConfig, QcError, SessionSnapshot, Slot,
};
use tempfile::TempDir;

fn engine_at(root: &std::path::Path) -> (InspectionEngine, MockHandles) {
    let config = QcConfig::new(root.to_path_buf());
    let (tools, mocks) = Collaborators::with_mocks();
    (InspectionEngine::restore(config, tools).unwrap(), mocks)
}

#[test]
fn test_resume_mid_unit() {
    let temp_dir = TempDir::new().unwrap();
    let session_id = {
        let (mut engine, _mocks) = engine_at(temp_dir.path());
        let id = engine.check_in(28).unwrap();
        engine.submit(1, Answer::yes()).unwrap();
        engine.submit(2, Answer::with_codes(["BOX123"])).unwrap();
        engine.submit(3, Answer::yes()).unwrap();
        id
    };

    let (mut engine, _mocks) = engine_at(temp_dir.path());

    assert!(engine.is_checked_in());
    let view = engine.view().unwrap();
    assert_eq!(view.session_id, session_id);
    assert_eq!(view.project_id, 28);
    assert_eq!(view.step.number.get(), 4);

    engine.submit(4, Answer::yes()).unwrap();
    assert_eq!(engine.view().unwrap().step.number.get(), 5);
}

#[test]
fn test_resume_open_category_submission() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut engine, _mocks) = engine_at(temp_dir.path());
        engine.check_in(28).unwrap();
        for step in 1..=13 {
            let answer = match step {
                2 => Answer::with_codes(["BOX123"]),
                9 => Answer::with_codes(["BAT1", "BAT2"]),
                _ => Answer::yes(),
            };
            engine.submit(step, answer).unwrap();
        }
        engine.submit(14, Answer::yes()).unwrap();
        engine.set_category_code(Slot::Item1, "B1").unwrap();
        engine.toggle_category(Slot::Item1, Category::A).unwrap();
    }

    let (mut engine, mocks) = engine_at(temp_dir.path());
    let view = engine.view().unwrap();
    assert!(view.category_open);
    assert_eq!(view.draft.as_ref().unwrap().item1.code, "B1");

    engine.set_category_code(Slot::Item2, "B2").unwrap();
    engine.toggle_category(Slot::Item2, Category::E).unwrap();
    engine.complete_categories().unwrap();

    assert_eq!(engine.view().unwrap().step.number.get(), 15);
    let corrections = mocks.audit.corrections();
    assert_eq!(corrections[0].battery1_category, Category::A);
    assert_eq!(corrections[0].battery2_category, Category::E);
}

#[test]
fn test_resume_keeps_counter_and_timing() {
    let temp_dir = TempDir::new().unwrap();
    {
        let (mut engine, mocks) = engine_at(temp_dir.path());
        engine.check_in(28).unwrap();
        for step in 1..=21u8 {
            if step == 14 {
                engine.submit(14, Answer::yes()).unwrap();
                engine.set_category_code(Slot::Item1, "B1").unwrap();
                engine.set_category_code(Slot::Item2, "B2").unwrap();
                engine.toggle_category(Slot::Item1, Category::A).unwrap();
                engine.toggle_category(Slot::Item2, Category::A).unwrap();
                engine.complete_categories().unwrap();
                continue;
            }
            if step == 21 {
                mocks.clock.advance_secs(95);
            }
            let answer = match step {
                2 | 15 => Answer::with_codes(["BOX"]),
                9 | 17 => Answer::with_codes(["BAT1", "BAT2"]),
                _ => Answer::yes(),
            };
            engine.submit(step, answer).unwrap();
        }
    }

    let (engine, _mocks) = engine_at(temp_dir.path());
    let view = engine.view().unwrap();
    assert_eq!(view.production_counter, 2);
    assert_eq!(view.timer.summary, "01:35");
    assert_eq!(view.step.number.get(), 1);
}

#[test]
fn test_no_snapshot_means_checked_out() {
    let temp_dir = TempDir::new().unwrap();
    let (engine, _mocks) = engine_at(temp_dir.path());
    assert!(!engine.is_checked_in());
}

#[test]
fn test_corrupted_snapshot_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = QcConfig::new(temp_dir.path().to_path_buf());
    std::fs::create_dir_all(&config.data_dir).unwrap();
    std::fs::write(&config.snapshot_file, "not a snapshot").unwrap();

    let (tools, _mocks) = Collaborators::with_mocks();
    let result = InspectionEngine::restore(config.clone(), tools);

    assert!(matches!(result, Err(QcError::CorruptedSnapshot(_))));
    assert!(SessionSnapshot::load(&config.snapshot_file).is_err());
}
