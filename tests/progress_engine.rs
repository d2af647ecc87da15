//! Progress engine scenarios against a real on-disk store.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use cutover::catalog::{BuiltinSource, CatalogDocument, Checkpoint, Step};
use cutover::store::STATE_KEY;
use cutover::{
    JsonFileStore, ProgressEngine, ProgressError, ProgressFraction, ProgressState, StepCatalog,
};

fn checkpoint(id: &str, optional: bool) -> Checkpoint {
    Checkpoint {
        id: id.to_string(),
        label: format!("Checkpoint {id}"),
        optional,
    }
}

fn step(id: &str, checkpoints: Vec<Checkpoint>) -> Step {
    Step {
        id: id.to_string(),
        title: format!("Step {id}"),
        description: String::new(),
        checkpoints,
        documentation: Vec::new(),
        images: Vec::new(),
        dashboard_link: None,
        notice: None,
        commands: None,
    }
}

fn catalog(steps: Vec<Step>) -> Arc<StepCatalog> {
    Arc::new(StepCatalog::from_document(CatalogDocument { steps }).unwrap())
}

fn three_steps() -> Arc<StepCatalog> {
    catalog(vec![
        step("step0", vec![checkpoint("a", false)]),
        step("step1", vec![checkpoint("b", true)]),
        step("step2", vec![checkpoint("c", false)]),
    ])
}

#[test]
fn test_walkthrough_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let mut engine =
            ProgressEngine::new(three_steps(), JsonFileStore::new(temp_dir.path())).unwrap();
        engine.toggle_checkpoint("step0", "a").unwrap();
        assert!(engine.advance().unwrap());
        assert!(engine.advance().unwrap());
    }

    let saved = temp_dir.path().join(format!("{STATE_KEY}.json"));
    assert!(saved.exists());

    let mut engine =
        ProgressEngine::new(three_steps(), JsonFileStore::new(temp_dir.path())).unwrap();
    assert_eq!(engine.current_step(), 2);
    assert!(engine.is_checkpoint_completed("step0", "a"));
    assert_eq!(
        engine.progress_fraction(),
        ProgressFraction {
            completed: 1,
            total: 2
        }
    );

    engine.toggle_checkpoint("step2", "c").unwrap();
    assert!(engine.advance().unwrap());
    assert!(engine.is_terminal());
    assert_eq!(engine.progress_fraction().percentage(), 100);
    assert!(engine.state().completed_at.is_some());
}

#[test]
fn test_reload_then_save_is_fixed_point() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());

    let mut engine = ProgressEngine::new(three_steps(), store.clone()).unwrap();
    engine.toggle_checkpoint("step2", "c").unwrap();
    engine.toggle_checkpoint("step0", "a").unwrap();
    engine.go_to(1).unwrap();

    let on_disk = fs::read(store.path()).unwrap();
    let reopened = ProgressEngine::new(three_steps(), store).unwrap();
    assert_eq!(reopened.state().to_bytes().unwrap(), on_disk);
}

#[test]
fn test_reset_removes_file_and_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());

    let mut engine = ProgressEngine::new(three_steps(), store.clone()).unwrap();
    engine.toggle_checkpoint("step0", "a").unwrap();
    assert!(store.path().exists());

    engine.reset().unwrap();
    assert!(!store.path().exists());
    engine.reset().unwrap();

    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.state(), &ProgressState::default());

    let reopened = ProgressEngine::new(three_steps(), store).unwrap();
    assert_eq!(reopened.state(), &ProgressState::default());
}

#[test]
fn test_catalog_evolution_drops_stale_progress() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());

    let mut engine = ProgressEngine::new(three_steps(), store.clone()).unwrap();
    engine.toggle_checkpoint("step0", "a").unwrap();
    engine.toggle_checkpoint("step2", "c").unwrap();
    engine.go_to(3).unwrap();

    // Next release removes step2 and reorders the rest
    let revised = catalog(vec![
        step("step1", vec![checkpoint("b", true)]),
        step("step0", vec![checkpoint("a", false), checkpoint("new", false)]),
    ]);
    let engine = ProgressEngine::new(revised, store).unwrap();

    assert_eq!(engine.current_step(), 2);
    assert!(engine.is_checkpoint_completed("step0", "a"));
    assert!(!engine.state().checkpoints.contains_key("step2"));
    assert_eq!(engine.required_tally(1), (1, 2));
}

#[test]
fn test_corrupt_file_starts_fresh() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());
    fs::write(store.path(), b"\x00garbage").unwrap();

    let mut engine = ProgressEngine::new(three_steps(), store.clone()).unwrap();
    assert_eq!(engine.state(), &ProgressState::default());

    engine.toggle_checkpoint("step0", "a").unwrap();
    let saved = ProgressState::from_bytes(&fs::read(store.path()).unwrap()).unwrap();
    assert!(saved.is_completed("step0", "a"));
}

#[test]
fn test_navigation_errors_do_not_touch_disk() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path());
    let mut engine = ProgressEngine::new(three_steps(), store.clone()).unwrap();

    assert!(matches!(
        engine.go_to(5),
        Err(ProgressError::IndexOutOfRange {
            index: 5,
            step_count: 3
        })
    ));
    assert!(matches!(
        engine.toggle_checkpoint("step1", "a"),
        Err(ProgressError::UnknownCheckpoint { .. })
    ));
    assert!(!engine.advance().unwrap());
    assert!(!engine.retreat().unwrap());
    assert!(!store.path().exists());
}

#[test]
fn test_advance_gate_holds_at_every_index() {
    let mut engine = ProgressEngine::new(three_steps(), cutover::MemoryStore::new()).unwrap();

    for index in 0..=engine.step_count() {
        engine.go_to(index).unwrap();
        let satisfied = engine.is_step_satisfied(index);
        let moved = engine.advance().unwrap();
        assert_eq!(moved, satisfied, "index {index}");
        let expected = if satisfied { index + 1 } else { index };
        assert_eq!(engine.current_step(), expected);
    }
}

#[test]
fn test_all_optional_guide_reports_zero_progress() {
    let guide = catalog(vec![
        step("read-first", vec![checkpoint("skimmed", true)]),
        step("extras", vec![checkpoint("x", true), checkpoint("y", true)]),
    ]);
    assert!(guide.is_progress_exempt(0) && guide.is_progress_exempt(1));

    let mut engine = ProgressEngine::new(guide, cutover::MemoryStore::new()).unwrap();
    let empty = ProgressFraction {
        completed: 0,
        total: 0,
    };
    assert_eq!(engine.progress_fraction(), empty);
    assert_eq!(engine.progress_fraction().percentage(), 0);

    engine.toggle_checkpoint("extras", "x").unwrap();
    assert!(engine.advance().unwrap());
    assert!(engine.advance().unwrap());
    assert!(engine.is_terminal());
    assert_eq!(engine.progress_fraction(), empty);
    assert_eq!(engine.progress_fraction().percentage(), 0);
    assert!(engine.progress_fraction().ratio().abs() < f64::EPSILON);
}

#[test]
fn test_reopen_against_longer_guide_clears_completion() {
    let temp_dir = TempDir::new().unwrap();
    let short = catalog(vec![step("one", Vec::new()), step("two", Vec::new())]);
    {
        let mut engine = ProgressEngine::new(short, JsonFileStore::new(temp_dir.path())).unwrap();
        engine.go_to(2).unwrap();
        assert!(engine.state().completed_at.is_some());
    }

    let longer = catalog(vec![
        step("one", Vec::new()),
        step("two", Vec::new()),
        step("three", vec![checkpoint("c", false)]),
        step("four", Vec::new()),
    ]);
    let engine = ProgressEngine::new(longer, JsonFileStore::new(temp_dir.path())).unwrap();
    assert_eq!(engine.current_step(), 2);
    assert!(!engine.is_terminal());
    assert!(engine.state().completed_at.is_none());
}

#[tokio::test]
async fn test_builtin_guide_progress_accounting() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = ProgressEngine::open(&BuiltinSource, JsonFileStore::new(temp_dir.path()))
        .await
        .unwrap();

    assert_eq!(engine.step_count(), 14);
    assert_eq!(
        engine.progress_fraction(),
        ProgressFraction {
            completed: 0,
            total: 13
        }
    );

    let first = engine.catalog().get(0).unwrap().clone();
    for cp in first.required_checkpoints() {
        engine.toggle_checkpoint(&first.id, &cp.id).unwrap();
    }
    assert!(engine.can_advance());
    assert!(engine.advance().unwrap());
    assert_eq!(engine.progress_fraction().completed, 1);
    assert_eq!(engine.progress_fraction().percentage(), 8);
}
