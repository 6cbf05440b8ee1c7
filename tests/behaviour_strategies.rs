//! Behaviour-driven tests for strategy fallback chains.
//!
//! Tests use the rstest-bdd v0.5.0 mutable world pattern.

use native_init::linker::{LibraryOrigin, LoadedLibrary};
use native_init::resources::EmbeddedResources;
use native_init::test_utils::{RecordingLinker, RecordingLog};
use native_init::{LoadError, LoaderStrategy, NativeLoader};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;
use std::sync::Arc;

struct StrategyWorld {
    rejected: Vec<String>,
    linker: Option<Arc<RecordingLinker>>,
    log: Arc<RecordingLog>,
    outcome: Option<Result<LoadedLibrary, LoadError>>,
}

#[fixture]
fn world() -> StrategyWorld {
    StrategyWorld {
        rejected: Vec::new(),
        linker: None,
        log: RecordingLog::new(),
        outcome: None,
    }
}

impl StrategyWorld {
    fn loaded(&self) -> &LoadedLibrary {
        match self.outcome.as_ref().expect("strategy ran") {
            Ok(library) => library,
            Err(err) => panic!("expected the load to succeed: {err}"),
        }
    }
}

#[given("the linker cannot find \"{target}\"")]
fn given_rejected(world: &mut StrategyWorld, target: String) {
    world.rejected.push(target);
}

#[when("the system library \"{name}\" is tried before file \"{path}\"")]
fn when_fallback(world: &mut StrategyWorld, name: String, path: String) {
    let linker = Arc::new(
        world
            .rejected
            .iter()
            .fold(RecordingLinker::new(), |linker, target| linker.reject(target)),
    );
    let loader = NativeLoader::new(
        Arc::clone(&linker) as Arc<dyn native_init::linker::DynamicLinker>,
        Arc::new(EmbeddedResources::new()),
        &RecordingLog::event_log(&world.log),
    );
    let strategy = LoaderStrategy::SystemSearchPath(name)
        .fallback_to(LoaderStrategy::ExplicitFile(PathBuf::from(path)));

    world.outcome = Some(loader.load(&strategy));
    world.linker = Some(linker);
}

#[then("the library was loaded from file \"{path}\"")]
fn then_loaded_from_file(world: &mut StrategyWorld, path: String) {
    assert_eq!(world.loaded().origin(), &LibraryOrigin::Path(PathBuf::from(path)));
}

#[then("the library was loaded from system library \"{name}\"")]
fn then_loaded_from_system(world: &mut StrategyWorld, name: String) {
    assert_eq!(world.loaded().origin(), &LibraryOrigin::Name(name));
}

#[then("the log mentions \"{text}\"")]
fn then_log_mentions(world: &mut StrategyWorld, text: String) {
    assert!(
        world.log.contains(&text),
        "missing '{text}' in {:?}",
        world.log.events()
    );
}

#[then("loading failed with a link error for \"{target}\"")]
fn then_link_failed(world: &mut StrategyWorld, target: String) {
    match world.outcome.as_ref().expect("strategy ran") {
        Err(LoadError::Link(err)) => assert_eq!(err.target, target),
        other => panic!("expected a link error, got {other:?}"),
    }
}

#[then("the linker received {count} requests")]
fn then_request_count(world: &mut StrategyWorld, count: usize) {
    let linker = world.linker.as_ref().expect("strategy ran");
    assert_eq!(linker.call_count(), count, "calls: {:?}", linker.calls());
}

#[scenario(
    path = "tests/features/strategies.feature",
    name = "A failing primary falls back to the secondary"
)]
fn scenario_fallback(world: StrategyWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/strategies.feature",
    name = "The secondary failure is surfaced when both fail"
)]
fn scenario_both_fail(world: StrategyWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/strategies.feature",
    name = "A successful primary never tries the secondary"
)]
fn scenario_primary_wins(world: StrategyWorld) {
    let _ = world;
}
