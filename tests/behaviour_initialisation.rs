//! Behaviour-driven tests for exactly-once initialisation.
//!
//! Tests use the rstest-bdd v0.5.0 mutable world pattern.

use native_init::linker::{DynamicLinker, LibraryOrigin, LoadedLibrary};
use native_init::resources::EmbeddedResources;
use native_init::test_utils::RecordingLinker;
use native_init::{
    InitError, LinkError, LoadStage, LoaderStrategy, NativeInitializer, NativeLoader,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

/// Rejects the first request and accepts every later one.
#[derive(Default)]
struct FlakyLinker {
    attempts: AtomicUsize,
}

impl DynamicLinker for FlakyLinker {
    fn load_by_name(&self, name: &str) -> Result<LoadedLibrary, LinkError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(LinkError {
                target: name.to_owned(),
                reason: "not installed yet".to_owned(),
            });
        }
        Ok(LoadedLibrary::new(LibraryOrigin::Name(name.to_owned())))
    }

    fn load_by_path(&self, path: &Path) -> Result<LoadedLibrary, LinkError> {
        Err(LinkError {
            target: path.display().to_string(),
            reason: "unexpected path load".to_owned(),
        })
    }
}

#[derive(Default)]
struct InitWorld {
    loads: Option<Box<dyn Fn() -> usize>>,
    constructed: Arc<AtomicUsize>,
    initializer: Option<NativeInitializer<Vec<u8>>>,
    observed: Vec<usize>,
    last: Option<Result<Vec<u8>, InitError>>,
}

#[fixture]
fn world() -> InitWorld {
    InitWorld::default()
}

impl InitWorld {
    fn install(&mut self, linker: Arc<dyn DynamicLinker>) {
        let loader = NativeLoader::new(
            linker,
            Arc::new(EmbeddedResources::new()),
            &native_init::events::EventLog::global(),
        );
        let constructed = Arc::clone(&self.constructed);
        self.initializer = Some(NativeInitializer::new(
            loader,
            LoaderStrategy::SystemSearchPath("thelib".to_owned()),
            move || {
                constructed.fetch_add(1, Ordering::SeqCst);
                b"codec state".to_vec()
            },
        ));
    }

    fn initializer(&self) -> &NativeInitializer<Vec<u8>> {
        self.initializer.as_ref().expect("initializer set")
    }
}

#[given("a library that takes a moment to load")]
fn given_slow_library(world: &mut InitWorld) {
    let linker = Arc::new(RecordingLinker::new().with_delay(Duration::from_millis(20)));
    let counter = Arc::clone(&linker);
    world.loads = Some(Box::new(move || counter.call_count()));
    world.install(linker);
}

#[given("a library that is missing on the first attempt")]
fn given_flaky_library(world: &mut InitWorld) {
    let linker = Arc::new(FlakyLinker::default());
    let counter = Arc::clone(&linker);
    world.loads = Some(Box::new(move || counter.attempts.load(Ordering::SeqCst)));
    world.install(linker);
}

#[when("{threads} threads request the value at once")]
fn when_concurrent(world: &mut InitWorld, threads: usize) {
    let initializer = world.initializer();
    let barrier = Barrier::new(threads);
    let observed = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let value = initializer.get().expect("initialised");
                    value.as_ptr() as usize
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect::<Vec<_>>()
    });
    world.observed = observed;
}

#[when("the value is requested")]
fn when_requested(world: &mut InitWorld) {
    let outcome = world.initializer().get().cloned();
    world.last = Some(outcome);
}

#[then("the library was loaded {count} times")]
fn then_loads(world: &mut InitWorld, count: usize) {
    let loads = world.loads.as_ref().expect("library set");
    assert_eq!(loads(), count);
}

#[then("the value was constructed {count} times")]
fn then_constructed(world: &mut InitWorld, count: usize) {
    assert_eq!(world.constructed.load(Ordering::SeqCst), count);
}

#[then("every thread observed the same value")]
fn then_same_value(world: &mut InitWorld) {
    let first = world.observed.first().expect("threads ran");
    assert!(world.observed.iter().all(|address| address == first));
}

#[then("the request fails at the link stage")]
fn then_link_failure(world: &mut InitWorld) {
    match world.last.as_ref().expect("requested") {
        Err(InitError::Load(err)) => assert_eq!(err.stage(), LoadStage::Link),
        other => panic!("expected a link failure, got {other:?}"),
    }
    assert!(!world.initializer().is_initialized());
}

#[then("the value is available")]
fn then_available(world: &mut InitWorld) {
    match world.last.as_ref().expect("requested") {
        Ok(value) => assert_eq!(value.as_slice(), b"codec state"),
        Err(err) => panic!("expected the value, got {err}"),
    }
    assert!(world.initializer().is_initialized());
}

#[then("replacing the strategy is rejected")]
fn then_strategy_fixed(world: &mut InitWorld) {
    let outcome = world
        .initializer()
        .set_strategy(LoaderStrategy::SystemSearchPath("other".to_owned()));
    assert!(matches!(outcome, Err(InitError::AlreadyInitialized)));
}

#[scenario(
    path = "tests/features/initialisation.feature",
    name = "Concurrent callers share one load"
)]
fn scenario_concurrent(world: InitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/initialisation.feature",
    name = "A failed initialisation is retried"
)]
fn scenario_retry(world: InitWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/initialisation.feature",
    name = "The strategy is fixed after initialisation"
)]
fn scenario_strategy_fixed(world: InitWorld) {
    let _ = world;
}
