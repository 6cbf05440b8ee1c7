//! Behaviour-driven tests for extracting bundled libraries to disk.
//!
//! Scenarios run resource strategies against a counting store and a
//! recording linker, so no real library is ever handed to the operating
//! system. Tests use the rstest-bdd v0.5.0 mutable world pattern.

use native_init::extraction::ExtractionTarget;
use native_init::linker::LibraryOrigin;
use native_init::naming::{LibraryName, NamingScheme};
use native_init::test_utils::{CountingStore, RecordingLinker};
use native_init::{LoadError, LoadStage, LoaderFactory, NativeLoader};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const PAYLOAD: &[u8] = b"\x7fELF bundled library bytes";

#[derive(Default)]
struct ExtractionWorld {
    factory: Option<LoaderFactory>,
    store: Option<Arc<CountingStore>>,
    loader: Option<NativeLoader>,
    directory: Option<TempDir>,
    paths: Vec<PathBuf>,
    error: Option<LoadError>,
}

#[fixture]
fn world() -> ExtractionWorld {
    ExtractionWorld::default()
}

impl ExtractionWorld {
    fn prepare(&mut self, store: CountingStore, factory: LoaderFactory) {
        let store = Arc::new(store);
        self.loader = Some(NativeLoader::new(
            Arc::new(RecordingLinker::new()),
            Arc::clone(&store) as Arc<dyn native_init::resources::ResourceStore>,
            &native_init::events::EventLog::global(),
        ));
        self.store = Some(store);
        self.factory = Some(factory);
        self.directory = Some(tempfile::tempdir().expect("temp dir"));
    }

    fn load_repeatedly(&mut self, target: ExtractionTarget, times: usize) {
        let factory = self.factory.as_ref().expect("factory set");
        let loader = self.loader.as_ref().expect("loader set");
        let strategy = factory.resource_loader(target);
        for _ in 0..times {
            match loader.load(&strategy) {
                Ok(library) => match library.origin() {
                    LibraryOrigin::Path(path) => self.paths.push(path.clone()),
                    LibraryOrigin::Name(name) => panic!("unexpected system load of {name}"),
                },
                Err(err) => {
                    self.error = Some(err);
                    return;
                }
            }
        }
    }

    fn directory_path(&self) -> PathBuf {
        self.directory.as_ref().expect("directory set").path().to_path_buf()
    }

    fn last_path(&self) -> &PathBuf {
        self.paths.last().expect("at least one successful load")
    }
}

fn thelib() -> LoaderFactory {
    LoaderFactory::new(NamingScheme::new(
        LibraryName::try_from("thelib").expect("test library"),
    ))
}

#[given("a bundle providing the library for this platform")]
fn given_bundle(world: &mut ExtractionWorld) {
    let factory = thelib();
    let resource = factory
        .naming_scheme()
        .resolve(true, false)
        .expect("every platform supported");
    world.prepare(CountingStore::new().with(&resource, PAYLOAD), factory);
}

#[given("an empty bundle")]
fn given_empty_bundle(world: &mut ExtractionWorld) {
    world.prepare(CountingStore::new(), thelib());
}

#[when("the library is loaded from a fixed directory {times} times")]
fn when_fixed(world: &mut ExtractionWorld, times: usize) {
    let target = ExtractionTarget::Fixed(world.directory_path());
    world.load_repeatedly(target, times);
}

#[when("the library is loaded from an ephemeral directory {times} times")]
fn when_ephemeral(world: &mut ExtractionWorld, times: usize) {
    let target = ExtractionTarget::Ephemeral(world.directory_path());
    world.load_repeatedly(target, times);
}

#[then("the bundle was read {count} times")]
fn then_reads(world: &mut ExtractionWorld, count: usize) {
    assert!(world.error.is_none(), "unexpected failure: {:?}", world.error);
    assert_eq!(world.store.as_ref().expect("store set").opens(), count);
}

#[then("every load used the same file")]
fn then_same_file(world: &mut ExtractionWorld) {
    let first = world.paths.first().expect("at least one load");
    assert!(world.paths.iter().all(|path| path == first));
}

#[then("the extracted file matches the bundled bytes")]
fn then_bytes_match(world: &mut ExtractionWorld) {
    assert_eq!(std::fs::read(world.last_path()).expect("read extracted"), PAYLOAD);
}

#[then("the extraction directory holds only the library")]
fn then_no_leftovers(world: &mut ExtractionWorld) {
    let entries: Vec<_> = std::fs::read_dir(world.directory_path())
        .expect("read dir")
        .map(|entry| entry.expect("entry").path())
        .collect();
    assert_eq!(entries.len(), 1, "unexpected entries: {entries:?}");
}

#[then("shutdown removes the extracted file")]
fn then_shutdown_cleans(world: &mut ExtractionWorld) {
    let path = world.last_path().clone();
    let report = world.loader.as_ref().expect("loader set").shutdown();
    assert_eq!(report.failed, 0);
    assert!(!path.exists());
}

#[then("loading failed at the extraction stage")]
fn then_extraction_failed(world: &mut ExtractionWorld) {
    let err = world.error.as_ref().expect("load should fail");
    assert_eq!(err.stage(), LoadStage::Extraction);
    assert!(err.to_string().contains("thelib"), "unexpected message: {err}");
}

#[scenario(
    path = "tests/features/extraction.feature",
    name = "Fixed directory extraction is idempotent"
)]
fn scenario_fixed_idempotent(world: ExtractionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/extraction.feature",
    name = "Ephemeral extraction reads the bundle every time"
)]
fn scenario_ephemeral_rereads(world: ExtractionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/extraction.feature",
    name = "A missing resource fails at the extraction stage"
)]
fn scenario_missing_resource(world: ExtractionWorld) {
    let _ = world;
}
