//! Integration tests for the context bundler engine.
//!
//! The engine is driven the way a display would drive it: requests go in
//! through its methods, results come back as `EngineEvent`s on a tokio MPSC
//! channel once the test awaits `wait_idle` (or pumps).

use context_bundler::app::{
    events::EngineEvent, proxy::EventProxy, view_model::SelectionUpdate, Engine, GenerateRequest,
};
use context_bundler::config::AppConfig;
use context_bundler::core::{OutputFormat, SelectionAction};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Contains the test infrastructure.
mod helpers {
    use super::*;
    use std::fs;

    /// A test double for the display side using a tokio MPSC channel.
    #[derive(Clone)]
    pub struct TestEventProxy {
        pub sender: mpsc::UnboundedSender<EngineEvent>,
    }

    impl EventProxy for TestEventProxy {
        fn send_event(&self, event: EngineEvent) {
            if let Err(e) = self.sender.send(event) {
                // Panic in a test if the receiver is dropped, as it indicates a test setup error.
                panic!("Test receiver dropped: {:?}", e.0);
            }
        }
    }

    /// `TestHarness` sets up a complete, isolated environment for each test case.
    pub struct TestHarness {
        pub engine: Engine<TestEventProxy>,
        pub event_rx: mpsc::UnboundedReceiver<EngineEvent>,
        pub root_path: PathBuf,
        pub output_dir: PathBuf,
        _temp_dir: TempDir,
        _output_temp_dir: TempDir,
    }

    impl TestHarness {
        /// Creates a new test harness with a clean configuration.
        pub fn new() -> Self {
            Self::with_ignore(&[])
        }

        pub fn with_ignore(patterns: &[&str]) -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let output_temp_dir = tempfile::tempdir().expect("Failed to create output dir");
            let root_path = temp_dir.path().to_path_buf();
            let output_dir = output_temp_dir.path().to_path_buf();
            let (event_tx, event_rx) = mpsc::unbounded_channel();

            let config = Self::create_clean_test_config(patterns, output_dir.clone());
            let engine = Engine::new(config, TestEventProxy { sender: event_tx })
                .expect("Failed to start engine");

            Self {
                engine,
                event_rx,
                root_path,
                output_dir,
                _temp_dir: temp_dir,
                _output_temp_dir: output_temp_dir,
            }
        }

        /// Creates a clean test configuration without production ignore patterns.
        fn create_clean_test_config(patterns: &[&str], output_dir: PathBuf) -> AppConfig {
            AppConfig {
                ignore_patterns: patterns.iter().map(|p| p.to_string()).collect(),
                output_directory: Some(output_dir),
                dispatcher_threads_per_core: 1,
                read_threads_per_core: 2,
                ..Default::default()
            }
        }

        /// Creates a file inside the temporary test directory.
        pub fn create_file(&self, path: &str, content: &str) {
            let file_path = self.root_path.join(path);
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            fs::write(file_path, content).expect("Failed to write file");
        }

        /// Sets up a standard project structure for testing.
        pub fn setup_basic_project(&self) {
            self.create_file("src/main.rs", "fn main() {}");
            self.create_file("src/lib.rs", "// Library code");
            self.create_file("README.md", "# My Project");
            self.create_file("Cargo.toml", "[package]\nname = \"test\"");
            self.create_file("docs/guide.txt", "User guide content");
            self.create_file("docs/logo.png", "not really a png");
        }

        pub fn path(&self, relative: &str) -> PathBuf {
            self.root_path.join(relative)
        }

        /// Selected paths relative to the root, in selection order.
        pub fn selected(&self) -> Vec<String> {
            self.engine
                .selected_paths()
                .iter()
                .map(|p| {
                    p.strip_prefix(&self.root_path)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/")
                })
                .collect()
        }

        pub fn request(&self, name: &str, format: OutputFormat) -> GenerateRequest {
            GenerateRequest {
                output_dir: self.output_dir.clone(),
                output_name: name.to_string(),
                format,
                relative: true,
                compress: false,
            }
        }

        /// Everything the engine has sent so far.
        pub fn drain_events(&mut self) -> Vec<EngineEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.event_rx.try_recv() {
                events.push(event);
            }
            events
        }

        /// Runs pending work and returns the outcome of the generation.
        pub async fn wait_for_generation(&mut self) -> Result<PathBuf, String> {
            tokio::time::timeout(Duration::from_secs(10), self.engine.wait_idle())
                .await
                .expect("Engine did not become idle within timeout");

            self.drain_events()
                .into_iter()
                .find_map(|event| match event {
                    EngineEvent::GenerationFinished(outcome) => Some(outcome),
                    _ => None,
                })
                .expect("No generation result was delivered")
        }
    }
}

use helpers::TestHarness;

#[tokio::test]
async fn test_recursive_select_then_deselect_restores_selection() {
    // --- ARRANGE ---
    let mut harness = TestHarness::new();
    harness.setup_basic_project();
    harness.engine.toggle(&harness.path("README.md"), true);
    let before = harness.engine.selected_paths();

    // --- ACT ---
    harness.engine.toggle(&harness.path("src"), true);
    harness.engine.wait_idle().await;
    assert_eq!(
        harness.selected(),
        vec!["README.md", "src", "src/lib.rs", "src/main.rs"]
    );

    harness.engine.toggle(&harness.path("src"), true);
    harness.engine.wait_idle().await;

    // --- ASSERT ---
    assert_eq!(harness.engine.selected_paths(), before);
}

#[tokio::test]
async fn test_recursive_selection_skips_ignored_files() {
    let mut harness = TestHarness::with_ignore(&["*.png"]);
    harness.create_file("assets/x.png", "png");
    harness.create_file("assets/x.txt", "txt");

    harness.engine.toggle(&harness.path("assets"), true);
    harness.engine.wait_idle().await;

    assert_eq!(harness.selected(), vec!["assets", "assets/x.txt"]);
    let events = harness.drain_events();
    assert!(matches!(
        events.as_slice(),
        [EngineEvent::SelectionChanged(SelectionUpdate {
            action: SelectionAction::Select,
            affected: 2,
            selected_files: 1,
        })]
    ));
}

#[tokio::test]
async fn test_generate_markdown_end_to_end() {
    let mut harness = TestHarness::new();
    harness.create_file("a.txt", "hi");
    harness.create_file("sub/b.txt", "yo");

    harness.engine.navigate(&harness.root_path).unwrap();
    harness.engine.toggle(&harness.root_path.clone(), true);
    harness.engine.wait_idle().await;

    let request = harness.request("prompt_context.md", OutputFormat::Markdown);
    let planned = harness.engine.generate(request).unwrap();
    let written = harness.wait_for_generation().await.unwrap();

    assert_eq!(written, planned);
    assert_eq!(
        std::fs::read_to_string(written).unwrap(),
        "# File Index\n1. a.txt\n2. sub/b.txt\n\n==============================\n\n\
         ## File 1: a.txt\n```txt\nhi\n```\n\n\
         ## File 2: sub/b.txt\n```txt\nyo\n```\n"
    );
}

#[tokio::test]
async fn test_generate_xml_lists_selected_files_in_order() {
    let mut harness = TestHarness::with_ignore(&["*.png"]);
    harness.setup_basic_project();

    harness.engine.navigate(&harness.root_path).unwrap();
    harness.engine.toggle(&harness.path("src"), true);
    harness.engine.toggle(&harness.path("docs"), true);
    harness.engine.toggle(&harness.path("README.md"), false);
    harness.engine.wait_idle().await;

    let request = harness.request("context.xml", OutputFormat::Xml);
    harness.engine.generate(request).unwrap();
    let written = harness.wait_for_generation().await.unwrap();
    let xml = std::fs::read_to_string(written).unwrap();

    let tree: Vec<&str> = xml
        .lines()
        .filter(|l| l.trim_start().starts_with("<file path=") && l.ends_with("/>"))
        .collect();
    assert_eq!(
        tree,
        vec![
            "    <file path=\"docs/guide.txt\"/>",
            "    <file path=\"README.md\"/>",
            "    <file path=\"src/lib.rs\"/>",
            "    <file path=\"src/main.rs\"/>",
        ]
    );
    assert!(xml.contains("<file path=\"src/main.rs\"><![CDATA[fn main() {}]]></file>"));
    assert!(!xml.contains("logo.png"));
}

#[tokio::test]
async fn test_repeated_generation_is_byte_identical() {
    let mut harness = TestHarness::new();
    harness.setup_basic_project();
    harness.engine.navigate(&harness.root_path).unwrap();
    harness.engine.toggle(&harness.root_path.clone(), true);
    harness.engine.wait_idle().await;

    harness
        .engine
        .generate(harness.request("one.md", OutputFormat::Markdown));
    let first = harness.wait_for_generation().await.unwrap();
    harness
        .engine
        .generate(harness.request("two.md", OutputFormat::Markdown));
    let second = harness.wait_for_generation().await.unwrap();

    assert_eq!(
        std::fs::read(first).unwrap(),
        std::fs::read(second).unwrap()
    );
}

#[tokio::test]
async fn test_compress_collapses_blank_lines() {
    let mut harness = TestHarness::new();
    harness.create_file("notes.txt", "line1\n\n\n\nline2");
    harness.engine.toggle(&harness.path("notes.txt"), false);

    let mut request = harness.request("out.md", OutputFormat::Markdown);
    request.compress = true;
    harness.engine.generate(request).unwrap();
    let written = harness.wait_for_generation().await.unwrap();

    let doc = std::fs::read_to_string(written).unwrap();
    assert!(doc.contains("```txt\nline1\nline2\n```"));
}

#[tokio::test]
async fn test_output_among_sources_is_rejected() {
    let mut harness = TestHarness::new();
    harness.create_file("a.txt", "hi");
    harness.create_file("bundle.md", "old bundle");
    harness.engine.toggle(&harness.root_path.clone(), true);
    harness.engine.wait_idle().await;

    let request = GenerateRequest {
        output_dir: harness.root_path.clone(),
        ..harness.request("bundle.md", OutputFormat::Markdown)
    };
    harness.engine.generate(request).unwrap();
    let outcome = harness.wait_for_generation().await;

    let message = outcome.unwrap_err();
    assert!(message.contains("Output path is also a selected source"), "{message}");
    assert_eq!(
        std::fs::read_to_string(harness.path("bundle.md")).unwrap(),
        "old bundle"
    );
}

#[tokio::test]
async fn test_clear_all_then_generate_is_refused() {
    let mut harness = TestHarness::new();
    harness.setup_basic_project();
    harness.engine.toggle(&harness.root_path.clone(), true);
    harness.engine.wait_idle().await;
    assert_eq!(harness.engine.selected_file_count(), 6);

    harness.engine.clear_all();
    harness.drain_events();

    let request = harness.request("out.md", OutputFormat::Markdown);
    assert!(harness.engine.generate(request).is_none());
    assert!(matches!(
        harness.drain_events().as_slice(),
        [EngineEvent::Notice(_)]
    ));
    assert!(!harness.output_dir.join("out.md").exists());
}

#[tokio::test]
async fn test_stale_listing_is_discarded() {
    let mut harness = TestHarness::new();
    harness.setup_basic_project();

    harness.engine.navigate(&harness.root_path).unwrap();
    harness.engine.navigate(harness.path("src")).unwrap();
    harness.engine.navigate(harness.path("docs")).unwrap();
    harness.engine.wait_idle().await;

    let listed: Vec<PathBuf> = harness
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::DirectoryListed { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(listed, vec![harness.path("docs")]);

    assert!(harness.engine.go_back());
    harness.engine.wait_idle().await;
    let names: Vec<String> = harness
        .engine
        .listing()
        .iter()
        .map(|e| e.name.clone())
        .collect();
    assert_eq!(names, vec!["lib.rs", "main.rs"]);
}

#[tokio::test]
async fn test_pumping_from_a_periodic_tick() {
    let mut harness = TestHarness::new();
    harness.setup_basic_project();
    harness.engine.toggle(&harness.root_path.clone(), true);

    let tick = async {
        while harness.engine.pending_tasks() > 0 {
            harness.engine.pump();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), tick)
        .await
        .expect("Selection was not delivered within timeout");

    assert_eq!(harness.engine.selected_file_count(), 6);
    assert_eq!(harness.engine.selection_view().paths.len(), 6);
}
