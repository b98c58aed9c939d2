//! Integration tests for library symbol merging

use std::fs;
use std::path::{Path, PathBuf};

use r_droid_build_engine::{
    AndroidModule, BuildModule, BuildType, Cache, CollectingLogger, MergeReport, MergeSymbolsTask,
    Task, TaskRunner, TaskState,
};
use r_droid_core::BuildSettings;
use tempfile::TempDir;

/// An application build directory with library directories next to it
struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    module: AndroidModule,
}

impl Fixture {
    fn new(full_symbols: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let module =
            AndroidModule::with_settings("com.app", root.join("build"), &BuildSettings::default());
        let fixture = Self {
            _temp: temp,
            root,
            module,
        };
        fixture.set_full_symbols(full_symbols);
        fixture
    }

    fn set_full_symbols(&self, symbols: &str) {
        let path = self.root.join("build/bin/res/R.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, symbols).unwrap();
    }

    /// Create (or overwrite) a library and declare it
    fn library(&mut self, name: &str, package: &str, symbols: &str) -> PathBuf {
        let dir = self.write_library(name, package, symbols);
        if !self.module.libraries().contains(&dir) {
            self.module.add_library(&dir);
        }
        dir
    }

    fn write_library(&self, name: &str, package: &str, symbols: &str) -> PathBuf {
        let dir = self.root.join("libs").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("AndroidManifest.xml"),
            format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
                 <manifest xmlns:android=\"http://schemas.android.com/apk/res/android\"\n\
                 \x20   package=\"{}\">\n\
                 \x20   <uses-sdk android:minSdkVersion=\"21\"/>\n\
                 </manifest>\n",
                package
            ),
        )
        .unwrap();
        fs::write(dir.join("R.txt"), symbols).unwrap();
        dir
    }

    fn generated(&self, package: &str) -> PathBuf {
        let mut path = self.root.join("build/gen");
        path.extend(package.split('.'));
        path.join("R.java")
    }

    fn read_generated(&self, package: &str) -> String {
        fs::read_to_string(self.generated(package)).unwrap()
    }

    fn merge(&mut self) -> MergeReport {
        let logger = CollectingLogger::new();
        let mut task = MergeSymbolsTask::new(&mut self.module, BuildSettings::default(), &logger);
        task.prepare(BuildType::Debug);
        task.run().unwrap();
        task.report().clone()
    }
}

fn field_lines(source: &str) -> Vec<&str> {
    source
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("public static final int"))
        .collect()
}

#[test]
fn test_two_packages_end_to_end() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    fx.library("a", "com.a", "int id icon 0x1\n");
    fx.library("b", "com.b", "int id icon 0x2\n");

    let report = fx.merge();
    assert_eq!(report.written, vec!["com.a".to_string(), "com.b".to_string()]);

    for package in ["com.a", "com.b"] {
        let source = fx.read_generated(package);
        assert!(source.contains(&format!("package {};", package)));
        assert!(source.contains("public static final class id {"));
        assert_eq!(field_lines(&source), vec!["public static final int icon=0x7f010001;"]);
    }
}

#[test]
fn test_values_come_from_full_table() {
    let mut fx = Fixture::new("int id icon 0x7f010001\nint string title 0x7f020005\n");
    fx.library("a", "com.a", "int id icon 0x1\nint string title 0x2\n");

    fx.merge();
    let source = fx.read_generated("com.a");

    assert!(source.contains("icon=0x7f010001;"));
    assert!(source.contains("title=0x7f020005;"));
    assert!(!source.contains("=0x1;"));
    assert!(!source.contains("=0x2;"));
}

#[test]
fn test_symbols_missing_from_full_table_are_dropped() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    fx.library("a", "com.a", "int id icon 0x1\nint id removed 0x2\nint layout main 0x3\n");

    fx.merge();
    let source = fx.read_generated("com.a");

    assert!(!source.contains("removed"));
    assert!(!source.contains("class layout"));
    assert_eq!(field_lines(&source).len(), 1);
}

#[test]
fn test_shared_package_is_union() {
    let mut fx = Fixture::new("int id one 0x7f010001\nint id two 0x7f010002\nint id both 0x7f010003\n");
    fx.library("first", "com.shared", "int id one 0x1\nint id both 0x3\n");
    fx.library("second", "com.shared", "int id two 0x2\nint id both 0x3\n");

    let report = fx.merge();
    assert_eq!(report.written, vec!["com.shared".to_string()]);

    let source = fx.read_generated("com.shared");
    assert_eq!(
        field_lines(&source),
        vec![
            "public static final int both=0x7f010003;",
            "public static final int one=0x7f010001;",
            "public static final int two=0x7f010002;",
        ]
    );
}

#[test]
fn test_styleables_keep_arrays() {
    let mut fx = Fixture::new(
        "int attr color 0x7f030001\n\
         int attr size 0x7f030002\n\
         int[] styleable Widget { 0x7f030001, 0x7f030002 }\n\
         int styleable Widget_color 0\n\
         int styleable Widget_size 1\n",
    );
    fx.library(
        "a",
        "com.a",
        "int attr color 0x1\nint[] styleable Widget { 0x1 }\nint styleable Widget_color 0\n",
    );

    fx.merge();
    let source = fx.read_generated("com.a");

    assert!(source.contains("public static final int[] Widget={ 0x7f030001, 0x7f030002 };"));
    assert!(source.contains("public static final int Widget_color=0;"));
    assert!(!source.contains("Widget_size"));
}

#[test]
fn test_cache_freshness() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("R.txt");
    fs::write(&path, "int id icon 0x1\n").unwrap();

    let mut cache: Cache<String, PathBuf> = Cache::new();
    cache.load(&path, "com.a".into(), PathBuf::from("gen/com/a/R.java")).unwrap();
    assert!(!cache.needs(&path));

    fs::write(&path, "int id icon 0x2\n").unwrap();
    assert!(cache.needs(&path));
}

#[test]
fn test_unchanged_libraries_are_not_reloaded() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    fx.library("a", "com.a", "int id icon 0x1\n");
    fx.merge();

    // a hand edit to the output survives because nothing forced a rewrite
    fs::write(fx.generated("com.a"), "edited").unwrap();
    let report = fx.merge();

    assert!(report.written.is_empty());
    assert_eq!(report.fresh, vec![fx.root.join("libs/a/R.txt")]);
    assert_eq!(fx.read_generated("com.a"), "edited");
}

#[test]
fn test_removed_library_output_is_deleted() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    let a = fx.library("a", "com.a", "int id icon 0x1\n");
    fx.library("b", "com.b", "int id icon 0x2\n");
    fx.merge();
    let b_source = fx.read_generated("com.b");

    fs::remove_dir_all(&a).unwrap();
    let report = fx.merge();

    assert_eq!(report.deleted, vec![fx.generated("com.a")]);
    assert!(!fx.generated("com.a").exists());
    assert_eq!(fx.read_generated("com.b"), b_source);
    assert_eq!(report.fresh, vec![fx.root.join("libs/b/R.txt")]);
}

#[test]
fn test_removed_library_of_shared_package_regenerates() {
    let mut fx = Fixture::new("int id one 0x7f010001\nint id two 0x7f010002\n");
    fx.library("first", "com.shared", "int id one 0x1\n");
    let second = fx.library("second", "com.shared", "int id two 0x2\n");
    fx.merge();

    fs::remove_file(second.join("R.txt")).unwrap();
    let report = fx.merge();

    assert!(report.deleted.is_empty());
    assert_eq!(report.written, vec!["com.shared".to_string()]);
    let source = fx.read_generated("com.shared");
    assert!(source.contains("one=0x7f010001;"));
    assert!(!source.contains("two="));
}

#[test]
fn test_changed_library_regenerates_whole_package() {
    let mut fx = Fixture::new("int id one 0x7f010001\nint id two 0x7f010002\nint id three 0x7f010003\n");
    fx.library("first", "com.shared", "int id one 0x1\n");
    fx.library("second", "com.shared", "int id two 0x2\n");
    fx.merge();

    fx.write_library("second", "com.shared", "int id two 0x2\nint id three 0x3\n");
    let report = fx.merge();

    assert_eq!(report.written, vec!["com.shared".to_string()]);
    assert!(report.fresh.is_empty());
    let source = fx.read_generated("com.shared");
    assert_eq!(field_lines(&source).len(), 3);
}

#[test]
fn test_garbled_library_is_excluded() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    fx.library("good", "com.good", "int id icon 0x1\n");
    let bad = fx.library("bad", "com.bad", "<resources/>\n");

    let report = fx.merge();

    assert_eq!(report.written, vec!["com.good".to_string()]);
    assert_eq!(report.excluded, vec![bad]);
    assert!(!fx.generated("com.bad").exists());
}

#[test]
fn test_cache_survives_new_module_instance() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    let a = fx.library("a", "com.a", "int id icon 0x1\n");
    fx.merge();

    fx.module = AndroidModule::with_settings("com.app", fx.root.join("build"), &BuildSettings::default())
        .with_libraries([a]);
    let report = fx.merge();

    assert!(report.written.is_empty());
    assert_eq!(report.fresh.len(), 1);
    assert!(fx.root.join("build/intermediate/caches/mergeSymbolsCache.json").exists());
}

#[test]
fn test_runs_inside_task_runner() {
    let mut fx = Fixture::new("int id icon 0x7f010001\n");
    fx.library("a", "com.a", "int id icon 0x1\n");

    let logger = CollectingLogger::new();
    let mut runner = TaskRunner::new();
    runner.add_task(MergeSymbolsTask::new(&mut fx.module, BuildSettings::default(), &logger));
    let records = runner.run(BuildType::Release).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "SymbolProcessor");
    assert_eq!(records[0].state, TaskState::Completed);
    drop(runner);
    assert!(fx.generated("com.a").exists());
}

#[test]
fn test_output_is_deterministic() {
    let mut fx = Fixture::new("int id b 0x7f010002\nint id a 0x7f010001\nint string s 0x7f020001\n");
    fx.library("z", "com.z", "int string s 0x1\nint id b 0x2\nint id a 0x1\n");
    fx.merge();
    let first = fx.read_generated("com.z");

    fs::remove_dir_all(fx.root.join("build/gen")).unwrap();
    fs::remove_dir_all(fx.root.join("build/intermediate")).unwrap();
    fx.module = AndroidModule::with_settings("com.app", fx.root.join("build"), &BuildSettings::default())
        .with_libraries([fx.root.join("libs/z")]);
    fx.merge();

    assert_eq!(fx.read_generated("com.z"), first);
    assert!(Path::new(&fx.generated("com.z")).exists());
}

#[test]
fn test_removal_survives_missing_full_table() {
    let mut fx = Fixture::new("int id one 0x7f010001\nint id two 0x7f010002\n");
    fx.library("first", "com.shared", "int id one 0x1\n");
    let second = fx.library("second", "com.shared", "int id two 0x2\n");
    fx.merge();

    // the library goes away in a run that cannot regenerate anything
    fs::remove_file(second.join("R.txt")).unwrap();
    let full = fx.root.join("build/bin/res/R.txt");
    let full_symbols = fs::read_to_string(&full).unwrap();
    fs::remove_file(&full).unwrap();
    let report = fx.merge();
    assert!(report.written.is_empty());
    assert!(report.fresh.is_empty());

    fx.set_full_symbols(&full_symbols);
    let report = fx.merge();

    assert_eq!(report.written, vec!["com.shared".to_string()]);
    let source = fx.read_generated("com.shared");
    assert!(source.contains("one=0x7f010001;"));
    assert!(!source.contains("two="));
}

#[test]
fn test_unreadable_manifest_keeps_fresh_output() {
    let mut fx = Fixture::new("int id icon 0x7f010001\nint id logo 0x7f010002\n");
    let a = fx.library("a", "com.a", "int id icon 0x1\n");
    fx.merge();
    let before = fx.read_generated("com.a");

    fs::write(a.join("AndroidManifest.xml"), "<manifest").unwrap();
    let report = fx.merge();

    assert_eq!(report.excluded, vec![a.clone()]);
    assert!(report.deleted.is_empty());
    assert_eq!(fx.read_generated("com.a"), before);

    // once its symbols change as well, the library counts as removed
    fs::write(a.join("R.txt"), "int id icon 0x1\nint id logo 0x2\n").unwrap();
    let report = fx.merge();

    assert_eq!(report.deleted, vec![fx.generated("com.a")]);
    assert!(!fx.generated("com.a").exists());
}

#[test]
fn test_library_with_unreadable_manifest_rejoins_its_package() {
    let mut fx = Fixture::new("int id one 0x7f010001\nint id two 0x7f010002\nint id three 0x7f010003\n");
    fx.library("first", "com.shared", "int id one 0x1\n");
    let second = fx.library("second", "com.shared", "int id two 0x2\n");
    fx.merge();

    let manifest = second.join("AndroidManifest.xml");
    let declared = fs::read_to_string(&manifest).unwrap();
    fs::write(&manifest, "<manifest").unwrap();
    fx.write_library("first", "com.shared", "int id one 0x1\nint id three 0x3\n");
    let report = fx.merge();

    assert_eq!(report.written, vec!["com.shared".to_string()]);
    assert!(!fx.read_generated("com.shared").contains("two="));

    fs::write(&manifest, declared).unwrap();
    let report = fx.merge();

    assert_eq!(report.written, vec!["com.shared".to_string()]);
    assert_eq!(field_lines(&fx.read_generated("com.shared")).len(), 3);
}
