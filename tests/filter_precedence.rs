// tests/filter_precedence.rs

use std::path::{Path, PathBuf};

use proptest::prelude::*;

use conductor::fs::mock::MockFileSystem;
use conductor::linker::WatchFilter;
use conductor::process::FsTrigger;

const ROOT: &str = "/work";

fn compile(watch: &[&str], ignore: &[&str], contain: &[&str]) -> WatchFilter {
    let fs = MockFileSystem::new();
    for w in watch {
        fs.add_dir(w);
    }
    let trigger = FsTrigger {
        watch: watch.iter().map(PathBuf::from).collect(),
        ignore: ignore.iter().map(PathBuf::from).collect(),
        contain_filters: contain.iter().map(|s| s.to_string()).collect(),
    };
    WatchFilter::compile("p", &trigger, &fs).expect("filter should compile")
}

#[test]
fn each_rule_in_order() {
    let filter = compile(
        &[ROOT, "/work/keep.log"],
        &["/work/secret.rs", "*.log", "tmp_*"],
        &["*.rs", "*.log", "tmp_*"],
    );

    // 1. exact watch path wins over every ignore rule.
    assert!(filter.includes(Path::new("/work/keep.log")));
    // 2. exact ignore path.
    assert!(!filter.includes(Path::new("/work/secret.rs")));
    // 3. ignore glob beats contain glob.
    assert!(!filter.includes(Path::new("/work/debug.log")));
    assert!(!filter.includes(Path::new("/work/sub/tmp_main.rs")));
    // 4. contain glob.
    assert!(filter.includes(Path::new("/work/main.rs")));
    assert!(filter.includes(Path::new("/work/deep/nested/lib.rs")));
    // 5. default.
    assert!(!filter.includes(Path::new("/work/README.md")));
}

#[test]
fn globs_are_case_sensitive_and_only_star_is_special() {
    let filter = compile(&[ROOT], &[], &["*.RS", "v[1].txt", "a?c"]);

    assert!(filter.includes(Path::new("/work/main.RS")));
    assert!(!filter.includes(Path::new("/work/main.rs")));
    assert!(filter.includes(Path::new("/work/v[1].txt")));
    assert!(!filter.includes(Path::new("/work/v1.txt")));
    assert!(filter.includes(Path::new("/work/a?c")));
    assert!(!filter.includes(Path::new("/work/abc")));
}

#[test]
fn no_contain_filters_means_only_watch_paths_trigger() {
    let filter = compile(&[ROOT], &[], &[]);
    assert!(filter.includes(Path::new(ROOT)));
    assert!(!filter.includes(Path::new("/work/anything.rs")));
}

fn base_name() -> impl Strategy<Value = String> {
    "[a-z]{1,6}\\.(rs|log|txt|md)"
}

proptest! {
    #[test]
    fn exact_watch_path_is_always_included(name in base_name()) {
        let watched = format!("{ROOT}/{name}");
        let filter = compile(&[ROOT, watched.as_str()], &[watched.as_str(), "*"], &[]);
        prop_assert!(filter.includes(Path::new(&watched)));
    }

    #[test]
    fn ignore_glob_beats_contain_glob(name in base_name(), dir in "[a-z]{1,4}") {
        let ext = name.rsplit('.').next().unwrap().to_string();
        let pattern = format!("*.{ext}");
        let filter = compile(&[ROOT], &[pattern.as_str()], &[pattern.as_str()]);
        let path = format!("{ROOT}/{dir}/{name}");
        prop_assert!(!filter.includes(Path::new(&path)));
    }

    #[test]
    fn contain_glob_matches_by_extension(name in base_name()) {
        let filter = compile(&[ROOT], &[], &["*.rs"]);
        let path = format!("{ROOT}/src/{name}");
        prop_assert_eq!(filter.includes(Path::new(&path)), name.ends_with(".rs"));
    }
}
