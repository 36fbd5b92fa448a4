use std::fs;
use std::path::Path;
use std::sync::Barrier;
use std::thread;

use archiver_engine::{ensure_dir, ensure_output_dir, AtomicFileWriter, PersistError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn output_root_is_created_with_parents_and_left_clean() {
    let root = TempDir::new().unwrap();
    let tool_dir = root.path().join("archive").join("learncpp");

    ensure_output_dir(&tool_dir).unwrap();

    assert!(tool_dir.is_dir());
    assert!(file_names(&tool_dir).is_empty(), "probe file must not linger");
}

#[test]
fn output_root_occupied_by_a_file_is_rejected() {
    let root = TempDir::new().unwrap();
    let blocker = root.path().join("learncpp");
    fs::write(&blocker, "not a directory").unwrap();

    let err = ensure_output_dir(&blocker).unwrap_err();
    assert!(matches!(err, PersistError::OutputDir { ref path, .. } if path == &blocker));
}

#[test]
fn chapter_dir_can_be_ensured_twice() {
    let root = TempDir::new().unwrap();
    let chapter = root.path().join("markdown").join("001-Intro");
    for _ in 0..2 {
        ensure_dir(&chapter).unwrap();
    }
    assert!(chapter.is_dir());
}

#[test]
fn concurrent_tasks_share_one_chapter_dir() {
    let root = TempDir::new().unwrap();
    let chapter = root.path().join("pdf").join("007-Scope").join("nested");
    let start = Barrier::new(8);

    thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    start.wait();
                    ensure_dir(&chapter)
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
    });

    assert!(chapter.is_dir());
    assert_eq!(file_names(&root.path().join("pdf")), vec!["007-Scope"]);
}

#[test]
fn rewrite_replaces_content_in_place() {
    let root = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(root.path().join("html").join("001-Intro"));

    let raw = writer.write("001-001-introduction.html", "<html>raw</html>").unwrap();
    let clean = writer.write("001-001-introduction.html", "<html>clean</html>").unwrap();

    assert_eq!(raw, clean);
    assert_eq!(fs::read_to_string(&clean).unwrap(), "<html>clean</html>");
    assert_eq!(file_names(writer.dir()), vec!["001-001-introduction.html"]);
}

#[test]
fn failed_write_leaves_no_target() {
    let root = TempDir::new().unwrap();
    let occupied = root.path().join("001-Intro");
    fs::write(&occupied, "file where a directory should be").unwrap();

    let writer = AtomicFileWriter::new(occupied);
    assert!(writer.write("001-001-introduction.md", "# Intro").is_err());
    assert_eq!(file_names(root.path()), vec!["001-Intro"]);
}

#[test]
fn unpersisted_temp_file_is_cleaned_up() {
    let root = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(root.path().to_path_buf());

    let pending = writer.temp_file(".pdf").unwrap();
    assert_eq!(file_names(root.path()).len(), 1);
    drop(pending);
    assert!(file_names(root.path()).is_empty());
}

#[test]
fn removing_is_idempotent() {
    let root = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(root.path().to_path_buf());

    writer.write("raw.html", "x").unwrap();
    writer.remove("raw.html").unwrap();
    writer.remove("raw.html").unwrap();
    assert!(file_names(root.path()).is_empty());
}
