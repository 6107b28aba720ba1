use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use memvault::coordinator::{self, LockSettings, Mode};
use memvault::diagnostics;
use memvault::error::{LockError, StoreError};
use memvault::protocol::{CommandStatus, handle_command, parse_command};
use memvault::store::{self, StoreContext};

// Helper to build lock settings with test-friendly budgets
fn test_settings() -> LockSettings {
    LockSettings {
        read_wait: Duration::from_millis(500),
        write_wait: Duration::from_millis(1500),
        stale_after: Duration::from_secs(30),
        retry_delay: Duration::from_millis(10),
    }
}

// Helper to set up a scratch storage root and context
fn setup() -> (TempDir, Arc<StoreContext>) {
    setup_with(test_settings())
}

fn setup_with(settings: LockSettings) -> (TempDir, Arc<StoreContext>) {
    let dir = tempfile::tempdir().unwrap();
    let diagnostics = diagnostics::spawn(dir.path().join("debug.log"));
    let ctx = StoreContext::new(dir.path(), "memories", settings, diagnostics).unwrap();
    (dir, Arc::new(ctx))
}

#[test]
fn test_view_empty_root() {
    let (_dir, ctx) = setup();
    let output = store::view(&ctx, "/memories", None).unwrap();
    assert_eq!(output, "Directory: /memories\n");
}

#[test]
fn test_create_then_view_round_trip() {
    let (_dir, ctx) = setup();
    let message = store::create(&ctx, "/memories/a.txt", "Hello\nWorld").unwrap();
    assert!(message.contains("/memories/a.txt"));

    let output = store::view(&ctx, "/memories/a.txt", None).unwrap();
    assert_eq!(output, "1: Hello\n2: World");
}

#[test]
fn test_create_empty_file() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/empty.txt", "").unwrap();
    let output = store::view(&ctx, "/memories/empty.txt", None).unwrap();
    assert_eq!(output, "1: ");
}

#[test]
fn test_create_makes_parent_directories() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/notes/deep/a.txt", "x").unwrap();
    let output = store::view(&ctx, "/memories/notes/deep/a.txt", None).unwrap();
    assert_eq!(output, "1: x");
}

#[test]
fn test_view_range_slices() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "l1\nl2\nl3\nl4\nl5").unwrap();

    let output = store::view(&ctx, "/memories/a.txt", Some((2, 3))).unwrap();
    assert_eq!(output, "2: l2\n3: l3");

    let output = store::view(&ctx, "/memories/a.txt", Some((4, -1))).unwrap();
    assert_eq!(output, "4: l4\n5: l5");
}

#[test]
fn test_view_range_rejects_out_of_bounds() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "l1\nl2").unwrap();

    assert!(matches!(
        store::view(&ctx, "/memories/a.txt", Some((0, 1))),
        Err(StoreError::InvalidRange(_))
    ));
    assert!(matches!(
        store::view(&ctx, "/memories/a.txt", Some((9, -1))),
        Err(StoreError::InvalidRange(_))
    ));
    assert!(matches!(
        store::view(&ctx, "/memories/a.txt", Some((2, 1))),
        Err(StoreError::InvalidRange(_))
    ));
}

#[test]
fn test_view_directory_listing() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/b.txt", "x").unwrap();
    store::create(&ctx, "/memories/sub/a.txt", "x").unwrap();
    fs::write(ctx.namespace_root().join(".hidden"), "x").unwrap();

    let output = store::view(&ctx, "/memories", None).unwrap();
    assert_eq!(output, "Directory: /memories\nb.txt\nsub/\n");
}

#[test]
fn test_view_missing_path() {
    let (_dir, ctx) = setup();
    let err = store::view(&ctx, "/memories/nope.txt", None).unwrap_err();
    assert!(err.to_string().contains("Path not found"));
}

#[test]
fn test_prefix_impostor_rejected() {
    let (_dir, ctx) = setup();
    let err = store::create(&ctx, "/memories-evil/a.txt", "x").unwrap_err();
    assert!(err.to_string().contains("outside the /memories namespace"));

    let err = store::view(&ctx, "/elsewhere", None).unwrap_err();
    assert!(err.to_string().contains("outside the /memories namespace"));
}

#[test]
fn test_traversal_outside_root_rejected() {
    let (_dir, ctx) = setup();
    let err = store::create(&ctx, "/memories/../escape.txt", "x").unwrap_err();
    assert!(err.to_string().contains("Path traversal attempt"));
}

#[test]
fn test_traversal_within_root_resolves() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a/../b.txt", "inside").unwrap();
    let output = store::view(&ctx, "/memories/b.txt", None).unwrap();
    assert_eq!(output, "1: inside");
}

#[test]
fn test_str_replace_unique_occurrence() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "alpha beta gamma").unwrap();
    store::str_replace(&ctx, "/memories/a.txt", "beta", "delta").unwrap();

    let output = store::view(&ctx, "/memories/a.txt", None).unwrap();
    assert_eq!(output, "1: alpha delta gamma");
}

#[test]
fn test_str_replace_zero_matches() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "alpha").unwrap();
    let err = store::str_replace(&ctx, "/memories/a.txt", "missing", "x").unwrap_err();
    assert!(err.to_string().contains("Text not found"));
}

#[test]
fn test_str_replace_multiple_matches() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "dup and dup").unwrap();
    let err = store::str_replace(&ctx, "/memories/a.txt", "dup", "x").unwrap_err();

    match &err {
        StoreError::NotUnique { count, .. } => assert_eq!(*count, 2),
        other => panic!("expected NotUnique, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("appears 2 times"));
    assert!(message.contains("Must be unique"));
}

#[test]
fn test_str_replace_rejects_directory() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/sub/a.txt", "x").unwrap();
    let err = store::str_replace(&ctx, "/memories/sub", "a", "b").unwrap_err();
    assert!(matches!(err, StoreError::NotAFile(_)));
}

#[test]
fn test_str_replace_missing_file() {
    let (_dir, ctx) = setup();
    let err = store::str_replace(&ctx, "/memories/nope.txt", "a", "b").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_insert_prepends_at_zero() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "one\ntwo").unwrap();
    store::insert(&ctx, "/memories/a.txt", 0, "zero").unwrap();

    let output = store::view(&ctx, "/memories/a.txt", None).unwrap();
    assert_eq!(output, "1: zero\n2: one\n3: two");
}

#[test]
fn test_insert_appends_at_line_count() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "one\ntwo").unwrap();
    store::insert(&ctx, "/memories/a.txt", 2, "three").unwrap();

    let output = store::view(&ctx, "/memories/a.txt", None).unwrap();
    assert_eq!(output, "1: one\n2: two\n3: three");
}

#[test]
fn test_insert_rejects_out_of_range() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "one").unwrap();

    let err = store::insert(&ctx, "/memories/a.txt", -1, "x").unwrap_err();
    assert!(matches!(err, StoreError::InvalidLine { .. }));

    let err = store::insert(&ctx, "/memories/a.txt", 5, "x").unwrap_err();
    assert!(err.to_string().contains("Must be between 0 and 1"));
}

#[test]
fn test_delete_file_and_directory() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "x").unwrap();
    store::create(&ctx, "/memories/sub/nested/b.txt", "x").unwrap();

    let message = store::delete(&ctx, "/memories/a.txt").unwrap();
    assert!(message.contains("File deleted"));

    let message = store::delete(&ctx, "/memories/sub").unwrap();
    assert!(message.contains("Directory deleted"));
    assert!(!ctx.namespace_root().join("sub").exists());
}

#[test]
fn test_delete_missing_path() {
    let (_dir, ctx) = setup();
    let err = store::delete(&ctx, "/memories/nope").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_delete_namespace_root_forbidden() {
    let (_dir, ctx) = setup();

    // Refused even while empty
    let err = store::delete(&ctx, "/memories").unwrap_err();
    assert!(err.to_string().contains("Cannot delete the /memories directory itself"));

    store::create(&ctx, "/memories/a.txt", "x").unwrap();
    let err = store::delete(&ctx, "/memories/").unwrap_err();
    assert!(matches!(err, StoreError::RootDeletionForbidden(_)));
}

#[test]
fn test_rename_moves_content() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "payload").unwrap();

    let message = store::rename(&ctx, "/memories/a.txt", "/memories/moved/b.txt").unwrap();
    assert!(message.contains("/memories/a.txt"));
    assert!(message.contains("/memories/moved/b.txt"));

    assert!(store::view(&ctx, "/memories/a.txt", None).is_err());
    let output = store::view(&ctx, "/memories/moved/b.txt", None).unwrap();
    assert_eq!(output, "1: payload");
}

#[test]
fn test_rename_refuses_existing_destination() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "source").unwrap();
    store::create(&ctx, "/memories/b.txt", "dest").unwrap();

    let err = store::rename(&ctx, "/memories/a.txt", "/memories/b.txt").unwrap_err();
    assert!(matches!(err, StoreError::DestinationExists(_)));

    // Neither file modified
    assert_eq!(store::view(&ctx, "/memories/a.txt", None).unwrap(), "1: source");
    assert_eq!(store::view(&ctx, "/memories/b.txt", None).unwrap(), "1: dest");
}

#[test]
fn test_rename_missing_source() {
    let (_dir, ctx) = setup();
    let err = store::rename(&ctx, "/memories/nope.txt", "/memories/b.txt").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_command_dispatch_round_trip() {
    let (_dir, ctx) = setup();

    let command =
        parse_command(r#"{"command":"create","path":"/memories/a.txt","file_text":"Hello"}"#)
            .unwrap();
    let result = handle_command(&ctx, command);
    assert_eq!(result.status, CommandStatus::Success);
    assert!(result.message.contains("/memories/a.txt"));

    let command = parse_command(r#"{"command":"view","path":"/memories/a.txt"}"#).unwrap();
    let result = handle_command(&ctx, command);
    assert_eq!(result.message, "1: Hello");

    let command = parse_command(r#"{"command":"delete","path":"/memories"}"#).unwrap();
    let result = handle_command(&ctx, command);
    match result.status {
        CommandStatus::Failure(message) => {
            assert!(message.contains("Cannot delete the /memories directory itself"))
        }
        CommandStatus::Success => panic!("root deletion must fail"),
    }
}

#[test]
fn test_read_waits_for_writer_and_sees_result() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/t.txt", "initial").unwrap();

    let settings = test_settings();
    let target = ctx.namespace_root().join("t.txt");
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let writer = thread::spawn({
        let target = target.clone();
        move || {
            coordinator::with_coordination(
                &settings,
                &target,
                "/memories/t.txt",
                Mode::Write,
                || -> Result<(), StoreError> {
                    locked_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(300));
                    fs::write(&target, "from-writer")?;
                    Ok(())
                },
            )
            .unwrap();
        }
    });

    // Once the writer holds the lock, the read must not return until the
    // writer releases, and it observes the writer's result.
    locked_rx.recv().unwrap();
    let output = store::view(&ctx, "/memories/t.txt", None).unwrap();
    assert_eq!(output, "1: from-writer");

    writer.join().unwrap();
}

#[test]
fn test_concurrent_write_detects_conflict() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/t.txt", "initial").unwrap();

    let settings = test_settings();
    let target = ctx.namespace_root().join("t.txt");
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let writer = thread::spawn({
        let target = target.clone();
        move || {
            coordinator::with_coordination(
                &settings,
                &target,
                "/memories/t.txt",
                Mode::Write,
                || -> Result<(), StoreError> {
                    locked_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(300));
                    fs::write(&target, "changed by writer")?;
                    Ok(())
                },
            )
            .unwrap();
        }
    });

    // Our snapshot is taken while the writer holds the lock but before it
    // writes; by the time we acquire, the timestamp has moved.
    locked_rx.recv().unwrap();
    let err = store::str_replace(&ctx, "/memories/t.txt", "initial", "x").unwrap_err();
    assert!(err.to_string().contains("has been modified by another process"));
    assert!(err.to_string().contains("retry"));

    writer.join().unwrap();

    // The writer's content survived; ours never landed
    let output = store::view(&ctx, "/memories/t.txt", None).unwrap();
    assert_eq!(output, "1: changed by writer");
}

#[test]
fn test_lock_wait_times_out() {
    let (_dir, ctx) = setup_with(LockSettings {
        read_wait: Duration::from_millis(150),
        write_wait: Duration::from_millis(150),
        stale_after: Duration::from_secs(30),
        retry_delay: Duration::from_millis(10),
    });
    store::create(&ctx, "/memories/t.txt", "x").unwrap();

    let target = ctx.namespace_root().join("t.txt");
    let _held = coordinator::acquire(
        &target,
        Duration::from_millis(100),
        Duration::from_secs(30),
        Duration::from_millis(10),
    )
    .unwrap();

    let err = store::view(&ctx, "/memories/t.txt", None).unwrap_err();
    match err {
        StoreError::Lock(LockError::Timeout { .. }) => {}
        other => panic!("expected lock timeout, got {:?}", other),
    }
    assert!(err.to_string().contains("Timed out waiting for lock"));
}

#[test]
fn test_stale_lock_is_reclaimed_by_operation() {
    let (_dir, ctx) = setup_with(LockSettings {
        read_wait: Duration::from_millis(500),
        write_wait: Duration::from_millis(500),
        stale_after: Duration::from_millis(50),
        retry_delay: Duration::from_millis(10),
    });
    store::create(&ctx, "/memories/t.txt", "x").unwrap();

    // A crashed holder left its marker behind
    let target = ctx.namespace_root().join("t.txt");
    fs::write(coordinator::marker_path(&target), "99999\n").unwrap();
    thread::sleep(Duration::from_millis(80));

    let output = store::view(&ctx, "/memories/t.txt", None).unwrap();
    assert_eq!(output, "1: x");
}

#[test]
fn test_operations_on_disjoint_targets_interleave() {
    let (_dir, ctx) = setup();
    store::create(&ctx, "/memories/a.txt", "a").unwrap();
    store::create(&ctx, "/memories/b.txt", "b").unwrap();

    let settings = test_settings();
    let target_a = ctx.namespace_root().join("a.txt");
    let (locked_tx, locked_rx) = std::sync::mpsc::channel();
    let holder = thread::spawn({
        move || {
            coordinator::with_coordination(
                &settings,
                &target_a,
                "/memories/a.txt",
                Mode::Write,
                || -> Result<(), StoreError> {
                    locked_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(300));
                    Ok(())
                },
            )
            .unwrap();
        }
    });

    // b.txt is not blocked by the lock on a.txt
    locked_rx.recv().unwrap();
    let started = std::time::Instant::now();
    let output = store::view(&ctx, "/memories/b.txt", None).unwrap();
    assert_eq!(output, "1: b");
    assert!(started.elapsed() < Duration::from_millis(200));

    holder.join().unwrap();
}
