mod common;

use std::time::Duration;

use archive_vfs::vfs::{MODE_DIR_BIT, MODE_LNK_BIT};
use archive_vfs::{ErrorKind, FileKind, Vfs};
use common::eager;

#[tokio::test]
async fn read_dir_blocks_until_sealed_then_yields_children() {
    let vfs = Vfs::new();
    vfs.create_dir("a", 0o755, 0, None).await.unwrap();
    vfs.create_file("a/b/c", 0, eager(b"x"), Some(1), 0o644, 0, None, None).await.unwrap();

    let mut dir = vfs.open("a/b").await.unwrap();
    let still_blocked = tokio::time::timeout(Duration::from_millis(50), dir.read_dir(0)).await;
    assert!(still_blocked.is_err(), "read_dir(<=0) must block while the directory is unsealed");

    vfs.seal_children("a/b").await.unwrap();
    let batch = dir.read_dir(0).await.unwrap();
    assert_eq!(batch.entries.len(), 1);
    assert_eq!(batch.entries[0], ("c".to_string(), FileKind::File));
    assert!(!batch.eof);
}

#[tokio::test]
async fn read_dir_with_positive_count_reports_eof_on_sealed_directory() {
    let vfs = Vfs::new();
    vfs.create_dir("d", 0o755, 0, None).await.unwrap();
    vfs.create_file("d/one", 0, eager(b"1"), Some(1), 0o644, 0, None, None).await.unwrap();
    vfs.seal_children("d").await.unwrap();

    let mut dir = vfs.open("d").await.unwrap();
    let batch = dir.read_dir(10).await.unwrap();
    assert_eq!(batch.entries.len(), 1);
    assert!(batch.eof);
}

#[tokio::test]
async fn root_mode_blocks_until_explicitly_declared() {
    let vfs = Vfs::new();
    let still_blocked = tokio::time::timeout(Duration::from_millis(50), vfs.stat(".")).await;
    assert!(still_blocked.is_err());

    vfs.create_dir(".", 0o755, 1234, None).await.unwrap();
    let st = vfs.stat(".").await.unwrap();
    assert_eq!(st.kind, FileKind::Dir);
    assert_ne!(st.mode & MODE_DIR_BIT, 0);
    assert_eq!(st.mtime, 1234);
}

#[tokio::test]
async fn duplicate_create_dir_fails_exist_implicit_upgrades_silently() {
    let vfs = Vfs::new();
    vfs.create_dir("implicit/explicit", 0o755, 0, None).await.unwrap();
    vfs.create_dir("implicit", 0o755, 0, None).await.unwrap();

    assert_eq!(vfs.create_dir("implicit/explicit", 0o755, 0, None).await.unwrap_err().kind, ErrorKind::Exist);
    assert_eq!(vfs.create_dir("implicit", 0o755, 0, None).await.unwrap_err().kind, ErrorKind::Exist);

    vfs.create_dir(".", 0o755, 0, None).await.unwrap();
    assert_eq!(vfs.create_dir(".", 0o755, 0, None).await.unwrap_err().kind, ErrorKind::Exist);
}

#[tokio::test]
async fn symlink_cycle_fails_not_exist_but_readlink_still_works() {
    let vfs = Vfs::new();
    vfs.create_symlink("a", "b", 0o777, 0).await.unwrap();
    vfs.create_symlink("b", "a", 0o777, 0).await.unwrap();
    vfs.seal_all();

    let err = vfs.open("a").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotExist);

    assert_eq!(vfs.readlink("a").await.unwrap(), "b");
}

#[tokio::test]
async fn symlink_to_file_stat_follows_lstat_does_not() {
    let vfs = Vfs::new();
    vfs.create_symlink("s", "d/f", 0o777, 0).await.unwrap();
    vfs.create_dir("d", 0o755, 0, None).await.unwrap();
    vfs.create_file("d/f", 0, eager(b"hi"), Some(2), 0o644, 0, None, None).await.unwrap();
    vfs.seal_all();

    let st = vfs.stat("s").await.unwrap();
    assert_eq!(st.kind, FileKind::File);
    assert_eq!(st.mode & MODE_LNK_BIT, 0);

    let lst = vfs.lstat("s").await.unwrap();
    assert_eq!(lst.kind, FileKind::Symlink);
    assert_ne!(lst.mode & MODE_LNK_BIT, 0);
}

#[tokio::test]
async fn set_size_fixes_unknown_size_exactly_once() {
    let vfs = Vfs::new();
    vfs.create_file("f", 0, eager(b"0123456789"), None, 0o644, 0, None, None).await.unwrap();
    vfs.set_size("f", 10).await.unwrap();
    assert_eq!(vfs.set_size("f", 10).await.unwrap_err().kind, ErrorKind::Invalid);

    let st = vfs.stat("f").await.unwrap();
    assert_eq!(st.size, Some(10));
}

#[tokio::test]
async fn errors_report_the_public_operation_that_actually_failed() {
    let vfs = Vfs::new();
    vfs.seal_all();

    assert_eq!(vfs.stat("missing").await.unwrap_err().operation, "stat");
    assert_eq!(vfs.lstat("missing").await.unwrap_err().operation, "lstat");
    assert_eq!(vfs.readlink("missing").await.unwrap_err().operation, "readlink");
    assert_eq!(vfs.open("missing").await.unwrap_err().operation, "open");
}

#[tokio::test]
async fn ancestor_creation_failure_reports_the_entry_points_own_operation() {
    let vfs = Vfs::new();
    // "a" is a plain file, not a directory, so using it as an ancestor for "a/b" must fail
    // while creating "a" itself, not while descending via some unrelated `create_dir` path.
    vfs.create_file("a", 0, eager(b"x"), Some(1), 0o644, 0, None, None).await.unwrap();

    let file_err = vfs.create_file("a/b", 0, eager(b"y"), Some(1), 0o644, 0, None, None).await.unwrap_err();
    assert_eq!(file_err.operation, "create_file");
    assert_eq!(file_err.kind, ErrorKind::Exist);

    let link_err = vfs.create_symlink("a/c", "target", 0o777, 0).await.unwrap_err();
    assert_eq!(link_err.operation, "create_symlink");
    assert_eq!(link_err.kind, ErrorKind::Exist);
}

#[tokio::test]
async fn walk_visits_parents_before_children_in_creation_order() {
    let vfs = Vfs::new();
    vfs.create_dir("a", 0o755, 0, None).await.unwrap();
    vfs.create_file("a/one", 0, eager(b"1"), Some(1), 0o644, 0, None, None).await.unwrap();
    vfs.create_dir("a/sub", 0o755, 0, None).await.unwrap();
    vfs.create_file("a/sub/two", 0, eager(b"2"), Some(1), 0o644, 0, None, None).await.unwrap();
    vfs.seal_all();

    let mut walk = vfs.walk(false);
    let mut seen = Vec::new();
    while let Some((path, kind)) = walk.next().await.unwrap() {
        seen.push((path, kind));
    }

    let pos = |p: &str| seen.iter().position(|(path, _)| path == p).unwrap();
    assert!(pos("a") < pos("a/sub"));
    assert!(pos("a/sub") < pos("a/sub/two"));
    assert!(pos("a") < pos("a/one"));
}
