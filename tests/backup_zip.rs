#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("hoteld-backup-src");
    let workspace2 = temp_dir("hoteld-backup-dst");
    let out_dir = temp_dir("hoteld-backup-out");

    let db_src = workspace.join("hotel.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.hotelbackup.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 2);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains(&export.db_sha256));
    archive
        .by_name("db/hotel.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);

    let restored = std::fs::read(workspace2.join("hotel.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn foreign_archives_are_refused() {
    let out_dir = temp_dir("hoteld-backup-foreign");
    let workspace = temp_dir("hoteld-backup-foreign-dst");

    // A zip without our manifest must not overwrite anything.
    let bundle_path = out_dir.join("other.zip");
    {
        let f = File::create(&bundle_path).expect("create zip");
        let mut zip = zip::ZipWriter::new(f);
        zip.start_file("readme.txt", zip::write::FileOptions::default())
            .expect("start entry");
        std::io::Write::write_all(&mut zip, b"not a workspace bundle").expect("write entry");
        zip.finish().expect("finish zip");
    }

    let result = backup::import_workspace_bundle(&bundle_path, &workspace);
    assert!(result.is_err());
    assert!(!workspace.join("hotel.sqlite3").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
