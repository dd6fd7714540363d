//! Integration tests for uploaded files on a real filesystem

use httpmessage::environment::Environment;
use httpmessage::factory;
use httpmessage::http::{Error, FsMover, UploadedFile, UPLOAD_ERR_OK};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn stored_upload(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_upload_from_environment_moved_once() {
    let tmp = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let tmp_name = stored_upload(&tmp, "php1", "report body");

    let env = Environment::builder()
        .server([("REQUEST_METHOD", "POST"), ("REQUEST_URI", "/upload")])
        .files(json!({
            "report": {
                "name": "report.txt",
                "type": "text/plain",
                "tmp_name": tmp_name,
                "size": 11,
                "error": 0
            }
        }))
        .build();

    let request = factory::create(&env).unwrap();
    let files = request.uploaded_files()["report"].files();
    let file = files[0];

    assert_eq!(file.get_stream().unwrap().to_string_lossy(), "report body");

    let target = dest.path().join("report.txt");
    file.move_to(&target).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), "report body");

    assert!(matches!(
        file.move_to(dest.path().join("again.txt")),
        Err(Error::AlreadyMoved(_))
    ));
    assert!(matches!(file.get_stream(), Err(Error::AlreadyMoved(_))));

    // The request copy still points at the same upload
    let copy = request.with_attribute("seen", true);
    assert!(copy.uploaded_files()["report"].files()[0].is_moved());
}

#[test]
fn test_concurrent_moves_succeed_once() {
    let tmp = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let path = stored_upload(&tmp, "php2", "payload");
    let file = UploadedFile::new(path, Some("p.bin".into()), None, Some(7), UPLOAD_ERR_OK);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let file = file.clone();
            let target = dest.path().join(format!("p{}.bin", i));
            thread::spawn(move || file.move_to(target).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
    assert!(file.is_moved());
}

#[test]
fn test_restricted_mover() {
    let uploads = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let outside = stored_upload(&elsewhere, "secret", "do not move");

    let file = UploadedFile::new(outside.clone(), None, None, None, UPLOAD_ERR_OK)
        .with_mover(Arc::new(FsMover::within(uploads.path())));

    assert!(matches!(
        file.move_to(dest.path().join("stolen")),
        Err(Error::NotUploaded(_))
    ));
    assert!(fs::metadata(&outside).is_ok());
}

#[test]
fn test_unwritable_target() {
    let tmp = TempDir::new().unwrap();
    let path = stored_upload(&tmp, "php3", "x");
    let file = UploadedFile::new(path, None, None, None, UPLOAD_ERR_OK);

    let err = file
        .move_to(tmp.path().join("no").join("such").join("dir.txt"))
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(!file.is_moved());
}
