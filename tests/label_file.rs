use std::fs;

use ferrite_engine::labels::{write_label_file, LabelScheme};
use ferrite_engine::LabelError;

#[test]
fn every_image_gets_one_line() {
    let root = tempfile::tempdir().unwrap();
    for name in ["dog.2.jpg", "cat.1.jpg", "dog.1.jpg"] {
        fs::write(root.path().join(name), b"").unwrap();
    }
    let out = tempfile::tempdir().unwrap();
    let out = out.path().join("path_label.txt");

    let n = write_label_file(root.path(), &out, &LabelScheme::default()).unwrap();
    assert_eq!(n, 3);
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text, "cat.1.jpg,0\ndog.1.jpg,1\ndog.2.jpg,1\n");
}

#[test]
fn unrecognised_name_leaves_no_file() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("dog.jpg"), b"").unwrap();
    fs::write(root.path().join("horse.jpg"), b"").unwrap();
    let out = tempfile::tempdir().unwrap();
    let out = out.path().join("path_label.txt");

    let err = write_label_file(root.path(), &out, &LabelScheme::default()).unwrap_err();
    assert!(matches!(err, LabelError::Unrecognized(ref name) if name == "horse.jpg"));
    assert_eq!(err.to_string(), "The image(horse.jpg) couldn't be recognized");
    assert!(!out.exists());
}

#[test]
fn custom_scheme_is_honoured() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("bird_01.png"), b"").unwrap();
    let out = tempfile::tempdir().unwrap();
    let out = out.path().join("labels.txt");

    let scheme = LabelScheme { rules: vec![("bird".to_string(), 7)] };
    write_label_file(root.path(), &out, &scheme).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "bird_01.png,7\n");
}
