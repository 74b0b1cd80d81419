use ipdb_util::fs::{ensure_dir, read_optional, write_with_parents};
use tempfile::TempDir;

#[test]
fn test_read_optional_missing_file() {
    let tmp = TempDir::new().unwrap();
    let result = read_optional(&tmp.path().join("ips_list.toml")).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_read_optional_existing_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ips_list.toml");
    std::fs::write(&path, "[[ip]]\nname = \"a\"\n").unwrap();
    let result = read_optional(&path).unwrap();
    assert_eq!(result.as_deref(), Some("[[ip]]\nname = \"a\"\n"));
}

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("fe").join("ips");
    ensure_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_write_with_parents_creates_directory() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("out").join("resolved.toml");
    write_with_parents(&path, "content").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
}
