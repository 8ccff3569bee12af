// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument and format detection tests.

use super::*;

#[test]
fn detects_supported_formats() {
    assert!(matches!(detect_format(Path::new("t.zip")), Ok(Format::Zip)));
    assert!(matches!(detect_format(Path::new("t.yaml")), Ok(Format::Yaml)));
    assert!(matches!(detect_format(Path::new("t.yml")), Ok(Format::Yaml)));
}

#[test]
fn rejects_unknown_formats() {
    for path in ["t.json", "t.tar.gz", "t"] {
        assert!(matches!(
            detect_format(Path::new(path)),
            Err(GraphError::UnsupportedFormat(_))
        ));
    }
}

#[test]
fn packages_flag_is_repeatable() {
    let args = Args::parse_from([
        "lattice",
        "--package",
        "/pkg/a",
        "--package",
        "/pkg/b",
        "--execution-folder",
        "/tmp/x",
        "--run",
    ]);
    assert_eq!(args.package.len(), 2);
    assert!(args.run);
    assert!(args.import_path.is_none());
}

#[test]
fn package_flag_is_required() {
    let result = Args::try_parse_from(["lattice", "--execution-folder", "/tmp/x"]);
    assert!(result.is_err());
}
