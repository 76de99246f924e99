use std::env;
use std::fs;
use std::path::PathBuf;

// Stamps the workspace `VERSION` into `INDASSIST_VERSION` for the footer.
fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let version_path = manifest_dir
        .ancestors()
        .nth(2)
        .expect("crate lives two levels below the workspace root")
        .join("VERSION");
    println!("cargo:rerun-if-changed={}", version_path.display());

    let version = fs::read_to_string(&version_path)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_path.display()))
        .trim()
        .to_string();
    assert!(
        version.split('.').count() == 3 && !version.is_empty(),
        "VERSION must hold a MAJOR.MINOR.PATCH version, found {version:?}"
    );

    println!("cargo:rustc-env=INDASSIST_VERSION={version}");
}
