//! Build script for the storefront crate.
//!
//! Fingerprints the stylesheet so it can be served with immutable caching.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex characters of the SHA-256 kept in the file name.
const HASH_LEN: usize = 8;

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    fingerprint_css(Path::new(&manifest_dir));
}

/// Copy `static/css/main.css` to `static/css/derived/main.{hash}.css`.
///
/// Sets `CSS_HASH` for `env!("CSS_HASH")`; empty when the stylesheet is
/// missing.
fn fingerprint_css(manifest_dir: &Path) {
    let css_path = manifest_dir.join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let content = match fs::read(&css_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read main.css: {e}");
            println!("cargo:rustc-env=CSS_HASH=");
            return;
        }
    };

    let digest = format!("{:x}", Sha256::digest(&content));
    let hash = &digest[..HASH_LEN];
    println!("cargo:rustc-env=CSS_HASH={hash}");

    let derived_dir = manifest_dir.join("static/css/derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived CSS directory");
    fs::copy(&css_path, derived_dir.join(format!("main.{hash}.css")))
        .expect("Failed to copy CSS to derived directory");
}
