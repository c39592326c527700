// build.rs
//
// Stamps the binary with its build time; main.rs pulls BUILD_DATE in via include!.

use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR");
    let dest = Path::new(&out_dir).join("build_info.rs");

    let stamp = Utc::now().format("%Y-%m-%d %H:%M UTC");
    fs::write(&dest, format!("pub const BUILD_DATE: &str = \"{stamp}\";\n"))
        .expect("write build_info.rs");

    println!("cargo:rerun-if-changed=build.rs");
}
