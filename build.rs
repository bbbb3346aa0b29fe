use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=MD_WIDE_MIX");
    println!("cargo:rustc-check-cfg=cfg(md_wide_mix)");

    // 1. An explicit request wins (e.g. MD_WIDE_MIX=0 to force the scalar mixer)
    if let Some(forced) = env::var_os("MD_WIDE_MIX") {
        if forced != "0" {
            println!("cargo:rustc-cfg=md_wide_mix");
        }
        return;
    }

    // 2. Otherwise look at the *target* features (not the host's) for 128-bit SIMD.
    let features = env::var("CARGO_CFG_TARGET_FEATURE").unwrap_or_default();
    let has_wide = features
        .split(',')
        .any(|f| matches!(f, "sse2" | "neon" | "simd128"));

    if has_wide {
        println!("cargo:rustc-cfg=md_wide_mix");
    }
}
