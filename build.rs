// Embed git hash for --version. Optional; no git = no hash.
fn main() {
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let mut long_version = version.clone();
    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            if let Ok(s) = String::from_utf8(output.stdout) {
                let hash = s.trim();
                if !hash.is_empty() {
                    long_version = format!("{version} ({hash})");
                }
            }
        }
    }
    println!("cargo:rustc-env=RIVE_GALLERY_VERSION={long_version}");
}
