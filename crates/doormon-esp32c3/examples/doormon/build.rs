fn main() {
    // The device configuration is read at compile time.
    println!("cargo:rerun-if-changed=cfg.toml");

    if !std::path::Path::new("cfg.toml").exists() {
        println!("cargo:warning=`cfg.toml` not found, copy `cfg.toml.example` and fill it in");
    }
}
