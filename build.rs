fn main() {
    // ESP-IDF link arguments are only needed for flash builds; host test
    // builds run without the `espidf` feature.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();

    println!("cargo:rerun-if-env-changed=RELAYGATE_SECRET");
    println!("cargo:rerun-if-env-changed=RELAYGATE_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=RELAYGATE_WIFI_PASS");
}
