fn main() {
    println!("cargo:rerun-if-changed=components/ei_classifier");

    // ESP-IDF sysenv is only meaningful for device builds; host builds
    // (tests, fuzzing) compile without the toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
