fn main() {
    // ESP-IDF link args are only needed (and embuild only present) when
    // building the firmware image.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
