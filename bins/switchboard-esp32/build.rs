//! Build script for the ESP32 firmware.

fn main() {
    // Lets esp-idf-sys find the IDF toolchain
    embuild::espidf::sysenv::output();
}
