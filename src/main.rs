#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

// When compiling natively:
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let image = std::env::args_os().nth(1).map(std::path::PathBuf::from);
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_min_inner_size([320.0, 240.0]),
        ..Default::default()
    };
    yuma_image_plugin::DemoApp::run(native_options, image)
}

// The browser build is driven by the JavaScript annotator through the library.
#[cfg(target_arch = "wasm32")]
fn main() {}
