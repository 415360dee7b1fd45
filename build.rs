#[cfg(target_os = "windows")]
fn main() {
    use winresource::WindowsResource;

    let mut res = WindowsResource::new();
    // icona opzionale: senza file si incorporano solo i metadati
    if std::path::Path::new("res/rtimesync.ico").exists() {
        res.set_icon("res/rtimesync.ico");
    }
    res.set("FileDescription", "rTimesync CLI")
        .set("ProductName", "rTimesync")
        .set("OriginalFilename", "rtimesync.exe")
        .set("FileVersion", env!("CARGO_PKG_VERSION"))
        .set("ProductVersion", env!("CARGO_PKG_VERSION"));

    if let Err(e) = res.compile() {
        println!("cargo:warning=Windows resources not embedded: {e}");
    }
}

#[cfg(not(target_os = "windows"))]
fn main() {}
