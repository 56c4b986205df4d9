fn main() {
    if let Err(e) = msfs_thumbs_lib::run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
