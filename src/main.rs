fn main() {
    if let Err(err) = envsense_lib::run() {
        eprintln!("envsense: {err:#}");
        std::process::exit(1);
    }
}
