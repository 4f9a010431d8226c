fn main() {
    if let Err(err) = kaggleease::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
