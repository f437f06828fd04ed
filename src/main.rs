fn main() {
    std::process::exit(directit::run());
}
