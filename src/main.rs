fn main() -> Result<(), Box<dyn std::error::Error>> {
    color_compass::cli::main()
}
