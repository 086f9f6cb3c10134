fn main() {
    lumen_lib::run()
}
