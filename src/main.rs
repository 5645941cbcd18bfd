fn main() -> anyhow::Result<()> {
    fastway_lib::run()
}
