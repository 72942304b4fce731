fn main() -> anyhow::Result<()> {
    subtrack_lib::run()
}
