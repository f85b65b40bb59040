fn main() -> anyhow::Result<()> {
    env_logger::init();
    ofono_cli::run()
}
