fn main() -> anyhow::Result<()> {
    let child = std::thread::Builder::new()
        .stack_size(1024 * 1024 * 512)
        .spawn(kiln_cli::internal_main)?;
    child
        .join()
        .map_err(|_| anyhow::anyhow!("Conversion thread panicked"))?
}
