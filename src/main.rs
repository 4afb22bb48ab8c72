fn main() -> anyhow::Result<()> {
    transpop::run()?;
    Ok(())
}
