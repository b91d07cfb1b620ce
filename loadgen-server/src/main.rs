use anyhow::Result;

fn main() -> Result<()> {
    loadgen_server::cli::execute()
}
