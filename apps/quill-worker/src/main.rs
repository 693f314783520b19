use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = quill_worker::Args::parse();

	quill_worker::run(args).await
}
