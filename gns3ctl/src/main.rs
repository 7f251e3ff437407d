
use clap::Parser;
use log::trace;

use gns3ctl::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::init();

	trace!("parsing args");
	let args = Args::parse();

	args.handle().await
}
