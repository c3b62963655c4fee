use switchblade_server::SwitchbladeServer;

#[derive(clap::Parser)]
#[command(name = "switchblade-server", version, about = "Serve the Switchblade query API")]
struct Args {
    #[arg(long, default_value = "config/switchblade.yaml")]
    config: String,

    /// Directory for errors.jsonl
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    SwitchbladeServer::new()
        .with_app_config(&args.config)
        .with_log_dir(&args.log_dir)
        .run()
        .await
}
