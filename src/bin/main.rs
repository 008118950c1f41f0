use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wa_relay::logging::init("wa_relay");

    let cancel = CancellationToken::new();
    wa_relay::shutdown::listen_for_signals(cancel.clone());

    if let Err(err) = wa_relay::run(cancel).await {
        tracing::error!("fatal: {err:#}");
        return Err(err);
    }
    Ok(())
}
