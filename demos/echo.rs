use promise_ipc::{
    // ---
    create_memory_transport_with_hub,
    Args,
    MemoryHub,
    ObjectRef,
    PromiseIpc,
    PromiseIpcBuilder,
    Result,
    RpcError,
    Thrown,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    text: String,
    shouted: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    env_logger::init();

    let hub = MemoryHub::new();
    let main_side = PromiseIpc::new(create_memory_transport_with_hub("main", hub.clone()).await?);
    let renderer = PromiseIpcBuilder::new(create_memory_transport_with_hub("renderer", hub).await?)
        .max_timeout_ms(2000)
        .build();

    main_side
        .on("echo", |args: Args| async move { Ok::<_, Thrown>(args.into_vec()) })
        .await?;

    main_side
        .on("greet", |args: Args| async move {
            let name: String = args.parse(0)?;
            let shout: bool = args.parse(1).unwrap_or(false);
            let text = format!("hello, {name}");
            Ok::<_, Thrown>(Greeting {
                text: if shout { text.to_uppercase() } else { text },
                shouted: shout,
            })
        })
        .await?;

    main_side
        .on_sync("fail", |_args: Args| {
            let err = ObjectRef::named_error("QuotaError", "too many requests");
            err.set("retryAfterMs", json!(500));
            Err::<(), _>(Thrown::from(err))
        })
        .await?;

    let echoed = renderer.send("echo", vec![json!("a"), json!(1)]).await?;
    println!("echo -> {echoed}");

    let greeting: Greeting = renderer
        .call("greet", vec![json!("world"), json!(true)])
        .await?;
    println!("greet -> {greeting:?}");

    match renderer.send("fail", vec![]).await {
        Err(RpcError::Remote(remote)) => println!(
            "fail -> {}: {} (retryAfterMs = {:?})",
            remote.name(),
            remote.message(),
            remote.get("retryAfterMs")
        ),
        other => println!("fail -> unexpected {other:?}"),
    }

    match renderer.send("nobody/home", vec![]).await {
        Err(err) => println!("nobody/home -> {err}"),
        Ok(value) => println!("nobody/home -> {value}"),
    }

    main_side.shutdown().await?;
    renderer.shutdown().await?;
    Ok(())
}
